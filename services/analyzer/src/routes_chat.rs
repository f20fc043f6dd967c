use axum::extract::State;
use axum::Json;
use modelops::{Analysis, Attachment, Comparison, GenerationRequest, GenerationResult, Insights, SongMetadata};
use serde::Deserialize;

use crate::error::{within, ApiError};
use crate::state::SharedState;

fn default_max_length() -> u32 {
    modelops::prompts::DEFAULT_MAX_LENGTH
}

#[derive(Deserialize)]
pub struct GenerateReq {
    pub prompt: String,
    #[serde(default = "default_max_length")]
    pub max_length: u32,
    #[serde(default)]
    pub temperature: Option<f32>,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
}

#[derive(Deserialize)]
pub struct AnalyzeReq {
    pub text: String,
    #[serde(default = "default_mode")]
    pub mode: String,
}

fn default_mode() -> String {
    "summary".to_string()
}

#[derive(Deserialize)]
pub struct CompareReq {
    pub a: String,
    pub b: String,
}

#[derive(Deserialize)]
pub struct InsightsReq {
    pub text: String,
    #[serde(flatten)]
    pub metadata: SongMetadata,
}

pub async fn post_generate(
    State(st): State<SharedState>,
    Json(req): Json<GenerateReq>,
) -> Result<Json<GenerationResult>, ApiError> {
    let request = GenerationRequest {
        prompt: req.prompt,
        attachments: req.attachments,
        max_length: req.max_length,
        temperature: req.temperature,
    };
    let out = within(st.cfg.generate_timeout, st.dispatcher.generate(request)).await?;
    Ok(Json(out))
}

pub async fn post_analyze(
    State(st): State<SharedState>,
    Json(req): Json<AnalyzeReq>,
) -> Result<Json<Analysis>, ApiError> {
    let out = within(st.cfg.generate_timeout, st.dispatcher.analyze(&req.text, &req.mode)).await?;
    Ok(Json(out))
}

pub async fn post_compare(
    State(st): State<SharedState>,
    Json(req): Json<CompareReq>,
) -> Result<Json<Comparison>, ApiError> {
    let out = within(st.cfg.generate_timeout, st.dispatcher.compare(&req.a, &req.b)).await?;
    Ok(Json(out))
}

pub async fn post_insights(
    State(st): State<SharedState>,
    Json(req): Json<InsightsReq>,
) -> Result<Json<Insights>, ApiError> {
    let out = within(st.cfg.generate_timeout, st.dispatcher.insights(&req.text, &req.metadata)).await?;
    Ok(Json(out))
}
