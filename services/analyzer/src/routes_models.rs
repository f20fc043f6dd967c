use axum::extract::{Path, State};
use axum::Json;
use modelops::ResidencyStatus;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{within, ApiError};
use crate::state::SharedState;

#[derive(Deserialize)]
pub struct KeyReq {
    pub key: String,
}

#[derive(Serialize)]
pub struct DownloadResp {
    pub key: String,
    pub downloaded: bool,
    pub manifest_hash: Option<String>,
}

#[derive(Serialize)]
pub struct CancelResp {
    pub key: String,
    pub cancelled: bool,
}

#[derive(Serialize)]
pub struct LoadResp {
    pub key: String,
    pub loaded: bool,
    pub error: Option<String>,
}

#[derive(Serialize)]
pub struct UnloadResp {
    pub unloaded: bool,
}

pub async fn get_status(State(st): State<SharedState>) -> Json<ResidencyStatus> {
    Json(st.status.status())
}

pub async fn post_download(
    State(st): State<SharedState>,
    Json(req): Json<KeyReq>,
) -> Result<Json<DownloadResp>, ApiError> {
    let downloads = st.manager.downloads().clone();
    let key = req.key.clone();
    // detached so a dropped connection does not abort the transfer
    let downloaded = tokio::spawn(async move { downloads.ensure_downloaded(&key).await })
        .await
        .map_err(|e| modelops::ResidencyError::Aborted(format!("download: {e}")))??;

    let manifest_hash = st
        .manager
        .downloads()
        .record(&req.key)
        .and_then(|r| r.manifest_hash)
        .map(hex::encode);
    Ok(Json(DownloadResp { key: req.key, downloaded, manifest_hash }))
}

pub async fn delete_download(
    State(st): State<SharedState>,
    Path(key): Path<String>,
) -> Result<Json<CancelResp>, ApiError> {
    st.manager.catalog().get(&key)?;
    let cancelled = st.manager.downloads().cancel(&key);
    info!(key = %key, cancelled, "download cancel requested");
    Ok(Json(CancelResp { key, cancelled }))
}

pub async fn post_load(
    State(st): State<SharedState>,
    Json(req): Json<KeyReq>,
) -> Result<Json<LoadResp>, ApiError> {
    let loaded = within(st.cfg.load_timeout, st.manager.load(&req.key)).await?;
    Ok(Json(load_resp(&st, req.key, loaded)))
}

pub async fn post_switch(
    State(st): State<SharedState>,
    Json(req): Json<KeyReq>,
) -> Result<Json<LoadResp>, ApiError> {
    let loaded = within(st.cfg.load_timeout, st.manager.switch(&req.key)).await?;
    Ok(Json(load_resp(&st, req.key, loaded)))
}

pub async fn post_unload(State(st): State<SharedState>) -> Result<Json<UnloadResp>, ApiError> {
    let unloaded = within(st.cfg.load_timeout, st.manager.unload()).await?;
    Ok(Json(UnloadResp { unloaded }))
}

fn load_resp(st: &SharedState, key: String, loaded: bool) -> LoadResp {
    let error = if loaded {
        None
    } else {
        st.manager
            .snapshot()
            .last_failure
            .filter(|f| f.key == key)
            .map(|f| f.cause)
    };
    LoadResp { key, loaded, error }
}
