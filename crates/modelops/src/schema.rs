use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub type Hash32 = [u8; 32];

/// Structural family of a generative model. Selects the runtime that knows
/// how to load and drive it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelFamily {
    CausalLm,
    Multimodal,
    EdgeRuntime,
}

impl ModelFamily {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelFamily::CausalLm => "causal_lm",
            ModelFamily::Multimodal => "multimodal",
            ModelFamily::EdgeRuntime => "edge_runtime",
        }
    }
}

impl fmt::Display for ModelFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Execution strategy a runtime can be asked to instantiate a model with.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionBackend {
    FlashAttention2,
    Sdpa,
    Eager,
    Gpu,
    Cpu,
}

impl ExecutionBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutionBackend::FlashAttention2 => "flash_attention_2",
            ExecutionBackend::Sdpa => "sdpa",
            ExecutionBackend::Eager => "eager",
            ExecutionBackend::Gpu => "gpu",
            ExecutionBackend::Cpu => "cpu",
        }
    }
}

impl fmt::Display for ExecutionBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Quantization {
    Bf16,
    Int8,
    Int4,
}

impl Quantization {
    pub fn as_str(&self) -> &'static str {
        match self {
            Quantization::Bf16 => "bf16",
            Quantization::Int8 => "int8",
            Quantization::Int4 => "int4",
        }
    }
}

/// One file a model needs on disk. `size` is checked when known.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactSpec {
    pub rel_path: String,
    #[serde(default)]
    pub size: Option<u64>,
}

impl ArtifactSpec {
    pub fn new(rel_path: &str) -> Self {
        Self { rel_path: rel_path.to_string(), size: None }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ModelFile {
    pub rel_path: String,
    pub size: u64,
}

/// Immutable description of a manageable model.
#[derive(Clone, Debug, Serialize)]
pub struct ModelDescriptor {
    pub key: String,
    pub family: ModelFamily,
    pub remote_id: String,
    pub revision: String,
    pub local_path: PathBuf,
    pub estimated_memory_mb: u64,
    /// Ordered: most optimized first, most portable last.
    pub backend_hints: Vec<ExecutionBackend>,
    pub quantization: Option<Quantization>,
    pub artifacts: Vec<ArtifactSpec>,
}

/// Per-key on-disk state as last observed by the download manager.
#[derive(Clone, Debug, Default, Serialize)]
pub struct DownloadRecord {
    pub present: bool,
    pub verified_at: Option<DateTime<Utc>>,
    #[serde(serialize_with = "hex_opt")]
    pub manifest_hash: Option<Hash32>,
    pub files: Vec<ModelFile>,
}

fn hex_opt<S: serde::Serializer>(v: &Option<Hash32>, s: S) -> Result<S::Ok, S::Error> {
    match v {
        Some(h) => s.serialize_some(&hex::encode(h)),
        None => s.serialize_none(),
    }
}
