//! Family runtimes: how each kind of model is instantiated, driven and
//! released. The residency manager only ever talks to these traits.

mod families;
mod worker;

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{GenerationError, ReleaseError};
use crate::{ExecutionBackend, ModelDescriptor, ModelFamily};

pub use families::{EdgeRuntime, PythonWorkerRuntime};
pub use worker::{WorkerCommand, WorkerErrorKind, WorkerEvent, WorkerProcess, WorkerRequest};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Modality {
    Audio,
    Image,
}

/// Reference to an auxiliary input on local disk (multimodal family only).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Attachment {
    pub modality: Modality,
    pub path: PathBuf,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub prompt: String,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
    pub max_length: u32,
    #[serde(default)]
    pub temperature: Option<f32>,
}

impl GenerationRequest {
    pub fn new(prompt: impl Into<String>, max_length: u32) -> Self {
        Self { prompt: prompt.into(), attachments: Vec::new(), max_length, temperature: None }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_attachment(mut self, modality: Modality, path: impl Into<PathBuf>) -> Self {
        self.attachments.push(Attachment { modality, path: path.into() });
        self
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.prompt.trim().is_empty() {
            return Err("prompt is empty".into());
        }
        if self.max_length == 0 {
            return Err("max_length must be at least 1".into());
        }
        if let Some(t) = self.temperature {
            if !(0.0..=2.0).contains(&t) || t.is_nan() {
                return Err(format!("temperature {t} outside 0.0..=2.0"));
            }
        }
        Ok(())
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct GenerationResult {
    pub text: String,
    pub latency_ms: u64,
    pub model_key: String,
    pub backend: ExecutionBackend,
    pub request_id: uuid::Uuid,
}

/// Auxiliary artifact loaded next to the weights.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Companion {
    Tokenizer,
    Processor,
}

/// A live, device-resident model. Owned by the residency slot; callers only
/// borrow it for the duration of one generation.
#[async_trait]
pub trait ModelHandle: Send {
    fn memory_mb(&self) -> u64;

    fn companion(&self) -> Option<Companion>;

    async fn generate(&mut self, request: &GenerationRequest) -> Result<String, GenerationError>;

    async fn release(self: Box<Self>) -> Result<(), ReleaseError>;
}

/// Result of one instantiation attempt with one backend.
pub enum LoadOutcome {
    Loaded(Box<dyn ModelHandle>),
    /// The backend cannot run here; the next, more portable hint may.
    Incompatible(String),
    OutOfMemory(String),
    Failed(String),
}

impl fmt::Debug for LoadOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadOutcome::Loaded(h) => write!(f, "Loaded({} MB)", h.memory_mb()),
            LoadOutcome::Incompatible(r) => write!(f, "Incompatible({r})"),
            LoadOutcome::OutOfMemory(r) => write!(f, "OutOfMemory({r})"),
            LoadOutcome::Failed(r) => write!(f, "Failed({r})"),
        }
    }
}

#[async_trait]
pub trait FamilyRuntime: Send + Sync {
    async fn load(&self, descriptor: &ModelDescriptor, backend: ExecutionBackend) -> LoadOutcome;
}

/// One runtime per family, selected by the descriptor's tag.
#[derive(Clone)]
pub struct RuntimeSet {
    causal_lm: Arc<dyn FamilyRuntime>,
    multimodal: Arc<dyn FamilyRuntime>,
    edge_runtime: Arc<dyn FamilyRuntime>,
}

impl RuntimeSet {
    pub fn new(
        causal_lm: Arc<dyn FamilyRuntime>,
        multimodal: Arc<dyn FamilyRuntime>,
        edge_runtime: Arc<dyn FamilyRuntime>,
    ) -> Self {
        Self { causal_lm, multimodal, edge_runtime }
    }

    /// Same runtime for every family.
    pub fn uniform(runtime: Arc<dyn FamilyRuntime>) -> Self {
        Self::new(runtime.clone(), runtime.clone(), runtime)
    }

    pub fn for_family(&self, family: ModelFamily) -> &Arc<dyn FamilyRuntime> {
        match family {
            ModelFamily::CausalLm => &self.causal_lm,
            ModelFamily::Multimodal => &self.multimodal,
            ModelFamily::EdgeRuntime => &self.edge_runtime,
        }
    }
}
