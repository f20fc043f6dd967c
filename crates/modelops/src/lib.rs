//! Single-tenancy residency management for generative models sharing one
//! accelerator: catalog, local artifact cache, load/unload/switch state
//! machine, and generation on top of whichever model is resident.

pub mod catalog;
pub mod device;
pub mod dispatch;
pub mod download;
pub mod error;
pub mod manager;
pub mod manifest;
pub mod prompts;
pub mod retry;
pub mod runtime;
pub mod schema;
pub mod slot;
pub mod status;
pub mod warmup;

pub use catalog::{CatalogEntry, ModelCatalog};
pub use device::DeviceMemory;
pub use dispatch::{Analysis, Comparison, GenerationDispatcher, Insights};
pub use download::{ArtifactFetcher, DownloadManager, HfFetcher};
pub use error::{
    CatalogError, DownloadError, GenerationError, GenerationFault, LoadError, ReleaseError, ResidencyError,
};
pub use manager::ResidencyManager;
pub use manifest::*;
pub use prompts::{AnalysisMode, SongMetadata};
pub use retry::RetryPolicy;
pub use runtime::{
    Attachment, Companion, EdgeRuntime, FamilyRuntime, GenerationRequest, GenerationResult, LoadOutcome, Modality,
    ModelHandle, PythonWorkerRuntime, RuntimeSet,
};
pub use schema::*;
pub use slot::{FailureRecord, ResidencyPhase, ResidentInfo, SlotSnapshot};
pub use status::{ModelStatus, ResidencyStatus, StatusReporter};
pub use warmup::{warm_up, WarmupReport};
