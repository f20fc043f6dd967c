use thiserror::Error;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("unknown model key: {0}")]
    UnknownKey(String),
    #[error("duplicate model key in catalog: {0}")]
    DuplicateKey(String),
    #[error("catalog file error: {0}")]
    File(String),
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DownloadError {
    #[error("network error: {0}")]
    Network(String),
    #[error("authentication failed: {0}")]
    Auth(String),
    #[error("disk error: {0}")]
    Disk(String),
    #[error("verification failed: {0}")]
    Verification(String),
    #[error("download cancelled")]
    Cancelled,
}

impl DownloadError {
    /// Only transport failures are worth another attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(self, DownloadError::Network(_))
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LoadError {
    #[error("backend {backend} unsupported: {reason}")]
    UnsupportedBackend { backend: String, reason: String },
    #[error("out of device memory: {0}")]
    OutOfMemory(String),
    #[error("missing or corrupt local files: {0}")]
    MissingArtifacts(String),
    #[error("download failed: {0}")]
    Download(#[from] DownloadError),
    #[error("runtime failure: {0}")]
    Runtime(String),
    #[error("no compatible backend among [{0}]")]
    NoCompatibleBackend(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationFault {
    /// Ordinary failure inside the model call; the handle stays usable.
    Runtime,
    /// Device state may be corrupted; the handle must not be served again.
    DeviceFault,
    /// The model refused the request as malformed for its family.
    Rejected,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("generation failed ({fault:?}): {message}")]
pub struct GenerationError {
    pub fault: GenerationFault,
    pub message: String,
}

impl GenerationError {
    pub fn runtime(message: impl Into<String>) -> Self {
        Self { fault: GenerationFault::Runtime, message: message.into() }
    }

    pub fn device_fault(message: impl Into<String>) -> Self {
        Self { fault: GenerationFault::DeviceFault, message: message.into() }
    }

    pub fn rejected(message: impl Into<String>) -> Self {
        Self { fault: GenerationFault::Rejected, message: message.into() }
    }

    pub fn is_device_fault(&self) -> bool {
        self.fault == GenerationFault::DeviceFault
    }
}

/// Fault while releasing a handle. Logged, never surfaced: the slot is
/// cleared regardless.
#[derive(Debug, Clone, Error)]
#[error("release failed: {0}")]
pub struct ReleaseError(pub String);

/// Errors the residency API propagates to callers.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ResidencyError {
    #[error("invalid state: {0}")]
    InvalidState(String),
    #[error("unknown model key: {0}")]
    UnknownKey(String),
    #[error(transparent)]
    Generation(#[from] GenerationError),
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("residency worker aborted: {0}")]
    Aborted(String),
}

impl ResidencyError {
    /// Caller misuse: nothing resident when one was required, a slot
    /// occupied by another model, or a key the catalog does not know.
    pub fn is_invalid_state(&self) -> bool {
        matches!(self, ResidencyError::InvalidState(_) | ResidencyError::UnknownKey(_))
    }
}

impl From<CatalogError> for ResidencyError {
    fn from(e: CatalogError) -> Self {
        match e {
            CatalogError::UnknownKey(k) => ResidencyError::UnknownKey(k),
            other => ResidencyError::InvalidState(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, ResidencyError>;

/// Substrings runtimes print when the accelerator context is unusable.
const DEVICE_FAULT_MARKERS: &[&str] = &[
    "cuda error",
    "cudaerror",
    "device-side assert",
    "illegal memory access",
    "cublas_status",
    "cudnn_status",
    "device lost",
];

pub fn looks_like_device_fault(message: &str) -> bool {
    let lower = message.to_ascii_lowercase();
    DEVICE_FAULT_MARKERS.iter().any(|m| lower.contains(m))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_network_errors_retry() {
        assert!(DownloadError::Network("reset".into()).is_retryable());
        assert!(!DownloadError::Auth("401".into()).is_retryable());
        assert!(!DownloadError::Disk("ENOSPC".into()).is_retryable());
        assert!(!DownloadError::Cancelled.is_retryable());
    }

    #[test]
    fn device_fault_markers() {
        assert!(looks_like_device_fault("RuntimeError: CUDA error: an illegal memory access was encountered"));
        assert!(looks_like_device_fault("device-side assert triggered"));
        assert!(!looks_like_device_fault("prompt too long for context window"));
    }

    #[test]
    fn unknown_key_maps_to_residency_error() {
        let e: ResidencyError = CatalogError::UnknownKey("nope".into()).into();
        assert_eq!(e, ResidencyError::UnknownKey("nope".into()));
    }
}
