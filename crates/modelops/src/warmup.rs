use std::time::Instant;

use serde::Serialize;
use tracing::{info, warn};

use crate::ResidencyManager;

/// Outcome of the startup load of the default model.
#[derive(Clone, Debug, Serialize)]
pub struct WarmupReport {
    pub key: String,
    pub loaded: bool,
    pub error: Option<String>,
    pub elapsed_ms: u64,
}

/// Loads `key` and reports how it went. Awaited by the caller; a failure
/// leaves the slot empty and is returned, not swallowed.
pub async fn warm_up(manager: &ResidencyManager, key: &str) -> WarmupReport {
    let started = Instant::now();
    info!(key = %key, "warming up default model");

    let (loaded, error) = match manager.load(key).await {
        Ok(true) => (true, None),
        Ok(false) => {
            let cause = manager
                .snapshot()
                .last_failure
                .filter(|f| f.key == key)
                .map(|f| f.cause)
                .unwrap_or_else(|| "load failed".to_string());
            (false, Some(cause))
        }
        Err(e) => (false, Some(e.to_string())),
    };

    let report = WarmupReport {
        key: key.to_string(),
        loaded,
        error,
        elapsed_ms: started.elapsed().as_millis() as u64,
    };
    match &report.error {
        None => info!(key = %key, elapsed_ms = report.elapsed_ms, "warm-up complete"),
        Some(e) => warn!(key = %key, error = %e, "warm-up failed"),
    }
    report
}
