use std::collections::BTreeMap;

use serde::Serialize;

use crate::slot::{FailureRecord, ResidencyPhase};
use crate::{ExecutionBackend, ModelFamily, ResidencyManager};

#[derive(Clone, Debug, Serialize)]
pub struct ModelStatus {
    pub family: ModelFamily,
    pub remote_id: String,
    pub downloaded: bool,
    pub downloading: bool,
    pub loaded: bool,
    pub backend_used: Option<ExecutionBackend>,
    pub memory_mb: Option<u64>,
    pub estimated_memory_mb: u64,
    pub manifest_hash: Option<String>,
}

#[derive(Clone, Debug, Serialize)]
pub struct ResidencyStatus {
    pub current_key: Option<String>,
    pub phase: ResidencyPhase,
    pub device_memory_mb: u64,
    pub device_capacity_mb: Option<u64>,
    pub last_failure: Option<FailureRecord>,
    pub per_key: BTreeMap<String, ModelStatus>,
}

impl ResidencyStatus {
    pub fn loaded_keys(&self) -> Vec<&str> {
        self.per_key
            .iter()
            .filter(|(_, s)| s.loaded)
            .map(|(k, _)| k.as_str())
            .collect()
    }
}

/// Builds status from the published snapshot and download records only,
/// so it answers immediately even mid-load.
#[derive(Clone)]
pub struct StatusReporter {
    manager: ResidencyManager,
}

impl StatusReporter {
    pub fn new(manager: ResidencyManager) -> Self {
        Self { manager }
    }

    pub fn status(&self) -> ResidencyStatus {
        let snapshot = self.manager.snapshot();
        let downloads = self.manager.downloads();
        let records = downloads.records();
        let resident = snapshot.resident.as_ref();

        let per_key = self
            .manager
            .catalog()
            .iter()
            .map(|d| {
                let record = records.get(&d.key);
                let here = resident.filter(|r| r.key == d.key);
                let status = ModelStatus {
                    family: d.family,
                    remote_id: d.remote_id.clone(),
                    downloaded: record.map(|r| r.present).unwrap_or(false),
                    downloading: downloads.is_downloading(&d.key),
                    loaded: here.is_some(),
                    backend_used: here.map(|r| r.backend_used),
                    memory_mb: here.map(|r| r.memory_mb),
                    estimated_memory_mb: d.estimated_memory_mb,
                    manifest_hash: record.and_then(|r| r.manifest_hash).map(hex::encode),
                };
                (d.key.clone(), status)
            })
            .collect();

        ResidencyStatus {
            current_key: resident.map(|r| r.key.clone()),
            phase: snapshot.phase,
            device_memory_mb: self.manager.device().used_mb(),
            device_capacity_mb: self.manager.device().capacity_mb(),
            last_failure: snapshot.last_failure,
            per_key,
        }
    }
}
