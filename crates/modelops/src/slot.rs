//! The single residency slot and its observable state.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::runtime::{Companion, ModelHandle};
use crate::{ExecutionBackend, ModelFamily};

/// The model currently occupying the device.
pub struct LoadedModel {
    pub key: String,
    pub family: ModelFamily,
    pub handle: Box<dyn ModelHandle>,
    pub companion: Option<Companion>,
    pub backend_used: ExecutionBackend,
    pub actual_memory_mb: u64,
    pub loaded_at: DateTime<Utc>,
}

impl LoadedModel {
    pub fn info(&self) -> ResidentInfo {
        ResidentInfo {
            key: self.key.clone(),
            family: self.family,
            backend_used: self.backend_used,
            memory_mb: self.actual_memory_mb,
            companion: self.companion,
            loaded_at: self.loaded_at,
        }
    }
}

/// Holds zero or one loaded model. Only reachable through the manager's
/// lock, so occupancy and every transition are serialized.
#[derive(Default)]
pub struct ResidencySlot {
    resident: Option<LoadedModel>,
}

impl ResidencySlot {
    pub fn is_empty(&self) -> bool {
        self.resident.is_none()
    }

    pub fn current_key(&self) -> Option<&str> {
        self.resident.as_ref().map(|m| m.key.as_str())
    }

    pub fn resident(&self) -> Option<&LoadedModel> {
        self.resident.as_ref()
    }

    pub fn model_mut(&mut self) -> Option<&mut LoadedModel> {
        self.resident.as_mut()
    }

    pub fn take(&mut self) -> Option<LoadedModel> {
        self.resident.take()
    }

    /// Hands the model back if the slot is already occupied.
    pub fn fill(&mut self, model: LoadedModel) -> Result<(), LoadedModel> {
        if self.resident.is_some() {
            return Err(model);
        }
        self.resident = Some(model);
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ResidencyPhase {
    Empty,
    Downloading { key: String },
    Loading { key: String, backend: Option<ExecutionBackend> },
    Resident { key: String },
    Unloading { key: String },
}

impl ResidencyPhase {
    pub fn name(&self) -> &'static str {
        match self {
            ResidencyPhase::Empty => "empty",
            ResidencyPhase::Downloading { .. } => "downloading",
            ResidencyPhase::Loading { .. } => "loading",
            ResidencyPhase::Resident { .. } => "resident",
            ResidencyPhase::Unloading { .. } => "unloading",
        }
    }

    pub fn key(&self) -> Option<&str> {
        match self {
            ResidencyPhase::Empty => None,
            ResidencyPhase::Downloading { key }
            | ResidencyPhase::Loading { key, .. }
            | ResidencyPhase::Resident { key }
            | ResidencyPhase::Unloading { key } => Some(key),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ResidentInfo {
    pub key: String,
    pub family: ModelFamily,
    pub backend_used: ExecutionBackend,
    pub memory_mb: u64,
    pub companion: Option<Companion>,
    pub loaded_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct FailureRecord {
    pub key: String,
    pub cause: String,
    pub at: DateTime<Utc>,
}

/// Published after every transition; readable without the slot lock.
#[derive(Clone, Debug, Serialize)]
pub struct SlotSnapshot {
    pub phase: ResidencyPhase,
    pub resident: Option<ResidentInfo>,
    pub last_failure: Option<FailureRecord>,
}

impl Default for SlotSnapshot {
    fn default() -> Self {
        Self { phase: ResidencyPhase::Empty, resident: None, last_failure: None }
    }
}
