use std::sync::Arc;

use chrono::{DateTime, Utc};
use modelops::{GenerationDispatcher, ResidencyManager, StatusReporter, WarmupReport};

use crate::config::AppConfig;

pub type SharedState = Arc<AppState>;

pub struct AppState {
    pub cfg: AppConfig,
    pub manager: ResidencyManager,
    pub dispatcher: GenerationDispatcher,
    pub status: StatusReporter,
    pub warmup: Option<WarmupReport>,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    pub fn new(cfg: AppConfig, manager: ResidencyManager, warmup: Option<WarmupReport>) -> Self {
        Self {
            cfg,
            dispatcher: GenerationDispatcher::new(manager.clone()),
            status: StatusReporter::new(manager.clone()),
            manager,
            warmup,
            started_at: Utc::now(),
        }
    }
}
