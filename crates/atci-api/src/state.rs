//! Application state.

use std::sync::Arc;

use atci_models::{AtciConfig, ConfigError};
use atci_queue::{CancelRegistry, Queue};
use atci_store::Db;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Db>,
    pub queue: Queue,
    pub cancel: Arc<CancelRegistry>,
}

impl AppState {
    /// Create new application state over the opened store.
    pub fn new(db: Arc<Db>, queue: Queue, cancel: Arc<CancelRegistry>) -> Self {
        Self { db, queue, cancel }
    }

    /// Load a validated configuration snapshot for one request.
    pub fn config(&self) -> Result<AtciConfig, ConfigError> {
        let cfg = AtciConfig::load()?;
        cfg.validate()?;
        Ok(cfg)
    }
}
