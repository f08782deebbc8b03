//! HTTP API for the echo agent

mod handlers;
mod types;

pub use handlers::create_router;
#[allow(unused_imports)] // Public API re-exports
pub use types::*;

use crate::db::Database;
use crate::runtime::{DatabaseStorage, ProductionRuntime, RuntimeConfig, RuntimeManager};
use std::sync::Arc;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub runtime: Arc<ProductionRuntime>,
    pub db: Database,
}

impl AppState {
    pub fn new(db: Database, config: RuntimeConfig) -> Self {
        let storage = DatabaseStorage::new(db.clone());
        Self {
            runtime: Arc::new(RuntimeManager::new(storage, config)),
            db,
        }
    }
}
