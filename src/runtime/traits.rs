//! Trait abstractions for runtime I/O
//!
//! These traits enable testing the actor with mock implementations.

use crate::db::{Database, DbError, StateChange};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Failure of the durable state store
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("state storage failed: {0}")]
    Storage(String),
}

impl From<DbError> for StoreError {
    fn from(e: DbError) -> Self {
        StoreError::Storage(e.to_string())
    }
}

/// Durable key/value state, scoped per actor
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Read the value stored under `key`, if any
    async fn load(&self, actor_id: &str, key: &str) -> Result<Option<String>, StoreError>;

    /// Check whether `key` exists
    async fn contains(&self, actor_id: &str, key: &str) -> Result<bool, StoreError>;

    /// Apply a batch of changes atomically
    async fn commit(&self, actor_id: &str, changes: &[StateChange]) -> Result<(), StoreError>;
}

// ============================================================================
// Arc implementation for trait objects
// ============================================================================

#[async_trait]
impl<T: StateStore + ?Sized> StateStore for Arc<T> {
    async fn load(&self, actor_id: &str, key: &str) -> Result<Option<String>, StoreError> {
        (**self).load(actor_id, key).await
    }

    async fn contains(&self, actor_id: &str, key: &str) -> Result<bool, StoreError> {
        (**self).contains(actor_id, key).await
    }

    async fn commit(&self, actor_id: &str, changes: &[StateChange]) -> Result<(), StoreError> {
        (**self).commit(actor_id, changes).await
    }
}

// ============================================================================
// Production Adapter
// ============================================================================

/// Adapter to use Database as a `StateStore`
#[derive(Clone)]
pub struct DatabaseStorage {
    db: Database,
}

impl DatabaseStorage {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

#[async_trait]
impl StateStore for DatabaseStorage {
    async fn load(&self, actor_id: &str, key: &str) -> Result<Option<String>, StoreError> {
        self.db.get_state(actor_id, key).map_err(StoreError::from)
    }

    async fn contains(&self, actor_id: &str, key: &str) -> Result<bool, StoreError> {
        self.db.contains_state(actor_id, key).map_err(StoreError::from)
    }

    async fn commit(&self, actor_id: &str, changes: &[StateChange]) -> Result<(), StoreError> {
        self.db
            .apply_changes(actor_id, changes)
            .map_err(StoreError::from)
    }
}
