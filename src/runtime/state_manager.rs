//! Per-actor state manager
//!
//! Buffers `set`/`remove` calls made during one operation and flushes them
//! through the [`StateStore`] in a single atomic commit on `save_state`.

use super::traits::{StateStore, StoreError};
use crate::db::StateChange;
use std::collections::BTreeMap;

#[derive(Debug, Clone)]
enum Pending {
    Set(String),
    Remove,
}

pub struct StateManager<S: StateStore> {
    actor_id: String,
    store: S,
    pending: BTreeMap<String, Pending>,
}

impl<S: StateStore> StateManager<S> {
    pub fn new(actor_id: impl Into<String>, store: S) -> Self {
        Self {
            actor_id: actor_id.into(),
            store,
            pending: BTreeMap::new(),
        }
    }

    /// Read a value, seeing this operation's uncommitted changes first
    pub async fn get_state(&self, key: &str) -> Result<Option<String>, StoreError> {
        match self.pending.get(key) {
            Some(Pending::Set(value)) => Ok(Some(value.clone())),
            Some(Pending::Remove) => Ok(None),
            None => self.store.load(&self.actor_id, key).await,
        }
    }

    pub async fn contains_state(&self, key: &str) -> Result<bool, StoreError> {
        match self.pending.get(key) {
            Some(Pending::Set(_)) => Ok(true),
            Some(Pending::Remove) => Ok(false),
            None => self.store.contains(&self.actor_id, key).await,
        }
    }

    pub fn set_state(&mut self, key: impl Into<String>, value: String) {
        self.pending.insert(key.into(), Pending::Set(value));
    }

    pub fn remove_state(&mut self, key: impl Into<String>) {
        self.pending.insert(key.into(), Pending::Remove);
    }

    /// Make every buffered change durable in one commit.
    ///
    /// The buffer is cleared whether or not the commit succeeds; a failed
    /// commit leaves the durable state exactly as it was.
    pub async fn save_state(&mut self) -> Result<(), StoreError> {
        if self.pending.is_empty() {
            return Ok(());
        }

        let changes: Vec<StateChange> = std::mem::take(&mut self.pending)
            .into_iter()
            .map(|(key, pending)| match pending {
                Pending::Set(value) => StateChange::Upsert { key, value },
                Pending::Remove => StateChange::Remove { key },
            })
            .collect();

        self.store.commit(&self.actor_id, &changes).await
    }

    #[cfg(test)]
    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }
}
