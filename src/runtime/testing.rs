//! Mock implementations for testing
//!
//! These mocks enable actor and runtime tests without SQLite.

use super::traits::{StateStore, StoreError};
use crate::db::StateChange;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

// ============================================================================
// Mock State Store
// ============================================================================

/// In-memory state store that records calls and can inject faults
pub struct MockStateStore {
    values: Mutex<HashMap<(String, String), String>>,
    load_delay: Mutex<Option<Duration>>,
    loads: AtomicUsize,
    commits: AtomicUsize,
    fail_next_load: AtomicBool,
    fail_next_commit: AtomicBool,
}

impl MockStateStore {
    pub fn new() -> Self {
        Self {
            values: Mutex::new(HashMap::new()),
            load_delay: Mutex::new(None),
            loads: AtomicUsize::new(0),
            commits: AtomicUsize::new(0),
            fail_next_load: AtomicBool::new(false),
            fail_next_commit: AtomicBool::new(false),
        }
    }

    /// Seed a raw value, bypassing the commit path
    pub fn insert_raw(&self, actor_id: &str, key: &str, value: &str) {
        self.values
            .lock()
            .unwrap()
            .insert((actor_id.to_string(), key.to_string()), value.to_string());
    }

    /// Raw value currently stored
    pub fn stored(&self, actor_id: &str, key: &str) -> Option<String> {
        self.values
            .lock()
            .unwrap()
            .get(&(actor_id.to_string(), key.to_string()))
            .cloned()
    }

    /// Number of reads (`load` and `contains`) served
    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }

    /// Number of successful commits
    pub fn commit_count(&self) -> usize {
        self.commits.load(Ordering::SeqCst)
    }

    pub fn fail_next_load(&self) {
        self.fail_next_load.store(true, Ordering::SeqCst);
    }

    pub fn fail_next_commit(&self) {
        self.fail_next_commit.store(true, Ordering::SeqCst);
    }

    /// Make every read sleep first, keeping the calling actor busy
    pub fn delay_loads(&self, delay: Duration) {
        *self.load_delay.lock().unwrap() = Some(delay);
    }

    async fn read(&self) -> Result<(), StoreError> {
        let delay = *self.load_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if self.fail_next_load.swap(false, Ordering::SeqCst) {
            return Err(StoreError::Storage("injected read fault".to_string()));
        }
        self.loads.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

impl Default for MockStateStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StateStore for MockStateStore {
    async fn load(&self, actor_id: &str, key: &str) -> Result<Option<String>, StoreError> {
        self.read().await?;
        Ok(self.stored(actor_id, key))
    }

    async fn contains(&self, actor_id: &str, key: &str) -> Result<bool, StoreError> {
        self.read().await?;
        Ok(self.stored(actor_id, key).is_some())
    }

    async fn commit(&self, actor_id: &str, changes: &[StateChange]) -> Result<(), StoreError> {
        if self.fail_next_commit.swap(false, Ordering::SeqCst) {
            return Err(StoreError::Storage("injected commit fault".to_string()));
        }

        let mut values = self.values.lock().unwrap();
        for change in changes {
            match change {
                StateChange::Upsert { key, value } => {
                    values.insert((actor_id.to_string(), key.clone()), value.clone());
                }
                StateChange::Remove { key } => {
                    values.remove(&(actor_id.to_string(), key.clone()));
                }
            }
        }
        self.commits.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_store_faults_are_one_shot() {
        let store = MockStateStore::new();

        store.fail_next_load();
        assert!(store.load("a", "k").await.is_err());
        assert!(store.load("a", "k").await.is_ok());

        store.fail_next_commit();
        let change = StateChange::Upsert {
            key: "k".into(),
            value: "v".into(),
        };
        assert!(store.commit("a", &[change.clone()]).await.is_err());
        assert_eq!(store.stored("a", "k"), None);

        store.commit("a", &[change]).await.unwrap();
        assert_eq!(store.stored("a", "k").as_deref(), Some("v"));
        assert_eq!(store.commit_count(), 1);
    }
}
