//! Database module for the echo agent
//!
//! Durable per-actor key/value state backed by SQLite.

mod schema;

pub use schema::*;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("Database connection lock poisoned")]
    Poisoned,
}

pub type DbResult<T> = Result<T, DbError>;

/// Thread-safe database handle
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
    actor_type: String,
}

impl Database {
    /// Open or create database at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> DbResult<Self> {
        let conn = Connection::open(path)?;
        Self::from_connection(conn)
    }

    /// Open an in-memory database (for testing)
    #[allow(dead_code)] // Used in tests
    pub fn open_in_memory() -> DbResult<Self> {
        let conn = Connection::open_in_memory()?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> DbResult<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            actor_type: CONVERSATION_ACTOR_TYPE.to_string(),
        })
    }

    fn lock(&self) -> DbResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| DbError::Poisoned)
    }

    // ==================== State Operations ====================

    /// Read one state value for an actor
    pub fn get_state(&self, actor_id: &str, key: &str) -> DbResult<Option<String>> {
        let conn = self.lock()?;
        conn.query_row(
            "SELECT value FROM actor_state WHERE actor_type = ?1 AND actor_id = ?2 AND state_key = ?3",
            params![self.actor_type, actor_id, key],
            |row| row.get(0),
        )
        .optional()
        .map_err(DbError::from)
    }

    /// Check whether a state key exists for an actor
    pub fn contains_state(&self, actor_id: &str, key: &str) -> DbResult<bool> {
        let conn = self.lock()?;
        let exists: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM actor_state WHERE actor_type = ?1 AND actor_id = ?2 AND state_key = ?3)",
            params![self.actor_type, actor_id, key],
            |row| row.get(0),
        )?;
        Ok(exists)
    }

    /// Apply a batch of changes for one actor in a single transaction.
    ///
    /// Either every change is committed or none is.
    pub fn apply_changes(&self, actor_id: &str, changes: &[StateChange]) -> DbResult<()> {
        if changes.is_empty() {
            return Ok(());
        }

        let mut conn = self.lock()?;
        let now = Utc::now();
        let tx = conn.transaction()?;

        for change in changes {
            match change {
                StateChange::Upsert { key, value } => {
                    tx.execute(
                        "INSERT INTO actor_state (actor_type, actor_id, state_key, value, updated_at)
                         VALUES (?1, ?2, ?3, ?4, ?5)
                         ON CONFLICT (actor_type, actor_id, state_key)
                         DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
                        params![self.actor_type, actor_id, key, value, now.to_rfc3339()],
                    )?;
                }
                StateChange::Remove { key } => {
                    tx.execute(
                        "DELETE FROM actor_state WHERE actor_type = ?1 AND actor_id = ?2 AND state_key = ?3",
                        params![self.actor_type, actor_id, key],
                    )?;
                }
            }
        }

        tx.commit()?;

        tracing::debug!(
            actor_id = %actor_id,
            changes = changes.len(),
            "Committed actor state"
        );
        Ok(())
    }

    /// List all state rows for an actor (operator inspection)
    pub fn list_state(&self, actor_id: &str) -> DbResult<Vec<StateRecord>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT actor_id, state_key, value, updated_at FROM actor_state
             WHERE actor_type = ?1 AND actor_id = ?2 ORDER BY state_key ASC",
        )?;

        let rows = stmt.query_map(params![self.actor_type, actor_id], |row| {
            Ok(StateRecord {
                actor_id: row.get(0)?,
                key: row.get(1)?,
                value: row.get(2)?,
                updated_at: parse_datetime(&row.get::<_, String>(3)?),
            })
        })?;

        rows.collect::<Result<Vec<_>, _>>().map_err(DbError::from)
    }
}

fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s).map_or_else(|_| Utc::now(), |dt| dt.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn upsert(key: &str, value: &str) -> StateChange {
        StateChange::Upsert {
            key: key.to_string(),
            value: value.to_string(),
        }
    }

    #[test]
    fn test_missing_state_is_none() {
        let db = Database::open_in_memory().unwrap();

        assert_eq!(db.get_state("conv-1", "echo_history").unwrap(), None);
        assert!(!db.contains_state("conv-1", "echo_history").unwrap());
    }

    #[test]
    fn test_upsert_and_get_state() {
        let db = Database::open_in_memory().unwrap();

        db.apply_changes("conv-1", &[upsert("echo_history", "[1]")])
            .unwrap();
        db.apply_changes("conv-1", &[upsert("echo_history", "[1,2]")])
            .unwrap();

        assert_eq!(
            db.get_state("conv-1", "echo_history").unwrap().as_deref(),
            Some("[1,2]")
        );
        assert!(db.contains_state("conv-1", "echo_history").unwrap());
        assert_eq!(db.list_state("conv-1").unwrap().len(), 1);
    }

    #[test]
    fn test_remove_state() {
        let db = Database::open_in_memory().unwrap();

        db.apply_changes("conv-1", &[upsert("echo_history", "[]")])
            .unwrap();
        db.apply_changes(
            "conv-1",
            &[StateChange::Remove {
                key: "echo_history".to_string(),
            }],
        )
        .unwrap();

        assert!(!db.contains_state("conv-1", "echo_history").unwrap());
    }

    #[test]
    fn test_state_is_scoped_per_actor() {
        let db = Database::open_in_memory().unwrap();

        db.apply_changes("A", &[upsert("echo_history", "[\"a\"]")])
            .unwrap();

        assert_eq!(db.get_state("B", "echo_history").unwrap(), None);
        assert!(db.list_state("B").unwrap().is_empty());
    }

    #[test]
    fn test_batch_applies_in_order() {
        let db = Database::open_in_memory().unwrap();

        db.apply_changes(
            "conv-1",
            &[
                upsert("k", "first"),
                StateChange::Remove {
                    key: "k".to_string(),
                },
                upsert("other", "kept"),
            ],
        )
        .unwrap();

        assert_eq!(db.get_state("conv-1", "k").unwrap(), None);
        assert_eq!(
            db.get_state("conv-1", "other").unwrap().as_deref(),
            Some("kept")
        );
    }

    #[test]
    fn test_state_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.db");

        {
            let db = Database::open(&path).unwrap();
            db.apply_changes("conv-1", &[upsert("echo_history", "[42]")])
                .unwrap();
        }

        let db = Database::open(&path).unwrap();
        assert_eq!(
            db.get_state("conv-1", "echo_history").unwrap().as_deref(),
            Some("[42]")
        );
    }
}
