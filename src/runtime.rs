//! Runtime for conversation actors
//!
//! A keyed executor: each live `ConversationId` maps to one actor task with
//! its own mailbox, so operations for one conversation run strictly one at a
//! time while different conversations proceed independently.

mod executor;
mod state_manager;
pub mod traits;

#[cfg(test)]
pub mod testing;

pub use executor::ConversationActor;
pub use traits::*;

use crate::state_machine::{ConversationId, Operation, Outcome};
use executor::Invocation;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot, watch, RwLock};

/// Type alias for production runtime with concrete implementations
pub type ProductionRuntime = RuntimeManager<DatabaseStorage>;

const DEFAULT_MAILBOX_CAPACITY: usize = 32;

/// Errors surfaced to callers of an actor operation
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("History for {conversation_id} is corrupt: {source}")]
    Decode {
        conversation_id: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("Failed to encode history: {0}")]
    Encode(#[source] serde_json::Error),
    #[error("Actor for {0} is unavailable")]
    MailboxClosed(String),
}

/// Runtime tuning
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Deactivate an actor after this long without invocations
    pub idle_timeout: Option<Duration>,
    pub mailbox_capacity: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            idle_timeout: None,
            mailbox_capacity: DEFAULT_MAILBOX_CAPACITY,
        }
    }
}

/// Handle to a live actor instance
#[derive(Clone)]
struct ActorHandle {
    mailbox: mpsc::Sender<Invocation>,
    generation: u64,
    /// Flips to `true` once the actor task has stopped
    exited: watch::Receiver<bool>,
}

/// Table entry for one conversation
#[derive(Clone)]
enum ActorSlot {
    Live(ActorHandle),
    /// Deactivated but still serving queued invocations. No new instance
    /// may start until it has exited.
    Draining {
        generation: u64,
        exited: watch::Receiver<bool>,
    },
}

impl ActorSlot {
    fn generation(&self) -> u64 {
        match self {
            ActorSlot::Live(handle) => handle.generation,
            ActorSlot::Draining { generation, .. } => *generation,
        }
    }
}

type ActorTable = Arc<RwLock<HashMap<ConversationId, ActorSlot>>>;

/// Manager for all conversation actors
pub struct RuntimeManager<S: StateStore + Clone + 'static> {
    store: S,
    config: RuntimeConfig,
    actors: ActorTable,
    next_generation: AtomicU64,
}

impl<S: StateStore + Clone + 'static> RuntimeManager<S> {
    pub fn new(store: S, config: RuntimeConfig) -> Self {
        Self {
            store,
            config,
            actors: Arc::new(RwLock::new(HashMap::new())),
            next_generation: AtomicU64::new(1),
        }
    }

    /// Invoke an operation on the actor owning `conversation_id`.
    ///
    /// Activates the actor if needed. If the actor went away between lookup
    /// and delivery (idle deactivation), a fresh one is activated and the
    /// call is retried once.
    pub async fn invoke(
        &self,
        conversation_id: &ConversationId,
        operation: Operation,
    ) -> Result<Outcome, RuntimeError> {
        let mut retried = false;

        loop {
            let handle = self.get_or_activate(conversation_id).await;
            let (reply_tx, reply_rx) = oneshot::channel();
            let invocation = Invocation {
                operation: operation.clone(),
                reply: reply_tx,
            };

            let delivered = handle.mailbox.send(invocation).await.is_ok();
            if delivered {
                if let Ok(result) = reply_rx.await {
                    return result;
                }
            }

            // The actor stopped without running this invocation
            self.evict(conversation_id, handle.generation).await;
            if retried {
                return Err(RuntimeError::MailboxClosed(conversation_id.to_string()));
            }
            tracing::debug!(conv_id = %conversation_id, "Actor stopped before delivery, retrying");
            retried = true;
        }
    }

    /// Live handle for `conversation_id`, activating one if needed.
    ///
    /// Waits while a deactivated instance is still draining, so at most one
    /// instance per conversation ever runs.
    async fn get_or_activate(&self, conversation_id: &ConversationId) -> ActorHandle {
        loop {
            let slot = self.actors.read().await.get(conversation_id).cloned();
            let mut exited = match slot {
                Some(ActorSlot::Live(handle)) => return handle,
                Some(ActorSlot::Draining { exited, .. }) if !*exited.borrow() => exited,
                Some(ActorSlot::Draining { .. }) | None => {
                    match self.activate(conversation_id).await {
                        Ok(handle) => return handle,
                        Err(exited) => exited,
                    }
                }
            };

            tracing::debug!(conv_id = %conversation_id, "Waiting for draining actor to stop");
            wait_for_exit(&mut exited).await;
        }
    }

    /// Start an actor unless one is present. A draining instance is returned
    /// as `Err` with its exit signal.
    async fn activate(
        &self,
        conversation_id: &ConversationId,
    ) -> Result<ActorHandle, watch::Receiver<bool>> {
        let mut actors = self.actors.write().await;
        // Another caller may have changed the entry while we waited for the lock
        match actors.get(conversation_id) {
            Some(ActorSlot::Live(handle)) => return Ok(handle.clone()),
            Some(ActorSlot::Draining { exited, .. }) if !*exited.borrow() => {
                return Err(exited.clone());
            }
            _ => {}
        }

        let (mailbox, mailbox_rx) = mpsc::channel(self.config.mailbox_capacity);
        let (exited_tx, exited) = watch::channel(false);
        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);
        let handle = ActorHandle {
            mailbox,
            generation,
            exited,
        };
        actors.insert(conversation_id.clone(), ActorSlot::Live(handle.clone()));
        drop(actors);

        let actor = ConversationActor::new(conversation_id.clone(), self.store.clone());
        let idle_timeout = self.config.idle_timeout;
        // Weak so that dropping the manager closes every mailbox
        let table = Arc::downgrade(&self.actors);
        let conv_id = conversation_id.clone();

        tokio::spawn(async move {
            actor.run(mailbox_rx, idle_timeout).await;
            exited_tx.send_replace(true);
            if let Some(table) = table.upgrade() {
                remove_if_current(&table, &conv_id, generation).await;
            }
            tracing::info!(conv_id = %conv_id, "Conversation actor finished");
        });

        tracing::info!(conv_id = %conversation_id, generation, "Activated conversation actor");
        Ok(handle)
    }

    async fn evict(&self, conversation_id: &ConversationId, generation: u64) {
        remove_if_current(&self.actors, conversation_id, generation).await;
    }

    /// Deactivate a live actor and wait until it has stopped.
    ///
    /// Invocations already queued are still served by the old instance.
    /// Invocations arriving meanwhile wait for it to stop and then go to a
    /// fresh instance, which starts un-cancelled. Returns whether an actor
    /// was live.
    pub async fn deactivate(&self, conversation_id: &ConversationId) -> bool {
        let (was_live, mut exited) = {
            let mut actors = self.actors.write().await;
            match actors.get(conversation_id).cloned() {
                Some(ActorSlot::Live(handle)) => {
                    let exited = handle.exited.clone();
                    // Replacing the entry drops the table's mailbox sender
                    actors.insert(
                        conversation_id.clone(),
                        ActorSlot::Draining {
                            generation: handle.generation,
                            exited: exited.clone(),
                        },
                    );
                    (true, exited)
                }
                Some(ActorSlot::Draining { exited, .. }) => (false, exited),
                None => return false,
            }
        };

        if was_live {
            tracing::info!(conv_id = %conversation_id, "Deactivating conversation actor");
        }
        wait_for_exit(&mut exited).await;
        was_live
    }

    /// Conversation ids with a live actor, sorted
    pub async fn active_actors(&self) -> Vec<ConversationId> {
        let mut ids: Vec<_> = self
            .actors
            .read()
            .await
            .iter()
            .filter(|(_, slot)| matches!(slot, ActorSlot::Live(_)))
            .map(|(id, _)| id.clone())
            .collect();
        ids.sort();
        ids
    }
}

async fn remove_if_current(table: &ActorTable, conversation_id: &ConversationId, generation: u64) {
    let mut actors = table.write().await;
    if actors
        .get(conversation_id)
        .is_some_and(|slot| slot.generation() == generation)
    {
        actors.remove(conversation_id);
    }
}

async fn wait_for_exit(exited: &mut watch::Receiver<bool>) {
    // A dropped sender means the task is gone as well
    let _ = exited.wait_for(|done| *done).await;
}
