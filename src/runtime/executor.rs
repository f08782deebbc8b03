//! Conversation actor and its mailbox loop

use super::state_manager::StateManager;
use super::traits::StateStore;
use super::RuntimeError;

use crate::state_machine::state::{decode_history, encode_history, CANCEL_ACK, HISTORY_KEY};
use crate::state_machine::transition::build_turn;
use crate::state_machine::{
    transition, Action, ActorStatus, ConversationId, DeleteOutcome, EchoInput, EchoResponse,
    Operation, Outcome, Reply, Turn,
};
use chrono::Utc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};

/// One queued call on an actor
#[derive(Debug)]
pub struct Invocation {
    pub operation: Operation,
    pub reply: oneshot::Sender<Result<Outcome, RuntimeError>>,
}

/// Single authority over one conversation's history and cancellation.
///
/// Holds no locks: the mailbox loop guarantees at most one operation in
/// flight per instance.
pub struct ConversationActor<S: StateStore> {
    conversation_id: ConversationId,
    status: ActorStatus,
    state: StateManager<S>,
}

impl<S: StateStore> ConversationActor<S> {
    pub fn new(conversation_id: ConversationId, store: S) -> Self {
        let state = StateManager::new(conversation_id.as_str(), store);
        Self {
            conversation_id,
            status: ActorStatus::Active,
            state,
        }
    }

    #[allow(dead_code)] // Inspected by tests
    pub fn status(&self) -> ActorStatus {
        self.status
    }

    /// Run one operation to completion
    pub async fn handle(&mut self, operation: Operation) -> Result<Outcome, RuntimeError> {
        let name = operation.name();
        let result = transition(self.status, operation);
        self.status = result.new_status;

        tracing::debug!(
            conv_id = %self.conversation_id,
            operation = name,
            action = ?result.action,
            cancelled = result.new_status.is_cancelled(),
            "Handling operation"
        );

        let reply = match result.action {
            Action::ShortCircuit => return Ok(Outcome::Cancelled),
            Action::Echo { input } => Reply::Echo(self.echo(&input).await?),
            Action::ReadHistory => Reply::History(self.history().await?),
            Action::DeleteHistory => Reply::DeleteHistory(self.delete_history().await?),
            Action::Acknowledge => {
                tracing::info!(conv_id = %self.conversation_id, "Cancel signal received");
                Reply::CancelAck(CANCEL_ACK)
            }
        };

        Ok(Outcome::Completed(reply))
    }

    async fn load_history(&self) -> Result<Vec<Turn>, RuntimeError> {
        match self.state.get_state(HISTORY_KEY).await? {
            Some(raw) => decode_history(&raw).map_err(|source| RuntimeError::Decode {
                conversation_id: self.conversation_id.to_string(),
                source,
            }),
            None => Ok(Vec::new()),
        }
    }

    async fn echo(&mut self, input: &EchoInput) -> Result<EchoResponse, RuntimeError> {
        let past = self.load_history().await?;
        let current = build_turn(input, self.conversation_id.as_str(), Utc::now());

        let mut history = Vec::with_capacity(past.len() + 1);
        history.extend(past.iter().cloned());
        history.push(current.clone());

        let encoded = encode_history(&history).map_err(RuntimeError::Encode)?;
        self.state.set_state(HISTORY_KEY, encoded);
        self.state.save_state().await?;

        tracing::debug!(
            conv_id = %self.conversation_id,
            turns = history.len(),
            "Echo appended to history"
        );

        Ok(EchoResponse { current, past })
    }

    async fn history(&self) -> Result<Vec<Turn>, RuntimeError> {
        self.load_history().await
    }

    async fn delete_history(&mut self) -> Result<DeleteOutcome, RuntimeError> {
        let conversation_id = self.conversation_id.to_string();

        if !self.state.contains_state(HISTORY_KEY).await? {
            tracing::debug!(conv_id = %conversation_id, "No history was found to delete");
            return Ok(DeleteOutcome::NothingToDelete { conversation_id });
        }

        self.state.remove_state(HISTORY_KEY);
        self.state.save_state().await?;
        tracing::info!(conv_id = %conversation_id, "History deleted");

        Ok(DeleteOutcome::Deleted { conversation_id })
    }

    /// Process invocations until the mailbox closes or the actor idles out
    pub async fn run(
        mut self,
        mut mailbox: mpsc::Receiver<Invocation>,
        idle_timeout: Option<Duration>,
    ) {
        tracing::debug!(conv_id = %self.conversation_id, "Actor activated");

        loop {
            let next = match idle_timeout {
                Some(timeout) => {
                    if let Ok(next) = tokio::time::timeout(timeout, mailbox.recv()).await {
                        next
                    } else {
                        tracing::debug!(
                            conv_id = %self.conversation_id,
                            "Actor idle, deactivating"
                        );
                        break;
                    }
                }
                None => mailbox.recv().await,
            };

            let Some(Invocation { operation, reply }) = next else {
                break;
            };

            let result = self.handle(operation).await;
            if let Err(e) = &result {
                tracing::error!(conv_id = %self.conversation_id, error = %e, "Operation failed");
            }
            if reply.send(result).is_err() {
                tracing::debug!(conv_id = %self.conversation_id, "Caller dropped before reply");
            }
        }

        tracing::debug!(conv_id = %self.conversation_id, "Actor deactivated");
    }
}
