//! Pure state transition function
//!
//! Decides, without any I/O, what an actor must do for an operation given
//! its current status. The runtime executes the returned action.

use super::state::{ActorStatus, EchoInput, Turn, ECHO_PREFIX, NO_INPUT_MESSAGE};
use super::Operation;
use chrono::{DateTime, Utc};

/// Work the runtime has to carry out after a transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Conversation is cancelled; answer with the sentinel, touch nothing
    ShortCircuit,
    Echo { input: EchoInput },
    ReadHistory,
    DeleteHistory,
    /// Cancel was accepted; reply with the acknowledgement
    Acknowledge,
}

/// Result of a state transition
#[derive(Debug)]
pub struct TransitionResult {
    pub new_status: ActorStatus,
    pub action: Action,
}

impl TransitionResult {
    fn new(status: ActorStatus, action: Action) -> Self {
        Self {
            new_status: status,
            action,
        }
    }
}

/// Pure transition function
///
/// `Cancel` always wins and is idempotent. Every other operation
/// short-circuits once the actor is cancelled, before any storage access.
pub fn transition(status: ActorStatus, operation: Operation) -> TransitionResult {
    match (status, operation) {
        (_, Operation::Cancel) => {
            TransitionResult::new(ActorStatus::Cancelled, Action::Acknowledge)
        }

        (ActorStatus::Cancelled, _) => {
            TransitionResult::new(ActorStatus::Cancelled, Action::ShortCircuit)
        }

        (ActorStatus::Active, Operation::Echo { input }) => {
            TransitionResult::new(ActorStatus::Active, Action::Echo { input })
        }
        (ActorStatus::Active, Operation::History) => {
            TransitionResult::new(ActorStatus::Active, Action::ReadHistory)
        }
        (ActorStatus::Active, Operation::DeleteHistory) => {
            TransitionResult::new(ActorStatus::Active, Action::DeleteHistory)
        }
    }
}

/// Compute the stored input and the output text for an echo
pub fn echo_output(input: &EchoInput) -> (Option<String>, String) {
    match input.meaningful() {
        Some(text) => (Some(text.to_string()), format!("{ECHO_PREFIX}{text}")),
        None => (None, NO_INPUT_MESSAGE.to_string()),
    }
}

/// Build the turn produced by an echo
pub fn build_turn(input: &EchoInput, actor_id: &str, timestamp: DateTime<Utc>) -> Turn {
    let (input, output) = echo_output(input);
    Turn {
        input,
        output,
        timestamp,
        actor_id: actor_id.to_string(),
    }
}
