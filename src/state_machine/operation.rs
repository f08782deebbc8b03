//! Operations a conversation actor accepts and what they return

use super::state::{DeleteOutcome, EchoInput, EchoResponse, Turn};

/// The four skills of a conversation actor
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    Echo { input: EchoInput },
    History,
    DeleteHistory,
    Cancel,
}

impl Operation {
    pub fn name(&self) -> &'static str {
        match self {
            Operation::Echo { .. } => "Echo",
            Operation::History => "History",
            Operation::DeleteHistory => "DeleteHistory",
            Operation::Cancel => "Cancel",
        }
    }
}

/// Value produced by a completed operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Echo(EchoResponse),
    History(Vec<Turn>),
    DeleteHistory(DeleteOutcome),
    CancelAck(&'static str),
}

/// Result of invoking an operation.
///
/// `Cancelled` is a normal outcome, not an error: the actor skipped the
/// operation because its conversation was cancelled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Completed(Reply),
    Cancelled,
}

impl Outcome {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Outcome::Cancelled)
    }
}
