//! Conversation actor state machine
//!
//! Pure decisions about what each operation does; the runtime performs the I/O.

mod operation;
pub mod state;
pub(crate) mod transition;

#[cfg(test)]
mod proptests;

pub use operation::{Operation, Outcome, Reply};
pub use state::{ActorStatus, ConversationId, DeleteOutcome, EchoInput, EchoResponse, Turn};
pub use transition::{transition, Action};
