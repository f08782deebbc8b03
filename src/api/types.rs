//! API request and response types

use crate::db::StateRecord;
use crate::state_machine::{ConversationId, DeleteOutcome, EchoInput, Operation, Outcome, Reply};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Skills exposed by the echo agent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Skill {
    Echo,
    History,
    DeleteHistory,
    Cancel,
}

/// Payload shared by every skill
#[derive(Debug, Default, Deserialize)]
pub struct SkillData {
    #[serde(default, alias = "thread_id")]
    pub conversation_id: String,
    #[serde(default, alias = "user_input")]
    pub input: Option<String>,
}

/// Tagged skill request: one entry point for all four operations
#[derive(Debug, Deserialize)]
pub struct SkillRequest {
    pub skill: Skill,
    #[serde(default)]
    pub data: SkillData,
}

impl SkillRequest {
    /// Validate and map to the actor operation it addresses
    pub fn into_operation(self) -> Result<(ConversationId, Operation), String> {
        let conversation_id =
            ConversationId::parse(self.data.conversation_id).map_err(|e| e.to_string())?;

        let operation = match self.skill {
            Skill::Echo => Operation::Echo {
                input: EchoInput::from_optional(self.data.input),
            },
            Skill::History => Operation::History,
            Skill::DeleteHistory => Operation::DeleteHistory,
            Skill::Cancel => Operation::Cancel,
        };

        Ok((conversation_id, operation))
    }
}

/// Request body for the echo route
#[derive(Debug, Default, Deserialize)]
pub struct EchoRequest {
    #[serde(default, alias = "user_input")]
    pub input: Option<String>,
}

/// Whether the actor ran the operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationStatus {
    Completed,
    Cancelled,
}

/// Response for any actor operation
#[derive(Debug, Serialize)]
pub struct OperationResponse {
    pub status: OperationStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
}

/// Response body for a history deletion
#[derive(Debug, Serialize)]
pub struct DeleteHistoryResponse {
    #[serde(flatten)]
    pub outcome: DeleteOutcome,
    pub message: String,
}

impl OperationResponse {
    pub fn from_outcome(outcome: Outcome) -> Result<Self, serde_json::Error> {
        let reply = match outcome {
            Outcome::Cancelled => {
                return Ok(Self {
                    status: OperationStatus::Cancelled,
                    result: None,
                })
            }
            Outcome::Completed(reply) => reply,
        };

        let result = match reply {
            Reply::Echo(response) => serde_json::to_value(response)?,
            Reply::History(turns) => serde_json::to_value(turns)?,
            Reply::DeleteHistory(outcome) => {
                let message = outcome.to_string();
                serde_json::to_value(DeleteHistoryResponse { outcome, message })?
            }
            Reply::CancelAck(ack) => Value::String(ack.to_string()),
        };

        Ok(Self {
            status: OperationStatus::Completed,
            result: Some(result),
        })
    }
}

/// Live actors, for operators
#[derive(Debug, Serialize)]
pub struct ActiveActorsResponse {
    pub actors: Vec<ConversationId>,
}

/// Result of an explicit deactivation
#[derive(Debug, Serialize)]
pub struct DeactivateResponse {
    pub conversation_id: ConversationId,
    pub deactivated: bool,
}

/// Raw stored state of one conversation
#[derive(Debug, Serialize)]
pub struct StoredStateResponse {
    pub conversation_id: ConversationId,
    pub records: Vec<StateRecord>,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_skill_request_maps_to_operation() {
        let req: SkillRequest = serde_json::from_value(json!({
            "skill": "echo",
            "data": { "thread_id": "t-1", "user_input": "hi" }
        }))
        .unwrap();

        let (id, op) = req.into_operation().unwrap();
        assert_eq!(id.as_str(), "t-1");
        assert_eq!(
            op,
            Operation::Echo {
                input: EchoInput::Present("hi".into())
            }
        );
    }

    #[test]
    fn test_skill_request_without_input_is_absent() {
        let req: SkillRequest = serde_json::from_value(json!({
            "skill": "echo",
            "data": { "conversation_id": "t-1" }
        }))
        .unwrap();

        let (_, op) = req.into_operation().unwrap();
        assert_eq!(
            op,
            Operation::Echo {
                input: EchoInput::Absent
            }
        );
    }

    #[test]
    fn test_blank_conversation_id_is_rejected() {
        let req: SkillRequest = serde_json::from_value(json!({
            "skill": "history",
            "data": { "conversation_id": "  " }
        }))
        .unwrap();
        assert!(req.into_operation().is_err());

        let req: SkillRequest = serde_json::from_value(json!({ "skill": "cancel" })).unwrap();
        assert!(req.into_operation().is_err());
    }

    #[test]
    fn test_unknown_skill_fails_to_parse() {
        let parsed = serde_json::from_value::<SkillRequest>(json!({
            "skill": "teleport",
            "data": { "conversation_id": "t-1" }
        }));
        assert!(parsed.is_err());
    }

    #[test]
    fn test_cancelled_response_has_no_result() {
        let response = OperationResponse::from_outcome(Outcome::Cancelled).unwrap();
        assert_eq!(
            serde_json::to_value(response).unwrap(),
            json!({ "status": "cancelled" })
        );
    }

    #[test]
    fn test_delete_response_shape() {
        let response = OperationResponse::from_outcome(Outcome::Completed(Reply::DeleteHistory(
            DeleteOutcome::NothingToDelete {
                conversation_id: "t-1".into(),
            },
        )))
        .unwrap();

        assert_eq!(
            serde_json::to_value(response).unwrap(),
            json!({
                "status": "completed",
                "result": {
                    "outcome": "nothing_to_delete",
                    "conversation_id": "t-1",
                    "message": "No history was found for t-1."
                }
            })
        );
    }
}
