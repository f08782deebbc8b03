//! HTTP request handlers

use super::types::{
    ActiveActorsResponse, DeactivateResponse, EchoRequest, ErrorResponse, OperationResponse,
    SkillRequest, StoredStateResponse,
};
use super::AppState;
use crate::runtime::RuntimeError;
use crate::state_machine::{ConversationId, EchoInput, Operation};
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use tower_http::trace::TraceLayer;

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Tagged skill dispatch
        .route("/api/skills", post(invoke_skill))
        // Per-operation routes
        .route("/api/conversations/:id/echo", post(echo))
        .route(
            "/api/conversations/:id/history",
            get(history).delete(delete_history),
        )
        .route("/api/conversations/:id/cancel", post(cancel))
        // Operator inspection
        .route("/api/conversations/:id/state", get(stored_state))
        .route("/api/actors", get(list_actors))
        .route("/api/actors/:id", delete(deactivate_actor))
        // Version
        .route("/version", get(get_version))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ============================================================
// Skill Dispatch
// ============================================================

async fn invoke_skill(
    State(state): State<AppState>,
    req: Result<Json<SkillRequest>, JsonRejection>,
) -> Result<Json<OperationResponse>, AppError> {
    let Json(req) = req?;
    let (conversation_id, operation) = req.into_operation().map_err(AppError::BadRequest)?;
    run(&state, &conversation_id, operation).await
}

// ============================================================
// Per-operation Routes
// ============================================================

async fn echo(
    State(state): State<AppState>,
    Path(id): Path<String>,
    req: Result<Json<EchoRequest>, JsonRejection>,
) -> Result<Json<OperationResponse>, AppError> {
    let conversation_id = parse_id(id)?;
    let Json(req) = req?;
    let operation = Operation::Echo {
        input: EchoInput::from_optional(req.input),
    };
    run(&state, &conversation_id, operation).await
}

async fn history(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<OperationResponse>, AppError> {
    let conversation_id = parse_id(id)?;
    run(&state, &conversation_id, Operation::History).await
}

async fn delete_history(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<OperationResponse>, AppError> {
    let conversation_id = parse_id(id)?;
    run(&state, &conversation_id, Operation::DeleteHistory).await
}

async fn cancel(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<OperationResponse>, AppError> {
    let conversation_id = parse_id(id)?;
    run(&state, &conversation_id, Operation::Cancel).await
}

// ============================================================
// Operator Routes
// ============================================================

async fn list_actors(State(state): State<AppState>) -> Json<ActiveActorsResponse> {
    Json(ActiveActorsResponse {
        actors: state.runtime.active_actors().await,
    })
}

async fn deactivate_actor(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DeactivateResponse>, AppError> {
    let conversation_id = parse_id(id)?;
    let deactivated = state.runtime.deactivate(&conversation_id).await;
    Ok(Json(DeactivateResponse {
        conversation_id,
        deactivated,
    }))
}

async fn stored_state(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<StoredStateResponse>, AppError> {
    let conversation_id = parse_id(id)?;
    let records = state
        .db
        .list_state(conversation_id.as_str())
        .map_err(|e| AppError::Internal(e.to_string()))?;
    Ok(Json(StoredStateResponse {
        conversation_id,
        records,
    }))
}

async fn get_version() -> &'static str {
    concat!("echo-agent ", env!("CARGO_PKG_VERSION"))
}

// ============================================================
// Helpers
// ============================================================

fn parse_id(raw: String) -> Result<ConversationId, AppError> {
    ConversationId::parse(raw).map_err(|e| AppError::BadRequest(e.to_string()))
}

async fn run(
    state: &AppState,
    conversation_id: &ConversationId,
    operation: Operation,
) -> Result<Json<OperationResponse>, AppError> {
    let outcome = state
        .runtime
        .invoke(conversation_id, operation)
        .await
        .map_err(|e| {
            tracing::error!(conv_id = %conversation_id, error = %e, "Actor operation failed");
            AppError::from(e)
        })?;

    if outcome.is_cancelled() {
        tracing::debug!(conv_id = %conversation_id, "Conversation cancelled, operation skipped");
    }

    let response =
        OperationResponse::from_outcome(outcome).map_err(|e| AppError::Internal(e.to_string()))?;
    Ok(Json(response))
}

// ============================================================
// Error Handling
// ============================================================

#[derive(Debug)]
enum AppError {
    BadRequest(String),
    Unavailable(String),
    Internal(String),
}

impl From<RuntimeError> for AppError {
    fn from(e: RuntimeError) -> Self {
        match e {
            RuntimeError::MailboxClosed(_) => AppError::Unavailable(e.to_string()),
            RuntimeError::Store(_) | RuntimeError::Decode { .. } | RuntimeError::Encode(_) => {
                AppError::Internal(e.to_string())
            }
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Unavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg),
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        let body = Json(ErrorResponse::new(message));
        (status, body).into_response()
    }
}
