//! HTTP handlers: thin adapters between the wire DTOs and the engine.
//!
//! Identity resolution happens here (the orchestrator itself is email-free),
//! and engine errors are mapped to status codes without leaking storage
//! detail verbatim.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use tracing::error;

use couch_core::ids::{SessionId, UserId};
use couch_engine::{ChatError, ResumeController, ResumeDecision};

use crate::dto::{
    ChatRequest, ChatResponse, ConversationResponse, LoginRequest, LoginResponse,
    NewSessionRequest, NewSessionResponse, SessionInfo,
};
use crate::server::AppState;

/// Engine error wrapped for the wire.
pub struct ApiError(ChatError);

impl From<ChatError> for ApiError {
    fn from(e: ChatError) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, detail) = match &self.0 {
            ChatError::EmptyEmail => (StatusCode::BAD_REQUEST, self.0.to_string()),
            ChatError::SessionNotFound(_) => (StatusCode::NOT_FOUND, "Session not found".into()),
            ChatError::SessionNotOwned(_) => {
                (StatusCode::FORBIDDEN, "Session not found for this user".into())
            }
            ChatError::GenerationFailed(cause) => (
                StatusCode::BAD_GATEWAY,
                format!("Generation failed: {cause}"),
            ),
            // Storage detail stays in the logs, not on the wire.
            ChatError::Store(cause) => {
                error!(error = %cause, "storage failure");
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal storage error".into())
            }
        };
        (status, Json(serde_json::json!({ "detail": detail }))).into_response()
    }
}

pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
        "persona": state.orchestrator.persona().label,
        "model": state.model_name,
    }))
}

/// Login: resolve identity, then run the resume controller. Never creates
/// a session; at most it re-opens the newest non-empty one.
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let user = state.identity.resolve(&request.email, &request.name)?;

    let controller = ResumeController::new(&state.orchestrator);
    let response = match controller.on_login(&user.id)? {
        ResumeDecision::Resume { session_id, conversation } => LoginResponse {
            user_id: user.id,
            resumed: true,
            session: Some(ConversationResponse::from_conversation(
                session_id,
                conversation,
            )),
        },
        ResumeDecision::StartFresh => LoginResponse {
            user_id: user.id,
            resumed: false,
            session: None,
        },
    };
    Ok(Json(response))
}

pub async fn new_session(
    State(state): State<AppState>,
    Json(request): Json<NewSessionRequest>,
) -> Result<Json<NewSessionResponse>, ApiError> {
    let user = state.identity.resolve(&request.email, &request.name)?;
    let session = state.orchestrator.start_session(&user.id)?;
    Ok(Json(NewSessionResponse {
        session_id: session.id,
        session_name: session.name,
    }))
}

pub async fn chat(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    let user_id = caller_id(&state, &request.email)?;
    let outcome = state
        .orchestrator
        .send_message(&request.session_id, &user_id, &request.message)
        .await?;
    Ok(Json(ChatResponse {
        session_id: request.session_id,
        response_text: outcome.response_text,
        timestamp: outcome.timestamp,
    }))
}

pub async fn list_sessions(
    State(state): State<AppState>,
    Path(email): Path<String>,
) -> Result<Json<Vec<SessionInfo>>, ApiError> {
    let summaries = match state.identity.lookup(&email)? {
        Some(user) => state.orchestrator.list_sessions(&user.id)?,
        // Unknown caller simply has no sessions yet.
        None => Vec::new(),
    };
    Ok(Json(summaries.into_iter().map(SessionInfo::from).collect()))
}

#[derive(Debug, Deserialize)]
pub struct ConversationQuery {
    pub email: String,
}

pub async fn get_conversation(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Query(query): Query<ConversationQuery>,
) -> Result<Json<ConversationResponse>, ApiError> {
    let session_id = SessionId::from_raw(session_id);
    let user_id = caller_id(&state, &query.email)?;
    let conversation = state.orchestrator.get_conversation(&session_id, &user_id)?;
    Ok(Json(ConversationResponse::from_conversation(
        session_id,
        conversation,
    )))
}

/// Resolve the caller without creating an account. An unknown email gets a
/// sentinel identity that owns nothing, so a real session still answers
/// "not owned" rather than "not found".
fn caller_id(state: &AppState, email: &str) -> Result<UserId, ApiError> {
    Ok(match state.identity.lookup(email)? {
        Some(user) => user.id,
        None => UserId::from_raw("user_unregistered"),
    })
}
