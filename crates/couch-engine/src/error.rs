use couch_core::errors::GatewayError;
use couch_core::ids::SessionId;
use couch_store::StoreError;

/// Errors surfaced by the session orchestrator. Nothing is swallowed: every
/// failed write is reported, and generation failures keep their cause.
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("session not found: {0}")]
    SessionNotFound(SessionId),

    #[error("session {0} does not belong to the caller")]
    SessionNotOwned(SessionId),

    #[error("generation failed: {0}")]
    GenerationFailed(#[source] GatewayError),

    #[error("email must not be empty")]
    EmptyEmail,

    #[error(transparent)]
    Store(#[from] StoreError),
}
