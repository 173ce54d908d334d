//! The session orchestrator: owns the request lifecycle for starting
//! sessions, sending messages, listing sessions and fetching transcripts.
//!
//! The orchestrator is stateless across calls; all state lives in the store.
//! Each call constructs its repos from the shared database handle, the way a
//! request-scoped unit of work would.

use std::sync::Arc;

use tracing::{info, instrument, warn};

use couch_core::ids::{SessionId, UserId};
use couch_core::persona::Persona;
use couch_core::phase::Phase;
use couch_llm::ModelGateway;
use couch_store::messages::{MessageRepo, MessageRow};
use couch_store::sessions::{SessionRepo, SessionRow, SessionSummary};
use couch_store::{Database, StoreError};

use crate::context;
use crate::error::ChatError;

/// Result of a successful send: the persona's reply, the commit timestamp
/// shared by both persisted rows, and the phase the reply was generated in.
#[derive(Clone, Debug)]
pub struct SendOutcome {
    pub response_text: String,
    pub timestamp: String,
    pub phase: Phase,
}

/// A full transcript, still in the storage vocabulary; callers relabel
/// roles for display via `StoredRole::display_role`.
#[derive(Clone, Debug)]
pub struct Conversation {
    pub session_name: String,
    pub messages: Vec<MessageRow>,
}

pub struct SessionOrchestrator {
    db: Database,
    gateway: Arc<dyn ModelGateway>,
    persona: Persona,
}

impl SessionOrchestrator {
    pub fn new(db: Database, gateway: Arc<dyn ModelGateway>, persona: Persona) -> Self {
        Self { db, gateway, persona }
    }

    pub fn persona(&self) -> &Persona {
        &self.persona
    }

    /// Create a brand-new session for the user. Never reuses an existing
    /// one; callers invoke this only when the user is about to send the
    /// first message of a fresh conversation, never speculatively at login.
    #[instrument(skip(self), fields(user_id = %user_id))]
    pub fn start_session(&self, user_id: &UserId) -> Result<SessionRow, ChatError> {
        let session = SessionRepo::new(self.db.clone()).create(user_id, &self.persona.label)?;
        info!(session_id = %session.id, name = %session.name, "session started");
        Ok(session)
    }

    /// One chat turn. Either exactly two messages are committed (the
    /// therapist's and the persona's, in that order) or none are.
    #[instrument(skip(self, text), fields(session_id = %session_id, user_id = %user_id))]
    pub async fn send_message(
        &self,
        session_id: &SessionId,
        user_id: &UserId,
        text: &str,
    ) -> Result<SendOutcome, ChatError> {
        let session = self.owned_session(session_id, user_id)?;

        let messages = MessageRepo::new(self.db.clone());
        let history = messages.list(&session.id)?;

        // The message about to be sent counts immediately, so the phase
        // boundary applies to the turn that crosses it.
        let turn_count = context::user_turn_count(&history) + 1;
        let phase = Phase::for_turn(turn_count);
        let instruction = self.persona.system_instruction(phase, turn_count);
        let prior_turns = context::assemble(&history);

        let response = self
            .gateway
            .generate(&instruction, &prior_turns, text)
            .await
            .map_err(|e| {
                warn!(kind = e.error_kind(), error = %e, "generation failed");
                ChatError::GenerationFailed(e)
            })?;

        // Persist only after generation succeeded; a gateway failure leaves
        // the transcript untouched.
        let (_, persona_row) = messages.append_exchange(&session.id, text, &response)?;

        info!(turn = turn_count, phase = %phase, "exchange committed");

        Ok(SendOutcome {
            response_text: response,
            timestamp: persona_row.created_at,
            phase,
        })
    }

    /// The user's sessions, newest first, with live message counts.
    /// No sessions is an empty list, not an error.
    #[instrument(skip(self), fields(user_id = %user_id))]
    pub fn list_sessions(&self, user_id: &UserId) -> Result<Vec<SessionSummary>, ChatError> {
        Ok(SessionRepo::new(self.db.clone()).list_for_user(user_id)?)
    }

    /// Full ordered transcript of a session the caller owns.
    #[instrument(skip(self), fields(session_id = %session_id, user_id = %user_id))]
    pub fn get_conversation(
        &self,
        session_id: &SessionId,
        user_id: &UserId,
    ) -> Result<Conversation, ChatError> {
        let session = self.owned_session(session_id, user_id)?;
        let messages = MessageRepo::new(self.db.clone()).list(&session.id)?;
        Ok(Conversation {
            session_name: session.name,
            messages,
        })
    }

    /// Fetch a session and verify ownership. A session id must never leak
    /// another user's transcript.
    fn owned_session(
        &self,
        session_id: &SessionId,
        user_id: &UserId,
    ) -> Result<SessionRow, ChatError> {
        let session = SessionRepo::new(self.db.clone())
            .get(session_id)
            .map_err(|e| match e {
                StoreError::NotFound(_) => ChatError::SessionNotFound(session_id.clone()),
                other => ChatError::Store(other),
            })?;
        if &session.user_id != user_id {
            return Err(ChatError::SessionNotOwned(session_id.clone()));
        }
        Ok(session)
    }
}
