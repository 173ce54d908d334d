pub mod context;
pub mod error;
pub mod identity;
pub mod orchestrator;
pub mod resume;

pub use error::ChatError;
pub use identity::IdentityResolver;
pub use orchestrator::{Conversation, SendOutcome, SessionOrchestrator};
pub use resume::{ResumeController, ResumeDecision};
