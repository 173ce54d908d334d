//! Identity resolution: a user-supplied email plus display name maps to a
//! stable internal user identity, created on first contact.

use tracing::instrument;

use couch_store::users::{UserRepo, UserRow};
use couch_store::Database;

use crate::error::ChatError;

/// Trim whitespace and lower-case; lookups and creations are case- and
/// whitespace-insensitive on email.
pub fn normalize_email(raw: &str) -> String {
    raw.trim().to_lowercase()
}

pub struct IdentityResolver {
    users: UserRepo,
}

impl IdentityResolver {
    pub fn new(db: Database) -> Self {
        Self {
            users: UserRepo::new(db),
        }
    }

    /// Resolve an email to a user, creating one if absent.
    /// Name policy is last write wins (see UserRepo::get_or_create).
    #[instrument(skip(self), fields(email, name))]
    pub fn resolve(&self, email: &str, name: &str) -> Result<UserRow, ChatError> {
        let email = normalize_email(email);
        if email.is_empty() {
            return Err(ChatError::EmptyEmail);
        }
        Ok(self.users.get_or_create(&email, name.trim())?)
    }

    /// Look up an existing user without creating one.
    #[instrument(skip(self), fields(email))]
    pub fn lookup(&self, email: &str) -> Result<Option<UserRow>, ChatError> {
        let email = normalize_email(email);
        if email.is_empty() {
            return Err(ChatError::EmptyEmail);
        }
        Ok(self.users.find_by_email(&email)?)
    }
}
