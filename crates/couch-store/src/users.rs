use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use couch_core::ids::UserId;

use crate::database::Database;
use crate::error::StoreError;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct UserRow {
    pub id: UserId,
    pub email: String,
    pub name: String,
    pub created_at: String,
}

pub struct UserRepo {
    db: Database,
}

impl UserRepo {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Get or create a user for the given email.
    ///
    /// The caller passes an already-normalized email (trimmed, lower-cased);
    /// the identity resolver owns normalization. Name policy is last write
    /// wins: a repeat contact with a different display name overwrites the
    /// stored one.
    #[instrument(skip(self), fields(email, name))]
    pub fn get_or_create(&self, email: &str, name: &str) -> Result<UserRow, StoreError> {
        self.db.with_conn(|conn| {
            let existing = find_in_conn(conn, email)?;

            if let Some(mut user) = existing {
                if user.name != name {
                    conn.execute(
                        "UPDATE users SET name = ?1 WHERE id = ?2",
                        rusqlite::params![name, user.id.as_str()],
                    )?;
                    user.name = name.to_string();
                }
                return Ok(user);
            }

            let id = UserId::new();
            let now = Utc::now().to_rfc3339();
            conn.execute(
                "INSERT INTO users (id, email, name, created_at) VALUES (?1, ?2, ?3, ?4)",
                rusqlite::params![id.as_str(), email, name, now],
            )?;

            Ok(UserRow {
                id,
                email: email.to_string(),
                name: name.to_string(),
                created_at: now,
            })
        })
    }

    /// Get a user by ID. Only a missing row is `NotFound`; real database
    /// errors propagate as such.
    #[instrument(skip(self), fields(user_id = %id))]
    pub fn get(&self, id: &UserId) -> Result<UserRow, StoreError> {
        self.db.with_conn(|conn| {
            let mut stmt =
                conn.prepare("SELECT id, email, name, created_at FROM users WHERE id = ?1")?;
            let mut rows = stmt.query([id.as_str()])?;
            match rows.next()? {
                Some(row) => row_to_user(row),
                None => Err(StoreError::NotFound(format!("user {id}"))),
            }
        })
    }

    /// Look up a user by normalized email without creating one.
    #[instrument(skip(self), fields(email))]
    pub fn find_by_email(&self, email: &str) -> Result<Option<UserRow>, StoreError> {
        self.db.with_conn(|conn| find_in_conn(conn, email))
    }
}

fn find_in_conn(
    conn: &rusqlite::Connection,
    email: &str,
) -> Result<Option<UserRow>, StoreError> {
    let mut stmt =
        conn.prepare("SELECT id, email, name, created_at FROM users WHERE email = ?1")?;
    let mut rows = stmt.query([email])?;
    match rows.next()? {
        Some(row) => Ok(Some(row_to_user(row)?)),
        None => Ok(None),
    }
}

fn row_to_user(row: &rusqlite::Row<'_>) -> Result<UserRow, StoreError> {
    Ok(UserRow {
        id: UserId::from_raw(row.get::<_, String>(0)?),
        email: row.get(1)?,
        name: row.get(2)?,
        created_at: row.get(3)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_db() -> Database {
        Database::in_memory().unwrap()
    }

    #[test]
    fn create_user() {
        let repo = UserRepo::new(test_db());
        let user = repo.get_or_create("ann@example.com", "Ann").unwrap();
        assert!(user.id.as_str().starts_with("user_"));
        assert_eq!(user.email, "ann@example.com");
        assert_eq!(user.name, "Ann");
    }

    #[test]
    fn get_or_create_returns_existing() {
        let repo = UserRepo::new(test_db());
        let u1 = repo.get_or_create("ann@example.com", "Ann").unwrap();
        let u2 = repo.get_or_create("ann@example.com", "Ann").unwrap();
        assert_eq!(u1.id, u2.id);
    }

    #[test]
    fn name_is_last_write_wins() {
        let repo = UserRepo::new(test_db());
        let u1 = repo.get_or_create("ann@example.com", "Ann").unwrap();
        let u2 = repo.get_or_create("ann@example.com", "Annabel").unwrap();
        assert_eq!(u1.id, u2.id);
        assert_eq!(u2.name, "Annabel");
        assert_eq!(repo.get(&u1.id).unwrap().name, "Annabel");
    }

    #[test]
    fn get_by_id() {
        let repo = UserRepo::new(test_db());
        let user = repo.get_or_create("bo@example.com", "Bo").unwrap();
        let fetched = repo.get(&user.id).unwrap();
        assert_eq!(fetched.email, "bo@example.com");
    }

    #[test]
    fn get_nonexistent_fails() {
        let repo = UserRepo::new(test_db());
        let result = repo.get(&UserId::from_raw("user_nonexistent"));
        assert!(matches!(result, Err(StoreError::NotFound(_))));
    }

    #[test]
    fn get_propagates_database_errors() {
        let db = test_db();
        let repo = UserRepo::new(db.clone());
        let user = repo.get_or_create("ann@example.com", "Ann").unwrap();
        db.with_conn(|conn| {
            conn.execute_batch("DROP TABLE users")?;
            Ok(())
        })
        .unwrap();
        assert!(matches!(repo.get(&user.id), Err(StoreError::Database(_))));
        assert!(matches!(
            repo.find_by_email("ann@example.com"),
            Err(StoreError::Database(_))
        ));
    }

    #[test]
    fn find_by_email_without_creating() {
        let repo = UserRepo::new(test_db());
        assert!(repo.find_by_email("ghost@example.com").unwrap().is_none());
        repo.get_or_create("real@example.com", "Real").unwrap();
        assert!(repo.find_by_email("real@example.com").unwrap().is_some());
    }

    #[test]
    fn different_emails_create_different_users() {
        let repo = UserRepo::new(test_db());
        let u1 = repo.get_or_create("a@x.com", "A").unwrap();
        let u2 = repo.get_or_create("b@x.com", "B").unwrap();
        assert_ne!(u1.id, u2.id);
    }
}
