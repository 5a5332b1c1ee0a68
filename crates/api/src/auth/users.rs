//! The user store behind live-session authentication.

use async_trait::async_trait;
use pumpwatch_core::types::DbId;
use pumpwatch_db::repositories::UserRepo;
use pumpwatch_db::{DbPool, PersistenceError};
use serde::Serialize;

/// The identity attached to a live session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LiveUser {
    pub id: DbId,
    pub username: String,
    pub role: String,
}

/// Looks up users by id. Inactive users must be reported as absent.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn find_active(&self, id: DbId) -> Result<Option<LiveUser>, PersistenceError>;
}

/// [`UserDirectory`] over the `users` table.
#[derive(Clone)]
pub struct PgUserDirectory {
    pool: DbPool,
}

impl PgUserDirectory {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserDirectory for PgUserDirectory {
    async fn find_active(&self, id: DbId) -> Result<Option<LiveUser>, PersistenceError> {
        let user = UserRepo::find_active(&self.pool, id).await?;
        Ok(user.map(|u| LiveUser {
            id: u.id,
            username: u.username,
            role: u.role,
        }))
    }
}
