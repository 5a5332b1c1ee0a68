//! User entity model. Only the fields live sessions need are loaded.

use serde::Serialize;
use sqlx::FromRow;
use pumpwatch_core::types::{DbId, Timestamp};

/// A row from the `users` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct User {
    pub id: DbId,
    pub username: String,
    pub email: Option<String>,
    pub role: String,
    pub is_active: bool,
    pub created_at: Timestamp,
}

/// Insert DTO for a user.
#[derive(Debug, Clone)]
pub struct CreateUser {
    pub username: String,
    pub email: Option<String>,
    pub role: String,
}
