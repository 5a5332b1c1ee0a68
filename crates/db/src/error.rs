use pumpwatch_core::alert::UnknownVariant;

/// A persistence gateway call failed.
#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error("Stored row could not be decoded: {0}")]
    Decode(String),

    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

impl From<UnknownVariant> for PersistenceError {
    fn from(err: UnknownVariant) -> Self {
        PersistenceError::Decode(err.to_string())
    }
}
