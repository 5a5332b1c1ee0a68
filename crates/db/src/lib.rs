//! Storage for devices, readings, alerts and users.
//!
//! The pipeline talks to storage only through [`PersistenceGateway`];
//! [`PgGateway`] is the production implementation and
//! [`InMemoryGateway`] backs tests and database-less runs.

use sqlx::postgres::PgPoolOptions;

pub mod error;
pub mod gateway;
pub mod memory;
pub mod models;
pub mod repositories;

pub use error::PersistenceError;
pub use gateway::{PersistenceGateway, PgGateway};
pub use memory::InMemoryGateway;

pub type DbPool = sqlx::PgPool;

/// Create a connection pool from a database URL.
pub async fn create_pool(database_url: &str) -> Result<DbPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(20)
        .connect(database_url)
        .await
}

/// Round-trip a trivial query to confirm the pool is usable.
pub async fn health_check(pool: &DbPool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}

/// Apply pending schema migrations from `db/migrations`.
pub async fn run_migrations(pool: &DbPool) -> Result<(), PersistenceError> {
    sqlx::migrate!("../../db/migrations").run(pool).await?;
    Ok(())
}
