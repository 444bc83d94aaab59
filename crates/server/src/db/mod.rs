//! Database operations for the referral rewards `PostgreSQL` database.
//!
//! # Tables
//!
//! - `rewards.user` - Registrants, their share tokens, and referral credit
//!
//! The original in-memory token/IP caches are gone on purpose: uniqueness of
//! email and share token is a database constraint, and the per-address signup
//! cap is a count query enforced inside the insert transaction.
//!
//! # Migrations
//!
//! Migrations are stored in `crates/server/migrations/` and run via:
//! ```bash
//! cargo run -p referral-rewards-cli -- migrate
//! ```

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

pub mod users;

pub use users::{CreatedUser, NewUser, UserRepository};

/// Errors from repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., unique email or share token).
    #[error("constraint violation: {0}")]
    Conflict(String),

    /// The per-address signup cap was reached inside the insert transaction.
    #[error("signup quota exceeded for source address")]
    QuotaExceeded,
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}
