//! Database migration command.
//!
//! # Usage
//!
//! ```bash
//! rewards-cli migrate
//! ```
//!
//! # Environment Variables
//!
//! - `REWARDS_DATABASE_URL` - `PostgreSQL` connection string (falls back to
//!   `DATABASE_URL`)
//!
//! Migration files live in `crates/server/migrations/` and are embedded into
//! this binary at compile time.

use sqlx::PgPool;

/// Errors from the migration command.
#[derive(Debug, thiserror::Error)]
pub enum MigrationError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Run the rewards database migrations.
///
/// # Errors
///
/// Returns `MigrationError` if the database URL is missing, the connection
/// fails, or a migration fails to apply.
pub async fn run() -> Result<(), MigrationError> {
    dotenvy::dotenv().ok();

    let database_url = std::env::var("REWARDS_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .map_err(|_| MigrationError::MissingEnvVar("REWARDS_DATABASE_URL"))?;

    tracing::info!("Connecting to rewards database...");
    let pool = PgPool::connect(&database_url).await?;

    tracing::info!("Running rewards migrations...");
    sqlx::migrate!("../server/migrations").run(&pool).await?;

    tracing::info!("Rewards migrations complete!");
    Ok(())
}
