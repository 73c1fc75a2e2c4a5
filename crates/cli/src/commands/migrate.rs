//! Database migration command.
//!
//! # Usage
//!
//! ```bash
//! ss-cli migrate
//! ```
//!
//! # Environment Variables
//!
//! - `STREETSIDE_DATABASE_URL` - `PostgreSQL` connection string
//!   (falls back to `DATABASE_URL`)
//!
//! Migration files live in `crates/catalog/migrations/` and are embedded
//! into the binary at compile time.

use thiserror::Error;
use tracing::info;

use streetside_catalog::config::{CatalogConfig, ConfigError};
use streetside_catalog::repo::postgres::{self, MIGRATOR};

/// Errors that can occur while migrating.
#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Run the catalog database migrations.
///
/// # Errors
///
/// Returns `MigrationError` if the database URL is missing, the connection
/// fails, or a migration fails to apply.
pub async fn catalog() -> Result<(), MigrationError> {
    let config = CatalogConfig::from_env()?;

    info!("Connecting to catalog database...");
    let pool = postgres::create_pool(&config.database_url).await?;

    info!("Running catalog migrations...");
    MIGRATOR.run(&pool).await?;

    info!("Catalog migrations complete!");
    Ok(())
}
