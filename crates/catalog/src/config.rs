//! Catalog configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `STREETSIDE_DATABASE_URL` - `PostgreSQL` connection string
//!   (falls back to the generic `DATABASE_URL`)
//!
//! ## Optional
//! - `STREETSIDE_PAGE_SIZE` - Store listing page size (default: 10)
//! - `STREETSIDE_SEARCH_LIMIT` - Text search result cap (default: 5)
//! - `STREETSIDE_NEARBY_LIMIT` - Nearby search result cap (default: 10)
//! - `STREETSIDE_NEARBY_RADIUS_METERS` - Nearby search radius (default: 10000)

use secrecy::SecretString;
use thiserror::Error;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Query limits and thresholds for catalog operations.
///
/// Kept separate from [`CatalogConfig`] so in-memory deployments and tests
/// can construct limits without a database URL.
#[derive(Debug, Clone, Copy)]
pub struct CatalogLimits {
    /// Number of stores per listing page.
    pub page_size: u32,
    /// Maximum number of text search hits returned.
    pub search_limit: usize,
    /// Maximum number of nearby stores returned.
    pub nearby_limit: usize,
    /// Radius for nearby search, in meters.
    pub nearby_radius_meters: f64,
}

impl Default for CatalogLimits {
    fn default() -> Self {
        Self {
            page_size: 10,
            search_limit: 5,
            nearby_limit: 10,
            nearby_radius_meters: 10_000.0,
        }
    }
}

/// Catalog application configuration.
#[derive(Debug, Clone)]
pub struct CatalogConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// Query limits and thresholds
    pub limits: CatalogLimits,
}

impl CatalogConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the database URL is missing or a limit
    /// variable fails to parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let database_url = get_database_url("STREETSIDE_DATABASE_URL")?;
        let limits = CatalogLimits {
            page_size: get_parsed_or_default("STREETSIDE_PAGE_SIZE", 10)?,
            search_limit: get_parsed_or_default("STREETSIDE_SEARCH_LIMIT", 5)?,
            nearby_limit: get_parsed_or_default("STREETSIDE_NEARBY_LIMIT", 10)?,
            nearby_radius_meters: get_parsed_or_default(
                "STREETSIDE_NEARBY_RADIUS_METERS",
                10_000.0,
            )?,
        };

        Ok(Self {
            database_url,
            limits,
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get database URL with fallback to generic `DATABASE_URL` (used by platform postgres attach).
fn get_database_url(primary_key: &str) -> Result<SecretString, ConfigError> {
    // Try primary key first (e.g., STREETSIDE_DATABASE_URL)
    if let Ok(value) = std::env::var(primary_key) {
        return Ok(SecretString::from(value));
    }
    // Fallback to generic DATABASE_URL
    if let Ok(value) = std::env::var("DATABASE_URL") {
        return Ok(SecretString::from(value));
    }
    Err(ConfigError::MissingEnvVar(primary_key.to_string()))
}

/// Get an environment variable parsed into `T`, or the default when unset.
fn get_parsed_or_default<T: std::str::FromStr>(key: &str, default: T) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string())),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_default_limits() {
        let limits = CatalogLimits::default();
        assert_eq!(limits.page_size, 10);
        assert_eq!(limits.search_limit, 5);
        assert_eq!(limits.nearby_limit, 10);
        assert!((limits.nearby_radius_meters - 10_000.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_get_parsed_or_default_uses_default_when_unset() {
        let value: u32 =
            get_parsed_or_default("STREETSIDE_TEST_UNSET_VARIABLE", 42).unwrap();
        assert_eq!(value, 42);
    }
}
