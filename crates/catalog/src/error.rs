//! Unified error handling for the catalog core.
//!
//! Two layers: [`crate::repo::RepositoryError`] at the persistence seam, and
//! [`CatalogError`] at the service surface. Validation and ownership errors
//! carry enough detail for the caller to render a user-facing message;
//! infrastructure failures collapse into [`CatalogError::Dependency`].

use thiserror::Error;

use crate::repo::RepositoryError;
use crate::search::SearchError;

/// Service-level error type for the catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// A required field is missing or invalid.
    #[error("validation failed: {0}")]
    Validation(String),

    /// No entity matched the given slug or id.
    #[error("not found: {0}")]
    NotFound(String),

    /// The actor is not allowed to perform this mutation.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// A uniqueness constraint was violated and could not be recovered.
    #[error("conflict: {0}")]
    Conflict(String),

    /// The underlying repository or search index is unavailable.
    #[error("dependency unavailable: {0}")]
    Dependency(String),
}

impl From<RepositoryError> for CatalogError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound => Self::NotFound("entity not found".to_owned()),
            RepositoryError::Conflict(msg) => Self::Conflict(msg),
            RepositoryError::Database(_) | RepositoryError::DataCorruption(_) => {
                Self::Dependency(err.to_string())
            }
        }
    }
}

impl From<SearchError> for CatalogError {
    fn from(err: SearchError) -> Self {
        Self::Dependency(err.to_string())
    }
}

/// Result type alias for `CatalogError`.
pub type Result<T> = std::result::Result<T, CatalogError>;
