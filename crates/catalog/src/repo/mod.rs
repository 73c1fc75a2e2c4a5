//! Persistence seam for the catalog.
//!
//! [`CatalogRepository`] is the contract the service is written against; it
//! is injected rather than reached through a global, so tests substitute the
//! in-memory implementation. The repository owns the slug uniqueness
//! constraint - [`RepositoryError::Conflict`] at commit time is the signal
//! the service retries on.
//!
//! # Implementations
//!
//! - [`postgres::PgCatalogRepository`] - production, backed by `PostgreSQL`
//! - [`memory::MemoryRepository`] - in-memory fake for tests and tooling

pub mod memory;
pub mod postgres;

use std::collections::BTreeSet;

use async_trait::async_trait;
use thiserror::Error;

use streetside_core::{Slug, StoreId, UserId};

use crate::models::{Location, NewReview, Review, Store, User};

pub use memory::MemoryRepository;
pub use postgres::PgCatalogRepository;

/// Errors that can occur during repository operations.
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

    /// Constraint violation (e.g., unique slug).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

/// The mutable fields of a store, fully resolved by the service.
///
/// The slug is already derived here; the repository only persists it and
/// enforces uniqueness.
#[derive(Debug, Clone)]
pub struct StoreWrite {
    pub name: String,
    pub slug: Slug,
    pub description: Option<String>,
    pub tags: BTreeSet<String>,
    pub location: Location,
    pub photo: Option<String>,
}

/// Persistence contract for stores, reviews, and favorites.
///
/// Write operations are each a single logical unit of work; read operations
/// may serve slightly stale data relative to in-flight writes.
#[async_trait]
pub trait CatalogRepository: Send + Sync {
    /// Persist a new store. The author is fixed here forever.
    ///
    /// # Errors
    ///
    /// Returns `Conflict` if the slug is already taken.
    async fn create_store(
        &self,
        write: StoreWrite,
        author: UserId,
    ) -> Result<Store, RepositoryError>;

    /// Replace a store's mutable fields.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the store does not exist and `Conflict` if the
    /// new slug is already taken.
    async fn update_store(&self, id: StoreId, write: StoreWrite)
    -> Result<Store, RepositoryError>;

    /// Fetch a store by id.
    async fn store_by_id(&self, id: StoreId) -> Result<Option<Store>, RepositoryError>;

    /// Fetch a store by slug.
    async fn store_by_slug(&self, slug: &str) -> Result<Option<Store>, RepositoryError>;

    /// One listing page: newest first, id-ascending tiebreak.
    async fn stores_page(&self, skip: u64, limit: u32) -> Result<Vec<Store>, RepositoryError>;

    /// Total number of stores.
    async fn count_stores(&self) -> Result<u64, RepositoryError>;

    /// Every store in the catalog.
    async fn all_stores(&self) -> Result<Vec<Store>, RepositoryError>;

    /// Slugs colliding with `base`: equal to it or `base-{digits}`,
    /// case-insensitively. `exclude` drops the store being renamed from the
    /// collision set.
    async fn slugs_matching(
        &self,
        base: &Slug,
        exclude: Option<StoreId>,
    ) -> Result<Vec<Slug>, RepositoryError>;

    /// Persist a new review.
    async fn create_review(&self, review: NewReview) -> Result<Review, RepositoryError>;

    /// Reviews for one store, oldest first.
    async fn reviews_for_store(&self, store: StoreId) -> Result<Vec<Review>, RepositoryError>;

    /// Every review in the catalog.
    async fn all_reviews(&self) -> Result<Vec<Review>, RepositoryError>;

    /// Atomically flip a store's membership in the user's favorites set and
    /// return the updated view. The flip must run against current
    /// server-side state, never a read-then-write of a cached copy.
    async fn toggle_favorite(&self, user: UserId, store: StoreId)
    -> Result<User, RepositoryError>;

    /// The user's current favorites view.
    async fn favorites(&self, user: UserId) -> Result<User, RepositoryError>;

    /// Fetch stores by id, ordered by id ascending. Unknown ids are skipped.
    async fn stores_by_ids(&self, ids: &[StoreId]) -> Result<Vec<Store>, RepositoryError>;
}
