//! `PostgreSQL` repository.
//!
//! Queries use the runtime-checked sqlx API and explicit row structs; rows
//! are converted to domain types at the edge, with invalid stored data
//! surfaced as `DataCorruption` rather than trusted blindly.
//!
//! # Migrations
//!
//! Migrations live in `crates/catalog/migrations/` and run via:
//! ```bash
//! cargo run -p streetside-cli -- migrate
//! ```

use std::collections::BTreeSet;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

use streetside_core::{Rating, ReviewId, Slug, StoreId, UserId};

use crate::models::{Location, NewReview, Review, Store, User};

use super::{CatalogRepository, RepositoryError, StoreWrite};

/// Embedded migrations for the catalog database.
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!();

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

/// `PostgreSQL`-backed [`CatalogRepository`].
#[derive(Clone)]
pub struct PgCatalogRepository {
    pool: PgPool,
}

impl PgCatalogRepository {
    /// Create a repository over an existing pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Get a reference to the underlying pool.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// Raw store row as stored in `PostgreSQL`.
#[derive(sqlx::FromRow)]
struct StoreRow {
    id: i32,
    name: String,
    slug: String,
    description: Option<String>,
    tags: Vec<String>,
    longitude: f64,
    latitude: f64,
    address: String,
    photo: Option<String>,
    author_id: i32,
    created_at: DateTime<Utc>,
}

impl TryFrom<StoreRow> for Store {
    type Error = RepositoryError;

    fn try_from(row: StoreRow) -> Result<Self, Self::Error> {
        let slug = Slug::parse(&row.slug).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid slug in database: {e}"))
        })?;
        let location =
            Location::new(row.longitude, row.latitude, &row.address).map_err(|e| {
                RepositoryError::DataCorruption(format!("invalid location in database: {e}"))
            })?;

        Ok(Self {
            id: StoreId::new(row.id),
            name: row.name,
            slug,
            description: row.description,
            tags: row.tags.into_iter().collect::<BTreeSet<String>>(),
            location,
            photo: row.photo,
            author: UserId::new(row.author_id),
            created_at: row.created_at,
        })
    }
}

/// Raw review row as stored in `PostgreSQL`.
#[derive(sqlx::FromRow)]
struct ReviewRow {
    id: i32,
    store_id: i32,
    author_id: i32,
    rating: i16,
    body: Option<String>,
    created_at: DateTime<Utc>,
}

impl TryFrom<ReviewRow> for Review {
    type Error = RepositoryError;

    fn try_from(row: ReviewRow) -> Result<Self, Self::Error> {
        let rating = Rating::new(i64::from(row.rating)).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid rating in database: {e}"))
        })?;

        Ok(Self {
            id: ReviewId::new(row.id),
            store: StoreId::new(row.store_id),
            author: UserId::new(row.author_id),
            rating,
            text: row.body,
            created_at: row.created_at,
        })
    }
}

/// Map a unique-constraint violation to `Conflict`, everything else to
/// `Database`.
fn map_insert_error(e: sqlx::Error) -> RepositoryError {
    if let sqlx::Error::Database(ref db_err) = e
        && db_err.is_unique_violation()
    {
        return RepositoryError::Conflict("slug already exists".to_owned());
    }
    RepositoryError::Database(e)
}

#[async_trait]
impl CatalogRepository for PgCatalogRepository {
    async fn create_store(
        &self,
        write: StoreWrite,
        author: UserId,
    ) -> Result<Store, RepositoryError> {
        let tags: Vec<String> = write.tags.into_iter().collect();

        let row = sqlx::query_as::<_, StoreRow>(
            r"
            INSERT INTO store (name, slug, description, tags, longitude, latitude, address, photo, author_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING id, name, slug, description, tags, longitude, latitude, address, photo,
                      author_id, created_at
            ",
        )
        .bind(&write.name)
        .bind(write.slug.as_str())
        .bind(&write.description)
        .bind(&tags)
        .bind(write.location.longitude())
        .bind(write.location.latitude())
        .bind(write.location.address())
        .bind(&write.photo)
        .bind(author.as_i32())
        .fetch_one(&self.pool)
        .await
        .map_err(map_insert_error)?;

        row.try_into()
    }

    async fn update_store(
        &self,
        id: StoreId,
        write: StoreWrite,
    ) -> Result<Store, RepositoryError> {
        let tags: Vec<String> = write.tags.into_iter().collect();

        let row = sqlx::query_as::<_, StoreRow>(
            r"
            UPDATE store
            SET name = $2, slug = $3, description = $4, tags = $5,
                longitude = $6, latitude = $7, address = $8, photo = $9
            WHERE id = $1
            RETURNING id, name, slug, description, tags, longitude, latitude, address, photo,
                      author_id, created_at
            ",
        )
        .bind(id.as_i32())
        .bind(&write.name)
        .bind(write.slug.as_str())
        .bind(&write.description)
        .bind(&tags)
        .bind(write.location.longitude())
        .bind(write.location.latitude())
        .bind(write.location.address())
        .bind(&write.photo)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_insert_error)?;

        row.map_or(Err(RepositoryError::NotFound), TryInto::try_into)
    }

    async fn store_by_id(&self, id: StoreId) -> Result<Option<Store>, RepositoryError> {
        let row = sqlx::query_as::<_, StoreRow>(
            r"
            SELECT id, name, slug, description, tags, longitude, latitude, address, photo,
                   author_id, created_at
            FROM store
            WHERE id = $1
            ",
        )
        .bind(id.as_i32())
        .fetch_optional(&self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    async fn store_by_slug(&self, slug: &str) -> Result<Option<Store>, RepositoryError> {
        let row = sqlx::query_as::<_, StoreRow>(
            r"
            SELECT id, name, slug, description, tags, longitude, latitude, address, photo,
                   author_id, created_at
            FROM store
            WHERE slug = $1
            ",
        )
        .bind(slug)
        .fetch_optional(&self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    async fn stores_page(&self, skip: u64, limit: u32) -> Result<Vec<Store>, RepositoryError> {
        let rows = sqlx::query_as::<_, StoreRow>(
            r"
            SELECT id, name, slug, description, tags, longitude, latitude, address, photo,
                   author_id, created_at
            FROM store
            ORDER BY created_at DESC, id ASC
            LIMIT $1 OFFSET $2
            ",
        )
        .bind(i64::from(limit))
        .bind(i64::try_from(skip).unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn count_stores(&self) -> Result<u64, RepositoryError> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM store")
            .fetch_one(&self.pool)
            .await?;

        Ok(u64::try_from(count).unwrap_or(0))
    }

    async fn all_stores(&self) -> Result<Vec<Store>, RepositoryError> {
        let rows = sqlx::query_as::<_, StoreRow>(
            r"
            SELECT id, name, slug, description, tags, longitude, latitude, address, photo,
                   author_id, created_at
            FROM store
            ORDER BY id ASC
            ",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn slugs_matching(
        &self,
        base: &Slug,
        exclude: Option<StoreId>,
    ) -> Result<Vec<Slug>, RepositoryError> {
        // The base slug only contains [a-z0-9-], so it is safe to splice
        // into the pattern
        let pattern = format!("^{}(-[0-9]+)?$", base.as_str());

        let slugs = sqlx::query_scalar::<_, String>(
            r"
            SELECT slug FROM store
            WHERE slug ~* $1 AND ($2::int IS NULL OR id <> $2)
            ",
        )
        .bind(&pattern)
        .bind(exclude.map(|id| id.as_i32()))
        .fetch_all(&self.pool)
        .await?;

        slugs
            .into_iter()
            .map(|s| {
                Slug::parse(&s).map_err(|e| {
                    RepositoryError::DataCorruption(format!("invalid slug in database: {e}"))
                })
            })
            .collect()
    }

    async fn create_review(&self, review: NewReview) -> Result<Review, RepositoryError> {
        let row = sqlx::query_as::<_, ReviewRow>(
            r"
            INSERT INTO review (store_id, author_id, rating, body)
            VALUES ($1, $2, $3, $4)
            RETURNING id, store_id, author_id, rating, body, created_at
            ",
        )
        .bind(review.store.as_i32())
        .bind(review.author.as_i32())
        .bind(i16::from(review.rating.value()))
        .bind(&review.text)
        .fetch_one(&self.pool)
        .await?;

        row.try_into()
    }

    async fn reviews_for_store(&self, store: StoreId) -> Result<Vec<Review>, RepositoryError> {
        let rows = sqlx::query_as::<_, ReviewRow>(
            r"
            SELECT id, store_id, author_id, rating, body, created_at
            FROM review
            WHERE store_id = $1
            ORDER BY created_at ASC, id ASC
            ",
        )
        .bind(store.as_i32())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn all_reviews(&self) -> Result<Vec<Review>, RepositoryError> {
        let rows = sqlx::query_as::<_, ReviewRow>(
            r"
            SELECT id, store_id, author_id, rating, body, created_at
            FROM review
            ORDER BY id ASC
            ",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn toggle_favorite(
        &self,
        user: UserId,
        store: StoreId,
    ) -> Result<User, RepositoryError> {
        // One atomic statement: remove the row if present, insert it
        // otherwise. Concurrent toggles by the same user on other stores
        // touch different rows and cannot lose each other's updates.
        sqlx::query(
            r"
            WITH removed AS (
                DELETE FROM user_favorite
                WHERE user_id = $1 AND store_id = $2
                RETURNING store_id
            )
            INSERT INTO user_favorite (user_id, store_id)
            SELECT $1, $2
            WHERE NOT EXISTS (SELECT 1 FROM removed)
            ON CONFLICT (user_id, store_id) DO NOTHING
            ",
        )
        .bind(user.as_i32())
        .bind(store.as_i32())
        .execute(&self.pool)
        .await?;

        self.favorites(user).await
    }

    async fn favorites(&self, user: UserId) -> Result<User, RepositoryError> {
        let ids = sqlx::query_scalar::<_, i32>(
            r"
            SELECT store_id FROM user_favorite
            WHERE user_id = $1
            ORDER BY store_id ASC
            ",
        )
        .bind(user.as_i32())
        .fetch_all(&self.pool)
        .await?;

        Ok(User {
            id: user,
            favorites: ids.into_iter().map(StoreId::new).collect(),
        })
    }

    async fn stores_by_ids(&self, ids: &[StoreId]) -> Result<Vec<Store>, RepositoryError> {
        let raw_ids: Vec<i32> = ids.iter().map(StoreId::as_i32).collect();

        let rows = sqlx::query_as::<_, StoreRow>(
            r"
            SELECT id, name, slug, description, tags, longitude, latitude, address, photo,
                   author_id, created_at
            FROM store
            WHERE id = ANY($1)
            ORDER BY id ASC
            ",
        )
        .bind(&raw_ids)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }
}
