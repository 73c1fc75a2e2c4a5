//! The catalog service facade.
//!
//! `CatalogService` wires the repository, the search index, and the pure
//! derivation stages into the operations the routing layer calls. It is the
//! validation boundary: names, coordinates, and ratings are checked here,
//! ownership is enforced here, and the slug-conflict retry lives here.

use streetside_core::{Rating, Slug, StoreId, UserId};
use tracing::{instrument, warn};

use crate::config::CatalogLimits;
use crate::error::{CatalogError, Result};
use crate::geo::{self, NearbyStore};
use crate::models::{
    NewReview, NewStore, Review, Store, StorePage, StoreUpdate, StoreWithReviews, User,
};
use crate::ratings::{self, RatedStore, TOP_STORES_LIMIT};
use crate::repo::{CatalogRepository, RepositoryError, StoreWrite};
use crate::search::{SearchHit, SearchIndex};
use crate::slug;
use crate::tags::{self, TagCount};

/// The store catalog service.
///
/// Cheap to share behind an `Arc`; every operation is a single logical unit
/// of work and may be invoked concurrently by independent callers.
pub struct CatalogService<R> {
    repo: R,
    search: SearchIndex,
    limits: CatalogLimits,
}

impl<R: CatalogRepository> CatalogService<R> {
    /// Create a service over a repository.
    ///
    /// The search index starts empty; call
    /// [`rebuild_search_index`](Self::rebuild_search_index) after startup to
    /// populate it from the repository.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Dependency` if the search index cannot be
    /// created.
    pub fn new(repo: R, limits: CatalogLimits) -> Result<Self> {
        let search = SearchIndex::new()?;
        Ok(Self {
            repo,
            search,
            limits,
        })
    }

    /// One page of the store listing, newest first.
    ///
    /// Pages are 1-indexed (page 0 is treated as page 1). When the requested
    /// page exceeds the last valid page, the returned [`StorePage`] reports
    /// the real `page_count` (see [`StorePage::out_of_range`]); callers are
    /// expected to re-request the last page rather than render the empty one.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Dependency` if the repository is unreachable.
    #[instrument(skip(self))]
    pub async fn list_stores(&self, page: u32) -> Result<StorePage> {
        let page = page.max(1);
        let page_size = self.limits.page_size;
        let skip = u64::from(page - 1) * u64::from(page_size);

        let stores = self.repo.stores_page(skip, page_size).await?;
        let total = self.repo.count_stores().await?;
        let page_count =
            u32::try_from(total.div_ceil(u64::from(page_size))).unwrap_or(u32::MAX);

        Ok(StorePage {
            stores,
            page,
            page_count,
            total,
        })
    }

    /// Fetch a store by slug, with its reviews joined in.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::NotFound` if no store has the slug.
    #[instrument(skip(self))]
    pub async fn store_by_slug(&self, slug: &str) -> Result<StoreWithReviews> {
        let store = self
            .repo
            .store_by_slug(slug)
            .await?
            .ok_or_else(|| CatalogError::NotFound(format!("store with slug `{slug}`")))?;
        let reviews = self.repo.reviews_for_store(store.id).await?;

        Ok(StoreWithReviews { store, reviews })
    }

    /// Create a store. The slug is derived from the name; the author is
    /// fixed forever.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Validation` if the name is empty or yields no
    /// slug, and `CatalogError::Dependency` if a slug collision persists
    /// after the internal retry.
    #[instrument(skip(self, new), fields(name = %new.name))]
    pub async fn create_store(&self, new: NewStore) -> Result<Store> {
        let name = new.name.trim().to_owned();
        if name.is_empty() {
            return Err(CatalogError::Validation(
                "store name is required".to_owned(),
            ));
        }
        let base = base_slug(&name)?;

        let write = StoreWrite {
            name,
            slug: self.resolve_slug(&base, None).await?,
            description: new.description,
            tags: tags::normalize(new.tags),
            location: new.location,
            photo: new.photo,
        };

        let store = match self.repo.create_store(write.clone(), new.author).await {
            Ok(store) => store,
            Err(RepositoryError::Conflict(_)) => {
                // A concurrent create won the slug; recompute against the
                // updated collision set and retry once
                let write = StoreWrite {
                    slug: self.resolve_slug(&base, None).await?,
                    ..write
                };
                self.repo
                    .create_store(write, new.author)
                    .await
                    .map_err(escalate_conflict)?
            }
            Err(e) => return Err(e.into()),
        };

        self.index_store(&store);
        Ok(store)
    }

    /// Update a store's mutable fields. Only the author may do this; the
    /// slug is recomputed only when the name actually changed.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::NotFound` if the store does not exist,
    /// `CatalogError::Unauthorized` if the actor is not the author, and
    /// `CatalogError::Validation` for an empty replacement name.
    #[instrument(skip(self, update), fields(store_id = %id))]
    pub async fn update_store(
        &self,
        id: StoreId,
        actor: UserId,
        update: StoreUpdate,
    ) -> Result<Store> {
        let current = self
            .repo
            .store_by_id(id)
            .await?
            .ok_or_else(|| CatalogError::NotFound(format!("store {id}")))?;

        if current.author != actor {
            return Err(CatalogError::Unauthorized(
                "only the store's author may edit it".to_owned(),
            ));
        }

        let name = match update.name {
            Some(name) => {
                let name = name.trim().to_owned();
                if name.is_empty() {
                    return Err(CatalogError::Validation(
                        "store name is required".to_owned(),
                    ));
                }
                name
            }
            None => current.name.clone(),
        };

        // Recompute the slug only on an actual rename, excluding the store's
        // own current slug from the collision set
        let (base, slug) = if name == current.name {
            (None, current.slug.clone())
        } else {
            let base = base_slug(&name)?;
            let slug = self.resolve_slug(&base, Some(id)).await?;
            (Some(base), slug)
        };

        let write = StoreWrite {
            name,
            slug,
            description: update.description.or(current.description),
            tags: update.tags.map_or(current.tags, tags::normalize),
            location: update.location.unwrap_or(current.location),
            photo: update.photo.or(current.photo),
        };

        let store = match self.repo.update_store(id, write.clone()).await {
            Ok(store) => store,
            // A conflict is only recoverable when the slug was recomputed;
            // an unchanged slug cannot collide with itself
            Err(RepositoryError::Conflict(_)) if base.is_some() => {
                let base = base.as_ref().map_or(&write.slug, |base| base);
                let slug = self.resolve_slug(base, Some(id)).await?;
                let write = StoreWrite { slug, ..write };
                self.repo
                    .update_store(id, write)
                    .await
                    .map_err(escalate_conflict)?
            }
            Err(e) => return Err(e.into()),
        };

        self.index_store(&store);
        Ok(store)
    }

    /// Relevance-ranked text search over store names and descriptions.
    ///
    /// An empty or whitespace query yields an empty result.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Dependency` if the search index fails.
    #[instrument(skip(self))]
    pub fn search_text(&self, query: &str) -> Result<Vec<SearchHit>> {
        Ok(self.search.search(query, self.limits.search_limit)?)
    }

    /// Stores nearest to a coordinate, within the configured radius.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Validation` for out-of-range coordinates.
    #[instrument(skip(self))]
    pub async fn search_nearby(&self, longitude: f64, latitude: f64) -> Result<Vec<NearbyStore>> {
        if !(-180.0..=180.0).contains(&longitude) || longitude.is_nan() {
            return Err(CatalogError::Validation(format!(
                "longitude must be between -180 and 180, got {longitude}"
            )));
        }
        if !(-90.0..=90.0).contains(&latitude) || latitude.is_nan() {
            return Err(CatalogError::Validation(format!(
                "latitude must be between -90 and 90, got {latitude}"
            )));
        }

        let stores = self.repo.all_stores().await?;
        Ok(geo::nearby(
            &stores,
            longitude,
            latitude,
            self.limits.nearby_limit,
            self.limits.nearby_radius_meters,
        ))
    }

    /// Tag facets: (tag, count) pairs, most-used first.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Dependency` if the repository is unreachable.
    #[instrument(skip(self))]
    pub async fn list_tags(&self) -> Result<Vec<TagCount>> {
        let stores = self.repo.all_stores().await?;
        Ok(tags::tag_counts(&stores))
    }

    /// Stores carrying `tag`, or every tagged store when no tag is given.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Dependency` if the repository is unreachable.
    #[instrument(skip(self))]
    pub async fn stores_by_tag(&self, tag: Option<&str>) -> Result<Vec<Store>> {
        let stores = self.repo.all_stores().await?;
        Ok(tags::with_tag(&stores, tag)
            .into_iter()
            .cloned()
            .collect())
    }

    /// The top-rated stores: average review rating, at least two reviews.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Dependency` if the repository is unreachable.
    #[instrument(skip(self))]
    pub async fn top_stores(&self) -> Result<Vec<RatedStore>> {
        let stores = self.repo.all_stores().await?;
        let reviews = self.repo.all_reviews().await?;
        Ok(ratings::top_stores(&stores, &reviews, TOP_STORES_LIMIT))
    }

    /// Flip a store's membership in the user's favorites set.
    ///
    /// Toggling twice returns the set to its original state.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::NotFound` if the store does not exist.
    #[instrument(skip(self))]
    pub async fn toggle_favorite(&self, user: UserId, store: StoreId) -> Result<User> {
        if self.repo.store_by_id(store).await?.is_none() {
            return Err(CatalogError::NotFound(format!("store {store}")));
        }

        Ok(self.repo.toggle_favorite(user, store).await?)
    }

    /// The stores a user has hearted, id-ascending.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Dependency` if the repository is unreachable.
    #[instrument(skip(self))]
    pub async fn favorite_stores(&self, user: UserId) -> Result<Vec<Store>> {
        let favorites = self.repo.favorites(user).await?;
        let ids: Vec<StoreId> = favorites.favorites.into_iter().collect();
        Ok(self.repo.stores_by_ids(&ids).await?)
    }

    /// Add a review to a store.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Validation` for a rating outside 1-5 and
    /// `CatalogError::NotFound` if the store does not exist.
    #[instrument(skip(self, text))]
    pub async fn add_review(
        &self,
        store: StoreId,
        author: UserId,
        rating: i64,
        text: Option<String>,
    ) -> Result<Review> {
        let rating =
            Rating::new(rating).map_err(|e| CatalogError::Validation(e.to_string()))?;

        if self.repo.store_by_id(store).await?.is_none() {
            return Err(CatalogError::NotFound(format!("store {store}")));
        }

        let text = text
            .map(|t| t.trim().to_owned())
            .filter(|t| !t.is_empty());

        Ok(self
            .repo
            .create_review(NewReview {
                store,
                author,
                rating,
                text,
            })
            .await?)
    }

    /// Re-index every store. Returns the number of indexed stores.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Dependency` if the repository or the index
    /// fails.
    #[instrument(skip(self))]
    pub async fn rebuild_search_index(&self) -> Result<usize> {
        let stores = self.repo.all_stores().await?;
        self.search.rebuild(&stores)?;
        Ok(stores.len())
    }

    /// Derive a unique slug for `base` against the current collision set.
    async fn resolve_slug(&self, base: &Slug, exclude: Option<StoreId>) -> Result<Slug> {
        let existing = self.repo.slugs_matching(base, exclude).await?;
        slug::resolve(base, &existing)
            .map_err(|e| CatalogError::Dependency(format!("slug resolution failed: {e}")))
    }

    /// Upsert a store into the search index. Index maintenance failures are
    /// logged, not surfaced: reads tolerate a stale index.
    fn index_store(&self, store: &Store) {
        if let Err(e) = self.search.upsert_store(store) {
            warn!(error = %e, slug = %store.slug, "Failed to index store");
        }
    }
}

/// After the single internal retry, a persisting conflict is a
/// dependency-class failure, not a caller error.
fn escalate_conflict(err: RepositoryError) -> CatalogError {
    match err {
        RepositoryError::Conflict(msg) => CatalogError::Dependency(format!(
            "slug conflict persisted after retry: {msg}"
        )),
        other => other.into(),
    }
}

/// Normalize a name into its base slug, or fail validation.
fn base_slug(name: &str) -> Result<Slug> {
    slug::slugify(name).ok_or_else(|| {
        CatalogError::Validation(
            "store name must contain at least one letter or digit".to_owned(),
        )
    })
}
