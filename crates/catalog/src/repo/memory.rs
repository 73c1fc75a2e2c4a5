//! In-memory repository.
//!
//! A faithful fake of the Postgres implementation for tests and local
//! tooling: same ordering, same conflict signaling, single-lock mutations so
//! the favorite toggle is as atomic as the SQL statement it stands in for.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::Utc;

use streetside_core::{ReviewId, Slug, StoreId, UserId};

use crate::models::{NewReview, Review, Store, User};
use crate::slug::collides_with_base;

use super::{CatalogRepository, RepositoryError, StoreWrite};

#[derive(Default)]
struct Inner {
    stores: BTreeMap<StoreId, Store>,
    reviews: Vec<Review>,
    favorites: BTreeMap<UserId, BTreeSet<StoreId>>,
    next_store_id: i32,
    next_review_id: i32,
}

/// In-memory [`CatalogRepository`] implementation.
#[derive(Default)]
pub struct MemoryRepository {
    inner: RwLock<Inner>,
}

impl MemoryRepository {
    /// Create an empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, Inner>, RepositoryError> {
        self.inner
            .read()
            .map_err(|_| RepositoryError::DataCorruption("lock poisoned".to_owned()))
    }

    fn write(&self) -> Result<std::sync::RwLockWriteGuard<'_, Inner>, RepositoryError> {
        self.inner
            .write()
            .map_err(|_| RepositoryError::DataCorruption("lock poisoned".to_owned()))
    }
}

#[async_trait]
impl CatalogRepository for MemoryRepository {
    async fn create_store(
        &self,
        write: StoreWrite,
        author: UserId,
    ) -> Result<Store, RepositoryError> {
        let mut inner = self.write()?;

        // Mirrors the unique index on slug
        if inner.stores.values().any(|s| s.slug == write.slug) {
            return Err(RepositoryError::Conflict("slug already exists".to_owned()));
        }

        inner.next_store_id += 1;
        let store = Store {
            id: StoreId::new(inner.next_store_id),
            name: write.name,
            slug: write.slug,
            description: write.description,
            tags: write.tags,
            location: write.location,
            photo: write.photo,
            author,
            created_at: Utc::now(),
        };
        inner.stores.insert(store.id, store.clone());
        Ok(store)
    }

    async fn update_store(
        &self,
        id: StoreId,
        write: StoreWrite,
    ) -> Result<Store, RepositoryError> {
        let mut inner = self.write()?;

        if inner
            .stores
            .values()
            .any(|s| s.id != id && s.slug == write.slug)
        {
            return Err(RepositoryError::Conflict("slug already exists".to_owned()));
        }

        let store = inner.stores.get_mut(&id).ok_or(RepositoryError::NotFound)?;
        store.name = write.name;
        store.slug = write.slug;
        store.description = write.description;
        store.tags = write.tags;
        store.location = write.location;
        store.photo = write.photo;
        Ok(store.clone())
    }

    async fn store_by_id(&self, id: StoreId) -> Result<Option<Store>, RepositoryError> {
        Ok(self.read()?.stores.get(&id).cloned())
    }

    async fn store_by_slug(&self, slug: &str) -> Result<Option<Store>, RepositoryError> {
        Ok(self
            .read()?
            .stores
            .values()
            .find(|s| s.slug.as_str() == slug)
            .cloned())
    }

    async fn stores_page(&self, skip: u64, limit: u32) -> Result<Vec<Store>, RepositoryError> {
        let inner = self.read()?;
        let mut stores: Vec<Store> = inner.stores.values().cloned().collect();
        stores.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(stores
            .into_iter()
            .skip(usize::try_from(skip).unwrap_or(usize::MAX))
            .take(limit as usize)
            .collect())
    }

    async fn count_stores(&self) -> Result<u64, RepositoryError> {
        Ok(self.read()?.stores.len() as u64)
    }

    async fn all_stores(&self) -> Result<Vec<Store>, RepositoryError> {
        Ok(self.read()?.stores.values().cloned().collect())
    }

    async fn slugs_matching(
        &self,
        base: &Slug,
        exclude: Option<StoreId>,
    ) -> Result<Vec<Slug>, RepositoryError> {
        Ok(self
            .read()?
            .stores
            .values()
            .filter(|s| exclude != Some(s.id))
            .filter(|s| collides_with_base(s.slug.as_str(), base.as_str()))
            .map(|s| s.slug.clone())
            .collect())
    }

    async fn create_review(&self, review: NewReview) -> Result<Review, RepositoryError> {
        let mut inner = self.write()?;

        if !inner.stores.contains_key(&review.store) {
            return Err(RepositoryError::NotFound);
        }

        inner.next_review_id += 1;
        let review = Review {
            id: ReviewId::new(inner.next_review_id),
            store: review.store,
            author: review.author,
            rating: review.rating,
            text: review.text,
            created_at: Utc::now(),
        };
        inner.reviews.push(review.clone());
        Ok(review)
    }

    async fn reviews_for_store(&self, store: StoreId) -> Result<Vec<Review>, RepositoryError> {
        Ok(self
            .read()?
            .reviews
            .iter()
            .filter(|r| r.store == store)
            .cloned()
            .collect())
    }

    async fn all_reviews(&self) -> Result<Vec<Review>, RepositoryError> {
        Ok(self.read()?.reviews.clone())
    }

    async fn toggle_favorite(
        &self,
        user: UserId,
        store: StoreId,
    ) -> Result<User, RepositoryError> {
        let mut inner = self.write()?;

        // Flip under the write lock: the in-memory analogue of the single
        // atomic SQL statement
        let favorites = inner.favorites.entry(user).or_default();
        if !favorites.remove(&store) {
            favorites.insert(store);
        }

        Ok(User {
            id: user,
            favorites: favorites.clone(),
        })
    }

    async fn favorites(&self, user: UserId) -> Result<User, RepositoryError> {
        Ok(self
            .read()?
            .favorites
            .get(&user)
            .map_or_else(|| User::empty(user), |favorites| User {
                id: user,
                favorites: favorites.clone(),
            }))
    }

    async fn stores_by_ids(&self, ids: &[StoreId]) -> Result<Vec<Store>, RepositoryError> {
        let wanted: BTreeSet<StoreId> = ids.iter().copied().collect();
        Ok(self
            .read()?
            .stores
            .values()
            .filter(|s| wanted.contains(&s.id))
            .cloned()
            .collect())
    }
}
