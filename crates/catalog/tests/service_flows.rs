//! End-to-end service flows over the in-memory repository.

#![allow(clippy::unwrap_used)]

use std::collections::BTreeSet;
use std::time::Duration;

use streetside_catalog::config::CatalogLimits;
use streetside_catalog::error::CatalogError;
use streetside_catalog::models::{Location, NewStore, StoreUpdate};
use streetside_catalog::repo::MemoryRepository;
use streetside_catalog::service::CatalogService;
use streetside_core::UserId;

fn service() -> CatalogService<MemoryRepository> {
    CatalogService::new(MemoryRepository::new(), CatalogLimits::default()).unwrap()
}

fn new_store(name: &str, author: i32) -> NewStore {
    NewStore {
        name: name.to_owned(),
        description: Some("a neighborhood favorite".to_owned()),
        tags: BTreeSet::new(),
        location: Location::new(-122.42, 37.77, "123 Main St").unwrap(),
        photo: None,
        author: UserId::new(author),
    }
}

fn tagged_store(name: &str, author: i32, tags: &[&str]) -> NewStore {
    NewStore {
        tags: tags.iter().map(|t| (*t).to_owned()).collect(),
        ..new_store(name, author)
    }
}

// =============================================================================
// Create / read round trips
// =============================================================================

#[tokio::test]
async fn test_create_then_get_by_slug_roundtrip() {
    let service = service();

    let created = service.create_store(new_store("Cafe Luna", 1)).await.unwrap();
    assert_eq!(created.slug.as_str(), "cafe-luna");

    let fetched = service.store_by_slug("cafe-luna").await.unwrap();
    assert_eq!(fetched.store.id, created.id);
    assert_eq!(fetched.store.name, "Cafe Luna");
    assert!(fetched.reviews.is_empty());
}

#[tokio::test]
async fn test_same_name_gets_counted_suffix() {
    let service = service();

    let first = service.create_store(new_store("Cafe Luna", 1)).await.unwrap();
    let second = service.create_store(new_store("Cafe Luna", 2)).await.unwrap();
    let third = service.create_store(new_store("Cafe Luna", 3)).await.unwrap();

    assert_eq!(first.slug.as_str(), "cafe-luna");
    assert_eq!(second.slug.as_str(), "cafe-luna-2");
    assert_eq!(third.slug.as_str(), "cafe-luna-3");
}

#[tokio::test]
async fn test_create_rejects_blank_name() {
    let service = service();

    let result = service.create_store(new_store("   ", 1)).await;
    assert!(matches!(result, Err(CatalogError::Validation(_))));

    let result = service.create_store(new_store("!!!", 1)).await;
    assert!(matches!(result, Err(CatalogError::Validation(_))));
}

#[tokio::test]
async fn test_get_unknown_slug_is_not_found() {
    let service = service();

    let result = service.store_by_slug("nope").await;
    assert!(matches!(result, Err(CatalogError::NotFound(_))));
}

// =============================================================================
// Updates and ownership
// =============================================================================

#[tokio::test]
async fn test_update_by_non_author_is_unauthorized_and_unmodified() {
    let service = service();
    let store = service.create_store(new_store("Cafe Luna", 1)).await.unwrap();

    let result = service
        .update_store(
            store.id,
            UserId::new(2),
            StoreUpdate {
                name: Some("Hijacked".to_owned()),
                ..StoreUpdate::default()
            },
        )
        .await;
    assert!(matches!(result, Err(CatalogError::Unauthorized(_))));

    let unchanged = service.store_by_slug("cafe-luna").await.unwrap();
    assert_eq!(unchanged.store.name, "Cafe Luna");
}

#[tokio::test]
async fn test_update_recomputes_slug_only_on_rename() {
    let service = service();
    let store = service.create_store(new_store("Cafe Luna", 1)).await.unwrap();

    // Description-only update keeps the slug
    let updated = service
        .update_store(
            store.id,
            UserId::new(1),
            StoreUpdate {
                description: Some("new description".to_owned()),
                ..StoreUpdate::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.slug.as_str(), "cafe-luna");
    assert_eq!(updated.description.as_deref(), Some("new description"));

    // A rename derives a fresh slug
    let renamed = service
        .update_store(
            store.id,
            UserId::new(1),
            StoreUpdate {
                name: Some("Moonlight Cafe".to_owned()),
                ..StoreUpdate::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(renamed.slug.as_str(), "moonlight-cafe");

    // The old slug no longer resolves
    assert!(matches!(
        service.store_by_slug("cafe-luna").await,
        Err(CatalogError::NotFound(_))
    ));
    assert!(service.store_by_slug("moonlight-cafe").await.is_ok());
}

#[tokio::test]
async fn test_update_unknown_store_is_not_found() {
    let service = service();

    let result = service
        .update_store(
            streetside_core::StoreId::new(99),
            UserId::new(1),
            StoreUpdate::default(),
        )
        .await;
    assert!(matches!(result, Err(CatalogError::NotFound(_))));
}

#[tokio::test]
async fn test_author_is_immutable_across_updates() {
    let service = service();
    let store = service.create_store(new_store("Cafe Luna", 7)).await.unwrap();

    let updated = service
        .update_store(store.id, UserId::new(7), StoreUpdate::default())
        .await
        .unwrap();
    assert_eq!(updated.author, UserId::new(7));
    assert_eq!(updated.created_at, store.created_at);
}

// =============================================================================
// Pagination
// =============================================================================

#[tokio::test]
async fn test_list_stores_pages_and_counts() {
    let service = service();
    for i in 1..=25 {
        service
            .create_store(new_store(&format!("Store {i}"), 1))
            .await
            .unwrap();
        // Keep created_at strictly increasing so newest-first is stable
        tokio::time::sleep(Duration::from_millis(2)).await;
    }

    let page = service.list_stores(1).await.unwrap();
    assert_eq!(page.stores.len(), 10);
    assert_eq!(page.total, 25);
    assert_eq!(page.page_count, 3);
    assert!(!page.out_of_range());
    assert_eq!(page.stores[0].name, "Store 25");

    let last = service.list_stores(3).await.unwrap();
    assert_eq!(last.stores.len(), 5);

    // Beyond the last page: empty, and flagged so the caller can redirect
    let beyond = service.list_stores(7).await.unwrap();
    assert!(beyond.stores.is_empty());
    assert!(beyond.out_of_range());
    assert_eq!(beyond.page_count, 3);
}

#[tokio::test]
async fn test_list_stores_empty_catalog() {
    let service = service();

    let page = service.list_stores(1).await.unwrap();
    assert!(page.stores.is_empty());
    assert_eq!(page.total, 0);
    assert!(!page.out_of_range());
}

// =============================================================================
// Tags
// =============================================================================

#[tokio::test]
async fn test_tag_facets_and_filtering() {
    let service = service();
    service
        .create_store(tagged_store("A", 1, &["wifi", "vegan"]))
        .await
        .unwrap();
    service
        .create_store(tagged_store("B", 1, &["wifi"]))
        .await
        .unwrap();
    service.create_store(new_store("C", 1)).await.unwrap();

    let facets = service.list_tags().await.unwrap();
    assert_eq!(facets.len(), 2);
    assert_eq!(facets[0].tag, "wifi");
    assert_eq!(facets[0].count, 2);
    assert_eq!(facets[1].tag, "vegan");
    assert_eq!(facets[1].count, 1);

    let wifi = service.stores_by_tag(Some("wifi")).await.unwrap();
    assert_eq!(wifi.len(), 2);

    // No tag given: every tagged store, untagged C excluded
    let tagged = service.stores_by_tag(None).await.unwrap();
    let names: Vec<&str> = tagged.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["A", "B"]);
}

// =============================================================================
// Reviews and top stores
// =============================================================================

#[tokio::test]
async fn test_add_review_validates_rating_and_store() {
    let service = service();
    let store = service.create_store(new_store("Cafe Luna", 1)).await.unwrap();

    let result = service.add_review(store.id, UserId::new(2), 0, None).await;
    assert!(matches!(result, Err(CatalogError::Validation(_))));
    let result = service.add_review(store.id, UserId::new(2), 6, None).await;
    assert!(matches!(result, Err(CatalogError::Validation(_))));

    let result = service
        .add_review(streetside_core::StoreId::new(99), UserId::new(2), 4, None)
        .await;
    assert!(matches!(result, Err(CatalogError::NotFound(_))));

    let review = service
        .add_review(store.id, UserId::new(2), 4, Some("solid espresso".to_owned()))
        .await
        .unwrap();
    assert_eq!(review.rating.value(), 4);
    assert_eq!(review.store, store.id);

    let with_reviews = service.store_by_slug("cafe-luna").await.unwrap();
    assert_eq!(with_reviews.reviews.len(), 1);
}

#[tokio::test]
async fn test_top_stores_excludes_small_samples() {
    let service = service();
    let loved = service.create_store(new_store("Loved", 1)).await.unwrap();
    let lonely = service.create_store(new_store("Lonely", 1)).await.unwrap();

    // One perfect review is not enough to rank
    service
        .add_review(lonely.id, UserId::new(2), 5, None)
        .await
        .unwrap();

    service.add_review(loved.id, UserId::new(2), 4, None).await.unwrap();
    service.add_review(loved.id, UserId::new(3), 5, None).await.unwrap();

    let top = service.top_stores().await.unwrap();
    assert_eq!(top.len(), 1);
    assert_eq!(top[0].store.id, loved.id);
    assert!((top[0].average_rating - 4.5).abs() < f64::EPSILON);
}

// =============================================================================
// Favorites
// =============================================================================

#[tokio::test]
async fn test_toggle_favorite_is_an_involution() {
    let service = service();
    let store = service.create_store(new_store("Cafe Luna", 1)).await.unwrap();
    let user = UserId::new(9);

    let before = service.favorite_stores(user).await.unwrap();
    assert!(before.is_empty());

    let after_add = service.toggle_favorite(user, store.id).await.unwrap();
    assert!(after_add.favorites.contains(&store.id));

    let after_remove = service.toggle_favorite(user, store.id).await.unwrap();
    assert!(after_remove.favorites.is_empty());

    let restored = service.favorite_stores(user).await.unwrap();
    assert!(restored.is_empty());
}

#[tokio::test]
async fn test_toggle_favorite_requires_existing_store() {
    let service = service();

    let result = service
        .toggle_favorite(UserId::new(9), streetside_core::StoreId::new(42))
        .await;
    assert!(matches!(result, Err(CatalogError::NotFound(_))));
}

#[tokio::test]
async fn test_favorite_stores_lists_hearted_stores() {
    let service = service();
    let a = service.create_store(new_store("A", 1)).await.unwrap();
    let b = service.create_store(new_store("B", 1)).await.unwrap();
    service.create_store(new_store("C", 1)).await.unwrap();
    let user = UserId::new(9);

    service.toggle_favorite(user, b.id).await.unwrap();
    service.toggle_favorite(user, a.id).await.unwrap();

    let hearted = service.favorite_stores(user).await.unwrap();
    let names: Vec<&str> = hearted.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["A", "B"]);
}

// =============================================================================
// Search
// =============================================================================

#[tokio::test]
async fn test_search_text_after_create_and_rename() {
    let service = service();
    service.create_store(new_store("Cafe Luna", 1)).await.unwrap();
    let taco = service.create_store(new_store("Taco Town", 1)).await.unwrap();

    let hits = service.search_text("luna").unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].slug, "cafe-luna");

    // Renames are reflected in the index
    service
        .update_store(
            taco.id,
            UserId::new(1),
            StoreUpdate {
                name: Some("Burrito Barn".to_owned()),
                ..StoreUpdate::default()
            },
        )
        .await
        .unwrap();
    assert!(service.search_text("taco").unwrap().is_empty());
    assert_eq!(service.search_text("burrito").unwrap().len(), 1);

    // Empty query is an empty result, not an error
    assert!(service.search_text("   ").unwrap().is_empty());
}

#[tokio::test]
async fn test_rebuild_search_index_from_repository() {
    let service = service();
    service.create_store(new_store("Cafe Luna", 1)).await.unwrap();
    service.create_store(new_store("Taco Town", 1)).await.unwrap();

    let indexed = service.rebuild_search_index().await.unwrap();
    assert_eq!(indexed, 2);
    assert_eq!(service.search_text("cafe").unwrap().len(), 1);
}

#[tokio::test]
async fn test_search_nearby_validates_and_filters() {
    let service = service();

    let result = service.search_nearby(200.0, 0.0).await;
    assert!(matches!(result, Err(CatalogError::Validation(_))));
    let result = service.search_nearby(0.0, -95.0).await;
    assert!(matches!(result, Err(CatalogError::Validation(_))));

    let mut near = new_store("Near", 1);
    near.location = Location::new(-122.42, 37.771, "close by").unwrap();
    let mut far = new_store("Far", 1);
    far.location = Location::new(-121.0, 38.5, "far away").unwrap();
    service.create_store(near).await.unwrap();
    service.create_store(far).await.unwrap();

    let results = service.search_nearby(-122.42, 37.77).await.unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].name, "Near");
    assert!(results[0].distance_meters <= 10_000.0);
}
