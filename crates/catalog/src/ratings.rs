//! Rating aggregation: the "top stores" ranking.
//!
//! The original aggregation pipeline (join reviews, drop small samples,
//! average, sort, limit) is re-expressed as explicit stages so each one is
//! independently testable. Review records are never mutated.

use std::collections::HashMap;

use serde::Serialize;

use streetside_core::StoreId;

use crate::models::{Review, Store};

/// Stores with fewer reviews than this never rank. A deliberate noise
/// filter: one 5-star review must not top the list.
pub const MIN_REVIEWS_FOR_RANKING: usize = 2;

/// Default number of top stores returned.
pub const TOP_STORES_LIMIT: usize = 10;

/// A ranked store with its average rating.
#[derive(Debug, Clone, Serialize)]
pub struct RatedStore {
    pub store: Store,
    pub average_rating: f64,
}

/// Rank stores by average review rating.
///
/// Stores with fewer than [`MIN_REVIEWS_FOR_RANKING`] reviews are excluded.
/// Sorted by average descending, ties broken by store id ascending, capped
/// at `limit`.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn top_stores(stores: &[Store], reviews: &[Review], limit: usize) -> Vec<RatedStore> {
    // store -> (rating sum, review count)
    let mut samples: HashMap<StoreId, (u64, usize)> = HashMap::new();
    for review in reviews {
        let entry = samples.entry(review.store).or_insert((0, 0));
        entry.0 += u64::from(review.rating.value());
        entry.1 += 1;
    }

    let mut ranked: Vec<RatedStore> = stores
        .iter()
        .filter_map(|store| {
            let (sum, count) = samples.get(&store.id).copied()?;
            (count >= MIN_REVIEWS_FOR_RANKING).then(|| RatedStore {
                store: store.clone(),
                average_rating: sum as f64 / count as f64,
            })
        })
        .collect();

    ranked.sort_by(|a, b| {
        b.average_rating
            .total_cmp(&a.average_rating)
            .then_with(|| a.store.id.cmp(&b.store.id))
    });
    ranked.truncate(limit);
    ranked
}
