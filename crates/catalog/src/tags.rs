//! Tag faceting and tag-filtered listing.
//!
//! The original aggregation pipeline (unwind tags, group, sort) is
//! re-expressed as explicit stages over the store list.

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use serde::Serialize;

use crate::models::Store;

/// A tag facet: how many stores carry the tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TagCount {
    pub tag: String,
    pub count: u64,
}

/// Count (store, tag) memberships across the catalog.
///
/// Each store increments each of its distinct tags once. Sorted by count
/// descending, ties broken by tag name ascending.
#[must_use]
pub fn tag_counts(stores: &[Store]) -> Vec<TagCount> {
    let mut counts: BTreeMap<&str, u64> = BTreeMap::new();
    for store in stores {
        for tag in &store.tags {
            *counts.entry(tag.as_str()).or_insert(0) += 1;
        }
    }

    let mut facets: Vec<TagCount> = counts
        .into_iter()
        .map(|(tag, count)| TagCount {
            tag: tag.to_owned(),
            count,
        })
        .collect();

    // BTreeMap already yields tags in ascending order, so a stable sort on
    // count keeps the name-ascending tiebreak
    facets.sort_by(|a, b| b.count.cmp(&a.count));
    facets
}

/// List the stores carrying `tag`, or every store with at least one tag when
/// no tag is given. Ordered by store id ascending.
#[must_use]
pub fn with_tag<'a>(stores: &'a [Store], tag: Option<&str>) -> Vec<&'a Store> {
    let mut matched: Vec<&Store> = stores
        .iter()
        .filter(|store| {
            tag.map_or_else(|| !store.tags.is_empty(), |tag| store.tags.contains(tag))
        })
        .collect();

    matched.sort_by_key(|store| store.id);
    matched
}

/// Normalize a user-supplied tag set: trim whitespace and drop empties.
#[must_use]
pub fn normalize(tags: BTreeSet<String>) -> BTreeSet<String> {
    tags.into_iter()
        .map(|tag| tag.trim().to_owned())
        .filter(|tag| !tag.is_empty())
        .collect()
}
