//! Geospatial nearest-store search.
//!
//! Distances are great-circle (haversine) against each store's stored 2D
//! point. The pipeline is explicit - measure, filter by radius, sort, limit,
//! project - so each stage is independently testable.

use serde::Serialize;

use streetside_core::Slug;

use crate::models::{Location, Store};

/// Mean Earth radius in meters.
const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

/// A store projected to the reduced nearby view: no author, no reviews.
#[derive(Debug, Clone, Serialize)]
pub struct NearbyStore {
    pub slug: Slug,
    pub name: String,
    pub description: Option<String>,
    pub location: Location,
    pub photo: Option<String>,
    /// Great-circle distance from the query point, in meters.
    pub distance_meters: f64,
}

/// Great-circle distance in meters between two (longitude, latitude) points.
#[must_use]
pub fn haversine_meters(lng1: f64, lat1: f64, lng2: f64, lat2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let d_phi = (lat2 - lat1).to_radians();
    let d_lambda = (lng2 - lng1).to_radians();

    let a = (d_phi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_METERS * c
}

/// Find the stores nearest to a query point.
///
/// Returns at most `limit` stores within `max_distance_meters`, ascending by
/// distance with ties broken by store id. An empty result is valid, not an
/// error.
#[must_use]
pub fn nearby(
    stores: &[Store],
    longitude: f64,
    latitude: f64,
    limit: usize,
    max_distance_meters: f64,
) -> Vec<NearbyStore> {
    let mut within: Vec<(f64, &Store)> = stores
        .iter()
        .map(|store| {
            let distance = haversine_meters(
                longitude,
                latitude,
                store.location.longitude(),
                store.location.latitude(),
            );
            (distance, store)
        })
        .filter(|(distance, _)| *distance <= max_distance_meters)
        .collect();

    within.sort_by(|(da, a), (db, b)| da.total_cmp(db).then_with(|| a.id.cmp(&b.id)));
    within.truncate(limit);

    within
        .into_iter()
        .map(|(distance_meters, store)| NearbyStore {
            slug: store.slug.clone(),
            name: store.name.clone(),
            description: store.description.clone(),
            location: store.location.clone(),
            photo: store.photo.clone(),
            distance_meters,
        })
        .collect()
}
