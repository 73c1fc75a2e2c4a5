//! Store domain types.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use streetside_core::{Slug, StoreId, UserId};

use super::review::Review;

/// Errors that can occur when constructing a [`Location`].
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum LocationError {
    /// Longitude outside [-180, 180].
    #[error("longitude must be between -180 and 180, got {0}")]
    LongitudeOutOfRange(f64),
    /// Latitude outside [-90, 90].
    #[error("latitude must be between -90 and 90, got {0}")]
    LatitudeOutOfRange(f64),
    /// The address is empty.
    #[error("an address is required")]
    EmptyAddress,
    /// The wire form carried a geometry type other than "Point".
    #[error("unsupported geometry type {0:?}, only \"Point\" is accepted")]
    UnsupportedGeometry(String),
}

/// A store's geolocation: a 2D point plus a free-text address.
///
/// Serializes to the `GeoJSON`-style wire shape the map layer consumes:
/// `{"type":"Point","coordinates":[longitude,latitude],"address":"..."}`.
/// Coordinate ranges are enforced on construction and on deserialize.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "LocationWire", into = "LocationWire")]
pub struct Location {
    longitude: f64,
    latitude: f64,
    address: String,
}

impl Location {
    /// Create a validated location.
    ///
    /// # Errors
    ///
    /// Returns `LocationError` if a coordinate is out of range or the
    /// address is empty after trimming.
    pub fn new(longitude: f64, latitude: f64, address: &str) -> Result<Self, LocationError> {
        if !(-180.0..=180.0).contains(&longitude) || longitude.is_nan() {
            return Err(LocationError::LongitudeOutOfRange(longitude));
        }
        if !(-90.0..=90.0).contains(&latitude) || latitude.is_nan() {
            return Err(LocationError::LatitudeOutOfRange(latitude));
        }
        let address = address.trim();
        if address.is_empty() {
            return Err(LocationError::EmptyAddress);
        }
        Ok(Self {
            longitude,
            latitude,
            address: address.to_owned(),
        })
    }

    /// Longitude in degrees.
    #[must_use]
    pub const fn longitude(&self) -> f64 {
        self.longitude
    }

    /// Latitude in degrees.
    #[must_use]
    pub const fn latitude(&self) -> f64 {
        self.latitude
    }

    /// The free-text address.
    #[must_use]
    pub fn address(&self) -> &str {
        &self.address
    }
}

/// `GeoJSON`-style wire form of [`Location`].
#[derive(Serialize, Deserialize)]
struct LocationWire {
    #[serde(rename = "type", default = "point_geometry")]
    kind: String,
    coordinates: [f64; 2],
    address: String,
}

fn point_geometry() -> String {
    "Point".to_owned()
}

impl TryFrom<LocationWire> for Location {
    type Error = LocationError;

    fn try_from(wire: LocationWire) -> Result<Self, Self::Error> {
        if wire.kind != "Point" {
            return Err(LocationError::UnsupportedGeometry(wire.kind));
        }
        let [longitude, latitude] = wire.coordinates;
        Self::new(longitude, latitude, &wire.address)
    }
}

impl From<Location> for LocationWire {
    fn from(location: Location) -> Self {
        Self {
            kind: point_geometry(),
            coordinates: [location.longitude, location.latitude],
            address: location.address,
        }
    }
}

/// A store in the catalog (domain type).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Store {
    /// Unique store ID.
    pub id: StoreId,
    /// Display name.
    pub name: String,
    /// Unique URL-safe identifier, derived from the name - never user-supplied.
    pub slug: Slug,
    /// Optional free-text description.
    pub description: Option<String>,
    /// Tag set. A true set: no duplicates, order irrelevant.
    pub tags: BTreeSet<String>,
    /// Geolocation and address.
    pub location: Location,
    /// Opaque reference to an already-uploaded photo.
    pub photo: Option<String>,
    /// The owning user. Set once at creation, immutable.
    pub author: UserId,
    /// When the store was created. Immutable.
    pub created_at: DateTime<Utc>,
}

/// Input for creating a store.
///
/// The slug is absent on purpose: it is derived by the catalog, and the
/// author is fixed here forever.
#[derive(Debug, Clone)]
pub struct NewStore {
    pub name: String,
    pub description: Option<String>,
    pub tags: BTreeSet<String>,
    pub location: Location,
    pub photo: Option<String>,
    pub author: UserId,
}

/// Field updates for a store. `Some` replaces the field, `None` leaves it
/// untouched. The author and creation time cannot be updated.
#[derive(Debug, Clone, Default)]
pub struct StoreUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub tags: Option<BTreeSet<String>>,
    pub location: Option<Location>,
    pub photo: Option<String>,
}

/// A store together with its reviews (explicit join, performed at query time).
#[derive(Debug, Clone, Serialize)]
pub struct StoreWithReviews {
    pub store: Store,
    pub reviews: Vec<Review>,
}

/// One page of the store listing.
#[derive(Debug, Clone, Serialize)]
pub struct StorePage {
    /// Stores on this page, newest first.
    pub stores: Vec<Store>,
    /// The requested page (1-indexed).
    pub page: u32,
    /// Total number of pages.
    pub page_count: u32,
    /// Total number of stores in the catalog.
    pub total: u64,
}

impl StorePage {
    /// Whether the requested page lies beyond the last valid page.
    ///
    /// Callers are expected to re-request `page_count` instead of rendering
    /// the empty page.
    #[must_use]
    pub const fn out_of_range(&self) -> bool {
        self.total > 0 && self.page > self.page_count
    }
}
