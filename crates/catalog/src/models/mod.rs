//! Domain types for the catalog.
//!
//! These types represent validated domain objects separate from database row
//! types. Constructors enforce the field invariants (coordinate ranges,
//! non-empty address); everything downstream relies on them.

pub mod review;
pub mod store;
pub mod user;

pub use review::{NewReview, Review};
pub use store::{
    Location, LocationError, NewStore, Store, StorePage, StoreUpdate, StoreWithReviews,
};
pub use user::User;
