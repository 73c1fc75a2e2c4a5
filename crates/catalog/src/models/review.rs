//! Review domain types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use streetside_core::{Rating, ReviewId, StoreId, UserId};

/// A review of a store (domain type).
///
/// Reviews always reference an existing store; the rating is in range by
/// construction. Editing and deleting reviews is not supported.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Review {
    /// Unique review ID.
    pub id: ReviewId,
    /// The reviewed store.
    pub store: StoreId,
    /// The reviewing user.
    pub author: UserId,
    /// Star rating, 1-5.
    pub rating: Rating,
    /// Optional review text.
    pub text: Option<String>,
    /// When the review was written.
    pub created_at: DateTime<Utc>,
}

/// Input for creating a review.
#[derive(Debug, Clone)]
pub struct NewReview {
    pub store: StoreId,
    pub author: UserId,
    pub rating: Rating,
    pub text: Option<String>,
}
