//! User favorites view.
//!
//! Identity is owned by the caller's auth layer; the catalog only tracks
//! which stores a user has hearted.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use streetside_core::{StoreId, UserId};

/// A user's favorites view (external identity, consumed not owned).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// The external user ID.
    pub id: UserId,
    /// Hearted stores. A true set: toggling is an involution.
    pub favorites: BTreeSet<StoreId>,
}

impl User {
    /// A user with no favorites yet.
    #[must_use]
    pub const fn empty(id: UserId) -> Self {
        Self {
            id,
            favorites: BTreeSet::new(),
        }
    }
}
