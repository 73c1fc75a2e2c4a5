//! Core types for Streetside.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod id;
pub mod rating;
pub mod slug;

pub use id::*;
pub use rating::{Rating, RatingError};
pub use slug::{Slug, SlugError};
