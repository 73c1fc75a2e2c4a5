//! Collision-safe slug derivation.
//!
//! A store's slug is derived from its display name, never user-supplied.
//! Derivation runs as an explicit pre-persistence step on create and on
//! rename (only when the name actually changed); the database's unique index
//! on `slug` stays authoritative, and the service retries once on a
//! commit-time collision.

use streetside_core::{Slug, SlugError};

/// Longest base slug kept before the collision suffix; leaves room for
/// `-{n}` within [`Slug::MAX_LENGTH`].
const MAX_BASE_LENGTH: usize = 80;

/// Normalize a display name into a base slug.
///
/// Lowercases ASCII letters, folds every run of other characters into a
/// single hyphen, and trims edge hyphens. Returns `None` when nothing
/// slug-worthy remains (e.g. an all-punctuation name).
#[must_use]
pub fn slugify(name: &str) -> Option<Slug> {
    let mut out = String::with_capacity(name.len().min(MAX_BASE_LENGTH));
    let mut pending_hyphen = false;

    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_hyphen && !out.is_empty() {
                out.push('-');
            }
            pending_hyphen = false;
            out.push(c.to_ascii_lowercase());
        } else {
            pending_hyphen = true;
        }
        if out.len() >= MAX_BASE_LENGTH {
            break;
        }
    }

    while out.ends_with('-') {
        out.pop();
    }

    Slug::parse(&out).ok()
}

/// Whether `candidate` collides with `base`: equal to it, or `base-{digits}`,
/// compared case-insensitively.
#[must_use]
pub fn collides_with_base(candidate: &str, base: &str) -> bool {
    let candidate = candidate.to_ascii_lowercase();
    if candidate == base {
        return true;
    }
    candidate
        .strip_prefix(base)
        .and_then(|rest| rest.strip_prefix('-'))
        .is_some_and(|digits| !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()))
}

/// Resolve a unique slug for `base` against the already-taken slugs.
///
/// Zero collisions leave the base untouched; N collisions yield
/// `base-{N+1}`. The suffix comes from the collision *count* - with N
/// pre-existing variants a new store always lands on `base-{N+1}`.
///
/// # Errors
///
/// Returns `SlugError` only if the suffixed form fails slug validation,
/// which cannot happen for a base produced by [`slugify`].
pub fn resolve(base: &Slug, existing: &[Slug]) -> Result<Slug, SlugError> {
    let collisions = existing
        .iter()
        .filter(|slug| collides_with_base(slug.as_str(), base.as_str()))
        .count();

    if collisions == 0 {
        Ok(base.clone())
    } else {
        Slug::parse(&format!("{base}-{}", collisions + 1))
    }
}
