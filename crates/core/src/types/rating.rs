//! Review rating type.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when constructing a [`Rating`].
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum RatingError {
    /// The value is outside the allowed 1-5 range.
    #[error("rating must be between {min} and {max}, got {value}")]
    OutOfRange {
        /// Minimum allowed rating.
        min: u8,
        /// Maximum allowed rating.
        max: u8,
        /// The rejected value.
        value: i64,
    },
}

/// A review rating on the 1-5 scale.
///
/// Ratings are always within range by construction; aggregate computations
/// (average ratings) can rely on the invariant without re-checking.
///
/// ## Examples
///
/// ```
/// use streetside_core::Rating;
///
/// assert!(Rating::new(1).is_ok());
/// assert!(Rating::new(5).is_ok());
/// assert!(Rating::new(0).is_err());
/// assert!(Rating::new(6).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct Rating(u8);

impl Rating {
    /// Minimum rating value.
    pub const MIN: u8 = 1;
    /// Maximum rating value.
    pub const MAX: u8 = 5;

    /// Create a `Rating` from an integer value.
    ///
    /// # Errors
    ///
    /// Returns [`RatingError::OutOfRange`] if the value is not in 1-5.
    pub fn new(value: i64) -> Result<Self, RatingError> {
        u8::try_from(value)
            .ok()
            .filter(|v| (Self::MIN..=Self::MAX).contains(v))
            .map(Self)
            .ok_or(RatingError::OutOfRange {
                min: Self::MIN,
                max: Self::MAX,
                value,
            })
    }

    /// Get the rating value.
    #[must_use]
    pub const fn value(self) -> u8 {
        self.0
    }

    /// Get the rating value as a float, for averaging.
    #[must_use]
    pub fn as_f64(self) -> f64 {
        f64::from(self.0)
    }
}

impl fmt::Display for Rating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<i64> for Rating {
    type Error = RatingError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Rating> for i64 {
    fn from(rating: Rating) -> Self {
        Self::from(rating.0)
    }
}

// SQLx support (with postgres feature): stored as SMALLINT
#[cfg(feature = "postgres")]
impl sqlx::Type<sqlx::Postgres> for Rating {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <i16 as sqlx::Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <i16 as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

#[cfg(feature = "postgres")]
impl<'r> sqlx::Decode<'r, sqlx::Postgres> for Rating {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let raw = <i16 as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        Ok(Self::new(i64::from(raw))?)
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Encode<'_, sqlx::Postgres> for Rating {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <i16 as sqlx::Encode<sqlx::Postgres>>::encode_by_ref(&i16::from(self.0), buf)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_new_valid_range() {
        for value in 1..=5 {
            assert!(Rating::new(value).is_ok());
        }
    }

    #[test]
    fn test_new_out_of_range() {
        assert!(matches!(
            Rating::new(0),
            Err(RatingError::OutOfRange { value: 0, .. })
        ));
        assert!(matches!(
            Rating::new(6),
            Err(RatingError::OutOfRange { value: 6, .. })
        ));
        assert!(Rating::new(-3).is_err());
    }

    #[test]
    fn test_value() {
        assert_eq!(Rating::new(4).unwrap().value(), 4);
    }

    #[test]
    fn test_as_f64() {
        assert!((Rating::new(3).unwrap().as_f64() - 3.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", Rating::new(5).unwrap()), "5");
    }

    #[test]
    fn test_serde_roundtrip() {
        let rating = Rating::new(2).unwrap();
        let json = serde_json::to_string(&rating).unwrap();
        assert_eq!(json, "2");

        let parsed: Rating = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, rating);
    }

    #[test]
    fn test_serde_rejects_out_of_range() {
        assert!(serde_json::from_str::<Rating>("0").is_err());
        assert!(serde_json::from_str::<Rating>("9").is_err());
    }
}
