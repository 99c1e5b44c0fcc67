//! Aggregate review rating.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Highest possible average rating.
pub const MAX_RATING: Decimal = Decimal::from_parts(5, 0, 0, false, 0);

/// Lowest possible average rating.
pub const MIN_RATING: Decimal = Decimal::ZERO;

/// Average rating plus review count.
///
/// Invariants: the average lies in [0, 5] when set, and is unset whenever
/// the review count is 0.
///
/// ```
/// use locus_discovery::types::Rating;
/// use rust_decimal::Decimal;
///
/// let rating = Rating::new(Some(Decimal::new(45, 1)), 12).unwrap();
/// assert_eq!(rating.average(), Some(Decimal::new(45, 1)));
///
/// assert!(Rating::new(Some(Decimal::new(45, 1)), 0).is_err());
/// assert!(Rating::new(None, -1).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "RawRating")]
pub struct Rating {
    average: Option<Decimal>,
    review_count: u64,
}

#[derive(Deserialize)]
struct RawRating {
    average: Option<Decimal>,
    review_count: i64,
}

impl TryFrom<RawRating> for Rating {
    type Error = ValidationError;

    fn try_from(raw: RawRating) -> Result<Self, Self::Error> {
        Rating::new(raw.average, raw.review_count)
    }
}

impl Rating {
    /// A provider with no reviews.
    pub fn unrated() -> Self {
        Self::default()
    }

    /// Validates and builds a rating.
    pub fn new(average: Option<Decimal>, review_count: i64) -> Result<Self, ValidationError> {
        if let Some(avg) = average {
            validate_rating_value("average_rating", avg)?;
        }
        if review_count < 0 {
            return Err(ValidationError::NegativeReviewCount { review_count });
        }
        if review_count == 0 && average.is_some() {
            return Err(ValidationError::RatingWithoutReviews);
        }
        Ok(Self {
            average,
            review_count: review_count as u64,
        })
    }

    /// The average rating, unset until the first review.
    pub fn average(&self) -> Option<Decimal> {
        self.average
    }

    /// Number of reviews behind the average.
    pub fn review_count(&self) -> u64 {
        self.review_count
    }

    /// Returns `true` if the average is set and at least `floor`.
    pub fn meets(&self, floor: Decimal) -> bool {
        self.average.is_some_and(|avg| avg >= floor)
    }
}

/// Checks that `value` lies in [0, 5].
pub(crate) fn validate_rating_value(
    field: &'static str,
    value: Decimal,
) -> Result<(), ValidationError> {
    if value < MIN_RATING || value > MAX_RATING {
        return Err(ValidationError::RatingOutOfRange {
            field,
            value: value.to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[test]
    fn test_bounds_inclusive() {
        assert!(Rating::new(Some(dec("0")), 1).is_ok());
        assert!(Rating::new(Some(dec("5.0")), 1).is_ok());
        assert!(matches!(
            Rating::new(Some(dec("5.01")), 3),
            Err(ValidationError::RatingOutOfRange { .. })
        ));
        assert!(matches!(
            Rating::new(Some(dec("-0.1")), 3),
            Err(ValidationError::RatingOutOfRange { .. })
        ));
    }

    #[test]
    fn test_review_count_rules() {
        assert_eq!(
            Rating::new(None, -3),
            Err(ValidationError::NegativeReviewCount { review_count: -3 })
        );
        assert_eq!(
            Rating::new(Some(dec("4")), 0),
            Err(ValidationError::RatingWithoutReviews)
        );
        let unrated = Rating::new(None, 0).unwrap();
        assert_eq!(unrated, Rating::unrated());
    }

    #[test]
    fn test_meets_floor() {
        let rating = Rating::new(Some(dec("4.5")), 10).unwrap();
        assert!(rating.meets(dec("4.0")));
        assert!(rating.meets(dec("4.5")));
        assert!(!rating.meets(dec("4.6")));
        assert!(!Rating::unrated().meets(Decimal::ZERO));
    }

    #[test]
    fn test_deserialize_validates() {
        let ok: Rating = serde_json::from_str(r#"{"average": "4.2", "review_count": 7}"#).unwrap();
        assert_eq!(ok.review_count(), 7);
        assert!(serde_json::from_str::<Rating>(r#"{"average": "4.2", "review_count": 0}"#).is_err());
    }
}
