//! Valid birth year range.
//!
//! Every place accepting a birth year (entity validation, request field and
//! object checks, database check constraint) goes through [`BirthYearRange`].

use serde::{Deserialize, Serialize};
use validator::ValidationError;

use crate::i18n::{Locale, Message};

/// Message reported whenever a birth year is rejected.
pub const BIRTH_YEAR_ERROR_MSG: Message = Message::BirthYearOutOfRange;

pub const DEFAULT_BIRTH_YEAR_MIN: i32 = 1900;
pub const DEFAULT_BIRTH_YEAR_MAX: i32 = 2010;

/// Configured `BIRTH_YEAR_MIN` and `BIRTH_YEAR_MAX` bounds.
///
/// Both bounds are exclusive: `min < year < max`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BirthYearRange {
    pub min: i32,
    pub max: i32,
}

impl Default for BirthYearRange {
    fn default() -> Self {
        Self {
            min: DEFAULT_BIRTH_YEAR_MIN,
            max: DEFAULT_BIRTH_YEAR_MAX,
        }
    }
}

impl BirthYearRange {
    /// Create a new [`BirthYearRange`].
    pub fn new(min: i32, max: i32) -> Self {
        Self { min, max }
    }

    /// Whether `year` lies strictly between both bounds.
    #[inline]
    pub fn contains(&self, year: i32) -> bool {
        self.min < year && year < self.max
    }

    /// Check `year`, returning the localized birth year error.
    pub fn check(&self, year: i32, locale: Locale) -> Result<(), ValidationError> {
        if self.contains(year) {
            Ok(())
        } else {
            let mut err = BIRTH_YEAR_ERROR_MSG.to_error(locale);
            err.add_param("min".into(), &self.min);
            err.add_param("max".into(), &self.max);
            err.add_param("value".into(), &year);
            Err(err)
        }
    }

    /// Validators attached to the `birth_year` column.
    ///
    /// These are INCLUSIVE (`min <= year <= max`) while [`Self::contains`]
    /// is exclusive. Both run on `full_clean`, so the exclusive rule wins.
    pub fn field_validators(&self) -> [FieldBound; 2] {
        [FieldBound::Min(self.min), FieldBound::Max(self.max)]
    }

    /// SQL predicate mirrored by the `check_birth_year_range` constraint.
    pub fn sql_predicate(&self, column: &str) -> String {
        format!("{column} > {} AND {column} < {}", self.min, self.max)
    }
}

/// Inclusive bound validator attached to an integer column.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FieldBound {
    Min(i32),
    Max(i32),
}

impl FieldBound {
    /// Bound value.
    pub fn limit_value(&self) -> i32 {
        match self {
            FieldBound::Min(limit) | FieldBound::Max(limit) => *limit,
        }
    }

    /// Inclusive check of `value`.
    pub fn check(&self, value: i32) -> Result<(), ValidationError> {
        let (valid, code, message) = match self {
            FieldBound::Min(limit) => (
                value >= *limit,
                "min_value",
                format!("Ensure this value is greater than or equal to {limit}."),
            ),
            FieldBound::Max(limit) => (
                value <= *limit,
                "max_value",
                format!("Ensure this value is less than or equal to {limit}."),
            ),
        };

        if valid {
            Ok(())
        } else {
            Err(ValidationError::new(code).with_message(message.into()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exclusive_bounds() {
        let range = BirthYearRange::new(1900, 2010);

        assert!(range.contains(1955));
        assert!(range.contains(1901));
        assert!(range.contains(2009));

        for year in [1899, 1900, 2010, 2011, i32::MIN, i32::MAX] {
            assert!(!range.contains(year), "{year} must be rejected");
        }
    }

    #[test]
    fn test_check_carries_message() {
        let range = BirthYearRange::new(1900, 2010);
        assert!(range.check(1955, Locale::English).is_ok());

        let err = range.check(2010, Locale::English).unwrap_err();
        assert_eq!(err.code, BIRTH_YEAR_ERROR_MSG.code());
        assert_eq!(
            err.message,
            Some(BIRTH_YEAR_ERROR_MSG.translate(Locale::English))
        );
    }

    #[test]
    fn test_field_validators_are_inclusive() {
        let range = BirthYearRange::new(1900, 2010);
        let [min, max] = range.field_validators();

        assert_eq!(min.limit_value(), 1900);
        assert_eq!(max.limit_value(), 2010);

        // Boundaries pass the attached validators but not the range rule.
        assert!(min.check(1900).is_ok());
        assert!(max.check(2010).is_ok());
        assert!(!range.contains(1900));
        assert!(!range.contains(2010));

        assert!(min.check(1899).is_err());
        assert!(max.check(2011).is_err());
    }

    #[test]
    fn test_sql_predicate() {
        let range = BirthYearRange::new(1900, 2010);
        assert_eq!(
            range.sql_predicate("birth_year"),
            "birth_year > 1900 AND birth_year < 2010"
        );
    }
}
