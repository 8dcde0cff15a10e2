//! Pagination types
//!
//! Offset/limit pagination over insertion order. Repositories order by
//! `id` ascending, so a fixed offset/limit pair always names the same
//! window of rows.

use serde::Deserialize;

use crate::validation::ValidationError;

/// Default number of items returned when no limit is given
const DEFAULT_LIMIT: i64 = 20;

/// Upper bound on a single page
const MAX_LIMIT: i64 = 100;

/// Validated pagination window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    offset: i64,
    limit: i64,
}

impl Pagination {
    /// Create a pagination window.
    ///
    /// # Errors
    ///
    /// `offset` must be >= 0 and `limit` must be > 0. Limits above the
    /// page cap are clamped rather than rejected.
    pub fn new(offset: i64, limit: i64) -> Result<Self, ValidationError> {
        if offset < 0 {
            return Err(ValidationError::OutOfRange {
                field: "offset",
                reason: "must not be negative",
            });
        }

        if limit <= 0 {
            return Err(ValidationError::OutOfRange {
                field: "limit",
                reason: "must be greater than zero",
            });
        }

        Ok(Self {
            offset,
            limit: limit.min(MAX_LIMIT),
        })
    }

    pub fn offset(&self) -> i64 {
        self.offset
    }

    pub fn limit(&self) -> i64 {
        self.limit
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            offset: 0,
            limit: DEFAULT_LIMIT,
        }
    }
}

/// Query parameters for pagination
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PaginationParams {
    pub offset: Option<i64>,
    pub limit: Option<i64>,
}

impl TryFrom<PaginationParams> for Pagination {
    type Error = ValidationError;

    fn try_from(params: PaginationParams) -> Result<Self, Self::Error> {
        Pagination::new(
            params.offset.unwrap_or(0),
            params.limit.unwrap_or(DEFAULT_LIMIT),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_valid_window() {
        let p = Pagination::new(1, 2).unwrap();
        assert_eq!(p.offset(), 1);
        assert_eq!(p.limit(), 2);
    }

    #[test]
    fn rejects_negative_offset() {
        let err = Pagination::new(-1, 10).unwrap_err();
        assert!(matches!(err, ValidationError::OutOfRange { field: "offset", .. }));
    }

    #[test]
    fn rejects_zero_or_negative_limit() {
        assert!(Pagination::new(0, 0).is_err());
        assert!(Pagination::new(0, -5).is_err());
    }

    #[test]
    fn clamps_oversized_limit() {
        let p = Pagination::new(0, 999).unwrap();
        assert_eq!(p.limit(), 100);
    }

    #[test]
    fn params_fall_back_to_defaults() {
        let p = Pagination::try_from(PaginationParams::default()).unwrap();
        assert_eq!(p.offset(), 0);
        assert_eq!(p.limit(), 20);
    }

    #[test]
    fn params_propagate_validation_errors() {
        let params = PaginationParams {
            offset: Some(-3),
            limit: None,
        };
        assert!(Pagination::try_from(params).is_err());
    }
}
