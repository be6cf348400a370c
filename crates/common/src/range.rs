use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::ValidationError;

/// Inclusive calendar date interval `[start, end]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "RawDateRange")]
pub struct DateRange {
    start_date: NaiveDate,
    end_date: NaiveDate,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawDateRange {
    start_date: NaiveDate,
    end_date: NaiveDate,
}

impl TryFrom<RawDateRange> for DateRange {
    type Error = ValidationError;

    fn try_from(raw: RawDateRange) -> Result<Self, Self::Error> {
        DateRange::new(raw.start_date, raw.end_date)
    }
}

impl DateRange {
    /// Creates a range, rejecting `start > end`.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, ValidationError> {
        if start > end {
            return Err(ValidationError::InvertedDateRange { start, end });
        }
        Ok(Self {
            start_date: start,
            end_date: end,
        })
    }

    pub fn start(&self) -> NaiveDate {
        self.start_date
    }

    pub fn end(&self) -> NaiveDate {
        self.end_date
    }

    /// Closed-interval overlap: both ends count, so a range ending on day D
    /// overlaps one starting on day D.
    pub fn overlaps(&self, other: &DateRange) -> bool {
        self.start_date <= other.end_date && self.end_date >= other.start_date
    }
}

impl std::fmt::Display for DateRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}, {}]", self.start_date, self.end_date)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, d).unwrap()
    }

    fn range(start: u32, end: u32) -> DateRange {
        DateRange::new(day(start), day(end)).unwrap()
    }

    #[test]
    fn test_rejects_inverted_range() {
        let err = DateRange::new(day(5), day(4)).unwrap_err();
        assert_eq!(
            err,
            ValidationError::InvertedDateRange {
                start: day(5),
                end: day(4)
            }
        );
    }

    #[test]
    fn test_single_day_range_is_valid() {
        let r = range(7, 7);
        assert_eq!(r.start(), r.end());
        assert!(r.overlaps(&range(7, 7)));
    }

    #[test]
    fn test_overlap_exact_match() {
        assert!(range(10, 12).overlaps(&range(10, 12)));
    }

    #[test]
    fn test_overlap_partial() {
        assert!(range(10, 12).overlaps(&range(11, 15)));
        assert!(range(11, 15).overlaps(&range(10, 12)));
    }

    #[test]
    fn test_overlap_containment() {
        assert!(range(10, 20).overlaps(&range(12, 13)));
        assert!(range(12, 13).overlaps(&range(10, 20)));
    }

    #[test]
    fn test_shared_boundary_day_overlaps() {
        assert!(range(10, 12).overlaps(&range(12, 14)));
        assert!(range(12, 14).overlaps(&range(10, 12)));
    }

    #[test]
    fn test_disjoint_ranges_do_not_overlap() {
        assert!(!range(10, 12).overlaps(&range(13, 14)));
        assert!(!range(13, 14).overlaps(&range(10, 12)));
    }

    #[test]
    fn test_deserialize_validates_order() {
        let ok: DateRange =
            serde_json::from_str(r#"{"startDate":"2026-03-01","endDate":"2026-03-02"}"#).unwrap();
        assert_eq!(ok, range(1, 2));

        let bad = serde_json::from_str::<DateRange>(
            r#"{"startDate":"2026-03-05","endDate":"2026-03-02"}"#,
        );
        assert!(bad.is_err());
    }
}
