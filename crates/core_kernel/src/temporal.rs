//! Calendar-day ranges
//!
//! Billing cycles and due dates are calendar days, not instants. This module
//! provides an inclusive `[start, end]` day range used by due-date reporting
//! and calendar views.

use chrono::{Datelike, Months, NaiveDate};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors related to temporal operations
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TemporalError {
    #[error("Invalid period: start {start} must not be after end {end}")]
    InvalidPeriod {
        start: String,
        end: String,
    },

    #[error("Invalid calendar month: {year}-{month}")]
    InvalidMonth {
        year: i32,
        month: u32,
    },
}

/// An inclusive range of calendar days
///
/// Both bounds are part of the range, so `DateRange::single_day(d)` contains
/// exactly `d`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    /// Creates a new inclusive range
    ///
    /// # Errors
    ///
    /// Returns `TemporalError::InvalidPeriod` if `start` is after `end`
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, TemporalError> {
        if start > end {
            return Err(TemporalError::InvalidPeriod {
                start: start.to_string(),
                end: end.to_string(),
            });
        }
        Ok(Self { start, end })
    }

    /// A range covering a single day
    pub fn single_day(day: NaiveDate) -> Self {
        Self { start: day, end: day }
    }

    /// The full calendar month containing the given year/month
    ///
    /// # Example
    ///
    /// ```rust
    /// use core_kernel::DateRange;
    ///
    /// let february = DateRange::month(2024, 2).unwrap();
    /// assert_eq!(february.len_days(), 29);
    /// ```
    pub fn month(year: i32, month: u32) -> Result<Self, TemporalError> {
        let start = NaiveDate::from_ymd_opt(year, month, 1)
            .ok_or(TemporalError::InvalidMonth { year, month })?;
        let end = start
            .checked_add_months(Months::new(1))
            .and_then(|next| next.pred_opt())
            .ok_or(TemporalError::InvalidMonth { year, month })?;
        Ok(Self { start, end })
    }

    /// Returns true if the day falls within the range, bounds included
    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }

    /// Number of days in the range, counting both bounds
    pub fn len_days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }

    /// Iterates over every day in the range in ascending order
    pub fn iter_days(&self) -> impl Iterator<Item = NaiveDate> {
        let end = self.end;
        self.start.iter_days().take_while(move |d| *d <= end)
    }

    /// Returns true if the range lies within a single calendar month
    pub fn is_single_month(&self) -> bool {
        self.start.year() == self.end.year() && self.start.month() == self.end.month()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_range_is_inclusive() {
        let range = DateRange::new(day(2024, 3, 1), day(2024, 3, 10)).unwrap();
        assert!(range.contains(day(2024, 3, 1)));
        assert!(range.contains(day(2024, 3, 10)));
        assert!(!range.contains(day(2024, 3, 11)));
        assert_eq!(range.len_days(), 10);
    }

    #[test]
    fn test_reversed_range_is_rejected() {
        let result = DateRange::new(day(2024, 3, 10), day(2024, 3, 1));
        assert!(matches!(result, Err(TemporalError::InvalidPeriod { .. })));
    }

    #[test]
    fn test_month_range() {
        let december = DateRange::month(2024, 12).unwrap();
        assert_eq!(december.start, day(2024, 12, 1));
        assert_eq!(december.end, day(2024, 12, 31));
        assert!(december.is_single_month());
        assert!(DateRange::month(2024, 13).is_err());
    }

    #[test]
    fn test_iter_days() {
        let range = DateRange::new(day(2024, 2, 27), day(2024, 3, 1)).unwrap();
        let days: Vec<_> = range.iter_days().collect();
        assert_eq!(days, vec![day(2024, 2, 27), day(2024, 2, 28), day(2024, 2, 29), day(2024, 3, 1)]);
    }
}
