//! Calendar-day windows.
//!
//! Task windows are inclusive on both ends: a task planned for Jan 1–Jan 5
//! occupies five days, and two tasks that share a single day overlap.
//!
//! # Filtering
//! A [`DateRange`] with open ends restricts scans to work that touches the
//! range. Work entirely before `start` or entirely after `end` is excluded.

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

/// An inclusive day interval [start, end].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateWindow {
    /// First day (inclusive).
    pub start: NaiveDate,
    /// Last day (inclusive).
    pub end: NaiveDate,
}

impl DateWindow {
    /// Creates a window; swapped bounds are reordered.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        if end < start {
            Self {
                start: end,
                end: start,
            }
        } else {
            Self { start, end }
        }
    }

    /// Number of days covered.
    #[inline]
    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }

    #[inline]
    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }

    /// Whether two windows share at least one day.
    pub fn overlaps(&self, other: &Self) -> bool {
        self.start <= other.end && other.start <= self.end
    }

    /// Shared days of two windows: `max(starts)..=min(ends)`.
    pub fn intersection(&self, other: &Self) -> Option<Self> {
        if !self.overlaps(other) {
            return None;
        }
        Some(Self {
            start: self.start.max(other.start),
            end: self.end.min(other.end),
        })
    }

    /// Iterates every calendar day in the window.
    pub fn iter_days(&self) -> impl Iterator<Item = NaiveDate> {
        let end = self.end;
        self.start.iter_days().take_while(move |day| *day <= end)
    }
}

/// Moves a date by a signed number of days; `None` past chrono's range.
pub(crate) fn add_days(date: NaiveDate, days: i64) -> Option<NaiveDate> {
    date.checked_add_signed(Duration::try_days(days)?)
}

/// Optional bounds on a scan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl DateRange {
    /// Unbounded range.
    pub fn all() -> Self {
        Self::default()
    }

    pub fn new(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
        Self { start, end }
    }

    /// Whether a window touches the range.
    pub fn admits(&self, window: &DateWindow) -> bool {
        self.admits_bounds(Some(window.start), Some(window.end))
    }

    /// Like [`admits`](Self::admits) for partially dated records.
    ///
    /// A missing bound on the record is treated as open-ended.
    pub fn admits_bounds(&self, start: Option<NaiveDate>, end: Option<NaiveDate>) -> bool {
        if let (Some(range_start), Some(end)) = (self.start, end) {
            if end < range_start {
                return false;
            }
        }
        if let (Some(range_end), Some(start)) = (self.end, start) {
            if start > range_end {
                return false;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn jan(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, d).unwrap()
    }

    #[test]
    fn test_window_basics() {
        let w = DateWindow::new(jan(1), jan(5));
        assert_eq!(w.days(), 5);
        assert!(w.contains(jan(1)));
        assert!(w.contains(jan(5)));
        assert!(!w.contains(jan(6)));
    }

    #[test]
    fn test_add_days_bounds() {
        assert_eq!(add_days(jan(1), 4), Some(jan(5)));
        assert_eq!(add_days(jan(5), -4), Some(jan(1)));
        assert_eq!(add_days(jan(1), 200_000_000), None);
        assert_eq!(add_days(jan(1), i64::MAX), None);
        assert_eq!(add_days(NaiveDate::MAX, 1), None);
    }

    #[test]
    fn test_swapped_bounds() {
        let w = DateWindow::new(jan(9), jan(2));
        assert_eq!(w.start, jan(2));
        assert_eq!(w.end, jan(9));
    }

    #[test]
    fn test_inclusive_overlap() {
        let a = DateWindow::new(jan(1), jan(5));
        let b = DateWindow::new(jan(5), jan(8));
        let c = DateWindow::new(jan(6), jan(8));
        assert!(a.overlaps(&b));
        assert!(!a.overlaps(&c));
        assert_eq!(a.intersection(&b), Some(DateWindow::new(jan(5), jan(5))));
        assert_eq!(a.intersection(&c), None);
    }

    #[test]
    fn test_iter_days() {
        let days: Vec<_> = DateWindow::new(jan(30), NaiveDate::from_ymd_opt(2025, 2, 2).unwrap())
            .iter_days()
            .collect();
        assert_eq!(days.len(), 4);
        assert_eq!(days[0], jan(30));
        assert_eq!(days[3], NaiveDate::from_ymd_opt(2025, 2, 2).unwrap());
    }

    #[test]
    fn test_range_admits() {
        let range = DateRange::new(Some(jan(10)), Some(jan(20)));
        assert!(range.admits(&DateWindow::new(jan(5), jan(10))));
        assert!(range.admits(&DateWindow::new(jan(20), jan(25))));
        assert!(!range.admits(&DateWindow::new(jan(1), jan(9))));
        assert!(!range.admits(&DateWindow::new(jan(21), jan(22))));
        assert!(DateRange::all().admits(&DateWindow::new(jan(1), jan(2))));
    }

    #[test]
    fn test_range_open_record_bounds() {
        let range = DateRange::new(Some(jan(10)), None);
        assert!(range.admits_bounds(None, None));
        assert!(range.admits_bounds(Some(jan(1)), None));
        assert!(!range.admits_bounds(None, Some(jan(9))));
    }
}
