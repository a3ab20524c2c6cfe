//! Date-range filtering of the chronological bar sequence

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use std::ops::Range;

use crate::types::Bar;

/// Inclusive date bounds. Each bound is taken at midnight, so `end` admits
/// bars stamped exactly at the start of that day.
///
/// `start > end` is allowed and selects nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    /// Range from the first to the last bar's date; `None` for no bars.
    /// Expects `bars` in chronological order.
    pub fn covering(bars: &[Bar]) -> Option<Self> {
        let first = bars.first()?;
        let last = bars.last()?;
        Some(Self::new(first.timestamp.date(), last.timestamp.date()))
    }

    fn lower_bound(&self) -> NaiveDateTime {
        self.start.and_time(NaiveTime::MIN)
    }

    fn upper_bound(&self) -> NaiveDateTime {
        self.end.and_time(NaiveTime::MIN)
    }

    pub fn contains(&self, timestamp: NaiveDateTime) -> bool {
        self.lower_bound() <= timestamp && timestamp <= self.upper_bound()
    }
}

impl std::fmt::Display for DateRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}..={}", self.start, self.end)
    }
}

/// Positions of the bars inside `range`.
///
/// Bars are sorted, so the selection is always one contiguous run and can be
/// found by binary search.
pub fn slice_bounds(bars: &[Bar], range: &DateRange) -> Range<usize> {
    let lower = range.lower_bound();
    let upper = range.upper_bound();

    let start = bars.partition_point(|b| b.timestamp < lower);
    let end = bars.partition_point(|b| b.timestamp <= upper);

    start..end.max(start)
}

/// Bars inside `range`, in their original order
pub fn filter<'a>(bars: &'a [Bar], range: &DateRange) -> &'a [Bar] {
    &bars[slice_bounds(bars, range)]
}
