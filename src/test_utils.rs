//! Test bar builders shared by the unit tests

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};

use crate::types::{Bar, Direction};

/// Midnight of 2024-01-01 plus `day` days
pub fn day(day: i64) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 1, 1)
        .unwrap()
        .and_time(NaiveTime::MIN)
        + Duration::days(day)
}

pub fn date(day_offset: i64) -> NaiveDate {
    day(day_offset).date()
}

/// Daily bar with no levels and no direction
pub fn create_test_bar(day_offset: i64, low: f64, high: f64, close: f64) -> Bar {
    Bar {
        timestamp: day(day_offset),
        open: close,
        high,
        low,
        close,
        support_levels: Vec::new(),
        resistance_levels: Vec::new(),
        direction: Direction::None,
    }
}

/// Consecutive daily bars with the given closes, range ±1 around each close
pub fn create_close_series(closes: &[f64]) -> Vec<Bar> {
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| create_test_bar(i as i64, close - 1.0, close + 1.0, close))
        .collect()
}
