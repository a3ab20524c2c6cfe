//! Simple moving averages over close.
//!
//! Trend values are computed on the full, unfiltered series so the first
//! bars of a narrowed date range still carry history from outside it.

use anyhow::{ensure, Result};

use crate::types::{Bar, TrendSeries};

/// Short trend window (bars)
pub const SHORT_WINDOW: usize = 20;

/// Long trend window (bars)
pub const LONG_WINDOW: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrendSmoother {
    window: usize,
}

impl TrendSmoother {
    pub fn new(window: usize) -> Result<Self> {
        ensure!(window > 0, "trend window must be at least one bar");
        Ok(Self { window })
    }

    pub fn window(&self) -> usize {
        self.window
    }

    /// Rolling mean of close ending at each bar
    pub fn smooth(&self, bars: &[Bar]) -> TrendSeries {
        let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
        TrendSeries {
            window: self.window,
            values: rolling_mean(&closes, self.window),
        }
    }
}

/// Trailing arithmetic mean over `window` values.
///
/// The first `window - 1` positions are `None`. NaN inputs are not skipped:
/// every window containing one yields NaN.
pub fn rolling_mean(values: &[f64], window: usize) -> Vec<Option<f64>> {
    if window == 0 {
        return vec![None; values.len()];
    }

    (0..values.len())
        .map(|i| {
            if i + 1 < window {
                return None;
            }
            let trailing = &values[i + 1 - window..=i];
            Some(trailing.iter().sum::<f64>() / window as f64)
        })
        .collect()
}
