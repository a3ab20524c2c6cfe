use anyhow::Result;
use chrono::NaiveDate;
use serde::Serialize;
use tracing::debug;

use crate::config::DashboardConfig;
use crate::markers::MarkerClassifier;
use crate::overlay::{assemble, band_count, DerivedSeries, Layer};
use crate::range::{slice_bounds, DateRange};
use crate::trend::TrendSmoother;
use crate::types::{BandKind, Bar, MarkerCategory};

/// Immutable bar series plus the settings needed to derive overlays from it.
///
/// Nothing is cached: every call recomputes from the bars.
pub struct Chart {
    bars: Vec<Bar>,
    smoothers: Vec<TrendSmoother>,
    classifier: MarkerClassifier,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChartOverlays {
    pub start: NaiveDate,
    pub end: NaiveDate,
    #[serde(rename = "visibleBars")]
    pub visible_bars: usize,
    pub layers: Vec<Layer>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ChartSummary {
    #[serde(rename = "visibleBars")]
    pub visible_bars: usize,
    #[serde(rename = "longEntries")]
    pub long_entries: usize,
    #[serde(rename = "shortEntries")]
    pub short_entries: usize,
    pub neutral: usize,
    #[serde(rename = "supportBands")]
    pub support_bands: usize,
    #[serde(rename = "resistanceBands")]
    pub resistance_bands: usize,
}

impl Chart {
    pub fn new(mut bars: Vec<Bar>, config: &DashboardConfig) -> Result<Self> {
        config.validate()?;

        // Range slicing relies on chronological order
        bars.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));

        let smoothers = config
            .trend_windows()
            .into_iter()
            .map(TrendSmoother::new)
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            bars,
            smoothers,
            classifier: MarkerClassifier::new(config.marker_offset),
        })
    }

    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    /// Default date selector bounds: the first and last date in the data
    pub fn default_range(&self) -> Option<DateRange> {
        DateRange::covering(&self.bars)
    }

    /// Fill missing bounds from the dataset. `None` only when a bound is
    /// missing and there are no bars to take it from.
    pub fn resolve_range(&self, start: Option<NaiveDate>, end: Option<NaiveDate>) -> Option<DateRange> {
        match (start, end) {
            (Some(start), Some(end)) => Some(DateRange::new(start, end)),
            _ => {
                let default = self.default_range()?;
                Some(DateRange::new(
                    start.unwrap_or(default.start),
                    end.unwrap_or(default.end),
                ))
            }
        }
    }

    fn derive(&self) -> DerivedSeries {
        DerivedSeries::compute(&self.bars, &self.smoothers, &self.classifier)
    }

    /// Recompute every overlay over the full series and return the layers
    /// for the bars inside `range`
    pub fn overlays(&self, range: &DateRange) -> ChartOverlays {
        let derived = self.derive();
        let positions = slice_bounds(&self.bars, range);

        debug!(
            "Computing overlays for {}: {} of {} bars visible",
            range,
            positions.len(),
            self.bars.len()
        );

        let layers = assemble(&self.bars[positions.clone()], &derived.slice(positions.clone()));

        ChartOverlays {
            start: range.start,
            end: range.end,
            visible_bars: positions.len(),
            layers,
        }
    }

    pub fn summary(&self, range: &DateRange) -> ChartSummary {
        let derived = self.derive();
        let positions = slice_bounds(&self.bars, range);

        let mut summary = ChartSummary {
            visible_bars: positions.len(),
            support_bands: band_count(&derived, BandKind::Support, positions.clone()),
            resistance_bands: band_count(&derived, BandKind::Resistance, positions.clone()),
            ..Default::default()
        };

        for marker in &derived.markers[positions] {
            match marker.category {
                MarkerCategory::EntryLong => summary.long_entries += 1,
                MarkerCategory::EntryShort => summary.short_entries += 1,
                MarkerCategory::Neutral => summary.neutral += 1,
            }
        }

        summary
    }
}
