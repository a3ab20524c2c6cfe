//! Support/resistance band collapsing
//!
//! Each bar's analyst levels reduce to a single [min, max] interval. Bands
//! are strictly per-bar: no interpolation across bars, so a bar without
//! levels leaves a gap in the rendered fill.

use crate::types::{Band, BandKind, Bar};

/// Collapse a level set into its [min, max] interval, `None` when empty
pub fn collapse(levels: &[f64]) -> Option<Band> {
    let (&first, rest) = levels.split_first()?;
    let (low, high) = rest
        .iter()
        .fold((first, first), |(low, high), &level| (low.min(level), high.max(level)));
    Some(Band { low, high })
}

pub fn collapse_bar(bar: &Bar, kind: BandKind) -> Option<Band> {
    collapse(bar.levels(kind))
}

/// Collapse every bar, aligned 1:1 with `bars`
pub fn collapse_series(bars: &[Bar], kind: BandKind) -> Vec<Option<Band>> {
    bars.iter().map(|bar| collapse_bar(bar, kind)).collect()
}
