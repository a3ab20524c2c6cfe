use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::chart::Chart;
use crate::query::TextQuery;

/// Trade-direction label attached to a bar
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Direction {
    Long,
    Short,
    #[default]
    None,
}

impl Direction {
    /// Normalize a raw label. Only the exact strings `LONG` and `SHORT` are
    /// recognized; everything else, including a missing label, is `None`.
    pub fn from_label(label: Option<&str>) -> Self {
        match label.map(str::trim) {
            Some("LONG") => Direction::Long,
            Some("SHORT") => Direction::Short,
            _ => Direction::None,
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Direction::Long => write!(f, "LONG"),
            Direction::Short => write!(f, "SHORT"),
            Direction::None => write!(f, "NONE"),
        }
    }
}

/// One trading period: OHLC prices plus analyst annotations.
///
/// Bars are immutable once loaded. Everything derived from them (bands,
/// trend values, markers) lives in separate collections keyed by position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub timestamp: NaiveDateTime,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    #[serde(rename = "supportLevels")]
    pub support_levels: Vec<f64>,
    #[serde(rename = "resistanceLevels")]
    pub resistance_levels: Vec<f64>,
    pub direction: Direction,
}

impl Bar {
    /// Raw level set for one band kind
    pub fn levels(&self, kind: BandKind) -> &[f64] {
        match kind {
            BandKind::Support => &self.support_levels,
            BandKind::Resistance => &self.resistance_levels,
        }
    }

    pub fn midpoint(&self) -> f64 {
        (self.high + self.low) / 2.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BandKind {
    Support,
    Resistance,
}

impl BandKind {
    pub const ALL: [BandKind; 2] = [BandKind::Support, BandKind::Resistance];
}

impl std::fmt::Display for BandKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BandKind::Support => write!(f, "support"),
            BandKind::Resistance => write!(f, "resistance"),
        }
    }
}

/// Collapsed [low, high] interval of one bar's level set.
/// An empty level set has no band at all (`Option<Band>::None`), so the two
/// edges are always present or absent together.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Band {
    pub low: f64,
    pub high: f64,
}

/// Rolling mean of close for one window size, aligned 1:1 with the bars it
/// was computed from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendSeries {
    pub window: usize,
    pub values: Vec<Option<f64>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MarkerCategory {
    EntryLong,
    EntryShort,
    Neutral,
}

impl MarkerCategory {
    pub fn shape(&self) -> MarkerShape {
        match self {
            MarkerCategory::EntryLong => MarkerShape::TriangleUp,
            MarkerCategory::EntryShort => MarkerShape::TriangleDown,
            MarkerCategory::Neutral => MarkerShape::Circle,
        }
    }
}

impl std::fmt::Display for MarkerCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MarkerCategory::EntryLong => write!(f, "ENTRY_LONG"),
            MarkerCategory::EntryShort => write!(f, "ENTRY_SHORT"),
            MarkerCategory::Neutral => write!(f, "NEUTRAL"),
        }
    }
}

/// Shape class handed to the renderer for a marker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MarkerShape {
    TriangleUp,
    TriangleDown,
    Circle,
}

/// Categorized event for a single bar. Every bar gets exactly one.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Marker {
    pub timestamp: NaiveDateTime,
    pub category: MarkerCategory,
    #[serde(rename = "anchorPrice")]
    pub anchor_price: f64,
}

impl Marker {
    pub fn shape(&self) -> MarkerShape {
        self.category.shape()
    }
}

/// Shared application state
pub struct AppState {
    pub chart: Chart,
    pub query: Arc<dyn TextQuery>,
}
