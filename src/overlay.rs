//! Overlay assembly
//!
//! Derived collections are computed over the full bar sequence, sliced to
//! the visible positions, and composed here into the ordered layer list the
//! renderer draws bottom to top:
//!
//! 1. candlesticks
//! 2. support band lower edge (hidden), upper edge (filled to previous)
//! 3. resistance band lower edge (hidden), upper edge (filled to previous)
//! 4. one line per trend window, shortest first
//! 5. one marker layer per bar, chronological

use chrono::NaiveDateTime;
use serde::{Serialize, Serializer};
use std::ops::Range;

use crate::bands::collapse_series;
use crate::markers::MarkerClassifier;
use crate::trend::TrendSmoother;
use crate::types::{Band, BandKind, Bar, Marker, MarkerCategory, MarkerShape, TrendSeries};

/// Semantic role of a layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LayerRole {
    Candlestick,
    Band(BandKind),
    Trend(usize),
    Marker,
}

impl std::fmt::Display for LayerRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LayerRole::Candlestick => write!(f, "candlestick"),
            LayerRole::Band(kind) => write!(f, "band-{}", kind),
            LayerRole::Trend(window) => write!(f, "trend-{}", window),
            LayerRole::Marker => write!(f, "marker"),
        }
    }
}

impl Serialize for LayerRole {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BandEdge {
    Lower,
    Upper,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Fill {
    None,
    ToPrevious,
}

/// Numeric payload of a layer. `None` entries are gaps for the renderer.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum LayerData {
    Candles {
        open: Vec<f64>,
        high: Vec<f64>,
        low: Vec<f64>,
        close: Vec<f64>,
    },
    Band {
        edge: BandEdge,
        fill: Fill,
        hidden: bool,
        y: Vec<Option<f64>>,
    },
    Line {
        y: Vec<Option<f64>>,
    },
    Point {
        y: f64,
        category: MarkerCategory,
        shape: MarkerShape,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Layer {
    pub role: LayerRole,
    /// Legend label; unnamed layers stay out of the legend
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub x: Vec<NaiveDateTime>,
    #[serde(flatten)]
    pub data: LayerData,
}

/// Per-bar derived collections over the full bar sequence
#[derive(Debug, Clone, PartialEq)]
pub struct DerivedSeries {
    pub support: Vec<Option<Band>>,
    pub resistance: Vec<Option<Band>>,
    pub trends: Vec<TrendSeries>,
    pub markers: Vec<Marker>,
}

/// Borrowed window of a [`DerivedSeries`], aligned with a bar slice
#[derive(Debug, Clone, PartialEq)]
pub struct DerivedView<'a> {
    pub support: &'a [Option<Band>],
    pub resistance: &'a [Option<Band>],
    pub trends: Vec<(usize, &'a [Option<f64>])>,
    pub markers: &'a [Marker],
}

impl DerivedSeries {
    pub fn compute(bars: &[Bar], smoothers: &[TrendSmoother], classifier: &MarkerClassifier) -> Self {
        Self {
            support: collapse_series(bars, BandKind::Support),
            resistance: collapse_series(bars, BandKind::Resistance),
            trends: smoothers.iter().map(|s| s.smooth(bars)).collect(),
            markers: classifier.classify_series(bars),
        }
    }

    pub fn slice(&self, positions: Range<usize>) -> DerivedView<'_> {
        DerivedView {
            support: &self.support[positions.clone()],
            resistance: &self.resistance[positions.clone()],
            trends: self
                .trends
                .iter()
                .map(|t| (t.window, &t.values[positions.clone()]))
                .collect(),
            markers: &self.markers[positions],
        }
    }

    fn bands(&self, kind: BandKind) -> &[Option<Band>] {
        match kind {
            BandKind::Support => &self.support,
            BandKind::Resistance => &self.resistance,
        }
    }
}

impl DerivedView<'_> {
    fn bands(&self, kind: BandKind) -> &[Option<Band>] {
        match kind {
            BandKind::Support => self.support,
            BandKind::Resistance => self.resistance,
        }
    }
}

fn band_name(kind: BandKind) -> &'static str {
    match kind {
        BandKind::Support => "Support Band",
        BandKind::Resistance => "Resistance Band",
    }
}

fn band_layers(kind: BandKind, x: &[NaiveDateTime], bands: &[Option<Band>]) -> [Layer; 2] {
    let lower = Layer {
        role: LayerRole::Band(kind),
        name: None,
        x: x.to_vec(),
        data: LayerData::Band {
            edge: BandEdge::Lower,
            fill: Fill::None,
            hidden: true,
            y: bands.iter().map(|b| b.map(|b| b.low)).collect(),
        },
    };
    let upper = Layer {
        role: LayerRole::Band(kind),
        name: Some(band_name(kind).to_string()),
        x: x.to_vec(),
        data: LayerData::Band {
            edge: BandEdge::Upper,
            fill: Fill::ToPrevious,
            hidden: false,
            y: bands.iter().map(|b| b.map(|b| b.high)).collect(),
        },
    };
    [lower, upper]
}

/// Compose the visible bars and their derived values into renderable
/// layers. No numeric work happens here.
pub fn assemble(bars: &[Bar], view: &DerivedView<'_>) -> Vec<Layer> {
    debug_assert_eq!(bars.len(), view.markers.len());
    debug_assert_eq!(bars.len(), view.support.len());
    debug_assert_eq!(bars.len(), view.resistance.len());

    let x: Vec<NaiveDateTime> = bars.iter().map(|b| b.timestamp).collect();
    let mut layers = Vec::with_capacity(1 + 2 * BandKind::ALL.len() + view.trends.len() + bars.len());

    layers.push(Layer {
        role: LayerRole::Candlestick,
        name: Some("Candlesticks".to_string()),
        x: x.clone(),
        data: LayerData::Candles {
            open: bars.iter().map(|b| b.open).collect(),
            high: bars.iter().map(|b| b.high).collect(),
            low: bars.iter().map(|b| b.low).collect(),
            close: bars.iter().map(|b| b.close).collect(),
        },
    });

    for kind in BandKind::ALL {
        layers.extend(band_layers(kind, &x, view.bands(kind)));
    }

    for (window, values) in &view.trends {
        debug_assert_eq!(bars.len(), values.len());
        layers.push(Layer {
            role: LayerRole::Trend(*window),
            name: Some(format!("{} MA", window)),
            x: x.clone(),
            data: LayerData::Line { y: values.to_vec() },
        });
    }

    layers.extend(view.markers.iter().map(|marker| Layer {
        role: LayerRole::Marker,
        name: None,
        x: vec![marker.timestamp],
        data: LayerData::Point {
            y: marker.anchor_price,
            category: marker.category,
            shape: marker.shape(),
        },
    }));

    layers
}

/// Count of bars with a band of `kind` inside `positions`
pub fn band_count(derived: &DerivedSeries, kind: BandKind, positions: Range<usize>) -> usize {
    derived.bands(kind)[positions].iter().filter(|b| b.is_some()).count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::range::{slice_bounds, DateRange};
    use crate::test_utils::{create_close_series, date};
    use crate::trend::{LONG_WINDOW, SHORT_WINDOW};
    use crate::types::Direction;

    fn smoothers() -> Vec<TrendSmoother> {
        vec![
            TrendSmoother::new(SHORT_WINDOW).unwrap(),
            TrendSmoother::new(LONG_WINDOW).unwrap(),
        ]
    }

    fn annotated_bars(count: usize) -> Vec<Bar> {
        let closes: Vec<f64> = (0..count).map(|i| 100.0 + i as f64).collect();
        let mut bars = create_close_series(&closes);
        bars[0].support_levels = vec![95.0, 97.0];
        bars[1].resistance_levels = vec![110.0];
        bars[1].direction = Direction::Long;
        bars[2].direction = Direction::Short;
        bars
    }

    #[test]
    fn test_layer_order() {
        let bars = annotated_bars(3);
        let derived = DerivedSeries::compute(&bars, &smoothers(), &MarkerClassifier::default());
        let layers = assemble(&bars, &derived.slice(0..bars.len()));

        let roles: Vec<String> = layers.iter().map(|l| l.role.to_string()).collect();
        assert_eq!(
            roles,
            vec![
                "candlestick",
                "band-support",
                "band-support",
                "band-resistance",
                "band-resistance",
                "trend-20",
                "trend-50",
                "marker",
                "marker",
                "marker",
            ]
        );

        match &layers[1].data {
            LayerData::Band { edge, hidden, fill, y } => {
                assert_eq!(*edge, BandEdge::Lower);
                assert!(*hidden);
                assert_eq!(*fill, Fill::None);
                assert_eq!(y, &vec![Some(95.0), None, None]);
            }
            other => panic!("unexpected layer data {:?}", other),
        }
        match &layers[4].data {
            LayerData::Band { edge, fill, y, .. } => {
                assert_eq!(*edge, BandEdge::Upper);
                assert_eq!(*fill, Fill::ToPrevious);
                assert_eq!(y, &vec![None, Some(110.0), None]);
            }
            other => panic!("unexpected layer data {:?}", other),
        }
        assert_eq!(layers[4].name.as_deref(), Some("Resistance Band"));
        assert_eq!(layers[3].name, None);
    }

    #[test]
    fn test_markers_follow_bars() {
        let bars = annotated_bars(3);
        let derived = DerivedSeries::compute(&bars, &smoothers(), &MarkerClassifier::default());
        let layers = assemble(&bars, &derived.slice(0..3));

        let markers: Vec<&Layer> = layers.iter().filter(|l| l.role == LayerRole::Marker).collect();
        assert_eq!(markers.len(), 3);
        for (layer, bar) in markers.iter().zip(&bars) {
            assert_eq!(layer.x, vec![bar.timestamp]);
        }
        match &markers[1].data {
            LayerData::Point { y, category, shape } => {
                assert_eq!(*category, MarkerCategory::EntryLong);
                assert_eq!(*shape, MarkerShape::TriangleUp);
                assert_eq!(*y, bars[1].low - 2.0);
            }
            other => panic!("unexpected layer data {:?}", other),
        }
    }

    #[test]
    fn test_slice_keeps_history_for_trends() {
        let bars = create_close_series(&[10.0; 25]);
        let derived = DerivedSeries::compute(&bars, &smoothers(), &MarkerClassifier::default());

        let positions = slice_bounds(&bars, &DateRange::new(date(19), date(24)));
        let view = derived.slice(positions.clone());
        let layers = assemble(&bars[positions], &view);

        let trend_20 = layers.iter().find(|l| l.role == LayerRole::Trend(20)).unwrap();
        match &trend_20.data {
            LayerData::Line { y } => assert_eq!(y, &vec![Some(10.0); 6]),
            other => panic!("unexpected layer data {:?}", other),
        }
    }

    #[test]
    fn test_empty_view() {
        let bars = annotated_bars(3);
        let derived = DerivedSeries::compute(&bars, &smoothers(), &MarkerClassifier::default());
        let layers = assemble(&bars[0..0], &derived.slice(0..0));

        assert_eq!(layers.len(), 7);
        assert!(layers.iter().all(|l| l.x.is_empty()));
        assert!(layers.iter().all(|l| l.role != LayerRole::Marker));
    }

    #[test]
    fn test_layer_serialization() {
        let bars = annotated_bars(3);
        let derived = DerivedSeries::compute(&bars, &smoothers(), &MarkerClassifier::default());
        let layers = assemble(&bars[0..1], &derived.slice(0..1));
        let json = serde_json::to_value(&layers).unwrap();

        assert_eq!(json[0]["role"], "candlestick");
        assert_eq!(json[0]["kind"], "candles");
        assert_eq!(json[1]["role"], "band-support");
        assert_eq!(json[1]["fill"], "none");
        assert_eq!(json[2]["fill"], "to-previous");
        assert_eq!(json[5]["role"], "trend-20");
        assert_eq!(json[5]["y"][0], serde_json::Value::Null);
        assert_eq!(json[7]["role"], "marker");
        assert_eq!(json[7]["shape"], "circle");
        assert_eq!(json[7]["category"], "NEUTRAL");
        assert!(json[7].get("name").is_none());
    }

    #[test]
    fn test_band_count() {
        let bars = annotated_bars(4);
        let derived = DerivedSeries::compute(&bars, &smoothers(), &MarkerClassifier::default());
        assert_eq!(band_count(&derived, BandKind::Support, 0..4), 1);
        assert_eq!(band_count(&derived, BandKind::Resistance, 2..4), 0);
    }
}
