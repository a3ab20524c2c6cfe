//! Direction markers: one categorized event per bar

use crate::types::{Bar, Direction, Marker, MarkerCategory};

/// Distance in price units between an entry marker and the bar extreme
pub const DEFAULT_MARKER_OFFSET: f64 = 2.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MarkerClassifier {
    offset: f64,
}

impl Default for MarkerClassifier {
    fn default() -> Self {
        Self::new(DEFAULT_MARKER_OFFSET)
    }
}

impl MarkerClassifier {
    pub fn new(offset: f64) -> Self {
        Self { offset }
    }

    pub fn offset(&self) -> f64 {
        self.offset
    }

    /// Long entries sit below the low, short entries above the high, and
    /// everything else at the bar's midpoint.
    pub fn classify(&self, bar: &Bar) -> Marker {
        let (category, anchor_price) = match bar.direction {
            Direction::Long => (MarkerCategory::EntryLong, bar.low - self.offset),
            Direction::Short => (MarkerCategory::EntryShort, bar.high + self.offset),
            Direction::None => (MarkerCategory::Neutral, bar.midpoint()),
        };

        Marker {
            timestamp: bar.timestamp,
            category,
            anchor_price,
        }
    }

    pub fn classify_series(&self, bars: &[Bar]) -> Vec<Marker> {
        bars.iter().map(|bar| self.classify(bar)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::create_test_bar;
    use crate::types::MarkerShape;

    fn bar_with(direction: Direction, low: f64, high: f64) -> Bar {
        Bar {
            direction,
            ..create_test_bar(0, low, high, (low + high) / 2.0)
        }
    }

    #[test]
    fn test_long_entry_below_low() {
        let marker = MarkerClassifier::default().classify(&bar_with(Direction::Long, 200.0, 210.0));
        assert_eq!(marker.category, MarkerCategory::EntryLong);
        assert_eq!(marker.anchor_price, 198.0);
        assert_eq!(marker.shape(), MarkerShape::TriangleUp);
    }

    #[test]
    fn test_short_entry_above_high() {
        let marker = MarkerClassifier::default().classify(&bar_with(Direction::Short, 200.0, 210.0));
        assert_eq!(marker.category, MarkerCategory::EntryShort);
        assert_eq!(marker.anchor_price, 212.0);
    }

    #[test]
    fn test_neutral_at_midpoint() {
        let marker = MarkerClassifier::default().classify(&bar_with(Direction::None, 200.0, 211.0));
        assert_eq!(marker.category, MarkerCategory::Neutral);
        assert_eq!(marker.anchor_price, 205.5);
        assert_eq!(marker.shape(), MarkerShape::Circle);
    }

    #[test]
    fn test_unrecognized_labels_are_neutral() {
        let classifier = MarkerClassifier::default();
        for label in [None, Some(""), Some("long"), Some("FLAT"), Some("BUY")] {
            let bar = bar_with(Direction::from_label(label), 10.0, 20.0);
            assert_eq!(classifier.classify(&bar).category, MarkerCategory::Neutral, "{:?}", label);
        }
    }

    #[test]
    fn test_custom_offset() {
        let classifier = MarkerClassifier::new(0.5);
        let marker = classifier.classify(&bar_with(Direction::Long, 100.0, 101.0));
        assert_eq!(marker.anchor_price, 99.5);
    }

    #[test]
    fn test_one_marker_per_bar() {
        let bars: Vec<Bar> = [Direction::Long, Direction::None, Direction::Short]
            .into_iter()
            .enumerate()
            .map(|(i, direction)| Bar {
                direction,
                ..create_test_bar(i as i64, 1.0, 3.0, 2.0)
            })
            .collect();

        let markers = MarkerClassifier::default().classify_series(&bars);
        assert_eq!(markers.len(), bars.len());
        for (marker, bar) in markers.iter().zip(&bars) {
            assert_eq!(marker.timestamp, bar.timestamp);
        }
    }
}
