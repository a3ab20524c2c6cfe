use anyhow::{anyhow, bail, Context, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use serde::Deserialize;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use tracing::{debug, info};

use crate::types::{Bar, Direction};

/// Cell values treated as "no value" in the level-list columns
const NULL_TOKENS: &[&str] = &["", "nan", "NaN", "null", "NULL", "None", "NA", "N/A"];

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

const OFFSET_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S%.f%:z", "%Y-%m-%d %H:%M:%S%.f%z"];

/// CSV row as it appears in the source file, keyed by column name.
///
/// Empty numeric cells come through as `None` and become NaN on the bar.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawRecord {
    pub timestamp: String,
    #[serde(default)]
    pub open: Option<f64>,
    #[serde(default)]
    pub high: Option<f64>,
    #[serde(default)]
    pub low: Option<f64>,
    #[serde(default)]
    pub close: Option<f64>,
    #[serde(rename = "Support", default)]
    pub support: Option<String>,
    #[serde(rename = "Resistance", default)]
    pub resistance: Option<String>,
    #[serde(default)]
    pub direction: Option<String>,
}

/// Decode a bracketed numeric list such as `[100, 105.5]`.
///
/// Blank and null-like cells decode to an empty set. A single trailing comma
/// is accepted; any other deviation is an error.
pub fn parse_level_list(text: &str) -> Result<Vec<f64>> {
    let trimmed = text.trim();
    if NULL_TOKENS.contains(&trimmed) {
        return Ok(Vec::new());
    }

    let inner = trimmed
        .strip_prefix('[')
        .and_then(|s| s.strip_suffix(']'))
        .ok_or_else(|| anyhow!("expected a bracketed list, got {:?}", text))?
        .trim();

    if inner.is_empty() {
        return Ok(Vec::new());
    }
    let inner = inner.strip_suffix(',').unwrap_or(inner);

    inner
        .split(',')
        .map(|token| -> Result<f64> {
            let token = token.trim();
            if token.is_empty() {
                bail!("empty element in {:?}", text);
            }
            let value: f64 = token
                .parse()
                .map_err(|_| anyhow!("invalid number {:?} in {:?}", token, text))?;
            if !value.is_finite() {
                bail!("non-finite level {:?} in {:?}", token, text);
            }
            Ok(value)
        })
        .collect()
}

/// Inverse of [`parse_level_list`]
pub fn format_level_list(levels: &[f64]) -> String {
    let items: Vec<String> = levels.iter().map(|v| v.to_string()).collect();
    format!("[{}]", items.join(", "))
}

/// Parse a timestamp cell. Offset-bearing values are converted to UTC and
/// stored naive; a bare date means midnight.
pub fn parse_timestamp(text: &str) -> Result<NaiveDateTime> {
    let text = text.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Ok(dt.naive_utc());
    }
    for fmt in OFFSET_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(text, fmt) {
            return Ok(dt.naive_utc());
        }
    }
    for fmt in NAIVE_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(text, fmt) {
            return Ok(dt);
        }
    }

    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .map(|date| date.and_time(NaiveTime::MIN))
        .with_context(|| format!("unrecognized timestamp {:?}", text))
}

fn parse_levels_cell(cell: Option<&str>, column: &str) -> Result<Vec<f64>> {
    match cell {
        Some(text) => parse_level_list(text)
            .with_context(|| format!("invalid {} level list {:?}", column, text)),
        None => Ok(Vec::new()),
    }
}

/// Convert one raw row into a bar
pub fn parse_record(raw: RawRecord) -> Result<Bar> {
    let timestamp = parse_timestamp(&raw.timestamp)?;
    let support_levels = parse_levels_cell(raw.support.as_deref(), "Support")?;
    let resistance_levels = parse_levels_cell(raw.resistance.as_deref(), "Resistance")?;

    Ok(Bar {
        timestamp,
        open: raw.open.unwrap_or(f64::NAN),
        high: raw.high.unwrap_or(f64::NAN),
        low: raw.low.unwrap_or(f64::NAN),
        close: raw.close.unwrap_or(f64::NAN),
        support_levels,
        resistance_levels,
        direction: Direction::from_label(raw.direction.as_deref()),
    })
}

/// Convert raw rows into bars sorted ascending by timestamp.
///
/// The first malformed row aborts the whole load.
pub fn parse_records<I>(rows: I) -> Result<Vec<Bar>>
where
    I: IntoIterator<Item = RawRecord>,
{
    let mut bars = rows
        .into_iter()
        .enumerate()
        .map(|(index, raw)| parse_record(raw).with_context(|| format!("row {}", index + 1)))
        .collect::<Result<Vec<_>>>()?;

    // Stable, so equal timestamps keep file order
    bars.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
    Ok(bars)
}

/// Read bars from CSV with a header row
pub fn read_csv<R: Read>(reader: R) -> Result<Vec<Bar>> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut rows = Vec::new();
    for (index, result) in csv_reader.deserialize().enumerate() {
        let row: RawRecord =
            result.with_context(|| format!("row {}: failed to parse CSV row", index + 1))?;
        rows.push(row);
    }

    debug!("Read {} raw rows", rows.len());
    parse_records(rows)
}

/// Load and parse a CSV file of bars
pub fn load_csv(path: &Path) -> Result<Vec<Bar>> {
    let file = File::open(path).with_context(|| format!("Failed to open file: {:?}", path))?;

    let bars = read_csv(BufReader::new(file))
        .with_context(|| format!("Failed to load bars from {:?}", path))?;

    let annotated = bars
        .iter()
        .filter(|b| !b.support_levels.is_empty() || !b.resistance_levels.is_empty())
        .count();

    match (bars.first(), bars.last()) {
        (Some(first), Some(last)) => info!(
            "Loaded {} bars from {:?} ({} to {}), {} with levels",
            bars.len(),
            path,
            first.timestamp,
            last.timestamp,
            annotated
        ),
        _ => info!("Loaded 0 bars from {:?}", path),
    }

    Ok(bars)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bands::collapse;
    use std::io::Write;

    const HEADER: &str = "timestamp,open,high,low,close,Support,Resistance,direction\n";

    #[test]
    fn test_parse_level_list() {
        assert_eq!(parse_level_list("[100, 105]").unwrap(), vec![100.0, 105.0]);
        assert_eq!(parse_level_list(" [ 99.5 ,-1,2e2 ] ").unwrap(), vec![99.5, -1.0, 200.0]);
        assert_eq!(parse_level_list("[7,]").unwrap(), vec![7.0]);
        assert!(parse_level_list("[]").unwrap().is_empty());
        assert!(parse_level_list("").unwrap().is_empty());
        assert!(parse_level_list("nan").unwrap().is_empty());
    }

    #[test]
    fn test_parse_level_list_malformed() {
        for text in ["100, 105", "[100, abc]", "[1,,2]", "[,]", "[1, 2", "[nan]", "[inf]", "__import__('os')"] {
            assert!(parse_level_list(text).is_err(), "accepted {:?}", text);
        }
    }

    #[test]
    fn test_level_list_round_trip_keeps_band() {
        let levels = parse_level_list("[105, 100.25, 103]").unwrap();
        let reparsed = parse_level_list(&format_level_list(&levels)).unwrap();
        assert_eq!(collapse(&levels), collapse(&reparsed));
        assert_eq!(format_level_list(&[100.0, 105.5]), "[100, 105.5]");
    }

    #[test]
    fn test_parse_timestamp_formats() {
        let expected = NaiveDate::from_ymd_opt(2024, 3, 5)
            .unwrap()
            .and_hms_opt(9, 30, 0)
            .unwrap();
        assert_eq!(parse_timestamp("2024-03-05 09:30:00").unwrap(), expected);
        assert_eq!(parse_timestamp("2024-03-05T09:30:00").unwrap(), expected);
        assert_eq!(parse_timestamp("2024-03-05 09:30").unwrap(), expected);
        assert_eq!(parse_timestamp("2024-03-05T09:30:00Z").unwrap(), expected);
        assert_eq!(parse_timestamp("2024-03-05 04:30:00-05:00").unwrap(), expected);

        let midnight = NaiveDate::from_ymd_opt(2024, 3, 5).unwrap().and_time(NaiveTime::MIN);
        assert_eq!(parse_timestamp("2024-03-05").unwrap(), midnight);

        assert!(parse_timestamp("05/03/2024 9am").is_err());
    }

    #[test]
    fn test_read_csv_sorts_and_normalizes() {
        let data = format!(
            "{}{}{}{}",
            HEADER,
            "2024-01-03,10,12,9,11,\"[100, 105]\",,LONG\n",
            "2024-01-02,10,12,9,,,\"[120]\",\n",
            "2024-01-04,10,12,9,11,[],\"[130, 125]\",sideways\n",
        );

        let bars = read_csv(data.as_bytes()).unwrap();
        assert_eq!(bars.len(), 3);

        let dates: Vec<String> = bars.iter().map(|b| b.timestamp.date().to_string()).collect();
        assert_eq!(dates, vec!["2024-01-02", "2024-01-03", "2024-01-04"]);

        assert!(bars[0].close.is_nan());
        assert!(bars[0].support_levels.is_empty());
        assert_eq!(bars[0].resistance_levels, vec![120.0]);
        assert_eq!(bars[0].direction, Direction::None);

        assert_eq!(bars[1].support_levels, vec![100.0, 105.0]);
        assert!(bars[1].resistance_levels.is_empty());
        assert_eq!(bars[1].direction, Direction::Long);

        assert_eq!(bars[2].direction, Direction::None);
    }

    #[test]
    fn test_read_csv_without_direction_column() {
        let data = "timestamp,open,high,low,close,Support,Resistance\n2024-01-02,1,2,0.5,1.5,,\n";
        let bars = read_csv(data.as_bytes()).unwrap();
        assert_eq!(bars[0].direction, Direction::None);
    }

    #[test]
    fn test_malformed_levels_abort_load() {
        let data = format!(
            "{}{}{}",
            HEADER,
            "2024-01-02,10,12,9,11,[100],,\n",
            "2024-01-03,10,12,9,11,\"[100, oops]\",,\n",
        );

        let err = read_csv(data.as_bytes()).unwrap_err();
        let message = format!("{:#}", err);
        assert!(message.contains("row 2"), "{}", message);
        assert!(message.contains("Support"), "{}", message);
    }

    #[test]
    fn test_non_numeric_price_aborts_load() {
        let data = format!("{}{}", HEADER, "2024-01-02,ten,12,9,11,,,\n");
        assert!(read_csv(data.as_bytes()).is_err());
    }

    #[test]
    fn test_load_csv_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{}2024-01-02,10,12,9,11,\"[100, 105]\",,SHORT\n", HEADER).unwrap();

        let bars = load_csv(file.path()).unwrap();
        assert_eq!(bars.len(), 1);
        assert_eq!(bars[0].direction, Direction::Short);

        assert!(load_csv(Path::new("does/not/exist.csv")).is_err());
    }
}
