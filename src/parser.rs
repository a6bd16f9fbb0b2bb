use crate::data::Value;
use chrono::NaiveDateTime;
use regex_lite::Regex;
use std::sync::LazyLock;

/// Format of the combined `date` + `hour` fields of the historical readings
pub const HISTORICAL_FORMAT: &str = "%d/%m/%Y %H:%M";

/// Format of the `datetime` column in the forecast and AQI files
pub const ISO_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Digit layout a historical `date hour` pair must have before chrono sees it;
/// chrono alone accepts signed and short years
static HISTORICAL_SHAPE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^\d{1,2}/\d{1,2}/\d{4} \d{1,2}:\d{2}$").ok());

static ISO_SHAPE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2} \d{2}:\d{2}:\d{2}$").ok());

/// Forms accepted when re-normalizing an already-joined key column
const COERCE_FORMATS: [&str; 3] = [ISO_FORMAT, "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"];

/// Cell contents treated as the missing-value marker
const NA_TOKENS: [&str; 10] = [
    "NA", "N/A", "n/a", "NaN", "-NaN", "nan", "null", "NULL", "None", "#N/A",
];

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParseStats {
    pub total_rows: usize,
    pub parsed_successfully: usize,
    pub parse_failures: usize,
    pub failure_rate: f64,
}

impl ParseStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, parsed: bool) {
        self.total_rows += 1;
        if parsed {
            self.parsed_successfully += 1;
        } else {
            self.parse_failures += 1;
        }
    }

    pub fn finalize(&mut self) {
        self.failure_rate = if self.total_rows > 0 {
            self.parse_failures as f64 / self.total_rows as f64
        } else {
            0.0
        };
    }
}

/// Parse a historical `date` + `hour` pair into a timestamp.
///
/// Both parts are trimmed of ASCII whitespace and joined with a single space.
/// Day, month, hour and minute may be zero-padded or not; the year must have
/// exactly four digits. Anything that does not match `DD/MM/YYYY HH:MM`
/// yields `None` instead of an error.
pub fn parse_historical_timestamp(date: &str, hour: &str) -> Option<NaiveDateTime> {
    let combined = format!("{} {}", date.trim_ascii(), hour.trim_ascii());
    if !matches_shape(&HISTORICAL_SHAPE, &combined) {
        return None;
    }
    NaiveDateTime::parse_from_str(&combined, HISTORICAL_FORMAT).ok()
}

/// Parse a `YYYY-MM-DD HH:MM:SS` timestamp, `None` when it does not match
pub fn parse_iso_timestamp(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim_ascii();
    if !matches_shape(&ISO_SHAPE, text) {
        return None;
    }
    NaiveDateTime::parse_from_str(text, ISO_FORMAT).ok()
}

fn matches_shape(shape: &LazyLock<Option<Regex>>, text: &str) -> bool {
    shape.as_ref().is_some_and(|re| re.is_match(text))
}

/// Re-normalize a key cell to a timestamp.
///
/// Accepts values that already are timestamps, and text in a handful of
/// ISO-like forms including a bare date (taken as midnight).
pub fn coerce_timestamp(value: &Value) -> Option<NaiveDateTime> {
    match value {
        Value::Timestamp(ts) => Some(*ts),
        Value::Text(text) => {
            let text = text.trim_ascii();
            COERCE_FORMATS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
                .or_else(|| {
                    chrono::NaiveDate::parse_from_str(text, "%Y-%m-%d")
                        .ok()
                        .and_then(|d| d.and_hms_opt(0, 0, 0))
                })
        }
        Value::Missing | Value::Number(_) => None,
    }
}

/// Classify a raw CSV cell.
///
/// Empty cells and NA tokens become `Missing`, numeric text becomes
/// `Number`, anything else is kept verbatim as `Text`.
pub fn parse_cell(raw: &str) -> Value {
    let trimmed = raw.trim_ascii();
    if trimmed.is_empty() || NA_TOKENS.contains(&trimmed) {
        return Value::Missing;
    }

    match trimmed.parse::<f64>() {
        Ok(n) if n.is_nan() => Value::Missing,
        Ok(n) => Value::Number(n),
        Err(_) => Value::Text(raw.to_string()),
    }
}

/// Numeric column cell: anything non-numeric counts as missing
pub fn parse_optional_float(raw: &str) -> Option<f64> {
    parse_cell(raw).as_f64()
}
