use crate::data::merge::{AQI_COLUMN, ARIMA_COLUMN, DATETIME_COLUMN, SARIMA_COLUMN};
use crate::data::{ForecastRecord, ObservedAqiRecord, TimeIndexedTable, Value};
use crate::error::{AppError, Result};
use crate::parser::{
    parse_cell, parse_historical_timestamp, parse_iso_timestamp, parse_optional_float, ParseStats,
};
use csv::{ReaderBuilder, StringRecord};
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

pub const DATE_COLUMN: &str = "date";
pub const HOUR_COLUMN: &str = "hour";

/// Header and records of a CSV source, with required columns located
struct RawCsv {
    headers: Vec<String>,
    records: Vec<StringRecord>,
    required: Vec<usize>,
}

impl RawCsv {
    fn read<R: Read>(reader: R, origin: &Path, required: &[&str]) -> Result<Self> {
        let csv_err = |source: csv::Error| AppError::Csv {
            path: origin.to_path_buf(),
            source,
        };

        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(reader);

        let headers: Vec<String> = reader
            .headers()
            .map_err(csv_err)?
            .iter()
            .map(|h| h.to_string())
            .collect();

        let required = required
            .iter()
            .map(|name| {
                headers
                    .iter()
                    .position(|h| h == *name)
                    .ok_or_else(|| AppError::SchemaMissing {
                        source_name: origin.display().to_string(),
                        column: name.to_string(),
                    })
            })
            .collect::<Result<Vec<_>>>()?;

        let records = reader
            .records()
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(csv_err)?;

        Ok(Self {
            headers,
            records,
            required,
        })
    }

    /// Column indices other than the required ones
    fn other_columns(&self) -> Vec<usize> {
        (0..self.headers.len())
            .filter(|i| !self.required.contains(i))
            .collect()
    }
}

fn field(record: &StringRecord, idx: usize) -> &str {
    record.get(idx).unwrap_or("")
}

fn open(path: &Path) -> Result<File> {
    File::open(path).map_err(|source| AppError::SourceUnavailable {
        path: path.to_path_buf(),
        source,
    })
}

fn log_stats(kind: &str, origin: &Path, stats: &ParseStats) {
    info!(
        "Loaded {} from {}: {} rows, {} with unparseable timestamps ({:.1}%)",
        kind,
        origin.display(),
        stats.total_rows,
        stats.parse_failures,
        stats.failure_rate * 100.0
    );
    if stats.parse_failures > 0 {
        warn!(
            "{} {} rows in {} have a null timestamp and will not be charted",
            stats.parse_failures,
            kind,
            origin.display()
        );
    }
}

/// Load historical readings and index them by their `date` + `hour` timestamp.
///
/// The `date` and `hour` columns are consumed by the index; all other columns
/// are kept in file order. Rows whose timestamp does not parse stay in the
/// table with a null index entry.
pub fn load_historical<P: AsRef<Path>>(path: P) -> Result<(TimeIndexedTable, ParseStats)> {
    let path = path.as_ref();
    historical_from_reader(open(path)?, path)
}

pub fn historical_from_reader<R: Read>(
    reader: R,
    origin: &Path,
) -> Result<(TimeIndexedTable, ParseStats)> {
    let raw = RawCsv::read(reader, origin, &[DATE_COLUMN, HOUR_COLUMN])?;
    let (date_idx, hour_idx) = (raw.required[0], raw.required[1]);
    let kept = raw.other_columns();

    let mut stats = ParseStats::new();
    let mut index = Vec::with_capacity(raw.records.len());
    let mut rows: Vec<Vec<Value>> = Vec::with_capacity(raw.records.len());

    for (row_num, record) in raw.records.iter().enumerate() {
        let (date, hour) = (field(record, date_idx), field(record, hour_idx));
        let ts = parse_historical_timestamp(date, hour);
        if ts.is_none() {
            debug!(
                "Row {}: unparseable date/hour '{}' '{}' in {}",
                row_num + 1,
                date,
                hour,
                origin.display()
            );
        }
        stats.record(ts.is_some());
        index.push(ts);
        rows.push(kept.iter().map(|&i| parse_cell(field(record, i))).collect());
    }
    stats.finalize();

    let columns = kept.iter().map(|&i| raw.headers[i].clone()).collect();
    let table = TimeIndexedTable::new(index, columns, rows)?;
    log_stats("historical readings", origin, &stats);

    Ok((table, stats))
}

/// Load forecast rows; columns besides the ARIMA/SARIMA ones go to `extra`
pub fn load_forecast<P: AsRef<Path>>(path: P) -> Result<(Vec<ForecastRecord>, ParseStats)> {
    let path = path.as_ref();
    forecast_from_reader(open(path)?, path)
}

pub fn forecast_from_reader<R: Read>(
    reader: R,
    origin: &Path,
) -> Result<(Vec<ForecastRecord>, ParseStats)> {
    let raw = RawCsv::read(
        reader,
        origin,
        &[DATETIME_COLUMN, ARIMA_COLUMN, SARIMA_COLUMN],
    )?;
    let (dt_idx, arima_idx, sarima_idx) = (raw.required[0], raw.required[1], raw.required[2]);
    let extra_cols = raw.other_columns();

    let mut stats = ParseStats::new();
    let records = raw
        .records
        .iter()
        .enumerate()
        .map(|(row_num, record)| {
            let datetime = parse_datetime_field(record, dt_idx, row_num, origin);
            stats.record(datetime.is_some());
            ForecastRecord {
                datetime,
                arima_forecast: parse_optional_float(field(record, arima_idx)),
                sarima_forecast: parse_optional_float(field(record, sarima_idx)),
                extra: extra_cols
                    .iter()
                    .map(|&i| (raw.headers[i].clone(), parse_cell(field(record, i))))
                    .collect(),
            }
        })
        .collect();
    stats.finalize();

    log_stats("forecasts", origin, &stats);
    Ok((records, stats))
}

pub fn load_observed_aqi<P: AsRef<Path>>(path: P) -> Result<(Vec<ObservedAqiRecord>, ParseStats)> {
    let path = path.as_ref();
    observed_aqi_from_reader(open(path)?, path)
}

pub fn observed_aqi_from_reader<R: Read>(
    reader: R,
    origin: &Path,
) -> Result<(Vec<ObservedAqiRecord>, ParseStats)> {
    let raw = RawCsv::read(reader, origin, &[DATETIME_COLUMN, AQI_COLUMN])?;
    let (dt_idx, aqi_idx) = (raw.required[0], raw.required[1]);

    let mut stats = ParseStats::new();
    let records = raw
        .records
        .iter()
        .enumerate()
        .map(|(row_num, record)| {
            let datetime = parse_datetime_field(record, dt_idx, row_num, origin);
            stats.record(datetime.is_some());
            ObservedAqiRecord {
                datetime,
                aqi: parse_optional_float(field(record, aqi_idx)),
            }
        })
        .collect();
    stats.finalize();

    log_stats("AQI readings", origin, &stats);
    Ok((records, stats))
}

fn parse_datetime_field(
    record: &StringRecord,
    idx: usize,
    row_num: usize,
    origin: &Path,
) -> Option<chrono::NaiveDateTime> {
    let text = field(record, idx);
    let ts = parse_iso_timestamp(text);
    if ts.is_none() {
        debug!(
            "Row {}: unparseable datetime '{}' in {}",
            row_num + 1,
            text,
            origin.display()
        );
    }
    ts
}

/// Raw stylesheet text for injection into the page
pub fn load_stylesheet<P: AsRef<Path>>(path: P) -> Result<String> {
    let path = path.as_ref();
    std::fs::read_to_string(path).map_err(|source| AppError::SourceUnavailable {
        path: PathBuf::from(path),
        source,
    })
}
