use crate::data::{ForecastRecord, Frame, ObservedAqiRecord, TimeIndexedTable, Value};
use crate::error::{AppError, Result};
use crate::parser::coerce_timestamp;
use chrono::NaiveDateTime;
use std::collections::BTreeMap;
use tracing::debug;

pub const DATETIME_COLUMN: &str = "datetime";
pub const AQI_COLUMN: &str = "aqi";
pub const ARIMA_COLUMN: &str = "arima_forecast";
pub const SARIMA_COLUMN: &str = "sarima_forecast";

/// Sort position of a join key: timestamps ascending, null keys last
type KeyOrder = (bool, Option<NaiveDateTime>);

#[derive(Default)]
struct KeyGroup {
    left: Vec<usize>,
    right: Vec<usize>,
}

/// Outer join of two frames on a timestamp key column.
///
/// Every key present on either side yields rows in the output. Keys found on
/// both sides produce one row per (left, right) pair; keys found on one side
/// only get `Missing` for the other side's columns. Null keys match each
/// other. Non-key columns present on both sides are suffixed `_x` / `_y`.
pub fn outer_join(left: &Frame, right: &Frame, key: &str) -> Result<Frame> {
    let left_key = left
        .column_index(key)
        .ok_or_else(|| AppError::JoinKeyMissing(key.to_string()))?;
    let right_key = right
        .column_index(key)
        .ok_or_else(|| AppError::JoinKeyMissing(key.to_string()))?;

    let left_cols: Vec<usize> = (0..left.columns().len())
        .filter(|&i| i != left_key)
        .collect();
    let right_cols: Vec<usize> = (0..right.columns().len())
        .filter(|&i| i != right_key)
        .collect();

    let mut columns = vec![key.to_string()];
    columns.extend(joined_names(left, &left_cols, right, &right_cols, "_x"));
    columns.extend(joined_names(right, &right_cols, left, &left_cols, "_y"));

    let mut groups: BTreeMap<KeyOrder, KeyGroup> = BTreeMap::new();
    for (i, row) in left.rows().iter().enumerate() {
        let ts = coerce_timestamp(&row[left_key]);
        groups.entry((ts.is_none(), ts)).or_default().left.push(i);
    }
    for (i, row) in right.rows().iter().enumerate() {
        let ts = coerce_timestamp(&row[right_key]);
        groups.entry((ts.is_none(), ts)).or_default().right.push(i);
    }

    let left_missing = vec![Value::Missing; left_cols.len()];
    let right_missing = vec![Value::Missing; right_cols.len()];
    let mut joined = Frame::new(columns);
    for ((_, ts), group) in groups {
        let left_parts: Vec<Vec<Value>> = if group.left.is_empty() {
            vec![left_missing.clone()]
        } else {
            group
                .left
                .iter()
                .map(|&i| pick(&left.rows()[i], &left_cols))
                .collect()
        };
        let right_parts: Vec<Vec<Value>> = if group.right.is_empty() {
            vec![right_missing.clone()]
        } else {
            group
                .right
                .iter()
                .map(|&i| pick(&right.rows()[i], &right_cols))
                .collect()
        };

        for l in &left_parts {
            for r in &right_parts {
                let mut row = Vec::with_capacity(1 + l.len() + r.len());
                row.push(Value::from_timestamp(ts));
                row.extend(l.iter().cloned());
                row.extend(r.iter().cloned());
                joined.push_row(row);
            }
        }
    }

    Ok(joined)
}

fn pick(row: &[Value], cols: &[usize]) -> Vec<Value> {
    cols.iter().map(|&c| row[c].clone()).collect()
}

fn joined_names(
    frame: &Frame,
    cols: &[usize],
    other: &Frame,
    other_cols: &[usize],
    suffix: &str,
) -> Vec<String> {
    cols.iter()
        .map(|&c| {
            let name = &frame.columns()[c];
            let clashes = other_cols.iter().any(|&o| &other.columns()[o] == name);
            if clashes {
                format!("{}{}", name, suffix)
            } else {
                name.clone()
            }
        })
        .collect()
}

pub fn aqi_frame(aqi: &[ObservedAqiRecord]) -> Frame {
    let mut frame = Frame::new(vec![DATETIME_COLUMN.to_string(), AQI_COLUMN.to_string()]);
    for record in aqi {
        frame.push_row(vec![
            Value::from_timestamp(record.datetime),
            Value::from_option(record.aqi),
        ]);
    }
    frame
}

/// All forecast columns, including the ones the merge does not keep
pub fn forecast_frame(forecast: &[ForecastRecord]) -> Frame {
    let mut extra_names: Vec<&str> = Vec::new();
    for record in forecast {
        for (name, _) in &record.extra {
            if !extra_names.contains(&name.as_str()) {
                extra_names.push(name);
            }
        }
    }

    let mut columns = vec![
        DATETIME_COLUMN.to_string(),
        ARIMA_COLUMN.to_string(),
        SARIMA_COLUMN.to_string(),
    ];
    columns.extend(extra_names.iter().map(|n| n.to_string()));

    let mut frame = Frame::new(columns);
    for record in forecast {
        let mut row = vec![
            Value::from_timestamp(record.datetime),
            Value::from_option(record.arima_forecast),
            Value::from_option(record.sarima_forecast),
        ];
        for name in &extra_names {
            let value = record
                .extra
                .iter()
                .find(|(n, _)| n.as_str() == *name)
                .map(|(_, v)| v.clone())
                .unwrap_or(Value::Missing);
            row.push(value);
        }
        frame.push_row(row);
    }
    frame
}

/// Outer-join observed AQI with the ARIMA / SARIMA forecasts and index the
/// result by timestamp.
///
/// Only `datetime`, `arima_forecast` and `sarima_forecast` are taken from the
/// forecast side.
pub fn build_merged_aqi_forecast(
    aqi: &[ObservedAqiRecord],
    forecast: &[ForecastRecord],
) -> Result<TimeIndexedTable> {
    let forecast =
        forecast_frame(forecast).project(&[DATETIME_COLUMN, ARIMA_COLUMN, SARIMA_COLUMN])?;
    let joined = outer_join(&aqi_frame(aqi), &forecast, DATETIME_COLUMN)?;

    debug!(
        "Outer join: {} AQI rows + {} forecast rows -> {} merged rows",
        aqi.len(),
        forecast.len(),
        joined.len()
    );

    joined.into_time_indexed(DATETIME_COLUMN)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::collections::BTreeSet;

    fn ts(h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 5, 1)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap()
    }

    fn aqi(h: Option<u32>, value: f64) -> ObservedAqiRecord {
        ObservedAqiRecord {
            datetime: h.map(ts),
            aqi: Some(value),
        }
    }

    fn forecast(h: Option<u32>, arima: f64, sarima: f64) -> ForecastRecord {
        ForecastRecord {
            datetime: h.map(ts),
            arima_forecast: Some(arima),
            sarima_forecast: Some(sarima),
            extra: vec![("sarimax_forecast".to_string(), Value::Number(0.5))],
        }
    }

    #[test]
    fn test_merge_outer_join_three_keys() {
        let merged = build_merged_aqi_forecast(
            &[aqi(Some(1), 100.0), aqi(Some(2), 120.0)],
            &[forecast(Some(2), 118.0, 121.0), forecast(Some(3), 130.0, 128.0)],
        )
        .unwrap();

        assert_eq!(merged.len(), 3);
        assert_eq!(merged.index(), &[Some(ts(1)), Some(ts(2)), Some(ts(3))]);
        assert_eq!(
            merged.columns(),
            &[
                AQI_COLUMN.to_string(),
                ARIMA_COLUMN.to_string(),
                SARIMA_COLUMN.to_string()
            ]
        );

        assert_eq!(merged.get(0, AQI_COLUMN), Some(&Value::Number(100.0)));
        assert_eq!(merged.get(0, ARIMA_COLUMN), Some(&Value::Missing));
        assert_eq!(merged.get(0, SARIMA_COLUMN), Some(&Value::Missing));

        assert_eq!(merged.get(1, AQI_COLUMN), Some(&Value::Number(120.0)));
        assert_eq!(merged.get(1, ARIMA_COLUMN), Some(&Value::Number(118.0)));
        assert_eq!(merged.get(1, SARIMA_COLUMN), Some(&Value::Number(121.0)));

        assert_eq!(merged.get(2, AQI_COLUMN), Some(&Value::Missing));
        assert_eq!(merged.get(2, ARIMA_COLUMN), Some(&Value::Number(130.0)));
    }

    #[test]
    fn test_merge_drops_extra_forecast_columns() {
        let merged =
            build_merged_aqi_forecast(&[aqi(Some(1), 1.0)], &[forecast(Some(1), 2.0, 3.0)])
                .unwrap();
        assert!(!merged.has_column("sarimax_forecast"));
        assert_eq!(merged.columns().len(), 3);
    }

    #[test]
    fn test_merge_null_keys_sorted_last_and_matched() {
        let merged = build_merged_aqi_forecast(
            &[aqi(None, 7.0), aqi(Some(4), 8.0)],
            &[forecast(None, 1.0, 2.0)],
        )
        .unwrap();

        assert_eq!(merged.index(), &[Some(ts(4)), None]);
        assert_eq!(merged.get(1, AQI_COLUMN), Some(&Value::Number(7.0)));
        assert_eq!(merged.get(1, ARIMA_COLUMN), Some(&Value::Number(1.0)));
    }

    #[test]
    fn test_merge_duplicate_keys_cartesian() {
        let merged = build_merged_aqi_forecast(
            &[aqi(Some(1), 1.0), aqi(Some(1), 2.0)],
            &[forecast(Some(1), 10.0, 11.0), forecast(Some(1), 20.0, 21.0)],
        )
        .unwrap();
        assert_eq!(merged.len(), 4);
        assert!(merged.index().iter().all(|t| *t == Some(ts(1))));
    }

    #[test]
    fn test_merge_empty_inputs() {
        let merged = build_merged_aqi_forecast(&[], &[]).unwrap();
        assert!(merged.is_empty());
        assert_eq!(merged.columns().len(), 3);
    }

    fn tuple_set(frame: &Frame) -> BTreeSet<String> {
        let col = |name: &str| frame.column_index(name).unwrap();
        let (k, a, r, s) = (
            col(DATETIME_COLUMN),
            col(AQI_COLUMN),
            col(ARIMA_COLUMN),
            col(SARIMA_COLUMN),
        );
        frame
            .rows()
            .iter()
            .map(|row| format!("{:?}|{:?}|{:?}|{:?}", row[k], row[a], row[r], row[s]))
            .collect()
    }

    #[test]
    fn test_outer_join_commutative_up_to_order() {
        let aqi = aqi_frame(&[aqi(Some(1), 50.0), aqi(Some(2), 60.0), aqi(None, 1.0)]);
        let forecast = forecast_frame(&[
            forecast(Some(2), 61.0, 62.0),
            forecast(Some(3), 70.0, 71.0),
        ])
        .project(&[DATETIME_COLUMN, ARIMA_COLUMN, SARIMA_COLUMN])
        .unwrap();

        let ab = outer_join(&aqi, &forecast, DATETIME_COLUMN).unwrap();
        let ba = outer_join(&forecast, &aqi, DATETIME_COLUMN).unwrap();

        assert_eq!(ab.len(), ba.len());
        assert_eq!(tuple_set(&ab), tuple_set(&ba));
    }

    #[test]
    fn test_outer_join_missing_key() {
        let left = Frame::new(vec!["aqi".to_string()]);
        let right = Frame::new(vec![DATETIME_COLUMN.to_string()]);
        assert!(matches!(
            outer_join(&left, &right, DATETIME_COLUMN),
            Err(AppError::JoinKeyMissing(_))
        ));
    }

    #[test]
    fn test_outer_join_suffixes_overlapping_columns() {
        let mut left = Frame::new(vec![DATETIME_COLUMN.to_string(), "value".to_string()]);
        left.push_row(vec![Value::Timestamp(ts(1)), Value::Number(1.0)]);
        let mut right = Frame::new(vec![DATETIME_COLUMN.to_string(), "value".to_string()]);
        right.push_row(vec![Value::Timestamp(ts(1)), Value::Number(2.0)]);

        let joined = outer_join(&left, &right, DATETIME_COLUMN).unwrap();
        assert_eq!(
            joined.columns(),
            &[
                DATETIME_COLUMN.to_string(),
                "value_x".to_string(),
                "value_y".to_string()
            ]
        );
        assert_eq!(
            joined.rows()[0],
            vec![Value::Timestamp(ts(1)), Value::Number(1.0), Value::Number(2.0)]
        );
    }
}
