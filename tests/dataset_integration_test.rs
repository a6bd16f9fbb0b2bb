use aqi_dashboard::config::Config;
use aqi_dashboard::data::{build_merged_aqi_forecast, Value};
use aqi_dashboard::dataset::{Dataset, View};
use aqi_dashboard::error::AppError;
use aqi_dashboard::loader::{load_forecast, load_historical, load_observed_aqi};
use chrono::{NaiveDate, NaiveDateTime};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const HISTORICAL: &str = "\
date,hour,temp,humidity,pm25
 01/01/2023 , 05:00 ,12.5,80,55.1
01/01/2023,06:00,0,82,60.3
not-a-date,07:00,14.0,0,61.0
1/1/2023,8:00,15.5,70,
";

const FORECAST: &str = "\
datetime,arima_forecast,sarima_forecast,sarimax_forecast
2023-01-01 06:00:00,118.0,121.0,119.5
2023-01-01 07:00:00,130.0,128.0,127.0
";

const AQI: &str = "\
datetime,aqi
2023-01-01 05:00:00,100
2023-01-01 06:00:00,120
";

const STYLE: &str = ".graph-container { margin: 1rem; }";

fn ts(h: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2023, 1, 1)
        .unwrap()
        .and_hms_opt(h, 0, 0)
        .unwrap()
}

fn write_sources(dir: &Path) -> Config {
    fs::write(dir.join("historical.csv"), HISTORICAL).unwrap();
    fs::write(dir.join("forecast.csv"), FORECAST).unwrap();
    fs::write(dir.join("aqi.csv"), AQI).unwrap();
    fs::write(dir.join("style.css"), STYLE).unwrap();

    let yaml = format!(
        "sources:\n  historical: {d}/historical.csv\n  forecast: {d}/forecast.csv\n  aqi: {d}/aqi.csv\n  stylesheet: {d}/style.css\n",
        d = dir.display()
    );
    Config::from_yaml(&yaml).expect("Config should parse")
}

/// Test whitespace-padded and unpadded date/hour text parse to the same index
#[test]
fn test_load_historical_aligns_timestamps() {
    let dir = TempDir::new().unwrap();
    write_sources(dir.path());

    // Load the historical readings
    let (table, stats) = load_historical(dir.path().join("historical.csv")).expect("Load failed");

    assert_eq!(table.len(), 4);
    assert_eq!(
        table.index(),
        &[Some(ts(5)), Some(ts(6)), None, Some(ts(8))]
    );
    assert_eq!(stats.parse_failures, 1);

    // date and hour are consumed by the index
    assert!(!table.has_column("date"));
    assert!(!table.has_column("hour"));
    assert_eq!(
        table.columns(),
        &["temp".to_string(), "humidity".to_string(), "pm25".to_string()]
    );
}

/// Test the malformed row keeps its other columns untouched
#[test]
fn test_load_historical_bad_row_preserved() {
    let dir = TempDir::new().unwrap();
    write_sources(dir.path());

    let (table, _) = load_historical(dir.path().join("historical.csv")).unwrap();

    // Row 3 has "not-a-date" but its readings survive
    assert_eq!(table.index()[2], None);
    assert_eq!(table.get(2, "temp"), Some(&Value::Number(14.0)));
    assert_eq!(table.get(2, "humidity"), Some(&Value::Number(0.0)));
    assert_eq!(table.get(2, "pm25"), Some(&Value::Number(61.0)));
    assert_eq!(table.get(3, "pm25"), Some(&Value::Missing));
}

/// Test a historical file without an hour column is rejected
#[test]
fn test_load_historical_missing_hour_column() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("no_hour.csv");
    fs::write(&path, "date,temp\n01/01/2023,12.5\n").unwrap();

    match load_historical(&path) {
        Err(AppError::SchemaMissing { column, source_name }) => {
            assert_eq!(column, "hour");
            assert!(source_name.contains("no_hour.csv"));
        }
        other => panic!("Expected SchemaMissing, got: {:?}", other),
    }
}

/// Test a missing source file reports its path
#[test]
fn test_load_missing_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("absent.csv");

    match load_forecast(&path) {
        Err(AppError::SourceUnavailable { path: reported, .. }) => assert_eq!(reported, path),
        other => panic!("Expected SourceUnavailable, got: {:?}", other),
    }
}

/// Test the outer join of observed AQI and forecasts read from disk
#[test]
fn test_merge_from_files() {
    let dir = TempDir::new().unwrap();
    write_sources(dir.path());

    // Load both sources and merge them
    let (aqi, _) = load_observed_aqi(dir.path().join("aqi.csv")).unwrap();
    let (forecast, _) = load_forecast(dir.path().join("forecast.csv")).unwrap();
    let merged = build_merged_aqi_forecast(&aqi, &forecast).unwrap();

    assert_eq!(merged.index(), &[Some(ts(5)), Some(ts(6)), Some(ts(7))]);
    assert!(!merged.has_column("sarimax_forecast"));

    // 05:00 only has an AQI reading
    assert_eq!(merged.get(0, "aqi"), Some(&Value::Number(100.0)));
    assert_eq!(merged.get(0, "arima_forecast"), Some(&Value::Missing));
    assert_eq!(merged.get(0, "sarima_forecast"), Some(&Value::Missing));

    // 06:00 is in both files
    assert_eq!(merged.get(1, "aqi"), Some(&Value::Number(120.0)));
    assert_eq!(merged.get(1, "arima_forecast"), Some(&Value::Number(118.0)));
    assert_eq!(merged.get(1, "sarima_forecast"), Some(&Value::Number(121.0)));

    // 07:00 only has forecasts
    assert_eq!(merged.get(2, "aqi"), Some(&Value::Missing));
    assert_eq!(merged.get(2, "sarima_forecast"), Some(&Value::Number(128.0)));
}

/// Test the full dataset build and the series behind each view
#[test]
fn test_dataset_build_and_views() {
    let dir = TempDir::new().unwrap();
    let config = write_sources(dir.path());

    // Build everything the dashboard shows
    let dataset = Dataset::build(&config).expect("Build failed");
    assert_eq!(dataset.stylesheet, STYLE);

    // Zero temperatures are dropped without touching the table
    let before = dataset.historical.clone();
    let temp = dataset.view_series(View::Temperature).unwrap();
    assert_eq!(temp[0].values(), vec![Some(12.5), Some(14.0), Some(15.5)]);
    assert_eq!(temp[0].points[1].timestamp, None);
    assert_eq!(dataset.historical, before);

    let humidity = dataset.view_series(View::Humidity).unwrap();
    assert_eq!(humidity[0].values(), vec![Some(80.0), Some(82.0), Some(70.0)]);

    // The AQI view charts all three merged columns
    let aqi = dataset.view_series(View::AqiAndForecast).unwrap();
    let names: Vec<_> = aqi.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["aqi", "arima_forecast", "sarima_forecast"]);
}

/// Test a missing stylesheet stops the build
#[test]
fn test_dataset_build_missing_stylesheet() {
    let dir = TempDir::new().unwrap();
    let config = write_sources(dir.path());
    fs::remove_file(dir.path().join("style.css")).unwrap();

    assert!(matches!(
        Dataset::build(&config),
        Err(AppError::SourceUnavailable { .. })
    ));
}

/// Test building twice from unchanged files gives identical results
#[test]
fn test_pipeline_is_idempotent() {
    let dir = TempDir::new().unwrap();
    let config = write_sources(dir.path());

    let first = Dataset::build(&config).unwrap();
    let second = Dataset::build(&config).unwrap();

    assert_eq!(first, second);
}

/// Test rows with a short or signed year get a null timestamp
#[test]
fn test_load_historical_rejects_malformed_years() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("years.csv");
    fs::write(
        &path,
        "date,hour,temp\n01/01/23,05:00,1.0\n01/01/+2023,05:00,2.0\n01/01/2023,05:00,3.0\n",
    )
    .unwrap();

    // Parse the file
    let (table, stats) = load_historical(&path).expect("Load failed");

    assert_eq!(table.index(), &[None, None, Some(ts(5))]);
    assert_eq!(stats.parse_failures, 2);
    assert_eq!(table.get(0, "temp"), Some(&Value::Number(1.0)));
}
