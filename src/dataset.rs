use crate::config::{ColumnConfig, Config};
use crate::data::merge::{AQI_COLUMN, ARIMA_COLUMN, SARIMA_COLUMN};
use crate::data::{build_merged_aqi_forecast, Series, TimeIndexedTable};
use crate::error::{AppError, Result};
use crate::loader;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use tracing::info;

/// The charts offered by the dashboard dropdown
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
pub enum View {
    #[default]
    #[serde(rename = "AQI and Forecast")]
    AqiAndForecast,
    #[serde(rename = "Temperature")]
    Temperature,
    #[serde(rename = "Humidity")]
    Humidity,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableKind {
    Historical,
    Merged,
}

impl View {
    pub const ALL: [View; 3] = [View::AqiAndForecast, View::Temperature, View::Humidity];

    pub fn label(&self) -> &'static str {
        match self {
            View::AqiAndForecast => "AQI and Forecast",
            View::Temperature => "Temperature",
            View::Humidity => "Humidity",
        }
    }

    pub fn subheader(&self) -> &'static str {
        match self {
            View::AqiAndForecast => "AQI and Forecast Graph",
            View::Temperature => "Temperature Graph",
            View::Humidity => "Humidity Graph",
        }
    }

    pub fn caption(&self) -> &'static str {
        match self {
            View::AqiAndForecast => {
                "This graph compares the AQI and its ARIMA and SARIMA forecasts."
            }
            View::Temperature => "This graph shows the temperature over time.",
            View::Humidity => "This graph shows the humidity levels over time.",
        }
    }

    pub fn table(&self) -> TableKind {
        match self {
            View::AqiAndForecast => TableKind::Merged,
            View::Temperature | View::Humidity => TableKind::Historical,
        }
    }

    /// Columns charted by this view
    pub fn columns(&self, names: &ColumnConfig) -> Vec<String> {
        match self {
            View::AqiAndForecast => vec![
                AQI_COLUMN.to_string(),
                ARIMA_COLUMN.to_string(),
                SARIMA_COLUMN.to_string(),
            ],
            View::Temperature => vec![names.temperature.clone()],
            View::Humidity => vec![names.humidity.clone()],
        }
    }

    /// Zero readings in the historical sensors mean "no reading" and are hidden
    pub fn exclude_zero(&self) -> bool {
        !matches!(self, View::AqiAndForecast)
    }
}

impl fmt::Display for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for View {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        View::ALL
            .into_iter()
            .find(|v| v.label() == s)
            .ok_or_else(|| AppError::UnknownView(s.to_string()))
    }
}

/// Everything the dashboard displays, built once at startup
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    pub historical: TimeIndexedTable,
    pub merged: TimeIndexedTable,
    pub stylesheet: String,
    pub columns: ColumnConfig,
}

impl Dataset {
    /// Load all three sources and the stylesheet, then merge AQI with forecasts
    pub fn build(config: &Config) -> Result<Self> {
        let sources = &config.sources;

        let (historical, _) = loader::load_historical(&sources.historical)?;
        let (forecast, _) = loader::load_forecast(&sources.forecast)?;
        let (aqi, _) = loader::load_observed_aqi(&sources.aqi)?;
        let merged = build_merged_aqi_forecast(&aqi, &forecast)?;
        let stylesheet = loader::load_stylesheet(&sources.stylesheet)?;

        info!(
            "Dataset ready: {} historical rows ({} without timestamp), {} merged AQI/forecast rows",
            historical.len(),
            historical.null_index_count(),
            merged.len()
        );

        Ok(Self {
            historical,
            merged,
            stylesheet,
            columns: config.columns.clone(),
        })
    }

    pub fn table(&self, kind: TableKind) -> &TimeIndexedTable {
        match kind {
            TableKind::Historical => &self.historical,
            TableKind::Merged => &self.merged,
        }
    }

    /// Series to chart for a view.
    ///
    /// Every column of the view must exist; the first absent one is reported
    /// as `ColumnUnavailable`.
    pub fn view_series(&self, view: View) -> Result<Vec<Series>> {
        let table = self.table(view.table());
        view.columns(&self.columns)
            .iter()
            .map(|column| table.select_series(column, view.exclude_zero()))
            .collect()
    }
}
