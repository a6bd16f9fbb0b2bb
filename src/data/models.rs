use chrono::NaiveDateTime;

/// A single cell of a loaded table.
///
/// `Missing` is the "no data" marker and is distinct from `Number(0.0)`.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Missing,
    Number(f64),
    Text(String),
    Timestamp(NaiveDateTime),
}

impl Value {
    /// Numeric view of the cell; text and timestamps have none
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn from_option(value: Option<f64>) -> Self {
        value.map(Value::Number).unwrap_or(Value::Missing)
    }

    pub fn from_timestamp(ts: Option<NaiveDateTime>) -> Self {
        ts.map(Value::Timestamp).unwrap_or(Value::Missing)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ForecastRecord {
    pub datetime: Option<NaiveDateTime>,
    pub arima_forecast: Option<f64>,
    pub sarima_forecast: Option<f64>,
    /// Forecast columns not taken into the merge (e.g. `sarimax_forecast`)
    pub extra: Vec<(String, Value)>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ObservedAqiRecord {
    pub datetime: Option<NaiveDateTime>,
    pub aqi: Option<f64>,
}
