pub mod frame;
pub mod merge;
pub mod models;

pub use frame::{Frame, Series, SeriesPoint, TimeIndexedTable};
pub use merge::build_merged_aqi_forecast;
pub use models::{ForecastRecord, ObservedAqiRecord, Value};
