use crate::data::Value;
use crate::error::{AppError, Result};
use crate::parser::coerce_timestamp;
use chrono::NaiveDateTime;
use serde::Serialize;

/// An unindexed table of named columns, as read from a source or produced
/// by a join.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Frame {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl Frame {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    /// Append a row, padding short rows with `Missing` and ignoring
    /// cells beyond the last column
    pub fn push_row(&mut self, mut row: Vec<Value>) {
        row.resize(self.columns.len(), Value::Missing);
        self.rows.push(row);
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Keep only the named columns, in the given order
    pub fn project(&self, names: &[&str]) -> Result<Frame> {
        let indices = names
            .iter()
            .map(|name| {
                self.column_index(name)
                    .ok_or_else(|| AppError::ColumnUnavailable(name.to_string()))
            })
            .collect::<Result<Vec<_>>>()?;

        let mut projected = Frame::new(names.iter().map(|n| n.to_string()).collect());
        for row in &self.rows {
            projected.push_row(indices.iter().map(|&i| row[i].clone()).collect());
        }
        Ok(projected)
    }

    /// Promote a key column to the index.
    ///
    /// The key is re-normalized with [`coerce_timestamp`], so already-parsed
    /// timestamps pass through and anything unparseable becomes a null index
    /// entry. The key column is removed from the remaining columns.
    pub fn into_time_indexed(self, key: &str) -> Result<TimeIndexedTable> {
        let key_idx = self
            .column_index(key)
            .ok_or_else(|| AppError::JoinKeyMissing(key.to_string()))?;

        let mut columns = self.columns;
        columns.remove(key_idx);

        let mut index = Vec::with_capacity(self.rows.len());
        let mut rows = Vec::with_capacity(self.rows.len());
        for mut row in self.rows {
            let key_value = row.remove(key_idx);
            index.push(coerce_timestamp(&key_value));
            rows.push(row);
        }

        Ok(TimeIndexedTable {
            index,
            columns,
            rows,
        })
    }
}

/// A table whose rows are identified by a (possibly null) timestamp.
///
/// Duplicate index entries are allowed. Tables are never mutated after
/// construction; views are extracted as owned [`Series`].
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TimeIndexedTable {
    index: Vec<Option<NaiveDateTime>>,
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl TimeIndexedTable {
    pub fn new(
        index: Vec<Option<NaiveDateTime>>,
        columns: Vec<String>,
        rows: Vec<Vec<Value>>,
    ) -> Result<Self> {
        if index.len() != rows.len() {
            return Err(AppError::Parse(format!(
                "Index has {} entries but table has {} rows",
                index.len(),
                rows.len()
            )));
        }
        if let Some(bad) = rows.iter().position(|r| r.len() != columns.len()) {
            return Err(AppError::Parse(format!(
                "Row {} has {} cells, expected {}",
                bad,
                rows[bad].len(),
                columns.len()
            )));
        }
        Ok(Self {
            index,
            columns,
            rows,
        })
    }

    pub fn index(&self) -> &[Option<NaiveDateTime>] {
        &self.index
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c == name)
    }

    /// Cell at `row` in the named column
    pub fn get(&self, row: usize, column: &str) -> Option<&Value> {
        let col = self.columns.iter().position(|c| c == column)?;
        self.rows.get(row).map(|r| &r[col])
    }

    /// Number of rows whose timestamp could not be parsed
    pub fn null_index_count(&self) -> usize {
        self.index.iter().filter(|ts| ts.is_none()).count()
    }

    /// Extract one column as a series.
    ///
    /// With `exclude_zero`, rows whose value is exactly `0` are left out.
    /// Missing values are not zero and are kept. The table is only borrowed;
    /// the series owns its points.
    pub fn select_series(&self, column: &str, exclude_zero: bool) -> Result<Series> {
        let col = self
            .columns
            .iter()
            .position(|c| c == column)
            .ok_or_else(|| AppError::ColumnUnavailable(column.to_string()))?;

        let points = self
            .index
            .iter()
            .zip(&self.rows)
            .map(|(ts, row)| SeriesPoint {
                timestamp: *ts,
                value: row[col].as_f64(),
            })
            .filter(|p| !(exclude_zero && p.value == Some(0.0)))
            .collect();

        Ok(Series {
            name: column.to_string(),
            points,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesPoint {
    #[serde(with = "optional_timestamp")]
    pub timestamp: Option<NaiveDateTime>,
    pub value: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Series {
    pub name: String,
    pub points: Vec<SeriesPoint>,
}

impl Series {
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn values(&self) -> Vec<Option<f64>> {
        self.points.iter().map(|p| p.value).collect()
    }

    /// Points that can be placed on a time axis, ordered by timestamp
    pub fn plottable(&self) -> Vec<(NaiveDateTime, f64)> {
        let mut points: Vec<_> = self
            .points
            .iter()
            .filter_map(|p| Some((p.timestamp?, p.value?)))
            .collect();
        points.sort_by_key(|(ts, _)| *ts);
        points
    }
}

mod optional_timestamp {
    use crate::parser::ISO_FORMAT;
    use chrono::NaiveDateTime;
    use serde::Serializer;

    pub fn serialize<S>(ts: &Option<NaiveDateTime>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match ts {
            Some(ts) => serializer.serialize_str(&ts.format(ISO_FORMAT).to_string()),
            None => serializer.serialize_none(),
        }
    }
}
