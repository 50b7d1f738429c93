use std::fmt;
use std::sync::Arc;

use chrono::NaiveDate;
use serde::Serialize;

use super::labels::{Season, Weather, WorkingDay};

/// Normalized temperatures are stored as a fraction of this many degrees Celsius.
pub const TEMPERATURE_SCALE_CELSIUS: f64 = 41.0;

// ---------------------------------------------------------------------------
// Record – one row of the source table
// ---------------------------------------------------------------------------

/// One hourly (or daily, when `hour` is absent) usage record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Record {
    pub date: NaiveDate,
    /// Hour of day, 0–23. `None` for day-level datasets.
    pub hour: Option<u8>,
    pub season: Season,
    pub weather: Weather,
    pub working_day: WorkingDay,
    /// Temperature scaled into [0, 1].
    pub temperature: f64,
    /// Relative humidity scaled into [0, 1].
    pub humidity: f64,
    pub casual: u32,
    pub registered: u32,
    /// Always `casual + registered`; checked when loading.
    pub total: u32,
}

impl Record {
    pub fn temperature_celsius(&self) -> f64 {
        self.temperature * TEMPERATURE_SCALE_CELSIUS
    }

    /// Read a numeric column as `f64`.
    pub fn value(&self, field: NumericField) -> f64 {
        match field {
            NumericField::Temperature => self.temperature,
            NumericField::TemperatureCelsius => self.temperature_celsius(),
            NumericField::Humidity => self.humidity,
            NumericField::Casual => f64::from(self.casual),
            NumericField::Registered => f64::from(self.registered),
            NumericField::Total => f64::from(self.total),
        }
    }
}

// ---------------------------------------------------------------------------
// NumericField – the continuous / count columns
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NumericField {
    Temperature,
    TemperatureCelsius,
    Humidity,
    Casual,
    Registered,
    Total,
}

impl NumericField {
    /// Column name as it appears in the source file.
    pub fn column_name(self) -> &'static str {
        match self {
            NumericField::Temperature => "temp",
            NumericField::TemperatureCelsius => "temp_celsius",
            NumericField::Humidity => "hum",
            NumericField::Casual => "casual",
            NumericField::Registered => "registered",
            NumericField::Total => "cnt",
        }
    }
}

impl fmt::Display for NumericField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column_name())
    }
}

// ---------------------------------------------------------------------------
// Table – immutable base rows plus a row selection
// ---------------------------------------------------------------------------

/// A read-only view over a shared set of records.
///
/// The base rows are loaded once and never mutated; filtering produces a new
/// `Table` that shares the same base and keeps its own list of row indices.
#[derive(Debug, Clone)]
pub struct Table {
    base: Arc<[Record]>,
    rows: Arc<[usize]>,
}

impl Table {
    /// Wrap freshly loaded records; every row is selected.
    pub fn from_records(records: Vec<Record>) -> Self {
        let rows: Arc<[usize]> = (0..records.len()).collect();
        Table {
            base: records.into(),
            rows,
        }
    }

    /// A view over the same base with a different row selection.
    pub(crate) fn with_rows(&self, rows: Vec<usize>) -> Self {
        Table {
            base: Arc::clone(&self.base),
            rows: rows.into(),
        }
    }

    /// Number of selected rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Number of rows in the underlying base table, regardless of selection.
    pub fn base_len(&self) -> usize {
        self.base.len()
    }

    /// Base indices of the selected rows, in base order.
    pub fn row_indices(&self) -> &[usize] {
        &self.rows
    }

    /// Whether two views share the same loaded base.
    pub fn shares_base_with(&self, other: &Table) -> bool {
        Arc::ptr_eq(&self.base, &other.base)
    }

    pub fn get(&self, i: usize) -> Option<&Record> {
        self.rows.get(i).map(|&r| &self.base[r])
    }

    pub fn iter(&self) -> impl Iterator<Item = &Record> + '_ {
        self.rows.iter().map(move |&r| &self.base[r])
    }

    /// Collect one numeric column of the selected rows.
    pub fn column(&self, field: NumericField) -> Vec<f64> {
        self.iter().map(|r| r.value(field)).collect()
    }

    /// Earliest and latest date among the selected rows.
    pub fn date_span(&self) -> Option<(NaiveDate, NaiveDate)> {
        self.iter().fold(None, |span, r| match span {
            None => Some((r.date, r.date)),
            Some((lo, hi)) => Some((lo.min(r.date), hi.max(r.date))),
        })
    }

    /// Whether the source carried an hour column.
    pub fn is_hourly(&self) -> bool {
        self.base.iter().any(|r| r.hour.is_some())
    }
}

impl PartialEq for Table {
    /// Two views are equal when they select the same records in the same order.
    fn eq(&self, other: &Self) -> bool {
        if Arc::ptr_eq(&self.base, &other.base) {
            return self.rows == other.rows;
        }
        self.len() == other.len() && self.iter().eq(other.iter())
    }
}
