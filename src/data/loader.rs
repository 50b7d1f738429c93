use std::path::Path;

use arrow::array::{Array, ArrayRef, AsArray};
use arrow::compute::cast;
use arrow::datatypes::{DataType, Float64Type, Int64Type};
use arrow::record_batch::RecordBatch;
use chrono::NaiveDate;
use log::{debug, info};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde::Deserialize;

use super::error::{DashboardError, Result};
use super::labels::{CategoryCode, Season, Weather, WorkingDay};
use super::model::{Record, Table};

/// Columns every source file must carry. `hr` and `cnt` are optional.
pub const REQUIRED_COLUMNS: &[&str] = &[
    "dteday",
    "season",
    "weathersit",
    "workingday",
    "temp",
    "hum",
    "casual",
    "registered",
];

const DATE_FORMAT: &str = "%Y-%m-%d";

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Load the usage table from a file.  Dispatch by extension.
///
/// Supported formats:
/// * `.csv`     – header row, one record per line (the UCI bike-sharing layout)
/// * `.parquet` – same column names; integer, float, string or date columns
pub fn load_file(path: &Path) -> Result<Table> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let records = match ext.as_str() {
        "csv" => load_csv(path)?,
        "parquet" | "pq" => load_parquet(path)?,
        other => {
            return Err(DashboardError::data_source(
                path,
                format!("unsupported file extension: .{other}"),
            ))
        }
    };

    info!("loaded {} records from {}", records.len(), path.display());
    Ok(Table::from_records(records))
}

// ---------------------------------------------------------------------------
// Raw row – what the file says, before validation
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct RawRow {
    dteday: String,
    #[serde(default)]
    hr: Option<i64>,
    season: i64,
    weathersit: i64,
    workingday: i64,
    temp: f64,
    hum: f64,
    casual: i64,
    registered: i64,
    #[serde(default)]
    cnt: Option<i64>,
}

impl RawRow {
    /// Validate one row and resolve its category codes.
    ///
    /// Nothing is repaired: a bad count, an out-of-domain measurement or an
    /// unmapped code rejects the whole load.
    fn into_record(self, row: usize) -> Result<Record> {
        let date = NaiveDate::parse_from_str(self.dteday.trim(), DATE_FORMAT).map_err(|e| {
            DashboardError::integrity(row, format!("invalid date '{}': {e}", self.dteday))
        })?;

        let hour = match self.hr {
            None => None,
            Some(h @ 0..=23) => Some(h as u8),
            Some(h) => {
                return Err(DashboardError::integrity(row, format!("hour {h} outside 0-23")))
            }
        };

        let temperature = unit_interval(row, "temp", self.temp)?;
        let humidity = unit_interval(row, "hum", self.hum)?;
        let casual = count(row, "casual", self.casual)?;
        let registered = count(row, "registered", self.registered)?;

        let total = casual.checked_add(registered).ok_or_else(|| {
            DashboardError::integrity(row, "casual + registered overflows")
        })?;
        if let Some(cnt) = self.cnt {
            if cnt != i64::from(total) {
                return Err(DashboardError::integrity(
                    row,
                    format!("casual ({casual}) + registered ({registered}) != cnt ({cnt})"),
                ));
            }
        }

        Ok(Record {
            date,
            hour,
            season: Season::from_code(self.season)?,
            weather: Weather::from_code(self.weathersit)?,
            working_day: WorkingDay::from_code(self.workingday)?,
            temperature,
            humidity,
            casual,
            registered,
            total,
        })
    }
}

fn unit_interval(row: usize, column: &str, value: f64) -> Result<f64> {
    if value.is_finite() && (0.0..=1.0).contains(&value) {
        Ok(value)
    } else {
        Err(DashboardError::integrity(
            row,
            format!("{column} = {value} outside [0, 1]"),
        ))
    }
}

fn count(row: usize, column: &str, value: i64) -> Result<u32> {
    u32::try_from(value).map_err(|_| {
        DashboardError::integrity(row, format!("{column} = {value} is not a valid count"))
    })
}

fn check_columns(path: &Path, present: &[String]) -> Result<()> {
    let missing: Vec<&str> = REQUIRED_COLUMNS
        .iter()
        .copied()
        .filter(|c| !present.iter().any(|p| p == c))
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(DashboardError::data_source(
            path,
            format!("missing required columns: {}", missing.join(", ")),
        ))
    }
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

fn load_csv(path: &Path) -> Result<Vec<Record>> {
    let mut reader = csv::Reader::from_path(path)
        .map_err(|e| DashboardError::data_source(path, format!("opening CSV: {e}")))?;
    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| DashboardError::data_source(path, format!("reading CSV headers: {e}")))?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();
    check_columns(path, &headers)?;
    debug!("CSV columns: {}", headers.join(","));

    let mut records = Vec::new();
    for (row_no, result) in reader.deserialize::<RawRow>().enumerate() {
        let raw = result
            .map_err(|e| DashboardError::data_source(path, format!("CSV row {row_no}: {e}")))?;
        records.push(raw.into_record(row_no)?);
    }
    Ok(records)
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Load a Parquet file with the same column names as the CSV layout.
///
/// Columns are cast to the loader's working types, so files written by
/// Pandas (int64 / float64 / object) and Polars (int32 / date) both work.
fn load_parquet(path: &Path) -> Result<Vec<Record>> {
    let file = std::fs::File::open(path)
        .map_err(|e| DashboardError::data_source(path, format!("opening parquet file: {e}")))?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)
        .map_err(|e| DashboardError::data_source(path, format!("reading parquet metadata: {e}")))?;
    let names: Vec<String> = builder
        .schema()
        .fields()
        .iter()
        .map(|f| f.name().clone())
        .collect();
    check_columns(path, &names)?;
    debug!("parquet columns: {}", names.join(","));

    let reader = builder
        .build()
        .map_err(|e| DashboardError::data_source(path, format!("building parquet reader: {e}")))?;

    let mut records = Vec::new();
    for batch_result in reader {
        let batch = batch_result
            .map_err(|e| DashboardError::data_source(path, format!("reading record batch: {e}")))?;
        for raw in batch_rows(path, &batch)? {
            let row = records.len();
            records.push(raw.into_record(row)?);
        }
    }
    Ok(records)
}

/// Turn one record batch into raw rows.
fn batch_rows(path: &Path, batch: &RecordBatch) -> Result<Vec<RawRow>> {
    let dates = string_column(path, batch, "dteday")?;
    let hours = optional_int_column(path, batch, "hr")?;
    let seasons = int_column(path, batch, "season")?;
    let weathers = int_column(path, batch, "weathersit")?;
    let working = int_column(path, batch, "workingday")?;
    let temps = float_column(path, batch, "temp")?;
    let hums = float_column(path, batch, "hum")?;
    let casuals = int_column(path, batch, "casual")?;
    let registereds = int_column(path, batch, "registered")?;
    let totals = optional_int_column(path, batch, "cnt")?;

    Ok((0..batch.num_rows())
        .map(|i| RawRow {
            dteday: dates[i].clone(),
            hr: hours.as_ref().map(|h| h[i]),
            season: seasons[i],
            weathersit: weathers[i],
            workingday: working[i],
            temp: temps[i],
            hum: hums[i],
            casual: casuals[i],
            registered: registereds[i],
            cnt: totals.as_ref().map(|c| c[i]),
        })
        .collect())
}

// -- Arrow helpers --

fn cast_column(path: &Path, batch: &RecordBatch, name: &str, to: &DataType) -> Result<ArrayRef> {
    let col = batch
        .column_by_name(name)
        .ok_or_else(|| DashboardError::data_source(path, format!("missing column '{name}'")))?;
    if col.null_count() > 0 {
        return Err(DashboardError::data_source(
            path,
            format!("column '{name}' contains nulls"),
        ));
    }
    cast(col, to).map_err(|e| {
        DashboardError::data_source(
            path,
            format!("column '{name}' ({:?}) is not {to:?}: {e}", col.data_type()),
        )
    })
}

fn int_column(path: &Path, batch: &RecordBatch, name: &str) -> Result<Vec<i64>> {
    let arr = cast_column(path, batch, name, &DataType::Int64)?;
    Ok(arr.as_primitive::<Int64Type>().values().to_vec())
}

fn optional_int_column(path: &Path, batch: &RecordBatch, name: &str) -> Result<Option<Vec<i64>>> {
    if batch.column_by_name(name).is_none() {
        return Ok(None);
    }
    int_column(path, batch, name).map(Some)
}

fn float_column(path: &Path, batch: &RecordBatch, name: &str) -> Result<Vec<f64>> {
    let arr = cast_column(path, batch, name, &DataType::Float64)?;
    Ok(arr.as_primitive::<Float64Type>().values().to_vec())
}

fn string_column(path: &Path, batch: &RecordBatch, name: &str) -> Result<Vec<String>> {
    let arr = cast_column(path, batch, name, &DataType::Utf8)?;
    let strings = arr.as_string::<i32>();
    Ok((0..strings.len()).map(|i| strings.value(i).to_string()).collect())
}
