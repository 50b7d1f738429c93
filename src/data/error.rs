use std::path::PathBuf;

use thiserror::Error;

/// Everything that can go wrong between reading the source file and handing a
/// summary table to the presentation layer.
#[derive(Debug, Error)]
pub enum DashboardError {
    /// Source missing, unreadable, malformed, or lacking required columns.
    #[error("data source {path}: {message}")]
    DataSource { path: PathBuf, message: String },

    /// A row violates a load-time invariant (count identity, value domain).
    #[error("data integrity violation at row {row}: {message}")]
    DataIntegrity { row: usize, message: String },

    /// A category code with no entry in its fixed label table.
    #[error("unknown {field} code {code}")]
    UnknownCode { field: &'static str, code: i64 },

    /// A selection label that does not name any category.
    #[error("unknown {field} label '{label}'")]
    UnknownLabel { field: &'static str, label: String },

    /// A binning input outside the bucket definition's domain.
    #[error("value {value} outside bucket domain [{lower}, {upper}]")]
    OutOfRange { value: f64, lower: f64, upper: f64 },

    #[error("invalid bucket definition: {0}")]
    InvalidBuckets(String),

    #[error("invalid filter criteria: {0}")]
    InvalidCriteria(String),

    /// A derived column does not line up with the table it is grouped against.
    #[error("derived column has {actual} rows, table has {expected}")]
    ColumnLength { expected: usize, actual: usize },

    /// A derived column of the right length, but taken from another row selection.
    #[error("column '{column}' was derived from a different table view")]
    MisalignedColumn { column: String },
}

impl DashboardError {
    pub(crate) fn data_source(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        DashboardError::DataSource {
            path: path.into(),
            message: message.into(),
        }
    }

    pub(crate) fn integrity(row: usize, message: impl Into<String>) -> Self {
        DashboardError::DataIntegrity {
            row,
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, DashboardError>;
