use std::fmt;

use thiserror::Error;

pub mod bind;
pub mod block;
pub mod buffer;
pub mod column;
pub mod coordinator;
pub mod csv_scan;
pub mod file;
pub mod options;
pub mod reader;

use column::ColumnType;

/// Error type used across the crate
#[derive(Debug, Error)]
pub enum ScanError {
    /// Rejected at bind time; the scan never starts.
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(
        "Could not read CSV block at offset {offset}: single row too large for buffer of {buffer_size} bytes"
    )]
    OversizedRow { offset: u64, buffer_size: usize },

    #[error("Parse error at byte {offset}: column '{column}' expects {column_type}, got {value:?}")]
    Parse {
        offset: u64,
        column: String,
        column_type: ColumnType,
        value: String,
    },

    #[error("Malformed row at byte {offset}: expected {expected} fields, got {found}")]
    FieldCount {
        offset: u64,
        expected: usize,
        found: usize,
    },

    #[error("{0} is not supported")]
    Unsupported(&'static str),

    #[error("Thread pool error: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

pub type Result<T> = std::result::Result<T, ScanError>;

/// A single decoded field
#[derive(Debug, Clone)]
pub enum Value {
    Text(String),
    Int64(i64),
    Float64(f64),
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Text(a), Value::Text(b)) => a == b,
            (Value::Int64(a), Value::Int64(b)) => a == b,
            (Value::Float64(a), Value::Float64(b)) => a.to_bits() == b.to_bits(),
            _ => false,
        }
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int64(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float64(v)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Text(v) => f.write_str(v),
            Value::Int64(v) => write!(f, "{v}"),
            Value::Float64(v) => write!(f, "{v}"),
        }
    }
}
