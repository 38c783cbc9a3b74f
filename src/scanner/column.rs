use arrow2::{
    array::{Array, Float64Array, Int64Array, Utf8Array},
    chunk::Chunk,
    datatypes::{DataType, Field, Schema as ArrowSchema},
};
use std::{fmt, str::FromStr, sync::Arc};

use crate::scanner::{Result as ScanResult, ScanError, Value};

/// The closed set of types a column can be declared with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnType {
    Text,
    Int64,
    Float64,
}

impl ColumnType {
    pub fn sql_name(&self) -> &'static str {
        match self {
            ColumnType::Text => "VARCHAR",
            ColumnType::Int64 => "BIGINT",
            ColumnType::Float64 => "DOUBLE",
        }
    }

    fn arrow_type(&self) -> DataType {
        match self {
            ColumnType::Text => DataType::LargeUtf8,
            ColumnType::Int64 => DataType::Int64,
            ColumnType::Float64 => DataType::Float64,
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.sql_name())
    }
}

impl FromStr for ColumnType {
    type Err = ScanError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "varchar" | "text" | "string" => Ok(ColumnType::Text),
            "bigint" | "int8" | "int64" | "long" => Ok(ColumnType::Int64),
            "double" | "float8" | "float64" => Ok(ColumnType::Float64),
            other => Err(ScanError::Config(format!(
                "unsupported column type '{other}': only VARCHAR, BIGINT, and DOUBLE are supported"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDef {
    pub name: String,
    pub column_type: ColumnType,
}

impl ColumnDef {
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        ColumnDef {
            name: name.into(),
            column_type,
        }
    }
}

/// Ordered column list, fixed for the lifetime of a scan.
///
/// Duplicate names are passed through untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    columns: Vec<ColumnDef>,
}

impl Schema {
    pub fn new(columns: Vec<ColumnDef>) -> Result<Self, ScanError> {
        if columns.is_empty() {
            return Err(ScanError::Config(
                "schema requires at least a single column".into(),
            ));
        }
        Ok(Schema { columns })
    }

    pub fn columns(&self) -> &[ColumnDef] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.columns.iter().map(|c| c.name.as_str())
    }

    pub fn types(&self) -> impl Iterator<Item = ColumnType> + '_ {
        self.columns.iter().map(|c| c.column_type)
    }

    pub fn to_arrow(&self) -> ArrowSchema {
        let fields: Vec<Field> = self
            .columns
            .iter()
            .map(|c| Field::new(&c.name, c.column_type.arrow_type(), false))
            .collect();
        ArrowSchema::from(fields)
    }
}

/// Typed values of one column of a batch
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnVector {
    Text(Vec<String>),
    Int64(Vec<i64>),
    Float64(Vec<f64>),
}

impl ColumnVector {
    pub fn with_capacity(column_type: ColumnType, capacity: usize) -> Self {
        match column_type {
            ColumnType::Text => ColumnVector::Text(Vec::with_capacity(capacity)),
            ColumnType::Int64 => ColumnVector::Int64(Vec::with_capacity(capacity)),
            ColumnType::Float64 => ColumnVector::Float64(Vec::with_capacity(capacity)),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            ColumnVector::Text(v) => v.len(),
            ColumnVector::Int64(v) => v.len(),
            ColumnVector::Float64(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, idx: usize) -> Option<Value> {
        match self {
            ColumnVector::Text(v) => v.get(idx).map(|s| Value::Text(s.clone())),
            ColumnVector::Int64(v) => v.get(idx).copied().map(Value::Int64),
            ColumnVector::Float64(v) => v.get(idx).copied().map(Value::Float64),
        }
    }

    pub fn as_text(&self) -> Option<&[String]> {
        match self {
            ColumnVector::Text(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<&[i64]> {
        match self {
            ColumnVector::Int64(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<&[f64]> {
        match self {
            ColumnVector::Float64(v) => Some(v),
            _ => None,
        }
    }

    fn truncate(&mut self, len: usize) {
        match self {
            ColumnVector::Text(v) => v.truncate(len),
            ColumnVector::Int64(v) => v.truncate(len),
            ColumnVector::Float64(v) => v.truncate(len),
        }
    }

    fn column_type(&self) -> ColumnType {
        match self {
            ColumnVector::Text(_) => ColumnType::Text,
            ColumnVector::Int64(_) => ColumnType::Int64,
            ColumnVector::Float64(_) => ColumnType::Float64,
        }
    }

    fn append(&mut self, other: &mut ColumnVector) -> ScanResult<()> {
        match (self, other) {
            (ColumnVector::Text(a), ColumnVector::Text(b)) => a.append(b),
            (ColumnVector::Int64(a), ColumnVector::Int64(b)) => a.append(b),
            (ColumnVector::Float64(a), ColumnVector::Float64(b)) => a.append(b),
            (a, b) => {
                return Err(ScanError::Config(format!(
                    "cannot append a {} column to a {} column",
                    b.column_type(),
                    a.column_type()
                )));
            }
        }
        Ok(())
    }

    fn to_arrow(&self) -> Arc<dyn Array> {
        match self {
            ColumnVector::Text(v) => Arc::new(Utf8Array::<i64>::from_slice(v)) as Arc<dyn Array>,
            ColumnVector::Int64(v) => Arc::new(Int64Array::from_slice(v)) as Arc<dyn Array>,
            ColumnVector::Float64(v) => Arc::new(Float64Array::from_slice(v)) as Arc<dyn Array>,
        }
    }
}

/// Position of a batch in file order
///
/// `block_index` orders blocks by file offset; `sequence` orders the batches
/// cut from one block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct BatchKey {
    pub block_index: u64,
    pub sequence: u64,
}

/// A column-major group of parsed rows
#[derive(Debug, Clone, PartialEq)]
pub struct Batch {
    columns: Vec<ColumnVector>,
    row_count: usize,
    reader_index: u64,
    key: BatchKey,
}

impl Batch {
    pub fn new(schema: &Schema, capacity: usize) -> Self {
        Batch {
            columns: schema
                .types()
                .map(|t| ColumnVector::with_capacity(t, capacity))
                .collect(),
            row_count: 0,
            reader_index: 0,
            key: BatchKey::default(),
        }
    }

    pub fn len(&self) -> usize {
        self.row_count
    }

    pub fn is_empty(&self) -> bool {
        self.row_count == 0
    }

    pub fn column(&self, idx: usize) -> Option<&ColumnVector> {
        self.columns.get(idx)
    }

    pub fn columns(&self) -> &[ColumnVector] {
        &self.columns
    }

    /// Identity of the worker that produced this batch.
    pub fn reader_index(&self) -> u64 {
        self.reader_index
    }

    pub fn key(&self) -> BatchKey {
        self.key
    }

    pub(crate) fn set_origin(&mut self, reader_index: u64, key: BatchKey) {
        self.reader_index = reader_index;
        self.key = key;
    }

    pub(crate) fn columns_mut(&mut self) -> &mut [ColumnVector] {
        &mut self.columns
    }

    /// Marks one more row as complete. Every column must already hold it.
    pub(crate) fn commit_row(&mut self) {
        self.row_count += 1;
        debug_assert!(self.columns.iter().all(|c| c.len() == self.row_count));
    }

    /// Drops any values pushed past the last committed row.
    pub(crate) fn rollback_partial_row(&mut self) {
        let len = self.row_count;
        for column in &mut self.columns {
            column.truncate(len);
        }
    }

    pub fn row(&self, idx: usize) -> Option<Vec<Value>> {
        if idx >= self.row_count {
            return None;
        }
        self.columns.iter().map(|c| c.get(idx)).collect()
    }

    pub fn rows(&self) -> impl Iterator<Item = Vec<Value>> + '_ {
        (0..self.row_count).filter_map(|i| self.row(i))
    }

    /// Concatenates batches, in the order given, into one batch.
    ///
    /// Fails with [`ScanError::Config`] if a batch does not have the columns
    /// `schema` declares.
    pub fn concat(
        schema: &Schema,
        batches: impl IntoIterator<Item = Batch>,
    ) -> ScanResult<Batch> {
        let mut out = Batch::new(schema, 0);
        for mut batch in batches {
            if batch.columns.len() != out.columns.len() {
                return Err(ScanError::Config(format!(
                    "cannot concatenate a batch of {} columns into a schema of {}",
                    batch.columns.len(),
                    out.columns.len()
                )));
            }
            for (dst, src) in out.columns.iter_mut().zip(batch.columns.iter_mut()) {
                dst.append(src)?;
            }
            out.row_count += batch.row_count;
        }
        Ok(out)
    }

    pub fn to_arrow(&self, schema: &Schema) -> (ArrowSchema, Chunk<Arc<dyn Array>>) {
        let arrays = self.columns.iter().map(ColumnVector::to_arrow).collect();
        (schema.to_arrow(), Chunk::new(arrays))
    }
}
