use arrow2::ffi::{ArrowArray, ArrowSchema, export_array_to_c, export_field_to_c};
use pyo3::exceptions;
use pyo3::prelude::*;
use pyo3::types::{PyDict, PyList};
use std::sync::Arc;

use crate::scanner::{
    ScanError,
    column::{ColumnDef, ColumnType, Schema},
    csv_scan::CsvScan,
    file::MmapFile,
    options::ScanOptions,
};

/// Convert Rust errors to Python exceptions
impl From<ScanError> for PyErr {
    fn from(err: ScanError) -> PyErr {
        match err {
            ScanError::Config(_) => exceptions::PyValueError::new_err(err.to_string()),
            ScanError::Io(_) => exceptions::PyIOError::new_err(err.to_string()),
            _ => exceptions::PyRuntimeError::new_err(err.to_string()),
        }
    }
}

/// `scan = CsvScan("data.csv", {"id": "bigint", "name": "varchar"}, buffer_size=1 << 20)`
#[pyclass(name = "CsvScan")]
pub struct PyCsvScan {
    inner: CsvScan,
}

#[pymethods]
impl PyCsvScan {
    #[new]
    #[pyo3(signature = (path, schema, buffer_size=None, threads=None, batch_size=None))]
    pub fn new(
        path: String,
        schema: &Bound<'_, PyDict>,
        buffer_size: Option<usize>,
        threads: Option<usize>,
        batch_size: Option<usize>,
    ) -> PyResult<Self> {
        let mut columns = Vec::with_capacity(schema.len());
        for (name, type_name) in schema.iter() {
            let name: String = name.extract()?;
            let column_type: ColumnType = type_name.extract::<String>()?.parse()?;
            columns.push(ColumnDef::new(name, column_type));
        }

        let mut options = ScanOptions::default();
        if let Some(buffer_size) = buffer_size {
            options = options.with_buffer_size(buffer_size);
        }
        if let Some(threads) = threads {
            options = options.with_threads(threads);
        }
        if let Some(batch_size) = batch_size {
            options = options.with_batch_size(batch_size);
        }

        let file = MmapFile::open(&path).map_err(ScanError::from)?;
        let inner = CsvScan::bind(Arc::new(file), Schema::new(columns)?, options)?;
        Ok(PyCsvScan { inner })
    }

    pub fn estimate_row_count(&self) -> u64 {
        self.inner.estimate_row_count()
    }

    /// Column names and SQL type names, in declaration order
    pub fn schema(&self) -> Vec<(String, String)> {
        self.inner
            .schema()
            .columns()
            .iter()
            .map(|c| (c.name.clone(), c.column_type.sql_name().to_string()))
            .collect()
    }

    /// Scan the whole file (without holding the GIL) and return a pyarrow Table
    pub fn to_arrow(&self, py: Python<'_>) -> PyResult<Py<PyAny>> {
        let scan = &self.inner;
        let table = py.allow_threads(|| scan.collect())?;
        let (schema, chunk) = table.to_arrow(scan.schema());

        // Export schema fields to C ABI
        let c_schema_fields: Vec<ArrowSchema> =
            schema.fields.iter().map(export_field_to_c).collect();

        // Export arrays to C ABI, no copy of the column data
        let c_arrays: Vec<ArrowArray> = chunk
            .arrays()
            .iter()
            .map(|array| export_array_to_c(array.to_boxed()))
            .collect();

        let pyarrow = py.import("pyarrow")?;

        let fields_obj = PyList::empty(py);
        for c_schema_field in &c_schema_fields {
            let field_ptr = c_schema_field as *const ArrowSchema as usize;
            let field_obj = pyarrow
                .getattr("Field")?
                .getattr("_import_from_c")?
                .call1((field_ptr,))?;
            fields_obj.append(field_obj)?;
        }
        let schema_obj = pyarrow.getattr("schema")?.call1((fields_obj,))?;

        let arrays_obj = PyList::empty(py);
        for (c_array, c_schema_field) in c_arrays.iter().zip(c_schema_fields.iter()) {
            let array_ptr = c_array as *const ArrowArray as usize;
            let schema_ptr = c_schema_field as *const ArrowSchema as usize;
            let arr_obj = pyarrow
                .getattr("Array")?
                .getattr("_import_from_c")?
                .call1((array_ptr, schema_ptr))?;
            arrays_obj.append(arr_obj)?;
        }

        let table = pyarrow
            .getattr("Table")?
            .getattr("from_arrays")?
            .call1((arrays_obj, py.None(), schema_obj))?;

        Ok(table.into())
    }

    fn __getstate__(&self) -> PyResult<()> {
        Err(ScanError::Unsupported("serializing a CSV scan").into())
    }

    fn __repr__(&self) -> String {
        format!(
            "CsvScan({}, columns={}, buffer_size={})",
            self.inner.display_name(),
            self.inner.schema().len(),
            self.inner.options().buffer_size
        )
    }
}
