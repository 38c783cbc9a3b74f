#![cfg(feature = "python-bindings")]

use pyo3::types::PyModuleMethods;
use pyo3::{Bound, PyResult, Python, pymodule, types::PyModule};

pub mod py_csv_scan;

#[pymodule]
fn csv_scanner(_py: Python, m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<py_csv_scan::PyCsvScan>()?;
    Ok(())
}
