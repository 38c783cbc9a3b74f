use std::path::PathBuf;

/// Returns the path to the sample CSV relative to the crate root.
///
/// Generate it with `cargo run --bin data_generator -- data/data.csv 100000`.
pub fn sample_csv_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("data")
        .join("data.csv")
}

/// Schema of the files written by `data_generator`.
pub const SAMPLE_SCHEMA: &str =
    r#"{"id": "bigint", "value": "bigint", "price": "double", "category": "varchar"}"#;
