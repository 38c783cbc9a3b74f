//! Host-facing glue: schema and connection-string parsing, and the single
//! read-only table an attached CSV file exposes.

use regex::Regex;
use serde::de::{Deserialize, Deserializer, MapAccess, Visitor};
use std::{fmt, path::PathBuf, sync::LazyLock};

use crate::scanner::{
    Result, ScanError,
    column::{ColumnDef, ColumnType, Schema},
    csv_scan::CsvScan,
    options::ScanOptions,
};

/// Schema name under which an attached file's table is registered
pub const DEFAULT_SCHEMA_NAME: &str = "csv_file";

static PARAMETER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\S+?)=(\{.*?\}|\S+)").expect("connection string pattern is valid")
});

/// `(name, type)` pairs of a JSON object, in written order and with
/// duplicate names kept
struct ColumnList(Vec<(String, String)>);

impl<'de> Deserialize<'de> for ColumnList {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct ColumnListVisitor;

        impl<'de> Visitor<'de> for ColumnListVisitor {
            type Value = ColumnList;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("an object mapping column names to type names")
            }

            fn visit_map<A>(self, mut map: A) -> std::result::Result<ColumnList, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut columns = Vec::with_capacity(map.size_hint().unwrap_or(0));
                while let Some(entry) = map.next_entry::<String, String>()? {
                    columns.push(entry);
                }
                Ok(ColumnList(columns))
            }
        }

        deserializer.deserialize_map(ColumnListVisitor)
    }
}

/// Parses a schema description such as `{"a": "varchar", "b": "bigint"}`.
///
/// The description is a JSON object of type names; columns keep their
/// written order.
pub fn parse_schema(schema: &str) -> Result<Schema> {
    let ColumnList(entries) = serde_json::from_str(schema)
        .map_err(|err| ScanError::Config(format!("invalid schema {schema:?}: {err}")))?;
    let columns = entries
        .into_iter()
        .map(|(name, type_name)| Ok(ColumnDef::new(name, type_name.parse::<ColumnType>()?)))
        .collect::<Result<Vec<_>>>()?;
    Schema::new(columns)
}

/// Parsed `file=... relname=... schema={...}` connection string
#[derive(Debug, Clone, PartialEq)]
pub struct AttachSpec {
    pub file: PathBuf,
    pub relname: String,
    pub schema: Schema,
}

impl AttachSpec {
    pub fn parse(connection: &str) -> Result<Self> {
        Ok(AttachSpec {
            file: PathBuf::from(named_parameter("file", connection)?),
            relname: named_parameter("relname", connection)?.to_string(),
            schema: parse_schema(named_parameter("schema", connection)?)?,
        })
    }
}

fn named_parameter<'a>(name: &str, connection: &'a str) -> Result<&'a str> {
    PARAMETER
        .captures_iter(connection)
        .find(|caps| &caps[1] == name)
        .and_then(|caps| caps.get(2))
        .map(|m| m.as_str())
        .ok_or_else(|| {
            ScanError::Config(format!(
                "could not find parameter {name} in connection string"
            ))
        })
}

/// The single table exposed by an attached CSV file
#[derive(Debug, Clone, PartialEq)]
pub struct CsvTable {
    schema_name: String,
    spec: AttachSpec,
}

impl CsvTable {
    pub fn attach(connection: &str) -> Result<Self> {
        let spec = AttachSpec::parse(connection)?;
        tracing::info!(
            file = %spec.file.display(),
            table = %spec.relname,
            columns = spec.schema.len(),
            "CSV file attached"
        );
        Ok(CsvTable {
            schema_name: DEFAULT_SCHEMA_NAME.to_string(),
            spec,
        })
    }

    pub fn schema_name(&self) -> &str {
        &self.schema_name
    }

    pub fn name(&self) -> &str {
        &self.spec.relname
    }

    pub fn schema(&self) -> &Schema {
        &self.spec.schema
    }

    /// Looks the table up by `schema.table`-style names; the default schema
    /// (`main`) resolves to this file's schema.
    pub fn lookup(&self, schema_name: &str, table: &str) -> Option<&Self> {
        let schema_matches = schema_name == self.schema_name || schema_name == "main";
        (schema_matches && table == self.spec.relname).then_some(self)
    }

    /// Binds a scan over the attached file with default options.
    pub fn scan(&self) -> Result<CsvScan> {
        CsvScan::open(&self.spec.file, self.spec.schema.clone(), ScanOptions::default())
    }
}
