//! Glue table schema files
//!
//! Each data source ships one JSON schema file per zone describing the
//! columns and storage format of the corresponding Glue table. The files
//! are consumed verbatim: column names and types flow unchanged into the
//! table definition.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors raised while loading table schema files
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("failed to read schema file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse schema file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("schema file {path} defines no columns")]
    NoColumns { path: PathBuf },

    #[error("failed to list schema directory {path}: {source}")]
    ListDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// A single column of a Glue table
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ColumnDef {
    pub name: String,
    #[serde(rename = "type")]
    pub data_type: String,
}

/// Description of one Glue table, deserialized from a schema file
#[derive(Debug, Clone, Deserialize)]
pub struct TableSchema {
    /// Table name within the Glue database
    pub table: String,
    /// Bucket prefix holding the table's data (e.g. `customer/landing`)
    pub prefix: String,
    /// Column definitions, in order
    pub columns: Vec<ColumnDef>,
    #[serde(default = "default_classification")]
    pub classification: String,
    #[serde(default = "default_serde_library")]
    pub serde_library: String,
    #[serde(default = "default_input_format")]
    pub input_format: String,
    #[serde(default = "default_output_format")]
    pub output_format: String,
}

fn default_classification() -> String {
    "json".to_string()
}

fn default_serde_library() -> String {
    "org.openx.data.jsonserde.JsonSerDe".to_string()
}

fn default_input_format() -> String {
    "org.apache.hadoop.mapred.TextInputFormat".to_string()
}

fn default_output_format() -> String {
    "org.apache.hadoop.hive.ql.io.HiveIgnoreKeyTextOutputFormat".to_string()
}

impl TableSchema {
    /// S3 location the table points at
    pub fn storage_location(&self, bucket: &str) -> String {
        format!("s3://{}/{}", bucket, self.prefix.trim_matches('/'))
    }
}

/// Load a single table schema from a JSON file.
pub fn load_table_schema(path: &Path) -> Result<TableSchema, SchemaError> {
    let contents = std::fs::read_to_string(path).map_err(|source| SchemaError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    let schema: TableSchema =
        serde_json::from_str(&contents).map_err(|source| SchemaError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

    if schema.columns.is_empty() {
        return Err(SchemaError::NoColumns {
            path: path.to_path_buf(),
        });
    }

    Ok(schema)
}

/// Discover and load every `*.json` schema under a directory.
///
/// Results are sorted by file name so table creation order is
/// deterministic across runs.
pub fn discover_table_schemas(dir: &Path) -> Result<Vec<TableSchema>, SchemaError> {
    let entries = std::fs::read_dir(dir).map_err(|source| SchemaError::ListDir {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut paths: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.is_file() && p.extension().is_some_and(|ext| ext == "json"))
        .collect();
    paths.sort();

    paths.iter().map(|p| load_table_schema(p)).collect()
}
