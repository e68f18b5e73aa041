// src/store/mod.rs

//! Local Store: the tabular snapshot a node reads before a fetch cycle and
//! overwrites after it.
//!
//! Snapshots are CSV files whose header row is the node's configured
//! `column_names`. Loading yields one JSON array of strings per row; saving
//! accepts arrays (positional), objects (looked up by column name) or scalars
//! (single cell).

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::config::PersistenceConfig;
use crate::fs::{FileSystem, RealFileSystem};
use crate::types::Record;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("reading snapshot {path:?}: {reason:#}")]
    Read { path: PathBuf, reason: anyhow::Error },

    #[error("writing snapshot {path:?}: {reason:#}")]
    Write { path: PathBuf, reason: anyhow::Error },

    #[error("malformed CSV in {path:?}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
}

/// CSV snapshot store rooted at a directory.
///
/// Relative persistence paths are resolved against `root` (the directory of
/// the config file when running from the CLI).
#[derive(Debug, Clone)]
pub struct LocalStore {
    fs: Arc<dyn FileSystem>,
    root: PathBuf,
}

impl LocalStore {
    pub fn new(fs: Arc<dyn FileSystem>, root: impl Into<PathBuf>) -> Self {
        Self {
            fs,
            root: root.into(),
        }
    }

    /// Store backed by the real filesystem.
    pub fn on_disk(root: impl Into<PathBuf>) -> Self {
        Self::new(Arc::new(RealFileSystem), root)
    }

    pub fn resolve(&self, path: &str) -> PathBuf {
        let p = Path::new(path);
        if p.is_absolute() {
            p.to_path_buf()
        } else {
            self.root.join(p)
        }
    }

    /// Read the snapshot described by `target`.
    ///
    /// A missing file is not an error: it is the first-run case and yields
    /// `Ok(None)`.
    pub fn load(&self, target: &PersistenceConfig) -> Result<Option<Vec<Record>>, StoreError> {
        let path = self.resolve(&target.path);
        if !self.fs.is_file(&path) {
            debug!(path = ?path, "no local snapshot yet");
            return Ok(None);
        }

        let bytes = self.fs.read(&path).map_err(|reason| StoreError::Read {
            path: path.clone(),
            reason,
        })?;

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(bytes.as_slice());

        let mut records = Vec::new();
        for row in reader.records() {
            let row = row.map_err(|source| StoreError::Csv {
                path: path.clone(),
                source,
            })?;
            records.push(Value::Array(
                row.iter().map(|cell| Value::String(cell.to_string())).collect(),
            ));
        }

        debug!(path = ?path, records = records.len(), "loaded local snapshot");
        Ok(Some(records))
    }

    /// Overwrite the snapshot with `records`.
    ///
    /// The same records in the same order always produce the same bytes.
    pub fn save(&self, target: &PersistenceConfig, records: &[Record]) -> Result<(), StoreError> {
        let path = self.resolve(&target.path);
        let bytes = encode_csv(&target.column_names, records).map_err(|source| {
            StoreError::Csv {
                path: path.clone(),
                source,
            }
        })?;

        self.fs
            .write(&path, &bytes)
            .map_err(|reason| StoreError::Write {
                path: path.clone(),
                reason,
            })?;

        debug!(path = ?path, records = records.len(), "saved local snapshot");
        Ok(())
    }
}

fn encode_csv(columns: &[String], records: &[Record]) -> Result<Vec<u8>, csv::Error> {
    let mut writer = csv::WriterBuilder::new()
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());

    writer.write_record(columns)?;
    for record in records {
        writer.write_record(row_cells(columns, record))?;
    }

    writer
        .into_inner()
        .map_err(|e| csv::Error::from(e.into_error()))
}

/// Lay a record out as exactly `columns.len()` cells.
fn row_cells(columns: &[String], record: &Record) -> Vec<String> {
    let mut cells: Vec<String> = match record {
        Value::Array(items) => items.iter().map(cell_text).collect(),
        Value::Object(map) => columns
            .iter()
            .map(|c| map.get(c).map(cell_text).unwrap_or_default())
            .collect(),
        other => vec![cell_text(other)],
    };
    cells.resize(columns.len(), String::new());
    cells
}

/// Text of a single cell: strings verbatim, `null` empty, anything else as JSON.
pub fn cell_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn columns(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn rows_are_padded_and_truncated_to_the_header() {
        let cols = columns(&["a", "b"]);
        assert_eq!(row_cells(&cols, &json!(["1"])), vec!["1", ""]);
        assert_eq!(row_cells(&cols, &json!(["1", "2", "3"])), vec!["1", "2"]);
    }

    #[test]
    fn objects_are_laid_out_by_column_name() {
        let cols = columns(&["id", "name"]);
        let cells = row_cells(&cols, &json!({"name": "x", "id": 7, "extra": true}));
        assert_eq!(cells, vec!["7", "x"]);
    }

    #[test]
    fn encode_writes_header_then_rows() {
        let cols = columns(&["index", "time"]);
        let bytes = encode_csv(&cols, &[json!(["100", "2024-06-01"])]).unwrap();
        assert_eq!(String::from_utf8(bytes).unwrap(), "index,time\n100,2024-06-01\n");
    }
}
