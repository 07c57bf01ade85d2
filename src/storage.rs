use std::borrow::Cow;
use std::collections::HashSet;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::error::{RowError, StoreError};
use crate::model::{Record, COLUMNS};

/// Result of reading the backing table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadedTable {
    pub records: Vec<Record>,
    /// Rows that failed validation and were left out of `records`
    pub rejected: Vec<RowError>,
}

/// Persistence collaborator: whole-table load and whole-table rewrite.
pub trait RecordStore: Send + Sync {
    fn load(&self) -> Result<LoadedTable, StoreError>;
    fn save(&self, records: &[Record]) -> Result<(), StoreError>;
}

#[derive(Serialize)]
struct Document<'a> {
    columns: [&'static str; 7],
    records: &'a [Record],
}

/// JSON table on disk: `{ "columns": [...], "records": [...] }`.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    pub file_path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self { file_path: path.as_ref().to_path_buf() }
    }

    /// Sibling written before the swap: `<file name>.tmp`.
    fn tmp_path(&self) -> PathBuf {
        let mut name = self.file_path.file_name().map(OsString::from).unwrap_or_default();
        name.push(".tmp");
        self.file_path.with_file_name(name)
    }
}

impl RecordStore for JsonFileStore {
    fn load(&self) -> Result<LoadedTable, StoreError> {
        if !self.file_path.exists() {
            debug!(path = %self.file_path.display(), "no store file yet");
            return Ok(LoadedTable::default());
        }

        let bytes = fs::read(&self.file_path)?;
        let text = String::from_utf8_lossy(&bytes);
        // Bad bytes inside a string value only sink the row holding them.
        let lossy = matches!(text, Cow::Owned(_));
        if lossy {
            warn!(path = %self.file_path.display(), "store contains invalid UTF-8");
        }
        let doc: Value = serde_json::from_str(&text)?;
        let table = parse_document(&doc, lossy)?;

        for err in &table.rejected {
            warn!(path = %self.file_path.display(), "{}", err);
        }
        Ok(table)
    }

    fn save(&self, records: &[Record]) -> Result<(), StoreError> {
        if let Some(parent) = self.file_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_string_pretty(&Document { columns: COLUMNS, records })?;

        // Write aside then swap, so readers never see a half-written table.
        let tmp_path = self.tmp_path();
        fs::write(&tmp_path, json)?;
        fs::rename(&tmp_path, &self.file_path)?;

        debug!(path = %self.file_path.display(), count = records.len(), "store rewritten");
        Ok(())
    }
}

/// Keeps the table in process memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: Mutex<Vec<Record>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RecordStore for MemoryStore {
    fn load(&self) -> Result<LoadedTable, StoreError> {
        let records = self.records.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(LoadedTable { records: records.clone(), rejected: Vec::new() })
    }

    fn save(&self, records: &[Record]) -> Result<(), StoreError> {
        let mut stored = self.records.lock().map_err(|_| StoreError::Poisoned)?;
        *stored = records.to_vec();
        Ok(())
    }
}

fn parse_document(doc: &Value, lossy: bool) -> Result<LoadedTable, StoreError> {
    let obj = doc
        .as_object()
        .ok_or_else(|| StoreError::Malformed("top level is not an object".into()))?;

    if let Some(columns) = obj.get("columns") {
        let names: Option<Vec<&str>> = columns
            .as_array()
            .map(|cols| cols.iter().filter_map(Value::as_str).collect());
        if names.as_deref() != Some(&COLUMNS[..]) {
            return Err(StoreError::Malformed(format!("unexpected columns {}", columns)));
        }
    }

    let rows = obj
        .get("records")
        .and_then(Value::as_array)
        .ok_or_else(|| StoreError::Malformed("missing 'records' array".into()))?;

    let mut table = LoadedTable::default();
    let mut seen = HashSet::new();

    for (index, row) in rows.iter().enumerate() {
        match parse_row(index, row, lossy) {
            Ok(record) if !seen.insert(record.id) => table.rejected.push(RowError {
                index,
                field: "id",
                reason: format!("duplicates id {}", record.id),
            }),
            Ok(record) => table.records.push(record),
            Err(e) => table.rejected.push(e),
        }
    }
    Ok(table)
}

/// Strict per-field check of one stored row. Nothing is coerced.
///
/// `lossy` means the file was decoded with replacement characters; any text
/// field carrying one is rejected instead of being stored back mangled.
fn parse_row(index: usize, row: &Value, lossy: bool) -> Result<Record, RowError> {
    let reject = |field: &'static str, reason: &str| RowError { index, field, reason: reason.to_string() };

    let obj = row.as_object().ok_or_else(|| reject("*", "row is not an object"))?;

    let text = |obj: &Map<String, Value>, field: &'static str| {
        let value = obj
            .get(field)
            .and_then(Value::as_str)
            .ok_or_else(|| reject(field, "is missing or not text"))?;
        if lossy && value.contains(char::REPLACEMENT_CHARACTER) {
            return Err(reject(field, "is not valid UTF-8"));
        }
        Ok(value.to_string())
    };

    let id = obj
        .get("id")
        .and_then(Value::as_u64)
        .ok_or_else(|| reject("id", "is missing or not a non-negative integer"))?;

    let area_hectares = obj
        .get("area_hectares")
        .and_then(Value::as_f64)
        .ok_or_else(|| reject("area_hectares", "is missing or not a number"))?;
    if !(area_hectares.is_finite() && area_hectares > 0.0) {
        return Err(reject("area_hectares", "must be greater than zero"));
    }

    let created_at = text(obj, "created_at")?
        .parse::<DateTime<Utc>>()
        .map_err(|e| reject("created_at", &e.to_string()))?;

    Ok(Record {
        id,
        crop: text(obj, "crop")?,
        pests: text(obj, "pests")?,
        pesticides: text(obj, "pesticides")?,
        area_hectares,
        cities: text(obj, "cities")?,
        created_at,
    })
}
