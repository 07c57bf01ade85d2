pub mod model;
pub mod error;
pub mod tokenizer;
pub mod frequency;
pub mod crosstab;
pub mod summary;
pub mod filter;
pub mod dashboard;
pub mod storage;
pub mod parser;
pub mod session;
pub mod console;
pub mod server;
pub mod config;

use std::fmt;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::crosstab::{CrossTab, CrossTabReport};
use crate::dashboard::Dashboard;
use crate::error::{NatureError, StoreError};
use crate::filter::Query;
use crate::frequency::{aggregate, FrequencyTable};
use crate::model::{Field, Record, RecordDraft};
use crate::storage::RecordStore;
use crate::summary::{summarize, Summary};

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DeleteOutcome {
    Deleted,
    NotFound,
}

/// Record table plus the frequency engine over it.
///
/// Every mutation is a read-modify-write of the whole table, done while
/// holding `write_lock`.
pub struct NatureDb<S: RecordStore> {
    store: S,
    write_lock: Mutex<()>,
}

impl<S: RecordStore> fmt::Debug for NatureDb<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NatureDb")
        .field("store", &std::any::type_name::<S>())
        .finish_non_exhaustive()
    }
}

impl<S: RecordStore> NatureDb<S> {
    pub fn new(store: S) -> Self {
        Self { store, write_lock: Mutex::new(()) }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Current table. An unreadable store reads as empty.
    pub fn records(&self) -> Vec<Record> {
        match self.store.load() {
            Ok(table) => table.records,
            Err(e) => {
                warn!("store unreadable, continuing with an empty table: {}", e);
                Vec::new()
            }
        }
    }

    /// Table for a rewrite. Refuses anything that a rewrite would lose.
    fn load_for_write(&self) -> Result<Vec<Record>, NatureError> {
        let table = self.store.load()?;
        if !table.rejected.is_empty() {
            return Err(NatureError::CorruptStore(table.rejected.len()));
        }
        Ok(table.records)
    }

    pub fn register(&self, draft: &RecordDraft) -> Result<Record, NatureError> {
        self.register_at(draft, Utc::now())
    }

    pub fn register_at(&self, draft: &RecordDraft, now: DateTime<Utc>) -> Result<Record, NatureError> {
        let _guard = self.write_lock.lock().map_err(|_| StoreError::Poisoned)?;

        let mut records = self.load_for_write()?;
        let id = match records.iter().map(|r| r.id).max() {
            None => 1,
            Some(max) => max.checked_add(1).ok_or(NatureError::IdSpaceExhausted(max))?,
        };
        let record = draft.validate(id, now)?;

        records.push(record.clone());
        self.store.save(&records)?;

        info!(id = record.id, crop = %record.crop, area = record.area_hectares, "record registered");
        Ok(record)
    }

    pub fn delete(&self, id: u64) -> Result<DeleteOutcome, NatureError> {
        let _guard = self.write_lock.lock().map_err(|_| StoreError::Poisoned)?;

        let records = self.load_for_write()?;
        let before = records.len();
        let remaining: Vec<Record> = records.into_iter().filter(|r| r.id != id).collect();

        if remaining.len() == before {
            info!(id, "delete: record not found");
            return Ok(DeleteOutcome::NotFound);
        }

        self.store.save(&remaining)?;
        info!(id, "record deleted");
        Ok(DeleteOutcome::Deleted)
    }

    pub fn query(&self, query: &Query) -> Vec<Record> {
        query.apply(&self.records())
    }

    pub fn frequencies(&self, field: Field) -> FrequencyTable {
        aggregate(&self.records(), field)
    }

    pub fn cross_tab(&self, rows: Field, columns: Field) -> CrossTabReport {
        CrossTab::compute(&self.records(), rows, columns).report()
    }

    pub fn summary(&self) -> Summary {
        summarize(&self.records())
    }

    pub fn dashboard(&self) -> Dashboard {
        Dashboard::build(&self.records())
    }
}
