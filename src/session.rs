//! Per-console presentation state.
//!
//! A `Session` belongs to exactly one console and is passed to it explicitly.
//! It holds the output theme and multi-valued entries the user has queued
//! one by one before registering a record.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::model::{Field, RecordDraft};
use crate::tokenizer::tokenize;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

#[derive(Debug, Clone, Default)]
pub struct Session {
    pub theme: Theme,
    pending: BTreeMap<Field, Vec<String>>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues every token of `text` for `field`. Returns how many were added.
    pub fn add_pending(&mut self, field: Field, text: &str) -> usize {
        let tokens = tokenize(text);
        let added = tokens.len();
        if added > 0 {
            self.pending
                .entry(field)
                .or_default()
                .extend(tokens.into_iter().map(str::to_string));
        }
        added
    }

    pub fn pending(&self) -> &BTreeMap<Field, Vec<String>> {
        &self.pending
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    pub fn clear_pending(&mut self) {
        self.pending.clear();
    }

    /// Copy of `draft` with the queued tokens appended to their fields.
    /// The queue itself is left alone until the caller knows the
    /// registration went through.
    pub fn merge_into(&self, draft: &RecordDraft) -> RecordDraft {
        let mut merged = draft.clone();
        for (field, tokens) in &self.pending {
            let slot = merged.field_mut(*field);
            let joined = {
                let mut parts: Vec<&str> = tokenize(slot);
                parts.extend(tokens.iter().map(String::as_str));
                parts.join(", ")
            };
            *slot = joined;
        }
        merged
    }
}
