//! Per-request record of touched files
//!
//! Created empty at request start, mutated by write-class tool calls, and
//! flushed once before the stream ends.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::tools::diff::modified_lines;

/// Before/after snapshot of a written file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiffSnapshot {
    pub old_content: String,
    pub new_content: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeSet {
    /// Touched paths in first-touch order
    changed_files: Vec<String>,
    modified_lines: BTreeMap<String, Vec<usize>>,
    diff_data: BTreeMap<String, DiffSnapshot>,
}

impl ChangeSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a path as changed without line information (rename, delete)
    pub fn touch(&mut self, key: impl Into<String>) {
        let key = key.into();
        if !self.changed_files.contains(&key) {
            self.changed_files.push(key);
        }
    }

    /// Record a content write and return the modified line numbers.
    ///
    /// Line data is stored only when at least one line differs; a later
    /// write to the same path replaces the earlier snapshot.
    pub fn record_write(&mut self, key: impl Into<String>, old: &str, new: &str) -> Vec<usize> {
        let key = key.into();
        self.touch(key.clone());

        let lines = modified_lines(old, new);
        if !lines.is_empty() {
            self.modified_lines.insert(key.clone(), lines.clone());
            self.diff_data.insert(
                key,
                DiffSnapshot {
                    old_content: old.to_string(),
                    new_content: new.to_string(),
                },
            );
        }
        lines
    }

    pub fn is_empty(&self) -> bool {
        self.changed_files.is_empty()
    }

    pub fn changed_files(&self) -> &[String] {
        &self.changed_files
    }

    pub fn modified_lines(&self) -> &BTreeMap<String, Vec<usize>> {
        &self.modified_lines
    }

    pub fn diff_data(&self) -> &BTreeMap<String, DiffSnapshot> {
        &self.diff_data
    }
}
