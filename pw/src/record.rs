//! Conversation records
//!
//! A [`RecordSequence`] is the corpus the dynamic phase queries. Indices used by
//! template functions are 1-based; anything outside `[1, len]` is an empty
//! result rather than an error.

use std::path::Path;

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// A single conversational turn
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    role: String,
    content: String,
}

impl Record {
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
        }
    }

    /// Create a user record
    pub fn user(content: impl Into<String>) -> Self {
        Self::new("user", content)
    }

    /// Create an assistant record
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new("assistant", content)
    }

    pub fn role(&self) -> &str {
        &self.role
    }

    pub fn content(&self) -> &str {
        &self.content
    }
}

/// An ordered, append-only sequence of records
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordSequence {
    records: Vec<Record>,
}

impl RecordSequence {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_records(records: Vec<Record>) -> Self {
        Self { records }
    }

    /// Load a sequence from a JSON array of `{role, content}` objects
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        debug!(?path, "RecordSequence::load: called");
        let content = std::fs::read_to_string(path)
            .context(format!("Failed to read conversation: {}", path.display()))?;
        let records: Vec<Record> = serde_json::from_str(&content)
            .context(format!("Invalid conversation file: {}", path.display()))?;
        debug!(count = records.len(), "RecordSequence::load: loaded records");
        Ok(Self { records })
    }

    /// Write the sequence as a pretty-printed JSON array
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        debug!(?path, count = self.records.len(), "RecordSequence::save: called");
        let content = serde_json::to_string_pretty(&self.records)?;
        std::fs::write(path, content)
            .context(format!("Failed to write conversation: {}", path.display()))?;
        Ok(())
    }

    pub fn push(&mut self, record: Record) {
        self.records.push(record);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn iter(&self) -> impl Iterator<Item = &Record> {
        self.records.iter()
    }

    /// Record at a 1-based index
    pub fn get(&self, index: i64) -> Option<&Record> {
        if index < 1 {
            return None;
        }
        self.records.get((index - 1) as usize)
    }

    /// Records in the inclusive 1-based window `[start, end]`
    ///
    /// The window is clamped to the sequence; an inverted or out-of-range
    /// window is empty.
    pub fn window(&self, start: i64, end: i64) -> &[Record] {
        let len = self.records.len() as i64;
        let start = start.max(1);
        let end = end.min(len);
        if start > end {
            return &[];
        }
        &self.records[(start - 1) as usize..end as usize]
    }

    /// The first `n` records
    pub fn first(&self, n: i64) -> &[Record] {
        let n = n.clamp(0, self.records.len() as i64) as usize;
        &self.records[..n]
    }

    /// The last `n` records, in original order
    pub fn last(&self, n: i64) -> &[Record] {
        let n = n.clamp(0, self.records.len() as i64) as usize;
        &self.records[self.records.len() - n..]
    }
}

impl FromIterator<Record> for RecordSequence {
    fn from_iter<I: IntoIterator<Item = Record>>(iter: I) -> Self {
        Self {
            records: iter.into_iter().collect(),
        }
    }
}

/// Join record contents with newlines
pub(crate) fn join_contents(records: &[Record]) -> String {
    records.iter().map(Record::content).collect::<Vec<_>>().join("\n")
}
