// 🚮 Invalid Owner Sink - Audit trail for everything we could not resolve
//
// Nothing is dropped silently: every rejected candidate lands here with its
// raw text and a reason, and every lossy cleanup (removed designation,
// unusable interest annotation) leaves an audit note.

use crate::error::RejectReason;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One rejected owner candidate, as written to `invalid_owners`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvalidOwnerRecord {
    pub raw: String,
    pub reason: String,
}

/// Something removed from owner text that did not make it into a payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditNote {
    pub raw: String,
    pub note: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SinkSummary {
    pub total: usize,
    pub by_category: BTreeMap<String, usize>,
    pub notes: usize,
}

#[derive(Debug, Default)]
pub struct InvalidOwnerSink {
    records: Vec<InvalidOwnerRecord>,
    notes: Vec<AuditNote>,
    by_category: BTreeMap<String, usize>,
}

impl InvalidOwnerSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a rejection. Exact duplicates (same raw + reason) are kept once;
    /// returns false for a duplicate.
    pub fn reject(&mut self, raw: &str, reason: &RejectReason) -> bool {
        let record = InvalidOwnerRecord {
            raw: raw.trim().to_string(),
            reason: reason.to_string(),
        };
        if self.records.contains(&record) {
            return false;
        }

        tracing::debug!(raw = %record.raw, reason = %record.reason, "owner candidate rejected");
        *self
            .by_category
            .entry(reason.category().to_string())
            .or_insert(0) += 1;
        self.records.push(record);
        true
    }

    pub fn note(&mut self, raw: &str, note: impl Into<String>) {
        let note = AuditNote {
            raw: raw.trim().to_string(),
            note: note.into(),
        };
        if !self.notes.contains(&note) {
            self.notes.push(note);
        }
    }

    pub fn records(&self) -> &[InvalidOwnerRecord] {
        &self.records
    }

    pub fn notes(&self) -> &[AuditNote] {
        &self.notes
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn summary(&self) -> SinkSummary {
        SinkSummary {
            total: self.records.len(),
            by_category: self.by_category.clone(),
            notes: self.notes.len(),
        }
    }

    pub fn into_parts(self) -> (Vec<InvalidOwnerRecord>, Vec<AuditNote>) {
        (self.records, self.notes)
    }
}
