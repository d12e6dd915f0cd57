use std::collections::BTreeMap;
use std::sync::Mutex;

use chrono::{DateTime, Utc};

use crate::foundation::error::{AdError, ErrorKind};
use crate::model::stages::SegmentKey;
use crate::pipeline::state::StageName;

/// One failure, as recorded in the run's ledger.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ErrorRecord {
    /// `None` for run-level failures (discovery).
    pub segment_key: Option<SegmentKey>,
    pub stage: StageName,
    pub kind: ErrorKind,
    pub message: String,
    /// Attempts made before giving up (1 when the error was not retried).
    pub attempts: u32,
    pub timestamp: DateTime<Utc>,
}

impl ErrorRecord {
    pub fn new(
        segment_key: Option<SegmentKey>,
        stage: StageName,
        kind: ErrorKind,
        message: impl Into<String>,
    ) -> Self {
        Self {
            segment_key,
            stage,
            kind,
            message: message.into(),
            attempts: 1,
            timestamp: Utc::now(),
        }
    }

    pub fn from_error(segment_key: Option<SegmentKey>, stage: StageName, err: &AdError) -> Self {
        Self::new(segment_key, stage, err.kind(), err.to_string())
    }

    pub fn with_attempts(mut self, attempts: u32) -> Self {
        self.attempts = attempts;
        self
    }
}

/// Append-only, thread-safe failure log for one run.
#[derive(Debug, Default)]
pub struct ErrorLedger {
    records: Mutex<Vec<ErrorRecord>>,
}

impl ErrorLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&self, record: ErrorRecord) {
        tracing::debug!(
            segment = record.segment_key.as_ref().map(SegmentKey::as_str),
            stage = record.stage.as_str(),
            kind = ?record.kind,
            "ledger append"
        );
        // A poisoned lock still holds every record appended so far; keep appending.
        let mut guard = self.records.lock().unwrap_or_else(|p| p.into_inner());
        guard.push(record);
    }

    fn read(&self) -> std::sync::MutexGuard<'_, Vec<ErrorRecord>> {
        self.records.lock().unwrap_or_else(|p| p.into_inner())
    }

    pub fn snapshot(&self) -> Vec<ErrorRecord> {
        self.read().clone()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    pub fn for_segment(&self, key: &SegmentKey) -> Vec<ErrorRecord> {
        self.read()
            .iter()
            .filter(|r| r.segment_key.as_ref() == Some(key))
            .cloned()
            .collect()
    }

    pub fn count_for(&self, key: &SegmentKey) -> usize {
        self.read()
            .iter()
            .filter(|r| r.segment_key.as_ref() == Some(key))
            .count()
    }

    /// Record counts per segment; run-level records are not included.
    pub fn count_by_segment(&self) -> BTreeMap<SegmentKey, usize> {
        let mut out = BTreeMap::new();
        for key in self.read().iter().filter_map(|r| r.segment_key.clone()) {
            *out.entry(key).or_insert(0) += 1;
        }
        out
    }

    pub fn count_by_kind(&self) -> BTreeMap<ErrorKind, usize> {
        let mut out = BTreeMap::new();
        for r in self.read().iter() {
            *out.entry(r.kind).or_insert(0) += 1;
        }
        out
    }
}

#[cfg(test)]
#[path = "../../tests/unit/pipeline/ledger.rs"]
mod tests;
