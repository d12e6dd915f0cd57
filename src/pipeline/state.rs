use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use anyhow::anyhow;
use chrono::{DateTime, Utc};

use crate::compose::engine::ComposedAsset;
use crate::foundation::error::{AdError, AdResult};
use crate::model::inputs::RunInputs;
use crate::model::stages::{AdCopy, CreativeConcept, SceneAsset, Segment, SegmentKey, StrategyBrief};
use crate::pipeline::ledger::ErrorRecord;

/// Pipeline stages, in execution order (discovery runs once per run, before fan-out).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageName {
    Discovery,
    Strategy,
    Concept,
    Copy,
    Scene,
    Composition,
}

impl StageName {
    /// Per-segment stages in execution order.
    pub const SEGMENT_STAGES: [StageName; 5] = [
        Self::Strategy,
        Self::Concept,
        Self::Copy,
        Self::Scene,
        Self::Composition,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Discovery => "discovery",
            Self::Strategy => "strategy",
            Self::Concept => "concept",
            Self::Copy => "copy",
            Self::Scene => "scene",
            Self::Composition => "composition",
        }
    }
}

impl std::fmt::Display for StageName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SegmentStatus {
    #[default]
    Pending,
    Running,
    Succeeded,
    Failed,
}

impl SegmentStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }

    /// `pending -> running -> {succeeded | failed}`; a pending segment may also fail directly.
    pub fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Running)
                | (Self::Pending, Self::Failed)
                | (Self::Running, Self::Succeeded)
                | (Self::Running, Self::Failed)
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
        }
    }
}

/// Per-segment accumulator, written only by the task that owns the segment.
#[derive(Clone, Debug, serde::Serialize)]
pub struct SegmentState {
    pub segment: Segment,
    pub status: SegmentStatus,
    /// Stage currently (or last) executing.
    pub current_stage: Option<StageName>,
    pub strategy: Option<StrategyBrief>,
    pub concept: Option<CreativeConcept>,
    pub copy: Option<AdCopy>,
    pub scene: Option<SceneAsset>,
    pub final_asset: Option<ComposedAsset>,
    pub errors: Vec<ErrorRecord>,
    pub warnings: Vec<String>,
}

impl SegmentState {
    pub fn new(segment: Segment) -> Self {
        Self {
            segment,
            status: SegmentStatus::Pending,
            current_stage: None,
            strategy: None,
            concept: None,
            copy: None,
            scene: None,
            final_asset: None,
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    pub fn key(&self) -> &SegmentKey {
        &self.segment.key
    }

    /// Apply a status change; backward or sideways moves are rejected and leave the state as is.
    pub fn transition(&mut self, next: SegmentStatus) -> AdResult<()> {
        if !self.status.can_transition_to(next) {
            return Err(AdError::Other(anyhow!(
                "segment '{}': illegal status transition {} -> {}",
                self.segment.key,
                self.status.as_str(),
                next.as_str()
            )));
        }
        tracing::debug!(
            segment = %self.segment.key,
            from = self.status.as_str(),
            to = next.as_str(),
            "segment status"
        );
        self.status = next;
        Ok(())
    }

    pub fn has_output(&self, stage: StageName) -> bool {
        match stage {
            StageName::Discovery => true,
            StageName::Strategy => self.strategy.is_some(),
            StageName::Concept => self.concept.is_some(),
            StageName::Copy => self.copy.is_some(),
            StageName::Scene => self.scene.is_some(),
            StageName::Composition => self.final_asset.is_some(),
        }
    }
}

/// Run-wide container: immutable inputs plus one state record per segment.
///
/// Each record is written only by the task that owns its segment. All reads and writes take one
/// narrow map lock for the length of a field update or a clone, never across an await.
#[derive(Debug)]
pub struct SharedRunState {
    run_id: String,
    started_at: DateTime<Utc>,
    inputs: Arc<RunInputs>,
    segments: Mutex<BTreeMap<SegmentKey, SegmentState>>,
}

// A panicking segment task must not hide its segment from failure reporting, so a poisoned
// lock is entered anyway.
fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

fn unknown(key: &SegmentKey) -> AdError {
    AdError::Other(anyhow!("unknown segment '{key}'"))
}

impl SharedRunState {
    pub fn new(run_id: impl Into<String>, inputs: Arc<RunInputs>) -> Self {
        Self {
            run_id: run_id.into(),
            started_at: Utc::now(),
            inputs,
            segments: Mutex::new(BTreeMap::new()),
        }
    }

    /// New state with a random v4 run id.
    pub fn with_random_id(inputs: Arc<RunInputs>) -> Self {
        Self::new(uuid::Uuid::new_v4().to_string(), inputs)
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn inputs(&self) -> &Arc<RunInputs> {
        &self.inputs
    }

    /// Register a segment; duplicate keys are a schema violation.
    pub fn insert_segment(&self, segment: Segment) -> AdResult<()> {
        let mut map = lock(&self.segments);
        if map.contains_key(&segment.key) {
            return Err(AdError::schema(format!(
                "duplicate segment key '{}'",
                segment.key
            )));
        }
        map.insert(segment.key.clone(), SegmentState::new(segment));
        Ok(())
    }

    /// Run `f` against one segment's record under the map lock.
    ///
    /// `f` must not touch this state again; the lock is not reentrant.
    pub fn update<R>(
        &self,
        key: &SegmentKey,
        f: impl FnOnce(&mut SegmentState) -> AdResult<R>,
    ) -> AdResult<R> {
        let mut map = lock(&self.segments);
        let state = map.get_mut(key).ok_or_else(|| unknown(key))?;
        f(state)
    }

    pub fn transition(&self, key: &SegmentKey, next: SegmentStatus) -> AdResult<()> {
        self.update(key, |s| s.transition(next))
    }

    pub fn snapshot(&self, key: &SegmentKey) -> AdResult<SegmentState> {
        lock(&self.segments)
            .get(key)
            .cloned()
            .ok_or_else(|| unknown(key))
    }

    pub fn keys(&self) -> Vec<SegmentKey> {
        lock(&self.segments).keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        lock(&self.segments).len()
    }

    pub fn is_empty(&self) -> bool {
        lock(&self.segments).is_empty()
    }

    /// Snapshot of every segment, ordered by key.
    pub fn snapshot_all(&self) -> Vec<SegmentState> {
        lock(&self.segments).values().cloned().collect()
    }

    pub fn run_status(&self) -> RunStatus {
        let map = lock(&self.segments);
        let statuses: Vec<_> = map.values().map(|s| s.status).collect();
        RunStatus::from_statuses(&statuses)
    }
}

/// Run-level outcome.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Succeeded,
    PartialSuccess,
    Failed,
}

impl RunStatus {
    /// All succeeded: succeeded. At least one: partial success. None (or no segments): failed.
    pub fn from_statuses(statuses: &[SegmentStatus]) -> Self {
        let ok = statuses
            .iter()
            .filter(|s| **s == SegmentStatus::Succeeded)
            .count();
        match ok {
            0 => Self::Failed,
            n if n == statuses.len() => Self::Succeeded,
            _ => Self::PartialSuccess,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Succeeded => "succeeded",
            Self::PartialSuccess => "partial_success",
            Self::Failed => "failed",
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/pipeline/state.rs"]
mod tests;
