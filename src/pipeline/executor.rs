use std::future::Future;
use std::sync::Arc;

use anyhow::anyhow;
use tokio::time::Instant;
use tracing::Instrument;

use crate::brand::resolver::ResolvedBrandIdentity;
use crate::compose::engine::{ComposedAsset, CompositionEngine, CompositionRequest};
use crate::foundation::error::{AdError, AdResult, ErrorKind};
use crate::model::inputs::RunInputs;
use crate::model::stages::{AdCopy, CreativeConcept, SceneAsset, SegmentKey, StrategyBrief};
use crate::pipeline::collaborators::{ContentStages, SceneGenerator, SceneRequest, StageContext};
use crate::pipeline::ledger::{ErrorLedger, ErrorRecord};
use crate::pipeline::limiter::CallLimiter;
use crate::pipeline::policy::{CopyLimitPolicy, RetryPolicy};
use crate::pipeline::state::{SegmentState, SegmentStatus, SharedRunState, StageName};

/// Shared handles for every segment task of one run.
#[derive(Clone, Debug)]
pub struct RunContext {
    pub state: Arc<SharedRunState>,
    pub ledger: Arc<ErrorLedger>,
    pub brand: Arc<ResolvedBrandIdentity>,
    /// Once passed, no new collaborator call is started.
    pub deadline: Option<Instant>,
}

impl RunContext {
    /// Record `record` in the ledger and the segment's error list, then mark the segment failed.
    ///
    /// A segment that already reached a terminal status keeps it; the record is still kept.
    pub fn fail_segment(&self, key: &SegmentKey, record: ErrorRecord) {
        self.ledger.append(record.clone());
        let res = self.state.update(key, |s| {
            s.errors.push(record);
            if s.status.is_terminal() {
                return Ok(());
            }
            s.transition(SegmentStatus::Failed)
        });
        if let Err(err) = res {
            tracing::error!(segment = %key, error = %err, "could not mark segment failed");
        }
    }
}

/// Why a segment stopped.
#[derive(Debug)]
pub struct StageFailure {
    pub stage: StageName,
    pub kind: ErrorKind,
    pub message: String,
    pub attempts: u32,
}

impl StageFailure {
    pub fn from_error(stage: StageName, err: &AdError, attempts: u32) -> Self {
        Self {
            stage,
            kind: err.kind(),
            message: err.to_string(),
            attempts,
        }
    }

    pub fn into_record(self, key: Option<SegmentKey>) -> ErrorRecord {
        ErrorRecord::new(key, self.stage, self.kind, self.message).with_attempts(self.attempts)
    }
}

/// Drives one segment through strategy, concept, copy, scene and composition.
pub struct StageExecutor {
    stages: Arc<dyn ContentStages>,
    scenes: Arc<dyn SceneGenerator>,
    engine: Arc<CompositionEngine>,
    limiter: Arc<CallLimiter>,
    retry: RetryPolicy,
    copy_limit_policy: CopyLimitPolicy,
}

impl StageExecutor {
    pub fn new(
        stages: Arc<dyn ContentStages>,
        scenes: Arc<dyn SceneGenerator>,
        engine: Arc<CompositionEngine>,
        limiter: Arc<CallLimiter>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            stages,
            scenes,
            engine,
            limiter,
            retry,
            copy_limit_policy: CopyLimitPolicy::default(),
        }
    }

    pub fn with_copy_limit_policy(mut self, policy: CopyLimitPolicy) -> Self {
        self.copy_limit_policy = policy;
        self
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    pub fn content_stages(&self) -> &Arc<dyn ContentStages> {
        &self.stages
    }

    /// Call a collaborator through the rate limiter, retrying transient failures.
    ///
    /// No attempt starts once `deadline` has passed: the limiter wait and every backoff sleep
    /// are bounded by it, and an expired deadline ends the loop with [`AdError::Deadline`].
    /// Returns the value with the number of attempts it took, or the last error with the number
    /// of attempts made.
    pub async fn call_with_retry<T, F, Fut>(
        &self,
        stage: StageName,
        deadline: Option<Instant>,
        mut call: F,
    ) -> Result<(T, u32), (AdError, u32)>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = AdResult<T>>,
    {
        let mut attempt = 1;
        loop {
            let made = attempt - 1;
            match deadline {
                Some(d) if Instant::now() >= d => {
                    return Err((deadline_error(stage, made, None), made));
                }
                Some(d) => {
                    if tokio::time::timeout_at(d, self.limiter.acquire()).await.is_err() {
                        return Err((deadline_error(stage, made, None), made));
                    }
                }
                None => self.limiter.acquire().await,
            }

            match call().await {
                Ok(v) => return Ok((v, attempt)),
                Err(err) if self.retry.should_retry(&err, attempt) => {
                    let delay = self.retry.delay_for(attempt, &err);
                    if let Some(d) = deadline {
                        if delay >= d.saturating_duration_since(Instant::now()) {
                            tracing::warn!(
                                stage = stage.as_str(),
                                attempt,
                                error = %err,
                                "run deadline leaves no room for another attempt"
                            );
                            return Err((deadline_error(stage, attempt, Some(&err)), attempt));
                        }
                    }
                    tracing::warn!(
                        stage = stage.as_str(),
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "transient failure, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => return Err((err, attempt)),
            }
        }
    }

    /// Run every stage for `key` and return its terminal status.
    ///
    /// Stage errors never panic. A segment that was already started is left untouched and its
    /// current status is returned.
    #[tracing::instrument(skip(self, run, key), fields(run = run.state.run_id(), segment = %key))]
    pub async fn run_segment(&self, run: &RunContext, key: &SegmentKey) -> SegmentStatus {
        if let Err(err) = run.state.transition(key, SegmentStatus::Running) {
            // Already started elsewhere: the owning task keeps its state and error chain.
            let status = run
                .state
                .snapshot(key)
                .map(|s| s.status)
                .unwrap_or(SegmentStatus::Failed);
            tracing::warn!(error = %err, status = status.as_str(), "segment restart refused");
            return status;
        }

        match self.drive(run, key).await {
            Ok(()) => match run.state.transition(key, SegmentStatus::Succeeded) {
                Ok(()) => {
                    tracing::info!("segment succeeded");
                    SegmentStatus::Succeeded
                }
                Err(err) => {
                    run.fail_segment(
                        key,
                        ErrorRecord::from_error(Some(key.clone()), StageName::Composition, &err),
                    );
                    SegmentStatus::Failed
                }
            },
            Err(failure) => {
                tracing::warn!(
                    stage = failure.stage.as_str(),
                    kind = ?failure.kind,
                    attempts = failure.attempts,
                    error = %failure.message,
                    "segment failed"
                );
                run.fail_segment(key, failure.into_record(Some(key.clone())));
                SegmentStatus::Failed
            }
        }
    }

    async fn drive(&self, run: &RunContext, key: &SegmentKey) -> Result<(), StageFailure> {
        let segment = run
            .state
            .snapshot(key)
            .map_err(|e| StageFailure::from_error(StageName::Strategy, &e, 0))?
            .segment;
        let inputs = Arc::clone(run.state.inputs());
        let cx = StageContext {
            run_id: run.state.run_id(),
            inputs: &inputs,
            brand: &run.brand,
            segment: &segment,
        };
        let cx = &cx;

        let strategy = self
            .content_stage(run, key, StageName::Strategy, StrategyBrief::validate, || {
                self.stages.strategy(cx)
            })
            .await?;
        commit(run, key, StageName::Strategy, |s| {
            s.strategy = Some(strategy.clone())
        })?;

        let concept = self
            .content_stage(run, key, StageName::Concept, CreativeConcept::validate, || {
                self.stages.concept(cx, &strategy)
            })
            .await?;
        commit(run, key, StageName::Concept, |s| {
            s.concept = Some(concept.clone())
        })?;

        let copy = self
            .content_stage(run, key, StageName::Copy, AdCopy::validate, || {
                self.stages.copy(cx, &strategy, &concept)
            })
            .await?;
        let over_limit = copy.limit_violations(&inputs.channel.text_limits);
        if !over_limit.is_empty() {
            match self.copy_limit_policy {
                CopyLimitPolicy::Advisory => {
                    tracing::warn!(violations = ?over_limit, "copy exceeds channel limits");
                    commit(run, key, StageName::Copy, |s| {
                        s.warnings
                            .extend(over_limit.iter().map(|v| format!("copy over limit: {v}")))
                    })?;
                }
                CopyLimitPolicy::Reject => {
                    let err = AdError::schema(format!(
                        "copy exceeds channel limits: {}",
                        over_limit.join("; ")
                    ));
                    return Err(StageFailure::from_error(StageName::Copy, &err, 1));
                }
            }
        }
        commit(run, key, StageName::Copy, |s| s.copy = Some(copy.clone()))?;

        let request = SceneRequest::from_concept(key, &concept, inputs.channel.dimensions);
        let scene = self
            .content_stage(run, key, StageName::Scene, SceneAsset::validate, || {
                self.scenes.generate(&request)
            })
            .await?;
        commit(run, key, StageName::Scene, |s| s.scene = Some(scene.clone()))?;

        commit(run, key, StageName::Composition, |_| ())?;
        let mut asset = self
            .compose(run, key, &inputs, concept, copy, scene)
            .instrument(tracing::info_span!("stage", stage = StageName::Composition.as_str()))
            .await
            .map_err(|e| StageFailure::from_error(StageName::Composition, &e, 1))?;
        // No await between the write and the status change: a timed-out segment leaves no file.
        self.engine
            .persist(&mut asset, run.state.run_id())
            .map_err(|e| StageFailure::from_error(StageName::Composition, &e, 1))?;
        tracing::info!(
            format = asset.format.extension(),
            fingerprint = asset.fingerprint,
            "asset composed"
        );
        commit(run, key, StageName::Composition, |s| {
            s.warnings.extend(asset.warnings.iter().cloned());
            s.final_asset = Some(asset);
        })
    }

    async fn content_stage<T, F, Fut>(
        &self,
        run: &RunContext,
        key: &SegmentKey,
        stage: StageName,
        validate: fn(&T) -> AdResult<()>,
        call: F,
    ) -> Result<T, StageFailure>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = AdResult<T>>,
    {
        commit(run, key, stage, |_| ())?;

        let span = tracing::info_span!("stage", stage = stage.as_str());
        async {
            let (value, attempts) = match self.call_with_retry(stage, run.deadline, call).await {
                Ok(v) => v,
                Err((err, attempts)) => {
                    return Err(StageFailure::from_error(stage, &err, attempts));
                }
            };
            validate(&value).map_err(|e| StageFailure::from_error(stage, &e, attempts))?;
            tracing::debug!(attempts, "stage output committed");
            Ok(value)
        }
        .instrument(span)
        .await
    }

    async fn compose(
        &self,
        run: &RunContext,
        key: &SegmentKey,
        inputs: &Arc<RunInputs>,
        concept: CreativeConcept,
        copy: AdCopy,
        scene: SceneAsset,
    ) -> AdResult<ComposedAsset> {
        let engine = Arc::clone(&self.engine);
        let inputs = Arc::clone(inputs);
        let brand = Arc::clone(&run.brand);
        let run_id = run.state.run_id().to_string();
        let key = key.clone();
        let joined = tokio::task::spawn_blocking(move || {
            engine.compose(&CompositionRequest {
                run_id: &run_id,
                segment_key: &key,
                inputs: &inputs,
                brand: &brand,
                concept: &concept,
                copy: &copy,
                scene: &scene,
            })
        })
        .await;
        match joined {
            Ok(res) => res,
            Err(e) => Err(AdError::Other(anyhow!("composition task failed: {e}"))),
        }
    }
}

fn deadline_error(stage: StageName, attempts: u32, last: Option<&AdError>) -> AdError {
    match last {
        Some(err) => AdError::deadline(format!(
            "run deadline reached during {stage} after {attempts} attempt(s); last error: {err}"
        )),
        None => AdError::deadline(format!(
            "run deadline reached before {stage} attempt {}",
            attempts + 1
        )),
    }
}

fn commit(
    run: &RunContext,
    key: &SegmentKey,
    stage: StageName,
    f: impl FnOnce(&mut SegmentState),
) -> Result<(), StageFailure> {
    run.state
        .update(key, |s| {
            s.current_stage = Some(stage);
            f(s);
            Ok(())
        })
        .map_err(|e| StageFailure::from_error(stage, &e, 0))
}

#[cfg(test)]
#[path = "../../tests/unit/pipeline/executor.rs"]
mod tests;
