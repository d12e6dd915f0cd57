//! Run-level fan-out: one task per segment, bounded by a semaphore, joined into a summary.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio::time::Instant;
use tracing::Instrument;

use crate::assets::fetch::AssetFetcher;
use crate::brand::resolver::resolve_brand_identity;
use crate::compose::engine::CompositionEngine;
use crate::config::EngineConfig;
use crate::foundation::error::{AdResult, ErrorKind};
use crate::model::inputs::RunInputs;
use crate::model::stages::{Segment, SegmentKey};
use crate::pipeline::collaborators::{ContentStages, SceneGenerator};
use crate::pipeline::executor::{RunContext, StageExecutor};
use crate::pipeline::ledger::{ErrorLedger, ErrorRecord};
use crate::pipeline::limiter::CallLimiter;
use crate::pipeline::state::{RunStatus, SharedRunState, StageName};
use crate::pipeline::summary::RunSummary;
use crate::render::text::TextRenderer;

/// Everything a finished run leaves behind.
#[derive(Debug)]
pub struct RunOutcome {
    pub state: Arc<SharedRunState>,
    pub ledger: Arc<ErrorLedger>,
    pub summary: RunSummary,
    /// Set when the summary document was written.
    pub summary_path: Option<PathBuf>,
}

impl RunOutcome {
    pub fn status(&self) -> RunStatus {
        self.summary.status
    }
}

pub struct SegmentOrchestrator {
    config: EngineConfig,
    executor: Arc<StageExecutor>,
    run_id: Option<String>,
}

impl SegmentOrchestrator {
    /// Build an orchestrator with the font chain from `config.text`.
    pub fn new(
        config: EngineConfig,
        stages: Arc<dyn ContentStages>,
        scenes: Arc<dyn SceneGenerator>,
        fetcher: Arc<dyn AssetFetcher>,
    ) -> AdResult<Self> {
        config.validate()?;
        let text = config.text_renderer();
        Self::with_text_renderer(config, stages, scenes, fetcher, text)
    }

    pub fn with_text_renderer(
        config: EngineConfig,
        stages: Arc<dyn ContentStages>,
        scenes: Arc<dyn SceneGenerator>,
        fetcher: Arc<dyn AssetFetcher>,
        text: Arc<TextRenderer>,
    ) -> AdResult<Self> {
        config.validate()?;
        let limiter = Arc::new(CallLimiter::new(&config.rate_limit)?);
        let engine = Arc::new(CompositionEngine::new(
            fetcher,
            text,
            config.composition_options(),
        ));
        let executor = StageExecutor::new(stages, scenes, engine, limiter, config.retry)
            .with_copy_limit_policy(config.copy_limit_policy);
        Ok(Self {
            config,
            executor: Arc::new(executor),
            run_id: None,
        })
    }

    /// Use a fixed run id instead of a random one.
    pub fn with_run_id(mut self, run_id: impl Into<String>) -> Self {
        self.run_id = Some(run_id.into());
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Run every segment in `segments` to a terminal status.
    ///
    /// Only invalid inputs, a brand configuration error or a malformed segment list return
    /// `Err`; segment failures are reported in the outcome.
    pub async fn run(&self, inputs: RunInputs, segments: Vec<Segment>) -> AdResult<RunOutcome> {
        let run = self.prepare(inputs)?;
        self.register(&run, segments)?;
        Ok(self.fan_out(run).await)
    }

    /// Ask the discovery collaborator for segments, then run them.
    ///
    /// A discovery failure is recorded in the ledger and yields a failed run with no segments.
    pub async fn run_discovered(&self, inputs: RunInputs) -> AdResult<RunOutcome> {
        let run = self.prepare(inputs)?;
        let inputs = Arc::clone(run.state.inputs());
        let stages = Arc::clone(self.executor.content_stages());

        let discovered = self
            .executor
            .call_with_retry(StageName::Discovery, run.deadline, || {
                stages.discover_segments(&inputs)
            })
            .instrument(tracing::info_span!("stage", stage = StageName::Discovery.as_str()))
            .await;
        match discovered {
            Ok((segments, attempts)) => {
                tracing::info!(count = segments.len(), attempts, "segments discovered");
                self.register(&run, segments)?;
                Ok(self.fan_out(run).await)
            }
            Err((err, attempts)) => {
                tracing::error!(error = %err, attempts, "segment discovery failed");
                run.ledger.append(
                    ErrorRecord::from_error(None, StageName::Discovery, &err)
                        .with_attempts(attempts),
                );
                Ok(self.finish(run))
            }
        }
    }

    fn prepare(&self, inputs: RunInputs) -> AdResult<RunContext> {
        inputs.validate()?;
        let brand = resolve_brand_identity(
            &inputs.store_brand,
            inputs.product_brand.as_ref(),
            inputs.brand_strategy,
        )?;
        let inputs = Arc::new(inputs);
        let state = match &self.run_id {
            Some(id) => SharedRunState::new(id.clone(), inputs),
            None => SharedRunState::with_random_id(inputs),
        };
        let deadline = self
            .config
            .deadlines
            .run_deadline_ms
            .map(|ms| Instant::now() + Duration::from_millis(ms));
        Ok(RunContext {
            state: Arc::new(state),
            ledger: Arc::new(ErrorLedger::new()),
            brand: Arc::new(brand),
            deadline,
        })
    }

    fn register(&self, run: &RunContext, mut segments: Vec<Segment>) -> AdResult<()> {
        let cap = self.config.concurrency.max_segments;
        if segments.len() > cap {
            tracing::warn!(
                count = segments.len(),
                max_segments = cap,
                "dropping segments beyond the cap"
            );
            segments.truncate(cap);
        }
        for segment in segments {
            segment.validate()?;
            run.state.insert_segment(segment)?;
        }
        Ok(())
    }

    #[tracing::instrument(skip_all, fields(run = run.state.run_id(), segments = run.state.len()))]
    async fn fan_out(&self, run: RunContext) -> RunOutcome {
        let keys = run.state.keys();
        let permits = Arc::new(Semaphore::new(
            self.config.concurrency.max_concurrent_segments,
        ));
        let timeout = self
            .config
            .deadlines
            .segment_timeout_ms
            .map(Duration::from_millis);

        let handles: Vec<_> = keys
            .iter()
            .cloned()
            .map(|key| {
                let executor = Arc::clone(&self.executor);
                let permits = Arc::clone(&permits);
                let run = run.clone();
                tokio::spawn(async move {
                    let _permit = match permits.acquire_owned().await {
                        Ok(p) => p,
                        Err(err) => {
                            let record = ErrorRecord::new(
                                Some(key.clone()),
                                StageName::Strategy,
                                ErrorKind::Internal,
                                format!("concurrency gate closed: {err}"),
                            );
                            run.fail_segment(&key, record);
                            return;
                        }
                    };
                    match timeout {
                        None => {
                            executor.run_segment(&run, &key).await;
                        }
                        Some(limit) => {
                            let res =
                                tokio::time::timeout(limit, executor.run_segment(&run, &key)).await;
                            if res.is_err() {
                                tracing::warn!(
                                    segment = %key,
                                    timeout_ms = limit.as_millis() as u64,
                                    "segment timed out"
                                );
                                let record = ErrorRecord::new(
                                    Some(key.clone()),
                                    current_stage(&run, &key),
                                    ErrorKind::Deadline,
                                    format!("segment timed out after {} ms", limit.as_millis()),
                                );
                                run.fail_segment(&key, record);
                            }
                        }
                    }
                }.in_current_span())
            })
            .collect();

        let joined = futures::future::join_all(handles).await;
        for (key, res) in keys.iter().zip(joined) {
            if let Err(err) = res {
                tracing::error!(segment = %key, error = %err, "segment task aborted");
                let record = ErrorRecord::new(
                    Some(key.clone()),
                    current_stage(&run, key),
                    ErrorKind::Internal,
                    format!("segment task aborted: {err}"),
                );
                run.fail_segment(key, record);
            }
        }

        self.finish(run)
    }

    fn finish(&self, run: RunContext) -> RunOutcome {
        let summary = RunSummary::build(&run.state, &run.ledger);
        let summary_path = match &self.config.output.root {
            Some(root) if self.config.output.write_files => match summary.write_json(root) {
                Ok(path) => Some(path),
                Err(err) => {
                    tracing::warn!(error = %err, "run summary not written");
                    None
                }
            },
            _ => None,
        };
        tracing::info!(
            run = %summary.run_id,
            status = summary.status.as_str(),
            assets = summary.assets_produced,
            errors = summary.errors_count,
            "run finished"
        );
        RunOutcome {
            state: run.state,
            ledger: run.ledger,
            summary,
            summary_path,
        }
    }
}

fn current_stage(run: &RunContext, key: &SegmentKey) -> StageName {
    run.state
        .snapshot(key)
        .ok()
        .and_then(|s| s.current_stage)
        .unwrap_or(StageName::Strategy)
}
