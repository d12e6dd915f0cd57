use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::{DateTime, Utc};

use crate::compose::engine::OutputFormat;
use crate::foundation::error::AdResult;
use crate::model::inputs::BrandStrategy;
use crate::model::stages::SegmentKey;
use crate::pipeline::ledger::{ErrorLedger, ErrorRecord};
use crate::pipeline::state::{RunStatus, SegmentState, SegmentStatus, SharedRunState, StageName};

pub const SUMMARY_FILE_NAME: &str = "run_summary.json";

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct AssetSummary {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    pub width: u32,
    pub height: u32,
    pub format: OutputFormat,
    pub bytes: usize,
    pub fingerprint: u64,
    pub archetype: String,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SegmentSummary {
    pub key: SegmentKey,
    pub name: String,
    pub status: SegmentStatus,
    pub has_strategy: bool,
    pub has_concept: bool,
    pub has_copy: bool,
    pub has_scene: bool,
    pub has_final_asset: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub asset: Option<AssetSummary>,
    pub error_count: usize,
    /// This segment's ledger records, in append order.
    #[serde(default)]
    pub errors: Vec<ErrorRecord>,
    #[serde(default)]
    pub warnings: Vec<String>,
}

impl SegmentSummary {
    fn from_state(s: &SegmentState, ledger: &ErrorLedger) -> Self {
        let errors = ledger.for_segment(&s.segment.key);
        Self {
            key: s.segment.key.clone(),
            name: s.segment.name.clone(),
            status: s.status,
            has_strategy: s.has_output(StageName::Strategy),
            has_concept: s.has_output(StageName::Concept),
            has_copy: s.has_output(StageName::Copy),
            has_scene: s.has_output(StageName::Scene),
            has_final_asset: s.has_output(StageName::Composition),
            asset: s.final_asset.as_ref().map(|a| AssetSummary {
                path: a.path.clone(),
                width: a.dimensions.width,
                height: a.dimensions.height,
                format: a.format,
                bytes: a.bytes.len(),
                fingerprint: a.fingerprint,
                archetype: a.archetype.clone(),
            }),
            error_count: errors.len(),
            errors,
            warnings: s.warnings.clone(),
        }
    }
}

/// One JSON document per run: outcome of every segment plus the full error ledger.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct RunSummary {
    pub run_id: String,
    pub status: RunStatus,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub elapsed_seconds: f64,
    pub product_name: String,
    pub store_brand: String,
    pub brand_strategy: BrandStrategy,
    pub segments_count: usize,
    pub assets_produced: usize,
    pub errors_count: usize,
    pub segments: Vec<SegmentSummary>,
    pub errors: Vec<ErrorRecord>,
}

impl RunSummary {
    pub fn build(state: &SharedRunState, ledger: &ErrorLedger) -> Self {
        let segments: Vec<SegmentSummary> = state
            .snapshot_all()
            .iter()
            .map(|s| SegmentSummary::from_state(s, ledger))
            .collect();
        let statuses: Vec<SegmentStatus> = segments.iter().map(|s| s.status).collect();
        let errors = ledger.snapshot();
        let finished_at = Utc::now();
        let elapsed_ms = (finished_at - state.started_at()).num_milliseconds().max(0);
        let inputs = state.inputs();

        Self {
            run_id: state.run_id().to_string(),
            status: RunStatus::from_statuses(&statuses),
            started_at: state.started_at(),
            finished_at,
            elapsed_seconds: (elapsed_ms as f64 / 10.0).round() / 100.0,
            product_name: inputs.product.name.clone(),
            store_brand: inputs.store_brand.brand_name.clone(),
            brand_strategy: inputs.brand_strategy,
            segments_count: segments.len(),
            assets_produced: segments.iter().filter(|s| s.has_final_asset).count(),
            errors_count: errors.len(),
            segments,
            errors,
        }
    }

    pub fn segment(&self, key: &SegmentKey) -> Option<&SegmentSummary> {
        self.segments.iter().find(|s| &s.key == key)
    }

    /// Write the summary to `<root>/<run_id>/run_summary.json`.
    pub fn write_json(&self, root: &Path) -> AdResult<PathBuf> {
        let dir = root.join(&self.run_id);
        std::fs::create_dir_all(&dir).with_context(|| format!("create {}", dir.display()))?;
        let path = dir.join(SUMMARY_FILE_NAME);
        let json = serde_json::to_vec_pretty(self).context("serialize run summary")?;
        std::fs::write(&path, json).with_context(|| format!("write {}", path.display()))?;
        tracing::info!(path = %path.display(), "run summary written");
        Ok(path)
    }

    /// Plain-text report for terminals and logs.
    pub fn render_report(&self) -> String {
        let mut out = String::new();
        let rule = "=".repeat(60);
        let _ = writeln!(out, "{rule}");
        let _ = writeln!(out, "AD RUN {}", self.status.as_str().to_uppercase());
        let _ = writeln!(out, "{rule}");
        let _ = writeln!(out, "Run ID:         {}", self.run_id);
        let _ = writeln!(out, "Product:        {}", self.product_name);
        let _ = writeln!(out, "Store Brand:    {}", self.store_brand);
        let _ = writeln!(out, "Brand Strategy: {}", self.brand_strategy.as_str());
        let _ = writeln!(out, "Elapsed:        {:.2}s", self.elapsed_seconds);
        let _ = writeln!(out);
        let _ = writeln!(out, "Segments:       {}", self.segments_count);
        let _ = writeln!(out, "Assets:         {}", self.assets_produced);
        let _ = writeln!(out, "Errors:         {}", self.errors_count);

        if !self.segments.is_empty() {
            let _ = writeln!(out);
            for s in &self.segments {
                let mark = if s.status == SegmentStatus::Succeeded {
                    "ok  "
                } else {
                    "FAIL"
                };
                let _ = write!(out, "  [{mark}] {} ({})", s.name, s.key);
                if let Some(a) = &s.asset {
                    let _ = write!(out, " {}x{} {}", a.width, a.height, a.format.extension());
                    if let Some(p) = &a.path {
                        let _ = write!(out, " -> {}", p.display());
                    }
                }
                let _ = writeln!(out);
            }
        }

        if !self.errors.is_empty() {
            let _ = writeln!(out);
            let _ = writeln!(out, "Errors:");
            for e in &self.errors {
                let who = e
                    .segment_key
                    .as_ref()
                    .map(|k| format!(" ({k})"))
                    .unwrap_or_default();
                let msg: String = e.message.chars().take(80).collect();
                let _ = writeln!(out, "  - [{}]{who}: {msg}", e.stage);
            }
        }
        let _ = writeln!(out, "{rule}");
        out
    }
}

#[cfg(test)]
#[path = "../../tests/unit/pipeline/summary.rs"]
mod tests;
