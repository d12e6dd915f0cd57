use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;

use crate::assets::cutout::DEFAULT_TOLERANCE;
use crate::compose::engine::CompositionOptions;
use crate::compose::placer::PlacerOptions;
use crate::foundation::error::{AdError, AdResult};
use crate::pipeline::limiter::RateLimitConfig;
use crate::pipeline::policy::{CopyLimitPolicy, RetryPolicy};
use crate::render::fonts::{FontBook, FontSource};
use crate::render::text::TextRenderer;

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct ConcurrencyConfig {
    pub max_concurrent_segments: usize,
    /// Discovered segments beyond this count are dropped.
    pub max_segments: usize,
}

impl Default for ConcurrencyConfig {
    fn default() -> Self {
        Self {
            max_concurrent_segments: 4,
            max_segments: 4,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct DeadlineConfig {
    /// After this long no new collaborator call starts; running compositions finish.
    pub run_deadline_ms: Option<u64>,
    /// Hard limit for one segment; only that segment fails when it expires.
    pub segment_timeout_ms: Option<u64>,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct TextConfig {
    /// Smallest font size as a fraction of the layout's starting size.
    pub min_size_ratio: f32,
    /// Shrink step as a fraction of the starting size.
    pub step_ratio: f32,
    pub ellipsis: String,
    /// Font fallback chain; `None` uses the process-wide default chain.
    pub fonts: Option<Vec<FontSource>>,
    /// Skip font discovery and use the built-in block face (host independent output).
    pub builtin_only: bool,
}

impl Default for TextConfig {
    fn default() -> Self {
        Self {
            min_size_ratio: 0.5,
            step_ratio: 0.1,
            ellipsis: "\u{2026}".to_string(),
            fonts: None,
            builtin_only: false,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub root: Option<PathBuf>,
    /// Write assets and the run summary under `root`.
    pub write_files: bool,
    pub jpeg_quality: u8,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            root: None,
            write_files: true,
            jpeg_quality: 95,
        }
    }
}

/// Engine-wide settings. Every field has a default, so `{}` is a valid config document.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub concurrency: ConcurrencyConfig,
    pub retry: RetryPolicy,
    pub rate_limit: RateLimitConfig,
    pub deadlines: DeadlineConfig,
    pub text: TextConfig,
    pub output: OutputConfig,
    pub copy_limit_policy: CopyLimitPolicy,
    pub remove_product_background: bool,
    pub cutout_tolerance: f32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            concurrency: ConcurrencyConfig::default(),
            retry: RetryPolicy::default(),
            rate_limit: RateLimitConfig::default(),
            deadlines: DeadlineConfig::default(),
            text: TextConfig::default(),
            output: OutputConfig::default(),
            copy_limit_policy: CopyLimitPolicy::default(),
            remove_product_background: true,
            cutout_tolerance: DEFAULT_TOLERANCE,
        }
    }
}

impl EngineConfig {
    pub fn from_json_str(s: &str) -> AdResult<Self> {
        let cfg: Self = serde_json::from_str(s)
            .map_err(|e| AdError::configuration(format!("invalid config json: {e}")))?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_path(path: impl AsRef<Path>) -> AdResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("read config {}", path.display()))
            .map_err(|e| AdError::configuration(format!("{e:#}")))?;
        Self::from_json_str(&text)
    }

    pub fn validate(&self) -> AdResult<()> {
        if self.concurrency.max_concurrent_segments == 0 {
            return Err(AdError::configuration(
                "concurrency.max_concurrent_segments must be >= 1",
            ));
        }
        if self.concurrency.max_segments == 0 {
            return Err(AdError::configuration("concurrency.max_segments must be >= 1"));
        }
        self.retry.validate()?;
        if !(self.text.min_size_ratio > 0.0 && self.text.min_size_ratio <= 1.0) {
            return Err(AdError::configuration(format!(
                "text.min_size_ratio must be in (0, 1], got {}",
                self.text.min_size_ratio
            )));
        }
        if !(self.text.step_ratio > 0.0 && self.text.step_ratio < 1.0) {
            return Err(AdError::configuration(format!(
                "text.step_ratio must be in (0, 1), got {}",
                self.text.step_ratio
            )));
        }
        if !(1..=100).contains(&self.output.jpeg_quality) {
            return Err(AdError::configuration("output.jpeg_quality must be in 1..=100"));
        }
        if !(self.cutout_tolerance.is_finite() && self.cutout_tolerance >= 0.0) {
            return Err(AdError::configuration("cutout_tolerance must be >= 0"));
        }
        if self.deadlines.segment_timeout_ms == Some(0) || self.deadlines.run_deadline_ms == Some(0)
        {
            return Err(AdError::configuration("deadlines must be > 0 when set"));
        }
        Ok(())
    }

    /// Apply `ADCRAFT_*` environment overrides. Unparseable values are ignored.
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(|k| std::env::var(k).ok())
    }

    /// Apply overrides from an arbitrary lookup (the environment in production).
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(n) = lookup("ADCRAFT_MAX_CONCURRENCY")
            .and_then(|v| v.trim().parse::<usize>().ok())
            .filter(|&n| n > 0)
        {
            self.concurrency.max_concurrent_segments = n;
        }
        if let Some(dir) = lookup("ADCRAFT_OUTPUT_DIR").filter(|v| !v.trim().is_empty()) {
            self.output.root = Some(PathBuf::from(dir));
        }
        if let Some(rpm) =
            lookup("ADCRAFT_RATE_LIMIT_RPM").and_then(|v| v.trim().parse::<u32>().ok())
        {
            self.rate_limit.requests_per_minute = rpm;
        }
        self
    }

    pub fn composition_options(&self) -> CompositionOptions {
        CompositionOptions {
            placer: PlacerOptions {
                remove_background: self.remove_product_background,
                tolerance: self.cutout_tolerance,
            },
            min_text_ratio: self.text.min_size_ratio,
            text_step_ratio: self.text.step_ratio,
            ellipsis: self.text.ellipsis.clone(),
            jpeg_quality: self.output.jpeg_quality,
            output_root: self
                .output
                .root
                .clone()
                .filter(|_| self.output.write_files),
        }
    }

    /// Resolve the font chain once and build the shared text renderer.
    pub fn text_renderer(&self) -> Arc<TextRenderer> {
        if self.text.builtin_only {
            return Arc::new(TextRenderer::builtin());
        }
        let book = match &self.text.fonts {
            Some(chain) => Arc::new(FontBook::resolve(chain)),
            None => FontBook::process_default(),
        };
        TextRenderer::shared(&book)
    }
}

#[cfg(test)]
#[path = "../tests/unit/config.rs"]
mod tests;
