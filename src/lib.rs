//! adcraft turns one product and its brand context into one finished ad per customer segment.
//!
//! A run fans out across segments. Each segment walks a fixed stage sequence and ends in a
//! locally composed raster of the channel's exact dimensions.
//!
//! # Pipeline overview
//!
//! 1. **Discover** (optional): the [`ContentStages`] collaborator proposes segments.
//! 2. **Strategy / Concept / Copy**: content records from the collaborator, validated before commit.
//! 3. **Scene**: a background image from the [`SceneGenerator`] collaborator.
//! 4. **Compose**: background, product, copy and logos layered by the [`CompositionEngine`].
//!
//! The key design constraints:
//!
//! - **No unsafe**: `unsafe` is forbidden in this crate.
//! - **Segment isolation**: a failure is recorded in the [`ErrorLedger`] and stops only its segment.
//! - **Deterministic composition**: identical inputs yield byte-identical assets.
//! - **Premultiplied RGBA8** inside the compositor, straight alpha at the encode boundary.
#![forbid(unsafe_code)]

/// Asset loading: fetchers, decoders, SVG rasterization and background cutout.
pub mod assets;
/// Brand strategy resolution.
pub mod brand;
/// Final ad composition.
pub mod compose;
pub mod config;
/// Pixel effects: blur, drop shadow and premultiplied compositing.
pub mod effects;
pub mod foundation;
/// Layout archetypes and region geometry.
pub mod layout;
/// Run inputs and stage records.
pub mod model;
/// Segment orchestration, stage execution, retry and reporting.
pub mod pipeline;
/// Raster surfaces, font chain and text fitting.
pub mod render;

pub use crate::assets::fetch::{
    AssetFetcher, FsFetcher, HttpFetcher, MemoryFetcher, RoutingFetcher,
};
pub use crate::brand::resolver::{ResolvedBrandIdentity, resolve_brand_identity};
pub use crate::compose::engine::{ComposedAsset, CompositionEngine, CompositionOptions};
pub use crate::config::EngineConfig;
pub use crate::foundation::core::{Dimensions, Rgba8};
pub use crate::foundation::error::{AdError, AdResult, CallFailure, ErrorKind};
pub use crate::model::inputs::{BrandIdentity, BrandStrategy, ChannelSpec, Product, RunInputs};
pub use crate::model::stages::{
    AdCopy, CreativeConcept, SceneAsset, Segment, SegmentKey, StrategyBrief,
};
pub use crate::pipeline::collaborators::{
    ContentStages, SceneGenerator, SceneRequest, StageContext,
};
pub use crate::pipeline::ledger::{ErrorLedger, ErrorRecord};
pub use crate::pipeline::orchestrator::{RunOutcome, SegmentOrchestrator};
pub use crate::pipeline::policy::{CopyLimitPolicy, RetryPolicy};
pub use crate::pipeline::state::{RunStatus, SegmentStatus, StageName};
pub use crate::pipeline::summary::RunSummary;
pub use crate::render::text::TextRenderer;
