//! Seams to the external content services.
//!
//! The crate never talks to a model service directly. Callers plug in implementations of
//! [`ContentStages`] and [`SceneGenerator`]; every returned record is validated by the stage
//! executor before it is committed.

use async_trait::async_trait;

use crate::brand::resolver::ResolvedBrandIdentity;
use crate::foundation::core::Dimensions;
use crate::foundation::error::AdResult;
use crate::model::inputs::RunInputs;
use crate::model::stages::{AdCopy, CreativeConcept, SceneAsset, Segment, SegmentKey, StrategyBrief};

/// Read-only context handed to every content-stage call of one segment.
#[derive(Clone, Copy, Debug)]
pub struct StageContext<'a> {
    pub run_id: &'a str,
    pub inputs: &'a RunInputs,
    pub brand: &'a ResolvedBrandIdentity,
    pub segment: &'a Segment,
}

/// Structured content generation (segment discovery, strategy, concept, copy).
///
/// Failures should be reported as `AdError::ExternalCall` so the executor can classify them;
/// `MalformedOutput` is treated as a schema violation and not retried.
#[async_trait]
pub trait ContentStages: Send + Sync {
    async fn discover_segments(&self, inputs: &RunInputs) -> AdResult<Vec<Segment>>;

    async fn strategy(&self, cx: &StageContext<'_>) -> AdResult<StrategyBrief>;

    async fn concept(
        &self,
        cx: &StageContext<'_>,
        strategy: &StrategyBrief,
    ) -> AdResult<CreativeConcept>;

    async fn copy(
        &self,
        cx: &StageContext<'_>,
        strategy: &StrategyBrief,
        concept: &CreativeConcept,
    ) -> AdResult<AdCopy>;
}

/// What the scene generator is asked to paint.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SceneRequest {
    pub segment_key: SegmentKey,
    pub description: String,
    #[serde(default)]
    pub mood: String,
    #[serde(default)]
    pub color_direction: String,
    pub dimensions: Dimensions,
}

impl SceneRequest {
    pub fn from_concept(key: &SegmentKey, concept: &CreativeConcept, dims: Dimensions) -> Self {
        Self {
            segment_key: key.clone(),
            description: concept.scene_description.clone(),
            mood: concept.mood.clone(),
            color_direction: concept.color_direction.clone(),
            dimensions: dims,
        }
    }
}

/// Background scene generation.
#[async_trait]
pub trait SceneGenerator: Send + Sync {
    async fn generate(&self, request: &SceneRequest) -> AdResult<SceneAsset>;
}
