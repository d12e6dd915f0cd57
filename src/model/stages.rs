use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use crate::foundation::error::{AdError, AdResult};
use crate::model::inputs::TextLimits;

fn require(field: &str, value: &str) -> AdResult<()> {
    if value.trim().is_empty() {
        return Err(AdError::schema(format!("{field} must be non-empty")));
    }
    Ok(())
}

/// Unique key of a customer segment within a run.
#[derive(
    Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(transparent)]
pub struct SegmentKey(pub String);

impl SegmentKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Key reduced to characters that are safe in a file name.
    pub fn file_stem(&self) -> String {
        self.0
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                    c
                } else {
                    '_'
                }
            })
            .collect()
    }
}

impl fmt::Display for SegmentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A discovered customer profile. Read-only once discovery has produced it.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Segment {
    pub key: SegmentKey,
    pub name: String,
    #[serde(default)]
    pub profile: serde_json::Value,
}

impl Segment {
    pub fn new(key: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            key: SegmentKey::new(key),
            name: name.into(),
            profile: serde_json::Value::Null,
        }
    }

    pub fn validate(&self) -> AdResult<()> {
        require("segment.key", self.key.as_str())?;
        require("segment.name", &self.name)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct StrategyBrief {
    pub positioning_statement: String,
    pub primary_pain_point: String,
    pub key_benefit: String,
    #[serde(default)]
    pub proof_point: String,
    #[serde(default)]
    pub emotional_appeal: String,
    #[serde(default)]
    pub tone_of_voice: String,
    pub message_hierarchy: Vec<String>,
}

impl StrategyBrief {
    pub fn validate(&self) -> AdResult<()> {
        require("strategy.positioning_statement", &self.positioning_statement)?;
        require("strategy.primary_pain_point", &self.primary_pain_point)?;
        require("strategy.key_benefit", &self.key_benefit)?;
        if !(1..=3).contains(&self.message_hierarchy.len()) {
            return Err(AdError::schema(format!(
                "strategy.message_hierarchy must have 1..=3 entries, got {}",
                self.message_hierarchy.len()
            )));
        }
        Ok(())
    }
}

/// Share of the product region the product should occupy.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductSize {
    Dominant,
    #[default]
    Balanced,
    Subtle,
}

impl ProductSize {
    /// Fraction of the product region's shorter side covered by the product's longer edge.
    pub fn region_fraction(self) -> f64 {
        match self {
            Self::Dominant => 0.90,
            Self::Balanced => 0.70,
            Self::Subtle => 0.45,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ProductPlacement {
    #[serde(default = "default_position")]
    pub position: String,
    #[serde(default)]
    pub size: ProductSize,
    #[serde(default)]
    pub treatment: String,
}

fn default_position() -> String {
    "center".to_string()
}

impl Default for ProductPlacement {
    fn default() -> Self {
        Self {
            position: default_position(),
            size: ProductSize::default(),
            treatment: String::new(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct CreativeConcept {
    pub big_idea: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visual_metaphor: Option<String>,
    pub layout_archetype: String,
    pub scene_description: String,
    #[serde(default)]
    pub product_placement: ProductPlacement,
    #[serde(default)]
    pub mood: String,
    #[serde(default)]
    pub color_direction: String,
    #[serde(default)]
    pub focal_point: String,
}

impl CreativeConcept {
    pub fn validate(&self) -> AdResult<()> {
        require("concept.big_idea", &self.big_idea)?;
        require("concept.scene_description", &self.scene_description)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct AdCopy {
    pub headline: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subheadline: Option<String>,
    #[serde(default)]
    pub body: String,
    pub cta: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cta_urgency: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disclaimer: Option<String>,
}

impl AdCopy {
    pub fn new(headline: impl Into<String>, body: impl Into<String>, cta: impl Into<String>) -> Self {
        Self {
            headline: headline.into(),
            subheadline: None,
            body: body.into(),
            cta: cta.into(),
            cta_urgency: None,
            disclaimer: None,
        }
    }

    pub fn validate(&self) -> AdResult<()> {
        require("copy.headline", &self.headline)?;
        require("copy.cta", &self.cta)
    }

    /// Human-readable descriptions of every field longer than its channel limit.
    pub fn limit_violations(&self, limits: &TextLimits) -> Vec<String> {
        let mut out = Vec::new();
        for (field, text, max) in [
            ("headline", self.headline.as_str(), limits.headline_max_chars),
            ("body", self.body.as_str(), limits.body_max_chars),
            ("cta", self.cta.as_str(), limits.cta_max_chars),
        ] {
            let n = text.chars().count();
            if n > max {
                out.push(format!("{field} has {n} chars (limit {max})"));
            }
        }
        out
    }
}

/// Generated background scene, carried as bytes or as a file path.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct SceneAsset {
    #[serde(skip)]
    pub bytes: Option<Arc<[u8]>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
    pub width: u32,
    pub height: u32,
}

impl SceneAsset {
    pub fn from_bytes(bytes: impl Into<Arc<[u8]>>, width: u32, height: u32) -> Self {
        Self {
            bytes: Some(bytes.into()),
            path: None,
            prompt: None,
            width,
            height,
        }
    }

    pub fn from_path(path: impl Into<PathBuf>, width: u32, height: u32) -> Self {
        Self {
            bytes: None,
            path: Some(path.into()),
            prompt: None,
            width,
            height,
        }
    }

    pub fn validate(&self) -> AdResult<()> {
        if self.bytes.is_none() && self.path.is_none() {
            return Err(AdError::schema("scene asset carries neither bytes nor a path"));
        }
        if self.width == 0 || self.height == 0 {
            return Err(AdError::schema(format!(
                "scene asset dimensions must be non-zero, got {}x{}",
                self.width, self.height
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/model/stages.rs"]
mod tests;
