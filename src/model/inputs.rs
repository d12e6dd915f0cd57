use std::collections::BTreeMap;

use crate::foundation::core::{Dimensions, Rgba8};
use crate::foundation::error::{AdError, AdResult};

fn require(field: &str, value: &str) -> AdResult<()> {
    if value.trim().is_empty() {
        return Err(AdError::schema(format!("{field} must be non-empty")));
    }
    Ok(())
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Price {
    pub value: f64,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compare_at_price: Option<f64>,
}

fn default_currency() -> String {
    "USD".to_string()
}

/// The single product being advertised.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Product {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub features: Vec<String>,
    #[serde(default)]
    pub benefits: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<Price>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    /// Image references resolved through an `AssetFetcher`; the first one is the hero image.
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub metadata: BTreeMap<String, serde_json::Value>,
}

impl Product {
    pub fn hero_image(&self) -> Option<&str> {
        self.images.first().map(String::as_str)
    }

    pub fn validate(&self) -> AdResult<()> {
        require("product.id", &self.id)?;
        require("product.name", &self.name)?;
        if let Some(p) = &self.price
            && !(p.value.is_finite() && p.value >= 0.0)
        {
            return Err(AdError::schema("product.price.value must be a finite non-negative number"));
        }
        Ok(())
    }
}

/// Brand colors as hex strings.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ColorPalette {
    pub primary: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secondary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accent: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background: Option<String>,
}

impl Default for ColorPalette {
    fn default() -> Self {
        Self {
            primary: "#000000".to_string(),
            secondary: None,
            accent: None,
            background: None,
        }
    }
}

impl ColorPalette {
    pub fn primary(&self) -> AdResult<Rgba8> {
        Rgba8::from_hex(&self.primary)
    }

    /// Accent color, falling back to the primary when absent or unparsable.
    pub fn accent_or_primary(&self) -> AdResult<Rgba8> {
        match self.accent.as_deref().map(Rgba8::from_hex) {
            Some(Ok(c)) => Ok(c),
            _ => self.primary(),
        }
    }

    pub fn validate(&self) -> AdResult<()> {
        self.primary()?;
        for c in [&self.secondary, &self.accent, &self.background]
            .into_iter()
            .flatten()
        {
            Rgba8::from_hex(c)?;
        }
        Ok(())
    }
}

/// A brand as supplied by the caller (store or product brand).
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct BrandIdentity {
    pub brand_name: String,
    #[serde(default)]
    pub voice: String,
    #[serde(default)]
    pub tone_keywords: Vec<String>,
    #[serde(default)]
    pub visual_style: String,
    #[serde(default)]
    pub palette: ColorPalette,
    /// Logo reference (raster or SVG) resolved through an `AssetFetcher`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logo: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tagline: Option<String>,
}

impl BrandIdentity {
    pub fn named(brand_name: impl Into<String>) -> Self {
        Self {
            brand_name: brand_name.into(),
            voice: String::new(),
            tone_keywords: Vec::new(),
            visual_style: String::new(),
            palette: ColorPalette::default(),
            logo: None,
            tagline: None,
        }
    }

    pub fn with_logo(mut self, logo: impl Into<String>) -> Self {
        self.logo = Some(logo.into());
        self
    }

    pub fn with_palette(mut self, palette: ColorPalette) -> Self {
        self.palette = palette;
        self
    }

    pub fn validate(&self) -> AdResult<()> {
        require("brand.brand_name", &self.brand_name)?;
        self.palette.validate()
    }
}

/// How store and product brands share the canvas.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BrandStrategy {
    #[default]
    StoreDominant,
    ProductDominant,
    CoBranded,
}

impl BrandStrategy {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::StoreDominant => "store_dominant",
            Self::ProductDominant => "product_dominant",
            Self::CoBranded => "co_branded",
        }
    }
}

/// Advisory character limits per copy field.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct TextLimits {
    pub headline_max_chars: usize,
    pub body_max_chars: usize,
    pub cta_max_chars: usize,
}

impl Default for TextLimits {
    fn default() -> Self {
        Self {
            headline_max_chars: 40,
            body_max_chars: 125,
            cta_max_chars: 20,
        }
    }
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ChannelSpec {
    #[serde(default)]
    pub platform: String,
    #[serde(default)]
    pub placement: String,
    pub dimensions: Dimensions,
    #[serde(default)]
    pub text_limits: TextLimits,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audience_context: Option<String>,
}

impl ChannelSpec {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            platform: String::new(),
            placement: String::new(),
            dimensions: Dimensions { width, height },
            text_limits: TextLimits::default(),
            audience_context: None,
        }
    }

    pub fn validate(&self) -> AdResult<()> {
        self.dimensions
            .validate()
            .map_err(|e| AdError::schema(format!("channel: {e}")))
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PricePositioning {
    Budget,
    #[default]
    MidRange,
    Premium,
    Luxury,
}

#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct StoreContext {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_summary: Option<String>,
    pub price_positioning: PricePositioning,
    pub competitors: Vec<String>,
    pub statistics: BTreeMap<String, serde_json::Value>,
}

/// Everything a run is started with. Shared read-only across segment tasks.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct RunInputs {
    pub product: Product,
    pub store_brand: BrandIdentity,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_brand: Option<BrandIdentity>,
    #[serde(default)]
    pub brand_strategy: BrandStrategy,
    pub channel: ChannelSpec,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub store_context: Option<StoreContext>,
}

impl RunInputs {
    pub fn validate(&self) -> AdResult<()> {
        self.product.validate()?;
        self.store_brand.validate()?;
        if let Some(b) = &self.product_brand {
            b.validate()?;
        }
        self.channel.validate()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/model/inputs.rs"]
mod tests;
