use smallvec::{SmallVec, smallvec};

use crate::foundation::error::{AdError, AdResult};
use crate::model::inputs::{BrandIdentity, BrandStrategy};

/// How logos are laid out inside the logo region.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogoRule {
    /// Only the dominant brand's logo.
    DominantOnly,
    /// Dominant logo plus a text caption naming the secondary brand.
    DominantWithCaption,
    /// Both logos side by side, dominant first.
    SideBySide,
}

/// One logo to draw: the brand name doubles as the text-logo fallback.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct LogoSlot {
    pub brand_name: String,
    pub logo: Option<String>,
}

impl LogoSlot {
    fn of(brand: &BrandIdentity) -> Self {
        Self {
            brand_name: brand.brand_name.clone(),
            logo: brand.logo.clone(),
        }
    }
}

/// Brand identity after applying the run's brand strategy.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ResolvedBrandIdentity {
    pub strategy: BrandStrategy,
    /// Brand whose palette and voice drive the visual.
    pub dominant: BrandIdentity,
    pub secondary: Option<BrandIdentity>,
    pub logo_rule: LogoRule,
    /// e.g. "Available at Northwind".
    pub caption: Option<String>,
    /// Logos that are actually drawn, in drawing order.
    pub logos: SmallVec<[LogoSlot; 2]>,
}

/// Resolve the brand presentation for a run.
///
/// Pure: the same `(store, product, strategy)` always yields the same value.
pub fn resolve_brand_identity(
    store: &BrandIdentity,
    product: Option<&BrandIdentity>,
    strategy: BrandStrategy,
) -> AdResult<ResolvedBrandIdentity> {
    let require_product = || {
        product.ok_or_else(|| {
            AdError::configuration(format!(
                "brand strategy '{}' requires a product brand",
                strategy.as_str()
            ))
        })
    };

    let resolved = match strategy {
        BrandStrategy::StoreDominant => ResolvedBrandIdentity {
            strategy,
            dominant: store.clone(),
            secondary: None,
            logo_rule: LogoRule::DominantOnly,
            caption: None,
            logos: smallvec![LogoSlot::of(store)],
        },
        BrandStrategy::ProductDominant => {
            let product = require_product()?;
            ResolvedBrandIdentity {
                strategy,
                dominant: product.clone(),
                secondary: Some(store.clone()),
                logo_rule: LogoRule::DominantWithCaption,
                caption: Some(format!("Available at {}", store.brand_name)),
                logos: smallvec![LogoSlot::of(product)],
            }
        }
        BrandStrategy::CoBranded => {
            let product = require_product()?;
            ResolvedBrandIdentity {
                strategy,
                dominant: store.clone(),
                secondary: Some(product.clone()),
                logo_rule: LogoRule::SideBySide,
                caption: None,
                logos: smallvec![LogoSlot::of(store), LogoSlot::of(product)],
            }
        }
    };

    tracing::debug!(
        strategy = strategy.as_str(),
        dominant = %resolved.dominant.brand_name,
        logos = resolved.logos.len(),
        "resolved brand identity"
    );
    Ok(resolved)
}

#[cfg(test)]
#[path = "../../tests/unit/brand/resolver.rs"]
mod tests;
