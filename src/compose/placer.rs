use crate::assets::cutout::{DEFAULT_TOLERANCE, remove_background};
use crate::assets::decode::decode_image;
use crate::assets::fetch::AssetFetcher;
use crate::effects::blur::DropShadow;
use crate::foundation::core::PixelBox;
use crate::foundation::error::{AdError, AdResult};
use crate::model::stages::ProductPlacement;
use crate::render::raster::Raster;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Anchor {
    Start,
    Center,
    End,
}

/// Horizontal and vertical anchoring parsed from a free-form position string.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Position {
    pub horizontal: Anchor,
    pub vertical: Anchor,
}

impl Position {
    /// Parse phrases like `"center"`, `"bottom-right"`, `"left third"`; unknown words mean center.
    pub fn parse(s: &str) -> Self {
        let s = s.to_ascii_lowercase();
        let horizontal = if s.contains("left") {
            Anchor::Start
        } else if s.contains("right") {
            Anchor::End
        } else {
            Anchor::Center
        };
        let vertical = if s.contains("top") {
            Anchor::Start
        } else if s.contains("bottom") {
            Anchor::End
        } else {
            Anchor::Center
        };
        Self {
            horizontal,
            vertical,
        }
    }

    fn offset(anchor: Anchor, start: u32, span: u32, size: u32) -> i64 {
        let slack = i64::from(span) - i64::from(size);
        i64::from(start)
            + match anchor {
                Anchor::Start => 0,
                Anchor::Center => slack / 2,
                Anchor::End => slack,
            }
    }
}

/// Visual treatment applied around the product.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Treatment {
    /// Pronounced drop shadow ("floating", "shadow").
    Floating,
    /// Resting on a surface; no shadow.
    OnSurface,
    /// Anything else gets a subtle shadow.
    Default,
}

impl Treatment {
    pub fn parse(s: &str) -> Self {
        let s = s.to_ascii_lowercase();
        if s.contains("float") || s.contains("shadow") {
            Self::Floating
        } else if s.contains("surface") {
            Self::OnSurface
        } else {
            Self::Default
        }
    }

    pub fn shadow(self) -> Option<DropShadow> {
        match self {
            Self::Floating => Some(DropShadow::floating()),
            Self::OnSurface => None,
            Self::Default => Some(DropShadow::subtle()),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PlacerOptions {
    pub remove_background: bool,
    pub tolerance: f32,
}

impl Default for PlacerOptions {
    fn default() -> Self {
        Self {
            remove_background: true,
            tolerance: DEFAULT_TOLERANCE,
        }
    }
}

/// Product sprite ready to be composited, plus its optional shadow.
#[derive(Clone, Debug)]
pub struct PlacedProduct {
    pub sprite: Raster,
    pub x: i64,
    pub y: i64,
    pub shadow: Option<(Raster, i64, i64)>,
    pub segmented: bool,
}

impl PlacedProduct {
    /// Bounds of the product sprite (shadow excluded).
    pub fn bounds(&self) -> PixelBox {
        PixelBox::new(
            self.x.max(0) as u32,
            self.y.max(0) as u32,
            self.sprite.width,
            self.sprite.height,
        )
    }

    pub fn draw(&self, canvas: &mut Raster) -> AdResult<()> {
        if let Some((shadow, sx, sy)) = &self.shadow {
            canvas.draw_over(shadow, *sx, *sy, 1.0)?;
        }
        canvas.draw_over(&self.sprite, self.x, self.y, 1.0)
    }
}

/// Fetch, cut out, scale and position the product image inside `region`.
///
/// Fetch and decode failures are [`AdError::AssetResolution`]. Segmentation and shadow problems
/// degrade to the plain image.
#[tracing::instrument(skip(fetcher, placement, opts), fields(region = ?region))]
pub fn place_product(
    fetcher: &dyn AssetFetcher,
    reference: &str,
    placement: &ProductPlacement,
    region: PixelBox,
    opts: &PlacerOptions,
) -> AdResult<PlacedProduct> {
    let bytes = fetcher.fetch(reference).map_err(|e| match e {
        AdError::AssetResolution(_) => e,
        other => AdError::asset(format!("fetch product image '{reference}': {other}")),
    })?;
    let decoded = decode_image(&bytes)
        .map_err(|e| AdError::asset(format!("decode product image '{reference}': {e}")))?;
    if decoded.is_empty() {
        return Err(AdError::asset(format!("product image '{reference}' is empty")));
    }

    let (image, segmented) = if !decoded.has_transparency() && opts.remove_background {
        match remove_background(&decoded, opts.tolerance) {
            Ok(c) => (c.raster, c.segmented),
            Err(err) => {
                tracing::warn!(error = %err, "foreground extraction failed; using the full image");
                (decoded, false)
            }
        }
    } else {
        (decoded, false)
    };

    let target = ((f64::from(region.short_side()) * placement.size.region_fraction()).floor() as u32)
        .max(1);
    let (w, h) = image.fit_size(target, target);
    let sprite = image
        .resize_exact(w, h)
        .map_err(|e| AdError::asset(format!("scale product image: {e}")))?;

    let pos = Position::parse(&placement.position);
    let x = Position::offset(pos.horizontal, region.x, region.width, w);
    let y = Position::offset(pos.vertical, region.y, region.height, h);

    let shadow = Treatment::parse(&placement.treatment)
        .shadow()
        .and_then(|s| match s.render(&sprite.data, sprite.width, sprite.height) {
            Ok((buf, sw, sh, origin)) => Raster::from_premul(sw, sh, buf).ok().map(|r| {
                (
                    r,
                    x + origin.x.round() as i64,
                    y + origin.y.round() as i64,
                )
            }),
            Err(err) => {
                tracing::warn!(error = %err, "product shadow skipped");
                None
            }
        });

    tracing::debug!(w, h, x, y, segmented, "placed product");
    Ok(PlacedProduct {
        sprite,
        x,
        y,
        shadow,
        segmented,
    })
}

#[cfg(test)]
#[path = "../../tests/unit/compose/placer.rs"]
mod tests;
