use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use vello_cpu::kurbo::Shape;

use crate::assets::decode::{decode_image, decode_logo};
use crate::assets::fetch::AssetFetcher;
use crate::brand::resolver::{LogoRule, LogoSlot, ResolvedBrandIdentity};
use crate::compose::placer::{PlacerOptions, place_product};
use crate::effects::blur::DropShadow;
use crate::foundation::core::{Dimensions, PixelBox, Rgba8};
use crate::foundation::error::{AdError, AdResult};
use crate::layout::archetypes::{LayoutDirective, Region, resolve_layout};
use crate::model::inputs::RunInputs;
use crate::model::stages::{AdCopy, CreativeConcept, SceneAsset, SegmentKey};
use crate::render::raster::Raster;
use crate::render::text::{TextAlign, TextRenderer, TextStyle, VerticalAlign};

/// Encoded output format of a composed asset.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    Png,
    Jpeg,
}

impl OutputFormat {
    pub fn extension(self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpg",
        }
    }
}

/// Final image for one segment.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct ComposedAsset {
    pub segment_key: SegmentKey,
    pub dimensions: Dimensions,
    pub format: OutputFormat,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    #[serde(skip)]
    pub bytes: Arc<[u8]>,
    /// xxh3 of the final premultiplied pixels.
    pub fingerprint: u64,
    pub archetype: String,
    /// Non-fatal degradations (text logo fallback, skipped text, ...).
    #[serde(default)]
    pub warnings: Vec<String>,
}

/// Tunables for [`CompositionEngine`].
#[derive(Clone, Debug, PartialEq)]
pub struct CompositionOptions {
    pub placer: PlacerOptions,
    /// Minimum font size as a fraction of the starting size.
    pub min_text_ratio: f32,
    /// Shrink step as a fraction of the starting size.
    pub text_step_ratio: f32,
    pub ellipsis: String,
    pub jpeg_quality: u8,
    /// When set, [`CompositionEngine::persist`] writes to `<output_root>/<run_id>/<segment>.<ext>`.
    pub output_root: Option<PathBuf>,
}

impl Default for CompositionOptions {
    fn default() -> Self {
        Self {
            placer: PlacerOptions::default(),
            min_text_ratio: 0.5,
            text_step_ratio: 0.1,
            ellipsis: "\u{2026}".to_string(),
            jpeg_quality: 95,
            output_root: None,
        }
    }
}

impl CompositionOptions {
    pub fn with_output_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.output_root = Some(root.into());
        self
    }

    pub fn with_placer(mut self, placer: PlacerOptions) -> Self {
        self.placer = placer;
        self
    }
}

/// Everything one composition needs, borrowed from the run state.
#[derive(Clone, Copy, Debug)]
pub struct CompositionRequest<'a> {
    pub run_id: &'a str,
    pub segment_key: &'a SegmentKey,
    pub inputs: &'a RunInputs,
    pub brand: &'a ResolvedBrandIdentity,
    pub concept: &'a CreativeConcept,
    pub copy: &'a AdCopy,
    pub scene: &'a SceneAsset,
}

const CTA_URGENCY_COLOR: Rgba8 = Rgba8::rgb(0xFF, 0xCC, 0x00);
const DISCLAIMER_COLOR: Rgba8 = Rgba8::rgb(0x99, 0x99, 0x99);

/// Deterministic layer compositor: background, product, text, logos, disclaimer.
pub struct CompositionEngine {
    fetcher: Arc<dyn AssetFetcher>,
    text: Arc<TextRenderer>,
    options: CompositionOptions,
}

impl CompositionEngine {
    pub fn new(
        fetcher: Arc<dyn AssetFetcher>,
        text: Arc<TextRenderer>,
        options: CompositionOptions,
    ) -> Self {
        Self {
            fetcher,
            text,
            options,
        }
    }

    pub fn options(&self) -> &CompositionOptions {
        &self.options
    }

    #[tracing::instrument(skip(self, req), fields(segment = %req.segment_key, run = req.run_id))]
    pub fn compose(&self, req: &CompositionRequest<'_>) -> AdResult<ComposedAsset> {
        let mut warnings = Vec::new();
        let (canvas, layout) = self.render(req, &mut warnings)?;

        let format = if canvas.has_transparency() {
            OutputFormat::Png
        } else {
            OutputFormat::Jpeg
        };
        let bytes: Arc<[u8]> = match format {
            OutputFormat::Png => canvas.encode_png()?,
            OutputFormat::Jpeg => canvas.encode_jpeg(self.options.jpeg_quality, Rgba8::WHITE)?,
        }
        .into();

        for w in &warnings {
            tracing::warn!(warning = %w, "composition degraded");
        }
        Ok(ComposedAsset {
            segment_key: req.segment_key.clone(),
            dimensions: canvas.dimensions(),
            format,
            path: None,
            bytes,
            fingerprint: canvas.fingerprint(),
            archetype: layout.archetype,
            warnings,
        })
    }

    /// Write an encoded asset to `<output_root>/<run_id>/<segment>.<ext>` and record its path.
    ///
    /// Composition itself never touches the filesystem; a no-op without an output root.
    pub fn persist(&self, asset: &mut ComposedAsset, run_id: &str) -> AdResult<()> {
        if let Some(root) = &self.options.output_root {
            let path = write_asset(root, run_id, &asset.segment_key, asset.format, &asset.bytes)?;
            asset.path = Some(path);
        }
        Ok(())
    }

    /// Paint every layer onto a canvas of the channel's exact size.
    fn render(
        &self,
        req: &CompositionRequest<'_>,
        warnings: &mut Vec<String>,
    ) -> AdResult<(Raster, LayoutDirective)> {
        let dims = req.inputs.channel.dimensions;
        dims.validate()?;

        let mut canvas = self.background(req.scene, dims)?;
        tracing::debug!(w = dims.width, h = dims.height, "background ready");

        let layout = resolve_layout(&req.concept.layout_archetype, dims);

        let hero = req
            .inputs
            .product
            .hero_image()
            .ok_or_else(|| AdError::asset("product has no image reference"))?;
        let placed = place_product(
            self.fetcher.as_ref(),
            hero,
            &req.concept.product_placement,
            layout.pixel_box(Region::Product),
            &self.options.placer,
        )?;
        placed.draw(&mut canvas)?;
        tracing::debug!(segmented = placed.segmented, "product layer drawn");

        self.draw_copy(&mut canvas, &layout, req, warnings);
        self.draw_logos(&mut canvas, &layout, req.brand, warnings);
        if let Some(disclaimer) = req.copy.disclaimer.as_deref() {
            let footer = layout.pixel_box(Region::Footer);
            let style = self
                .style(layout.body_px() * 0.6, DISCLAIMER_COLOR)
                .with_align(TextAlign::Center)
                .with_valign(VerticalAlign::Center);
            self.draw_text(&mut canvas, disclaimer, footer, &style, "disclaimer", warnings);
        }
        Ok((canvas, layout))
    }

    /// Decode the scene and reconcile it with the channel size (cover-scale, center crop).
    fn background(&self, scene: &SceneAsset, dims: Dimensions) -> AdResult<Raster> {
        let bytes: Arc<[u8]> = match (&scene.bytes, &scene.path) {
            (Some(b), _) => b.clone(),
            (None, Some(p)) => std::fs::read(p)
                .map_err(|e| {
                    AdError::composition(format!("background '{}' missing: {e}", p.display()))
                })?
                .into(),
            (None, None) => return Err(AdError::composition("background asset missing")),
        };
        let bg = decode_image(&bytes)
            .map_err(|e| AdError::composition(format!("background undecodable: {e}")))?;

        if bg.is_empty()
            || u64::from(bg.width) * 2 < u64::from(dims.width)
            || u64::from(bg.height) * 2 < u64::from(dims.height)
        {
            return Err(AdError::composition(format!(
                "background {}x{} cannot be reconciled with {}x{}",
                bg.width, bg.height, dims.width, dims.height
            )));
        }
        if bg.width == dims.width && bg.height == dims.height {
            return Ok(bg);
        }

        let scale = (f64::from(dims.width) / f64::from(bg.width))
            .max(f64::from(dims.height) / f64::from(bg.height));
        let cw = ((f64::from(bg.width) * scale).ceil() as u32).max(dims.width);
        let ch = ((f64::from(bg.height) * scale).ceil() as u32).max(dims.height);
        let covered = bg.resize_exact(cw, ch)?;
        covered.crop(PixelBox::new(
            (cw - dims.width) / 2,
            (ch - dims.height) / 2,
            dims.width,
            dims.height,
        ))
    }

    fn style(&self, size_px: f32, color: Rgba8) -> TextStyle {
        TextStyle::new(size_px, color)
            .with_min_size((size_px * self.options.min_text_ratio).max(6.0))
            .with_step((size_px * self.options.text_step_ratio).max(1.0))
            .with_ellipsis(self.options.ellipsis.clone())
    }

    fn draw_copy(
        &self,
        canvas: &mut Raster,
        layout: &LayoutDirective,
        req: &CompositionRequest<'_>,
        warnings: &mut Vec<String>,
    ) {
        let copy = req.copy;

        let headline_box = layout.pixel_box(Region::Headline);
        let color = average_color(canvas, headline_box).contrasting();
        let style = self
            .style(layout.headline_px(), color)
            .with_shadow(text_shadow(color));
        self.draw_text(canvas, &copy.headline, headline_box, &style, "headline", warnings);

        let mut body_box = layout.pixel_box(Region::Body);
        if let Some(sub) = copy.subheadline.as_deref() {
            let sub_h = body_box.height * 2 / 5;
            let sub_box = PixelBox::new(body_box.x, body_box.y, body_box.width, sub_h);
            body_box = PixelBox::new(
                body_box.x,
                body_box.y + sub_h,
                body_box.width,
                body_box.height - sub_h,
            );
            let color = average_color(canvas, sub_box).contrasting();
            let style = self
                .style((layout.headline_px() + layout.body_px()) / 2.0, color)
                .with_shadow(text_shadow(color));
            self.draw_text(canvas, sub, sub_box, &style, "subheadline", warnings);
        }
        let color = average_color(canvas, body_box).contrasting();
        let style = self.style(layout.body_px(), color).with_shadow(text_shadow(color));
        self.draw_text(canvas, &copy.body, body_box, &style, "body", warnings);

        let mut cta_box = layout.pixel_box(Region::Cta);
        if let Some(urgency) = copy.cta_urgency.as_deref() {
            let button_h = cta_box.height * 7 / 10;
            let urgency_box = PixelBox::new(
                cta_box.x,
                cta_box.y + button_h,
                cta_box.width,
                cta_box.height - button_h,
            );
            cta_box.height = button_h;
            let style = self
                .style(layout.cta_px() * 0.7, CTA_URGENCY_COLOR)
                .with_align(TextAlign::Center)
                .with_valign(VerticalAlign::Center);
            self.draw_text(canvas, urgency, urgency_box, &style, "cta urgency", warnings);
        }
        let button_color = req
            .brand
            .dominant
            .palette
            .accent_or_primary()
            .unwrap_or(Rgba8::BLACK);
        if let Err(err) = fill_rounded(canvas, cta_box, button_color) {
            warnings.push(format!("cta button skipped: {err}"));
        }
        let pad = (cta_box.height / 8).min(cta_box.width / 8);
        let style = self
            .style(layout.cta_px(), button_color.contrasting())
            .with_align(TextAlign::Center)
            .with_valign(VerticalAlign::Center);
        self.draw_text(canvas, &copy.cta, cta_box.inset(pad), &style, "cta", warnings);
    }

    fn draw_logos(
        &self,
        canvas: &mut Raster,
        layout: &LayoutDirective,
        brand: &ResolvedBrandIdentity,
        warnings: &mut Vec<String>,
    ) {
        let region = layout.pixel_box(Region::Logo);
        let (logo_area, caption_area) = match (&brand.caption, brand.logo_rule) {
            (Some(_), LogoRule::DominantWithCaption) => {
                let logo_h = region.height * 7 / 10;
                (
                    PixelBox::new(region.x, region.y, region.width, logo_h),
                    Some(PixelBox::new(
                        region.x,
                        region.y + logo_h,
                        region.width,
                        region.height - logo_h,
                    )),
                )
            }
            _ => (region, None),
        };

        let slots: Vec<PixelBox> = match brand.logo_rule {
            LogoRule::SideBySide if brand.logos.len() > 1 => {
                let gap = logo_area.width / 20;
                let (a, b) = logo_area.split_columns(gap);
                vec![a, b]
            }
            _ => vec![logo_area],
        };
        for (slot, logo) in slots.iter().zip(brand.logos.iter()) {
            self.draw_logo(canvas, logo, *slot, warnings);
        }

        if let (Some(caption), Some(area)) = (brand.caption.as_deref(), caption_area) {
            let color = average_color(canvas, area).contrasting();
            let style = self
                .style(layout.body_px() * 0.8, color)
                .with_align(TextAlign::Center)
                .with_valign(VerticalAlign::Center)
                .with_shadow(text_shadow(color));
            self.draw_text(canvas, caption, area, &style, "caption", warnings);
        }
    }

    fn draw_logo(
        &self,
        canvas: &mut Raster,
        logo: &LogoSlot,
        slot: PixelBox,
        warnings: &mut Vec<String>,
    ) {
        if slot.is_empty() {
            return;
        }
        let loaded = logo
            .logo
            .as_deref()
            .ok_or_else(|| AdError::asset("no logo reference"))
            .and_then(|r| self.fetcher.fetch(r))
            .and_then(|bytes| decode_logo(&bytes, slot.width, slot.height));
        match loaded {
            Ok(img) => {
                let x = i64::from(slot.x) + i64::from((slot.width - img.width.min(slot.width)) / 2);
                let y =
                    i64::from(slot.y) + i64::from((slot.height - img.height.min(slot.height)) / 2);
                if let Err(err) = canvas.draw_over(&img, x, y, 1.0) {
                    warnings.push(format!("logo '{}' skipped: {err}", logo.brand_name));
                }
            }
            Err(err) => {
                warnings.push(format!(
                    "logo for '{}' unavailable ({err}); rendered as text",
                    logo.brand_name
                ));
                let color = average_color(canvas, slot).contrasting();
                let style = self
                    .style(slot.height as f32 * 0.6, color)
                    .with_align(TextAlign::Center)
                    .with_valign(VerticalAlign::Center);
                self.draw_text(canvas, &logo.brand_name, slot, &style, "text logo", warnings);
            }
        }
    }

    fn draw_text(
        &self,
        canvas: &mut Raster,
        text: &str,
        target: PixelBox,
        style: &TextStyle,
        what: &str,
        warnings: &mut Vec<String>,
    ) {
        match self.text.draw(canvas, text, target, style) {
            Ok(block) if block.truncated => {
                warnings.push(format!("{what} truncated at {}px", block.font_size));
            }
            Ok(_) => {}
            Err(err) => warnings.push(format!("{what} skipped: {err}")),
        }
    }
}

fn text_shadow(color: Rgba8) -> Option<DropShadow> {
    (color == Rgba8::WHITE).then(DropShadow::text)
}

/// Mean straight color of `area` (clipped to the raster).
pub fn average_color(r: &Raster, area: PixelBox) -> Rgba8 {
    let x1 = area.right().min(r.width);
    let y1 = area.bottom().min(r.height);
    let mut sum = [0u64; 4];
    let mut n = 0u64;
    for y in area.y.min(y1)..y1 {
        for x in area.x.min(x1)..x1 {
            for (acc, c) in sum.iter_mut().zip(r.pixel(x, y)) {
                *acc += u64::from(c);
            }
            n += 1;
        }
    }
    if n == 0 || sum[3] == 0 {
        return Rgba8::WHITE;
    }
    // Premultiplied sums divided by summed alpha give the straight mean.
    let straight = |c: usize| ((sum[c] * 255 + sum[3] / 2) / sum[3]).min(255) as u8;
    Rgba8 {
        r: straight(0),
        g: straight(1),
        b: straight(2),
        a: (sum[3] / n) as u8,
    }
}

/// Fill `area` with a rounded rectangle (corner radius a quarter of the short side).
fn fill_rounded(canvas: &mut Raster, area: PixelBox, color: Rgba8) -> AdResult<()> {
    if area.is_empty() {
        return Ok(());
    }
    let w16 = u16::try_from(area.width).map_err(|_| AdError::composition("button too wide"))?;
    let h16 = u16::try_from(area.height).map_err(|_| AdError::composition("button too tall"))?;
    let radius = f64::from(area.short_side()) / 4.0;

    let mut ctx = vello_cpu::RenderContext::new(w16, h16);
    ctx.set_paint(vello_cpu::peniko::Color::from_rgba8(
        color.r, color.g, color.b, color.a,
    ));
    let shape = vello_cpu::kurbo::RoundedRect::new(
        0.0,
        0.0,
        f64::from(area.width),
        f64::from(area.height),
        radius,
    );
    ctx.fill_path(&shape.to_path(0.1));

    let mut pixmap = vello_cpu::Pixmap::new(w16, h16);
    ctx.flush();
    ctx.render_to_pixmap(&mut pixmap);
    let sprite = Raster::from_premul(area.width, area.height, pixmap.data_as_u8_slice().to_vec())?;
    canvas.draw_over(&sprite, i64::from(area.x), i64::from(area.y), 1.0)
}

fn write_asset(
    root: &Path,
    run_id: &str,
    key: &SegmentKey,
    format: OutputFormat,
    bytes: &[u8],
) -> AdResult<PathBuf> {
    let dir = root.join(run_id);
    std::fs::create_dir_all(&dir).with_context(|| format!("create {}", dir.display()))?;
    let path = dir.join(format!("{}.{}", key.file_stem(), format.extension()));
    std::fs::write(&path, bytes).with_context(|| format!("write {}", path.display()))?;
    tracing::debug!(path = %path.display(), bytes = bytes.len(), "asset written");
    Ok(path)
}

#[cfg(test)]
#[path = "../../tests/unit/compose/engine.rs"]
mod tests;
