use std::sync::{Arc, Mutex};

use crate::effects::blur::DropShadow;
use crate::foundation::core::{PixelBox, Rgba8};
use crate::foundation::error::{AdError, AdResult};
use crate::render::fonts::{FontBook, FontFace, LoadedFont};
use crate::render::raster::Raster;

/// Line pitch as a multiple of the font size.
pub const LINE_HEIGHT: f32 = 1.25;

// Built-in face metrics, in multiples of the font size.
const BUILTIN_ADVANCE: f32 = 0.625;
const BUILTIN_GLYPH_W: f32 = 0.5;
const BUILTIN_CAP: f32 = 0.75;
const BUILTIN_BASELINE: f32 = 0.8;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextAlign {
    #[default]
    Left,
    Center,
    Right,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerticalAlign {
    #[default]
    Top,
    Center,
    Bottom,
}

/// Sizing and styling knobs for one text element.
#[derive(Clone, Debug, PartialEq)]
pub struct TextStyle {
    pub size_px: f32,
    pub min_size_px: f32,
    pub step_px: f32,
    pub color: Rgba8,
    pub align: TextAlign,
    pub valign: VerticalAlign,
    pub ellipsis: String,
    pub shadow: Option<DropShadow>,
}

impl TextStyle {
    pub fn new(size_px: f32, color: Rgba8) -> Self {
        Self {
            size_px,
            min_size_px: (size_px * 0.5).max(8.0).min(size_px),
            step_px: 2.0,
            color,
            align: TextAlign::Left,
            valign: VerticalAlign::Top,
            ellipsis: "\u{2026}".to_string(),
            shadow: None,
        }
    }

    pub fn with_min_size(mut self, min_size_px: f32) -> Self {
        self.min_size_px = min_size_px.min(self.size_px);
        self
    }

    pub fn with_step(mut self, step_px: f32) -> Self {
        self.step_px = step_px;
        self
    }

    pub fn with_align(mut self, align: TextAlign) -> Self {
        self.align = align;
        self
    }

    pub fn with_valign(mut self, valign: VerticalAlign) -> Self {
        self.valign = valign;
        self
    }

    pub fn with_ellipsis(mut self, ellipsis: impl Into<String>) -> Self {
        self.ellipsis = ellipsis.into();
        self
    }

    pub fn with_shadow(mut self, shadow: Option<DropShadow>) -> Self {
        self.shadow = shadow;
        self
    }
}

/// A fitted block of text, positioned inside its target box.
#[derive(Clone, Debug, PartialEq)]
pub struct TextBlock {
    pub font_size: f32,
    pub lines: Vec<String>,
    pub line_widths: Vec<f32>,
    pub truncated: bool,
    /// Absolute pixel bounds, always contained in the target box.
    pub bounds: PixelBox,
}

impl TextBlock {
    pub fn line_height(&self) -> f32 {
        self.font_size * LINE_HEIGHT
    }

    pub fn text(&self) -> String {
        self.lines.join(" ")
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

struct ShapedLine {
    width: f32,
    height: f32,
    glyphs: Vec<vello_cpu::Glyph>,
}

struct ParleyShaper {
    font_ctx: parley::FontContext,
    layout_ctx: parley::LayoutContext<Rgba8Brush>,
    family_name: String,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
struct Rgba8Brush;

impl ParleyShaper {
    fn new(font: &LoadedFont) -> AdResult<Self> {
        let mut font_ctx = parley::FontContext::default();
        let families = font_ctx
            .collection
            .register_fonts(parley::fontique::Blob::from(font.data.as_ref().clone()), None);
        let family_id = families
            .first()
            .map(|(id, _)| *id)
            .ok_or_else(|| AdError::configuration("no font families registered from font bytes"))?;
        let family_name = font_ctx
            .collection
            .family_name(family_id)
            .ok_or_else(|| AdError::configuration("registered font family has no name"))?
            .to_string();
        Ok(Self {
            font_ctx,
            layout_ctx: parley::LayoutContext::new(),
            family_name,
        })
    }

    fn shape(&mut self, text: &str, size_px: f32) -> ShapedLine {
        let mut builder = self
            .layout_ctx
            .ranged_builder(&mut self.font_ctx, text, 1.0, true);
        builder.push_default(parley::style::StyleProperty::FontStack(
            parley::style::FontStack::Source(std::borrow::Cow::Owned(self.family_name.clone())),
        ));
        builder.push_default(parley::style::StyleProperty::FontSize(size_px));
        builder.push_default(parley::style::StyleProperty::Brush(Rgba8Brush));

        let mut layout: parley::Layout<Rgba8Brush> = builder.build(text);
        layout.break_all_lines(None);

        let mut glyphs = Vec::new();
        for line in layout.lines() {
            for item in line.items() {
                let parley::layout::PositionedLayoutItem::GlyphRun(run) = item else {
                    continue;
                };
                glyphs.extend(run.positioned_glyphs().map(|g| vello_cpu::Glyph {
                    id: g.id,
                    x: g.x,
                    y: g.y,
                }));
            }
        }
        ShapedLine {
            width: layout.width(),
            height: layout.height(),
            glyphs,
        }
    }
}

enum Shaper {
    Parley {
        shaper: Mutex<ParleyShaper>,
        font: vello_cpu::peniko::FontData,
    },
    Builtin,
}

/// Fits and draws text with a resolved [`FontBook`].
///
/// Shaping goes through one shared parley context; glyph rasterization happens outside the lock.
pub struct TextRenderer {
    shaper: Shaper,
}

impl TextRenderer {
    pub fn new(book: &FontBook) -> Self {
        let shaper = match book.face() {
            FontFace::Loaded(font) => match ParleyShaper::new(font) {
                Ok(shaper) => Shaper::Parley {
                    shaper: Mutex::new(shaper),
                    font: vello_cpu::peniko::FontData::new(
                        vello_cpu::peniko::Blob::from(font.data.as_ref().clone()),
                        font.index,
                    ),
                },
                Err(err) => {
                    tracing::warn!(font = %font.label, error = %err, "font rejected by shaper; using built-in face");
                    Shaper::Builtin
                }
            },
            FontFace::Builtin => Shaper::Builtin,
        };
        Self { shaper }
    }

    pub fn builtin() -> Self {
        Self {
            shaper: Shaper::Builtin,
        }
    }

    pub fn shared(book: &FontBook) -> Arc<Self> {
        Arc::new(Self::new(book))
    }

    fn shape(&self, text: &str, size_px: f32) -> AdResult<ShapedLine> {
        match &self.shaper {
            Shaper::Parley { shaper, .. } => {
                let mut s = shaper
                    .lock()
                    .map_err(|_| AdError::composition("text shaper lock poisoned"))?;
                Ok(s.shape(text, size_px))
            }
            Shaper::Builtin => Ok(builtin_shape(text, size_px)),
        }
    }

    /// Advance width of `text` on a single line.
    pub fn measure(&self, text: &str, size_px: f32) -> AdResult<f32> {
        Ok(self.shape(text, size_px)?.width)
    }

    /// Greedy word wrap at `size_px` into lines no wider than `max_width`.
    ///
    /// Words wider than `max_width` are broken by character.
    pub fn wrap(&self, text: &str, size_px: f32, max_width: f32) -> AdResult<Vec<String>> {
        let mut lines = Vec::new();
        for paragraph in text.split('\n') {
            let mut current = String::new();
            for word in paragraph.split_whitespace() {
                let candidate = if current.is_empty() {
                    word.to_string()
                } else {
                    format!("{current} {word}")
                };
                if self.measure(&candidate, size_px)? <= max_width {
                    current = candidate;
                    continue;
                }
                if !current.is_empty() {
                    lines.push(std::mem::take(&mut current));
                }
                if self.measure(word, size_px)? <= max_width {
                    current = word.to_string();
                    continue;
                }
                let mut pieces = self.break_word(word, size_px, max_width)?;
                current = pieces.pop().unwrap_or_default();
                lines.extend(pieces);
            }
            if !current.is_empty() {
                lines.push(current);
            }
        }
        Ok(lines)
    }

    fn break_word(&self, word: &str, size_px: f32, max_width: f32) -> AdResult<Vec<String>> {
        let mut pieces = Vec::new();
        let mut piece = String::new();
        for ch in word.chars() {
            let mut candidate = piece.clone();
            candidate.push(ch);
            if piece.is_empty() || self.measure(&candidate, size_px)? <= max_width {
                piece = candidate;
            } else {
                pieces.push(std::mem::replace(&mut piece, ch.to_string()));
            }
        }
        if !piece.is_empty() {
            pieces.push(piece);
        }
        Ok(pieces)
    }

    /// Fit `text` into `target`: wrap, shrink in steps down to the minimum size, then truncate.
    ///
    /// Never fails on overlong input; the returned block always lies within `target`.
    pub fn fit(&self, text: &str, target: PixelBox, style: &TextStyle) -> AdResult<TextBlock> {
        let text = text.trim();
        let empty = || TextBlock {
            font_size: style.size_px,
            lines: Vec::new(),
            line_widths: Vec::new(),
            truncated: false,
            bounds: PixelBox::new(target.x, target.y, 0, 0),
        };
        if text.is_empty() || target.is_empty() {
            return Ok(empty());
        }

        let max_w = target.width as f32;
        let max_h = target.height as f32;
        let min_size = style.min_size_px.clamp(1.0, style.size_px.max(1.0));
        let step = style.step_px.max(0.5);

        let mut size = style.size_px.max(min_size);
        loop {
            let lines = self.wrap(text, size, max_w)?;
            if lines.len() as f32 * size * LINE_HEIGHT <= max_h {
                return self.finish(lines, size, false, target, style);
            }
            if size <= min_size {
                break;
            }
            size = (size - step).max(min_size);
        }

        // At minimum size and still too tall: keep what fits and end with an ellipsis.
        if size * LINE_HEIGHT > max_h {
            size = (max_h / LINE_HEIGHT).max(1.0);
        }
        let max_lines = ((max_h / (size * LINE_HEIGHT)).floor() as usize).max(1);
        let mut lines = self.wrap(text, size, max_w)?;
        if lines.len() <= max_lines {
            return self.finish(lines, size, false, target, style);
        }
        lines.truncate(max_lines);
        if let Some(last) = lines.pop() {
            let ended = self.with_ellipsis(&last, size, max_w, &style.ellipsis)?;
            lines.push(ended);
        }
        tracing::debug!(size, lines = lines.len(), "text truncated at minimum size");
        self.finish(lines, size, true, target, style)
    }

    fn with_ellipsis(&self, line: &str, size: f32, max_w: f32, ellipsis: &str) -> AdResult<String> {
        let mut chars: Vec<char> = line.chars().collect();
        loop {
            let head: String = chars.iter().collect();
            let candidate = format!("{}{ellipsis}", head.trim_end());
            if chars.is_empty() || self.measure(&candidate, size)? <= max_w {
                return Ok(candidate);
            }
            chars.pop();
        }
    }

    fn finish(
        &self,
        lines: Vec<String>,
        size: f32,
        truncated: bool,
        target: PixelBox,
        style: &TextStyle,
    ) -> AdResult<TextBlock> {
        let mut line_widths = Vec::with_capacity(lines.len());
        for l in &lines {
            line_widths.push(self.measure(l, size)?.min(target.width as f32));
        }
        let widest = line_widths.iter().copied().fold(0.0f32, f32::max);
        let w = (widest.ceil() as u32).min(target.width);
        let h = ((lines.len() as f32 * size * LINE_HEIGHT).ceil() as u32).min(target.height);

        let x = target.x
            + match style.align {
                TextAlign::Left => 0,
                TextAlign::Center => (target.width - w) / 2,
                TextAlign::Right => target.width - w,
            };
        let y = target.y
            + match style.valign {
                VerticalAlign::Top => 0,
                VerticalAlign::Center => (target.height - h) / 2,
                VerticalAlign::Bottom => target.height - h,
            };

        Ok(TextBlock {
            font_size: size,
            lines,
            line_widths,
            truncated,
            bounds: PixelBox::new(x, y, w, h),
        })
    }

    /// Rasterize `block` (premultiplied), clipped to its bounds.
    pub fn rasterize(&self, block: &TextBlock, style: &TextStyle) -> AdResult<Raster> {
        let (w, h) = (block.bounds.width, block.bounds.height);
        if block.is_empty() || w == 0 || h == 0 {
            return Ok(Raster::transparent(w, h));
        }
        let w16 = u16::try_from(w).map_err(|_| AdError::composition("text block too wide"))?;
        let h16 = u16::try_from(h).map_err(|_| AdError::composition("text block too tall"))?;

        let mut ctx = vello_cpu::RenderContext::new(w16, h16);
        let c = style.color;
        ctx.set_paint(vello_cpu::peniko::Color::from_rgba8(c.r, c.g, c.b, c.a));

        let pitch = block.line_height();
        for (i, (line, line_w)) in block.lines.iter().zip(&block.line_widths).enumerate() {
            let shaped = self.shape(line, block.font_size)?;
            let dx = match style.align {
                TextAlign::Left => 0.0,
                TextAlign::Center => (w as f32 - line_w) / 2.0,
                TextAlign::Right => w as f32 - line_w,
            };
            let dy = i as f32 * pitch + (pitch - shaped.height).max(0.0) / 2.0;
            ctx.set_transform(vello_cpu::kurbo::Affine::translate((
                f64::from(dx.max(0.0)),
                f64::from(dy),
            )));
            match &self.shaper {
                Shaper::Parley { font, .. } => {
                    ctx.glyph_run(font)
                        .font_size(block.font_size)
                        .fill_glyphs(shaped.glyphs.into_iter());
                }
                Shaper::Builtin => {
                    for g in &shaped.glyphs {
                        let x0 = f64::from(g.x);
                        let y0 = f64::from(g.y - BUILTIN_CAP * block.font_size);
                        ctx.fill_rect(&vello_cpu::kurbo::Rect::new(
                            x0,
                            y0,
                            x0 + f64::from(BUILTIN_GLYPH_W * block.font_size),
                            f64::from(g.y),
                        ));
                    }
                }
            }
        }

        let mut pixmap = vello_cpu::Pixmap::new(w16, h16);
        ctx.flush();
        ctx.render_to_pixmap(&mut pixmap);
        Raster::from_premul(w, h, pixmap.data_as_u8_slice().to_vec())
    }

    /// Fit, rasterize and composite `text` onto `canvas`.
    pub fn draw(
        &self,
        canvas: &mut Raster,
        text: &str,
        target: PixelBox,
        style: &TextStyle,
    ) -> AdResult<TextBlock> {
        let block = self.fit(text, target, style)?;
        if block.is_empty() {
            return Ok(block);
        }
        let sprite = self.rasterize(&block, style)?;
        let (x, y) = (i64::from(block.bounds.x), i64::from(block.bounds.y));
        if let Some(shadow) = &style.shadow {
            let (buf, sw, sh, origin) = shadow.render(&sprite.data, sprite.width, sprite.height)?;
            let shadow = Raster::from_premul(sw, sh, buf)?;
            canvas.draw_over(
                &shadow,
                x + origin.x.round() as i64,
                y + origin.y.round() as i64,
                1.0,
            )?;
        }
        canvas.draw_over(&sprite, x, y, 1.0)?;
        Ok(block)
    }
}

fn builtin_shape(text: &str, size_px: f32) -> ShapedLine {
    let advance = BUILTIN_ADVANCE * size_px;
    let glyphs = text
        .chars()
        .enumerate()
        .filter(|(_, c)| !c.is_whitespace())
        .map(|(i, _)| vello_cpu::Glyph {
            id: 0,
            x: i as f32 * advance,
            y: BUILTIN_BASELINE * size_px,
        })
        .collect();
    ShapedLine {
        width: text.chars().count() as f32 * advance,
        height: size_px,
        glyphs,
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/text.rs"]
mod tests;
