use anyhow::Context;

use crate::foundation::error::{AdError, AdResult};
use crate::render::raster::Raster;

/// Sniff the first bytes for an XML/SVG prologue.
pub fn looks_like_svg(bytes: &[u8]) -> bool {
    let head = &bytes[..bytes.len().min(512)];
    let text = String::from_utf8_lossy(head);
    let t = text.trim_start_matches('\u{feff}').trim_start();
    t.starts_with("<svg") || (t.starts_with("<?xml") && text.contains("<svg"))
}

pub fn parse_svg(bytes: &[u8]) -> AdResult<usvg::Tree> {
    let opts = usvg::Options::default();
    let tree = usvg::Tree::from_data(bytes, &opts).context("parse svg tree")?;
    Ok(tree)
}

/// Rasterize `tree` at the largest aspect-preserving size fitting `max_w x max_h`.
pub fn rasterize_svg_fit(tree: &usvg::Tree, max_w: u32, max_h: u32) -> AdResult<Raster> {
    let size = tree.size();
    let (sw, sh) = (size.width(), size.height());
    if !(sw.is_finite() && sh.is_finite() && sw > 0.0 && sh > 0.0) {
        return Err(AdError::asset("svg has invalid width/height"));
    }
    let scale = (max_w as f32 / sw).min(max_h as f32 / sh);
    let w = ((sw * scale).round() as u32).clamp(1, max_w.max(1));
    let h = ((sh * scale).round() as u32).clamp(1, max_h.max(1));

    let mut pixmap = resvg::tiny_skia::Pixmap::new(w, h)
        .ok_or_else(|| AdError::asset("failed to allocate svg pixmap"))?;
    let xform = resvg::tiny_skia::Transform::from_scale(w as f32 / sw, h as f32 / sh);
    resvg::render(tree, xform, &mut pixmap.as_mut());

    // tiny-skia pixmaps are premultiplied RGBA8 already.
    Raster::from_premul(w, h, pixmap.data().to_vec())
}

#[cfg(test)]
#[path = "../../tests/unit/assets/svg.rs"]
mod tests;
