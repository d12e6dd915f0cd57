use anyhow::Context;

use crate::assets::svg::{looks_like_svg, parse_svg, rasterize_svg_fit};
use crate::foundation::error::AdResult;
use crate::render::raster::Raster;

/// Decode encoded raster bytes (PNG, JPEG, WebP, ...) into premultiplied RGBA8.
pub fn decode_image(bytes: &[u8]) -> AdResult<Raster> {
    let dyn_img = image::load_from_memory(bytes).context("decode image from memory")?;
    let rgba = dyn_img.to_rgba8();
    let (width, height) = rgba.dimensions();
    Raster::from_straight(width, height, rgba.into_raw())
}

/// Decode a logo, raster or SVG, scaled to fit within `max_w x max_h`.
pub fn decode_logo(bytes: &[u8], max_w: u32, max_h: u32) -> AdResult<Raster> {
    if looks_like_svg(bytes) {
        let tree = parse_svg(bytes)?;
        return rasterize_svg_fit(&tree, max_w, max_h);
    }
    decode_image(bytes)?.resize_to_fit(max_w, max_h)
}

#[cfg(test)]
#[path = "../../tests/unit/assets/decode.rs"]
mod tests;
