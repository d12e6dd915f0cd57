use std::io::Cursor;

use anyhow::Context;

use crate::effects::composite::{fill_rect, flatten_to_rgb, over_at, premultiply_in_place, unpremultiply};
use crate::foundation::core::{Dimensions, PixelBox, Rgba8};
use crate::foundation::error::{AdError, AdResult};

/// Alpha below this value counts as transparency.
pub const TRANSPARENCY_ALPHA_THRESHOLD: u8 = 250;

/// Owned premultiplied RGBA8 image.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Raster {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

impl Raster {
    pub fn transparent(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![0; (width as usize) * (height as usize) * 4],
        }
    }

    pub fn filled(width: u32, height: u32, color: Rgba8) -> Self {
        let px = color.to_premul();
        Self {
            width,
            height,
            data: px.repeat((width as usize) * (height as usize)),
        }
    }

    pub fn from_premul(width: u32, height: u32, data: Vec<u8>) -> AdResult<Self> {
        if data.len() != (width as usize) * (height as usize) * 4 {
            return Err(AdError::composition(format!(
                "raster buffer of {} bytes does not match {width}x{height}",
                data.len()
            )));
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// Build from straight-alpha RGBA8.
    pub fn from_straight(width: u32, height: u32, mut data: Vec<u8>) -> AdResult<Self> {
        premultiply_in_place(&mut data);
        Self::from_premul(width, height, data)
    }

    pub fn dimensions(&self) -> Dimensions {
        Dimensions {
            width: self.width,
            height: self.height,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        let i = ((y as usize) * (self.width as usize) + x as usize) * 4;
        [
            self.data[i],
            self.data[i + 1],
            self.data[i + 2],
            self.data[i + 3],
        ]
    }

    pub fn has_transparency(&self) -> bool {
        self.data
            .chunks_exact(4)
            .any(|px| px[3] < TRANSPARENCY_ALPHA_THRESHOLD)
    }

    /// Composite `src` over `self` with its top-left at `(x, y)`.
    pub fn draw_over(&mut self, src: &Raster, x: i64, y: i64, opacity: f32) -> AdResult<()> {
        over_at(
            &mut self.data,
            self.width,
            self.height,
            &src.data,
            src.width,
            src.height,
            x,
            y,
            opacity,
        )
    }

    pub fn fill(&mut self, area: PixelBox, color: Rgba8) {
        fill_rect(
            &mut self.data,
            self.width,
            self.height,
            i64::from(area.x),
            i64::from(area.y),
            area.width,
            area.height,
            color,
        );
    }

    /// Resample to exactly `width x height` (Lanczos3, straight alpha).
    pub fn resize_exact(&self, width: u32, height: u32) -> AdResult<Self> {
        if width == 0 || height == 0 {
            return Err(AdError::composition("cannot resize to an empty raster"));
        }
        if width == self.width && height == self.height {
            return Ok(self.clone());
        }
        let straight = image::RgbaImage::from_raw(self.width, self.height, unpremultiply(&self.data))
            .context("wrap raster for resampling")?;
        let resized =
            image::imageops::resize(&straight, width, height, image::imageops::FilterType::Lanczos3);
        Self::from_straight(width, height, resized.into_raw())
    }

    /// Largest aspect-preserving size that fits in `max_w x max_h`, at least 1x1.
    pub fn fit_size(&self, max_w: u32, max_h: u32) -> (u32, u32) {
        if self.is_empty() {
            return (0, 0);
        }
        let scale = (f64::from(max_w) / f64::from(self.width))
            .min(f64::from(max_h) / f64::from(self.height));
        let w = ((f64::from(self.width) * scale).round() as u32).clamp(1, max_w.max(1));
        let h = ((f64::from(self.height) * scale).round() as u32).clamp(1, max_h.max(1));
        (w, h)
    }

    pub fn resize_to_fit(&self, max_w: u32, max_h: u32) -> AdResult<Self> {
        let (w, h) = self.fit_size(max_w, max_h);
        self.resize_exact(w, h)
    }

    pub fn crop(&self, area: PixelBox) -> AdResult<Self> {
        let canvas = PixelBox::new(0, 0, self.width, self.height);
        if area.is_empty() || !canvas.contains(area) {
            return Err(AdError::composition(format!(
                "crop {area:?} outside {}x{} raster",
                self.width, self.height
            )));
        }
        let mut data = Vec::with_capacity(area.width as usize * area.height as usize * 4);
        for y in area.y..area.bottom() {
            let off = ((y as usize) * (self.width as usize) + area.x as usize) * 4;
            data.extend_from_slice(&self.data[off..off + area.width as usize * 4]);
        }
        Self::from_premul(area.width, area.height, data)
    }

    /// Tight bounding box of pixels with non-zero alpha.
    pub fn alpha_bounds(&self) -> Option<PixelBox> {
        let (mut x0, mut y0, mut x1, mut y1) = (u32::MAX, u32::MAX, 0u32, 0u32);
        for y in 0..self.height {
            for x in 0..self.width {
                if self.pixel(x, y)[3] != 0 {
                    x0 = x0.min(x);
                    y0 = y0.min(y);
                    x1 = x1.max(x + 1);
                    y1 = y1.max(y + 1);
                }
            }
        }
        (x0 < x1).then(|| PixelBox::new(x0, y0, x1 - x0, y1 - y0))
    }

    pub fn encode_png(&self) -> AdResult<Vec<u8>> {
        let img = image::RgbaImage::from_raw(self.width, self.height, unpremultiply(&self.data))
            .context("wrap raster for png encoding")?;
        let mut buf = Vec::new();
        image::DynamicImage::ImageRgba8(img)
            .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
            .context("encode png")?;
        Ok(buf)
    }

    /// Encode as JPEG after flattening over `background`.
    pub fn encode_jpeg(&self, quality: u8, background: Rgba8) -> AdResult<Vec<u8>> {
        let rgb = flatten_to_rgb(&self.data, background);
        let mut buf = Vec::new();
        {
            let mut enc = image::codecs::jpeg::JpegEncoder::new_with_quality(&mut buf, quality);
            enc.encode(&rgb, self.width, self.height, image::ExtendedColorType::Rgb8)
                .context("encode jpeg")?;
        }
        Ok(buf)
    }

    /// Stable 64-bit hash of size and pixels.
    pub fn fingerprint(&self) -> u64 {
        let mut h = xxhash_rust::xxh3::Xxh3::new();
        h.update(&self.width.to_le_bytes());
        h.update(&self.height.to_le_bytes());
        h.update(&self.data);
        h.digest()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/raster.rs"]
mod tests;
