use rayon::prelude::*;

use crate::effects::composite::tint_alpha;
use crate::foundation::core::{Rgba8, Vec2};
use crate::foundation::error::{AdError, AdResult};

/// Separable gaussian blur over premultiplied RGBA8, rows and columns processed in parallel.
///
/// Edges clamp. `radius == 0` returns the input unchanged.
pub fn blur_rgba8_premul(
    src: &[u8],
    width: u32,
    height: u32,
    radius: u32,
    sigma: f32,
) -> AdResult<Vec<u8>> {
    let expected_len = (width as usize)
        .checked_mul(height as usize)
        .and_then(|v| v.checked_mul(4))
        .ok_or_else(|| AdError::composition("blur buffer size overflow"))?;
    if src.len() != expected_len {
        return Err(AdError::composition(
            "blur expects a buffer matching width*height*4",
        ));
    }
    if radius == 0 || expected_len == 0 {
        return Ok(src.to_vec());
    }

    let kernel = gaussian_kernel_q16(radius, sigma)?;
    let w = width as usize;
    let h = height as usize;
    let r = radius as isize;

    let mut tmp = vec![0u8; expected_len];
    tmp.par_chunks_mut(w * 4).enumerate().for_each(|(y, row)| {
        let src_row = &src[y * w * 4..(y + 1) * w * 4];
        for x in 0..w {
            let mut acc = [0u64; 4];
            for (ki, &kw) in kernel.iter().enumerate() {
                let sx = (x as isize + ki as isize - r).clamp(0, w as isize - 1) as usize;
                let px = &src_row[sx * 4..sx * 4 + 4];
                for c in 0..4 {
                    acc[c] += u64::from(kw) * u64::from(px[c]);
                }
            }
            for c in 0..4 {
                row[x * 4 + c] = q16_to_u8(acc[c]);
            }
        }
    });

    let mut out = vec![0u8; expected_len];
    out.par_chunks_mut(w * 4).enumerate().for_each(|(y, row)| {
        for x in 0..w {
            let mut acc = [0u64; 4];
            for (ki, &kw) in kernel.iter().enumerate() {
                let sy = (y as isize + ki as isize - r).clamp(0, h as isize - 1) as usize;
                let idx = (sy * w + x) * 4;
                for c in 0..4 {
                    acc[c] += u64::from(kw) * u64::from(tmp[idx + c]);
                }
            }
            for c in 0..4 {
                row[x * 4 + c] = q16_to_u8(acc[c]);
            }
        }
    });
    Ok(out)
}

/// Integer gaussian weights in Q16 that sum to exactly `1 << 16`.
fn gaussian_kernel_q16(radius: u32, sigma: f32) -> AdResult<Vec<u32>> {
    if !sigma.is_finite() || sigma <= 0.0 {
        return Err(AdError::composition("blur sigma must be > 0"));
    }

    let r = radius as i32;
    let denom = 2.0 * f64::from(sigma) * f64::from(sigma);
    let weights_f: Vec<f64> = (-r..=r)
        .map(|i| (-(f64::from(i) * f64::from(i)) / denom).exp())
        .collect();
    let sum: f64 = weights_f.iter().sum();

    let mut weights: Vec<u32> = weights_f
        .iter()
        .map(|wf| ((wf / sum) * 65536.0).round().clamp(0.0, 65536.0) as u32)
        .collect();
    let acc: i64 = weights.iter().map(|&q| i64::from(q)).sum();
    let mid = weights.len() / 2;
    weights[mid] = (i64::from(weights[mid]) + 65536 - acc).clamp(0, 65536) as u32;
    Ok(weights)
}

fn q16_to_u8(acc: u64) -> u8 {
    ((acc + 32768) >> 16).min(255) as u8
}

/// A soft shadow for a premultiplied sprite.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct DropShadow {
    pub offset: Vec2,
    pub blur_radius: u32,
    pub color: Rgba8,
}

impl DropShadow {
    /// Pronounced shadow for floating products.
    pub fn floating() -> Self {
        Self {
            offset: Vec2::new(8.0, 8.0),
            blur_radius: 15,
            color: Rgba8::BLACK.with_alpha(100),
        }
    }

    /// Light shadow applied when no treatment is specified.
    pub fn subtle() -> Self {
        Self {
            offset: Vec2::new(5.0, 5.0),
            blur_radius: 10,
            color: Rgba8::BLACK.with_alpha(60),
        }
    }

    /// Shadow used behind text.
    pub fn text() -> Self {
        Self {
            offset: Vec2::new(2.0, 2.0),
            blur_radius: 3,
            color: Rgba8::BLACK.with_alpha(90),
        }
    }

    /// Render the shadow of `sprite` into a padded buffer.
    ///
    /// Returns `(pixels, width, height, origin)` where `origin` is the top-left of the padded
    /// buffer relative to the sprite's top-left, offset included.
    pub fn render(&self, sprite: &[u8], width: u32, height: u32) -> AdResult<(Vec<u8>, u32, u32, Vec2)> {
        let pad = self.blur_radius;
        let pw = width + 2 * pad;
        let ph = height + 2 * pad;
        let tinted = tint_alpha(sprite, self.color);

        let mut padded = vec![0u8; (pw as usize) * (ph as usize) * 4];
        for y in 0..height as usize {
            let s = &tinted[y * width as usize * 4..(y + 1) * width as usize * 4];
            let d_off = ((y + pad as usize) * pw as usize + pad as usize) * 4;
            padded[d_off..d_off + s.len()].copy_from_slice(s);
        }

        let sigma = (self.blur_radius as f32 / 2.0).max(0.5);
        let blurred = blur_rgba8_premul(&padded, pw, ph, self.blur_radius, sigma)?;
        let origin = Vec2::new(
            self.offset.x - f64::from(pad),
            self.offset.y - f64::from(pad),
        );
        Ok((blurred, pw, ph, origin))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/effects/blur.rs"]
mod tests;
