//! Foreground extraction for product photos shot on a plain backdrop.
//!
//! The backdrop color is the per-channel median of the border pixels. A flood fill from the border
//! through pixels close to that color marks the backdrop, which becomes transparent. Foreground
//! pixels touching the backdrop get half alpha as a one-pixel feather, then the result is cropped
//! to its alpha bounds.

use std::collections::VecDeque;

use rayon::prelude::*;

use crate::foundation::error::AdResult;
use crate::render::raster::Raster;

/// Default RGB distance under which a pixel counts as backdrop.
pub const DEFAULT_TOLERANCE: f32 = 32.0;

/// Outcome of [`remove_background`].
#[derive(Clone, Debug)]
pub struct Cutout {
    pub raster: Raster,
    /// `false` when no usable foreground was found and the input was returned unchanged.
    pub segmented: bool,
}

pub fn remove_background(src: &Raster, tolerance: f32) -> AdResult<Cutout> {
    if src.width < 3 || src.height < 3 {
        return Ok(Cutout {
            raster: src.clone(),
            segmented: false,
        });
    }
    let w = src.width as usize;
    let h = src.height as usize;

    let bg = border_median(src);
    let tol2 = tolerance.max(0.0).powi(2);
    let near = |i: usize| -> bool {
        let px = &src.data[i * 4..i * 4 + 4];
        let d: f32 = (0..3)
            .map(|c| (f32::from(px[c]) - f32::from(bg[c])).powi(2))
            .sum();
        d <= tol2
    };

    let mut backdrop = vec![false; w * h];
    let mut queue = VecDeque::new();
    let border = (0..w)
        .flat_map(|x| [x, (h - 1) * w + x])
        .chain((1..h - 1).flat_map(|y| [y * w, y * w + w - 1]));
    for i in border {
        if !backdrop[i] && near(i) {
            backdrop[i] = true;
            queue.push_back(i);
        }
    }
    while let Some(i) = queue.pop_front() {
        let (x, y) = (i % w, i / w);
        let mut visit = |j: usize| {
            if !backdrop[j] && near(j) {
                backdrop[j] = true;
                queue.push_back(j);
            }
        };
        if x > 0 {
            visit(i - 1);
        }
        if x + 1 < w {
            visit(i + 1);
        }
        if y > 0 {
            visit(i - w);
        }
        if y + 1 < h {
            visit(i + w);
        }
    }

    let removed = backdrop.iter().filter(|&&b| b).count();
    if removed == 0 || removed == w * h {
        tracing::debug!(removed, "segmentation found no separable foreground");
        return Ok(Cutout {
            raster: src.clone(),
            segmented: false,
        });
    }

    let mut data = src.data.clone();
    data.par_chunks_mut(w * 4).enumerate().for_each(|(y, row)| {
        for x in 0..w {
            let i = y * w + x;
            let px = &mut row[x * 4..x * 4 + 4];
            if backdrop[i] {
                px.copy_from_slice(&[0, 0, 0, 0]);
                continue;
            }
            let edge = (x > 0 && backdrop[i - 1])
                || (x + 1 < w && backdrop[i + 1])
                || (y > 0 && backdrop[i - w])
                || (y + 1 < h && backdrop[i + w]);
            if edge {
                for c in px.iter_mut() {
                    *c = (u16::from(*c) / 2) as u8;
                }
            }
        }
    });

    let keyed = Raster::from_premul(src.width, src.height, data)?;
    let raster = match keyed.alpha_bounds() {
        Some(b) => keyed.crop(b)?,
        None => keyed,
    };
    Ok(Cutout {
        raster,
        segmented: true,
    })
}

fn border_median(src: &Raster) -> [u8; 3] {
    let (w, h) = (src.width, src.height);
    let mut channels: [Vec<u8>; 3] = Default::default();
    let mut push = |x: u32, y: u32| {
        let px = src.pixel(x, y);
        for c in 0..3 {
            channels[c].push(px[c]);
        }
    };
    for x in 0..w {
        push(x, 0);
        push(x, h - 1);
    }
    for y in 1..h - 1 {
        push(0, y);
        push(w - 1, y);
    }
    let mut out = [0u8; 3];
    for (o, ch) in out.iter_mut().zip(channels.iter_mut()) {
        ch.sort_unstable();
        *o = ch[ch.len() / 2];
    }
    out
}

#[cfg(test)]
#[path = "../../tests/unit/assets/cutout.rs"]
mod tests;
