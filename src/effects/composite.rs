use crate::foundation::core::Rgba8;
use crate::foundation::error::{AdError, AdResult};
use crate::foundation::math::mul_div255_u8;

/// One premultiplied RGBA8 pixel.
pub type PremulRgba8 = [u8; 4];

/// Source-over for premultiplied pixels, scaled by `opacity` in `0.0..=1.0`.
pub fn over(dst: PremulRgba8, src: PremulRgba8, opacity: f32) -> PremulRgba8 {
    let opacity = opacity.clamp(0.0, 1.0);
    if opacity <= 0.0 || src[3] == 0 {
        return dst;
    }

    let op = ((opacity * 255.0).round() as i32).clamp(0, 255) as u16;
    let sa = mul_div255_u8(u16::from(src[3]), op);
    if sa == 0 {
        return dst;
    }
    let inv = 255u16 - u16::from(sa);

    let mut out = [0u8; 4];
    out[3] = sa.saturating_add(mul_div255_u8(u16::from(dst[3]), inv));
    for i in 0..3 {
        let sc = mul_div255_u8(u16::from(src[i]), op);
        let dc = mul_div255_u8(u16::from(dst[i]), inv);
        out[i] = sc.saturating_add(dc);
    }
    out
}

/// Composite `src` (premultiplied, `src_w x src_h`) onto `dst` with its top-left at `(x, y)`.
///
/// Parts of `src` falling outside `dst` are clipped; negative offsets are allowed.
#[allow(clippy::too_many_arguments)]
pub fn over_at(
    dst: &mut [u8],
    dst_w: u32,
    dst_h: u32,
    src: &[u8],
    src_w: u32,
    src_h: u32,
    x: i64,
    y: i64,
    opacity: f32,
) -> AdResult<()> {
    if dst.len() != (dst_w as usize) * (dst_h as usize) * 4
        || src.len() != (src_w as usize) * (src_h as usize) * 4
    {
        return Err(AdError::composition(
            "over_at expects rgba8 buffers matching their dimensions",
        ));
    }

    let x0 = x.max(0);
    let y0 = y.max(0);
    let x1 = (x + i64::from(src_w)).min(i64::from(dst_w));
    let y1 = (y + i64::from(src_h)).min(i64::from(dst_h));
    if x0 >= x1 || y0 >= y1 {
        return Ok(());
    }

    let span = ((x1 - x0) as usize) * 4;
    for dy in y0..y1 {
        let sy = (dy - y) as usize;
        let sx = (x0 - x) as usize;
        let s_off = (sy * src_w as usize + sx) * 4;
        let d_off = (dy as usize * dst_w as usize + x0 as usize) * 4;
        let d_row = &mut dst[d_off..d_off + span];
        let s_row = &src[s_off..s_off + span];
        for (d, s) in d_row.chunks_exact_mut(4).zip(s_row.chunks_exact(4)) {
            let out = over([d[0], d[1], d[2], d[3]], [s[0], s[1], s[2], s[3]], opacity);
            d.copy_from_slice(&out);
        }
    }
    Ok(())
}

/// Fill an axis-aligned rectangle (clipped) with a straight-alpha color using source-over.
#[allow(clippy::too_many_arguments)]
pub fn fill_rect(dst: &mut [u8], dst_w: u32, dst_h: u32, x: i64, y: i64, w: u32, h: u32, color: Rgba8) {
    let src = color.to_premul();
    let x0 = x.clamp(0, i64::from(dst_w)) as usize;
    let y0 = y.clamp(0, i64::from(dst_h)) as usize;
    let x1 = (x + i64::from(w)).clamp(0, i64::from(dst_w)) as usize;
    let y1 = (y + i64::from(h)).clamp(0, i64::from(dst_h)) as usize;
    for row in y0..y1 {
        let off = (row * dst_w as usize + x0) * 4;
        let end = (row * dst_w as usize + x1) * 4;
        for d in dst[off..end].chunks_exact_mut(4) {
            let out = over([d[0], d[1], d[2], d[3]], src, 1.0);
            d.copy_from_slice(&out);
        }
    }
}

/// Replace the color of every pixel with `color`, keeping the source alpha as coverage.
pub fn tint_alpha(src: &[u8], color: Rgba8) -> Vec<u8> {
    let [r, g, b, a] = color.to_premul();
    let mut out = vec![0u8; src.len()];
    for (o, s) in out.chunks_exact_mut(4).zip(src.chunks_exact(4)) {
        let cov = u16::from(s[3]);
        o[0] = mul_div255_u8(u16::from(r), cov);
        o[1] = mul_div255_u8(u16::from(g), cov);
        o[2] = mul_div255_u8(u16::from(b), cov);
        o[3] = mul_div255_u8(u16::from(a), cov);
    }
    out
}

/// Composite premultiplied pixels over an opaque `background`, returning straight RGB8.
pub fn flatten_to_rgb(src: &[u8], background: Rgba8) -> Vec<u8> {
    let bg = [background.r, background.g, background.b, 255];
    let mut out = Vec::with_capacity(src.len() / 4 * 3);
    for s in src.chunks_exact(4) {
        let px = over(bg, [s[0], s[1], s[2], s[3]], 1.0);
        out.extend_from_slice(&px[..3]);
    }
    out
}

/// Convert premultiplied pixels back to straight alpha.
pub fn unpremultiply(src: &[u8]) -> Vec<u8> {
    let mut out = vec![0u8; src.len()];
    for (o, s) in out.chunks_exact_mut(4).zip(src.chunks_exact(4)) {
        let a = s[3];
        if a == 0 {
            continue;
        }
        let a32 = u32::from(a);
        for c in 0..3 {
            o[c] = ((u32::from(s[c]) * 255 + a32 / 2) / a32).min(255) as u8;
        }
        o[3] = a;
    }
    out
}

/// Convert straight-alpha pixels to premultiplied in place.
pub fn premultiply_in_place(buf: &mut [u8]) {
    for px in buf.chunks_exact_mut(4) {
        let a = u16::from(px[3]);
        if a == 255 {
            continue;
        }
        for c in &mut px[..3] {
            *c = mul_div255_u8(u16::from(*c), a);
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/effects/composite.rs"]
mod tests;
