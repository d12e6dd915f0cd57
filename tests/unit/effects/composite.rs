use super::*;

#[test]
fn over_opacity_0_is_noop() {
    let dst = [1, 2, 3, 4];
    assert_eq!(over(dst, [200, 200, 200, 200], 0.0), dst);
}

#[test]
fn over_src_opaque_replaces_dst() {
    assert_eq!(over([1, 2, 3, 255], [9, 8, 7, 255], 1.0), [9, 8, 7, 255]);
}

#[test]
fn over_dst_transparent_returns_scaled_src() {
    assert_eq!(over([0, 0, 0, 0], [100, 50, 0, 200], 1.0), [100, 50, 0, 200]);
}

#[test]
fn over_at_clips_negative_and_overflowing_offsets() {
    let (dw, dh) = (4u32, 4u32);
    let mut dst = vec![0u8; (dw * dh * 4) as usize];
    let src = [255u8, 0, 0, 255].repeat(9);
    over_at(&mut dst, dw, dh, &src, 3, 3, -1, 2, 1.0).unwrap();

    let px = |x: usize, y: usize| &dst[(y * dw as usize + x) * 4..][..4];
    assert_eq!(px(0, 2), [255, 0, 0, 255]);
    assert_eq!(px(1, 3), [255, 0, 0, 255]);
    assert_eq!(px(2, 2), [0, 0, 0, 0]);
    assert_eq!(px(0, 1), [0, 0, 0, 0]);
}

#[test]
fn over_at_rejects_mismatched_buffers() {
    let mut dst = vec![0u8; 16];
    assert!(over_at(&mut dst, 2, 2, &[0u8; 7], 1, 2, 0, 0, 1.0).is_err());
}

#[test]
fn flatten_over_white_keeps_opaque_and_whitens_clear() {
    let src = [10u8, 20, 30, 255, 0, 0, 0, 0];
    assert_eq!(flatten_to_rgb(&src, Rgba8::WHITE), vec![10, 20, 30, 255, 255, 255]);
}

#[test]
fn tint_keeps_coverage() {
    let src = [1u8, 2, 3, 255, 9, 9, 9, 0];
    let out = tint_alpha(&src, Rgba8::BLACK.with_alpha(100));
    assert_eq!(&out[..4], &[0, 0, 0, 100]);
    assert_eq!(&out[4..], &[0, 0, 0, 0]);
}

#[test]
fn premultiply_then_unpremultiply_is_close() {
    let mut buf = vec![200u8, 100, 50, 128];
    premultiply_in_place(&mut buf);
    assert_eq!(buf, vec![100, 50, 25, 128]);
    let back = unpremultiply(&buf);
    for (a, b) in back.iter().zip([200u8, 100, 50, 128]) {
        assert!((i16::from(*a) - i16::from(b)).abs() <= 2);
    }
}

#[test]
fn fill_rect_is_clipped() {
    let mut dst = vec![0u8; 2 * 2 * 4];
    fill_rect(&mut dst, 2, 2, 1, -5, 10, 6, Rgba8::WHITE);
    assert_eq!(&dst[4..8], &[255, 255, 255, 255]);
    assert_eq!(&dst[0..4], &[0, 0, 0, 0]);
    assert_eq!(&dst[12..16], &[0, 0, 0, 0]);
}
