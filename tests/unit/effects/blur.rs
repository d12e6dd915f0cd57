use super::*;

#[test]
fn blur_radius_0_is_identity() {
    let src = vec![1u8, 2, 3, 4, 5, 6, 7, 8];
    assert_eq!(blur_rgba8_premul(&src, 1, 2, 0, 1.0).unwrap(), src);
}

#[test]
fn blur_constant_image_is_identity() {
    let (w, h) = (6u32, 4u32);
    let src = [12u8, 24, 36, 48].repeat((w * h) as usize);
    assert_eq!(blur_rgba8_premul(&src, w, h, 3, 2.0).unwrap(), src);
}

#[test]
fn blur_spreads_a_point_and_keeps_its_energy() {
    let (w, h) = (7u32, 7u32);
    let mut src = vec![0u8; (w * h * 4) as usize];
    let center = ((3 * w + 3) * 4) as usize;
    src[center..center + 4].copy_from_slice(&[255, 255, 255, 255]);

    let out = blur_rgba8_premul(&src, w, h, 2, 1.2).unwrap();
    assert!(out.chunks_exact(4).filter(|px| px[3] != 0).count() > 1);
    let sum_a: i32 = out.chunks_exact(4).map(|px| i32::from(px[3])).sum();
    assert!((sum_a - 255).abs() <= 16, "{sum_a}");
}

#[test]
fn blur_rejects_bad_input() {
    assert!(blur_rgba8_premul(&[0u8; 5], 1, 1, 1, 1.0).is_err());
    assert!(blur_rgba8_premul(&[0u8; 4], 1, 1, 1, 0.0).is_err());
}

#[test]
fn drop_shadow_pads_and_offsets() {
    let sprite = [0u8, 0, 0, 255].repeat(4);
    let shadow = DropShadow::subtle();
    let (buf, w, h, origin) = shadow.render(&sprite, 2, 2).unwrap();
    assert_eq!((w, h), (22, 22));
    assert_eq!(buf.len(), 22 * 22 * 4);
    assert_eq!(origin, Vec2::new(-5.0, -5.0));
    assert!(buf.chunks_exact(4).all(|px| px[3] <= 60));
    assert!(buf.chunks_exact(4).any(|px| px[3] > 0));
}
