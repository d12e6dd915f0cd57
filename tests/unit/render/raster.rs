use super::*;

#[test]
fn transparency_threshold() {
    let mut r = Raster::filled(2, 2, Rgba8::WHITE);
    assert!(!r.has_transparency());
    r.data[3] = 250;
    assert!(!r.has_transparency());
    r.data[3] = 249;
    assert!(r.has_transparency());
}

#[test]
fn resize_exact_hits_requested_size() {
    let r = Raster::filled(40, 20, Rgba8::rgb(10, 200, 30));
    let out = r.resize_exact(17, 9).unwrap();
    assert_eq!((out.width, out.height), (17, 9));
    assert_eq!(out.data.len(), 17 * 9 * 4);
    assert!(out.resize_exact(0, 9).is_err());
}

#[test]
fn fit_size_preserves_aspect() {
    let r = Raster::transparent(200, 100);
    assert_eq!(r.fit_size(50, 50), (50, 25));
    assert_eq!(r.fit_size(400, 100), (200, 100));
}

#[test]
fn crop_and_alpha_bounds() {
    let mut r = Raster::transparent(10, 8);
    r.fill(PixelBox::new(3, 2, 4, 3), Rgba8::BLACK);
    let b = r.alpha_bounds().unwrap();
    assert_eq!(b, PixelBox::new(3, 2, 4, 3));
    let c = r.crop(b).unwrap();
    assert!(!c.has_transparency());
    assert!(r.crop(PixelBox::new(8, 0, 5, 1)).is_err());
    assert!(Raster::transparent(3, 3).alpha_bounds().is_none());
}

#[test]
fn encoders_produce_decodable_images() {
    let r = Raster::filled(8, 6, Rgba8::rgb(255, 0, 0).with_alpha(128));
    let png = r.encode_png().unwrap();
    let back = image::load_from_memory(&png).unwrap().to_rgba8();
    assert_eq!(back.dimensions(), (8, 6));
    assert_eq!(back.get_pixel(0, 0).0[3], 128);

    let jpg = r.encode_jpeg(95, Rgba8::WHITE).unwrap();
    let back = image::load_from_memory(&jpg).unwrap();
    assert_eq!((back.width(), back.height()), (8, 6));
}

#[test]
fn fingerprint_tracks_pixels() {
    let a = Raster::filled(4, 4, Rgba8::WHITE);
    let mut b = a.clone();
    assert_eq!(a.fingerprint(), b.fingerprint());
    b.data[0] = 0;
    assert_ne!(a.fingerprint(), b.fingerprint());
}
