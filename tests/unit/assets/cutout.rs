use super::*;
use crate::foundation::core::{PixelBox, Rgba8};

fn product_on_white() -> Raster {
    let mut r = Raster::filled(20, 16, Rgba8::rgb(250, 250, 250));
    r.fill(PixelBox::new(6, 4, 8, 6), Rgba8::rgb(200, 20, 20));
    r
}

#[test]
fn removes_plain_backdrop_and_crops() {
    let out = remove_background(&product_on_white(), DEFAULT_TOLERANCE).unwrap();
    assert!(out.segmented);
    assert_eq!((out.raster.width, out.raster.height), (8, 6));
    assert!(out.raster.has_transparency());
    // Interior keeps full alpha, edges are feathered.
    assert_eq!(out.raster.pixel(3, 3), [200, 20, 20, 255]);
    assert_eq!(out.raster.pixel(0, 0)[3], 127);
}

#[test]
fn holes_not_connected_to_border_are_kept() {
    let mut r = product_on_white();
    r.fill(PixelBox::new(9, 6, 2, 2), Rgba8::rgb(250, 250, 250));
    let out = remove_background(&r, DEFAULT_TOLERANCE).unwrap();
    assert_eq!(out.raster.pixel(3, 2)[3], 255);
}

#[test]
fn uniform_image_is_returned_unchanged() {
    let r = Raster::filled(10, 10, Rgba8::rgb(9, 9, 9));
    let out = remove_background(&r, DEFAULT_TOLERANCE).unwrap();
    assert!(!out.segmented);
    assert_eq!(out.raster, r);
}

#[test]
fn tolerance_controls_what_counts_as_backdrop() {
    let mut r = Raster::filled(12, 12, Rgba8::rgb(250, 250, 250));
    r.fill(PixelBox::new(3, 3, 6, 6), Rgba8::rgb(235, 235, 235));

    let loose = remove_background(&r, DEFAULT_TOLERANCE).unwrap();
    assert!(!loose.segmented);

    let tight = remove_background(&r, 5.0).unwrap();
    assert!(tight.segmented);
    assert_eq!((tight.raster.width, tight.raster.height), (6, 6));
}
