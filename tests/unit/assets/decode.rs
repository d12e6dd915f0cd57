use std::io::Cursor;

use super::*;

fn png_bytes(w: u32, h: u32, px: [u8; 4]) -> Vec<u8> {
    let img = image::RgbaImage::from_pixel(w, h, image::Rgba(px));
    let mut buf = Vec::new();
    image::DynamicImage::ImageRgba8(img)
        .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .unwrap();
    buf
}

#[test]
fn decode_image_png_dimensions_and_premul() {
    let r = decode_image(&png_bytes(1, 1, [100, 50, 200, 128])).unwrap();
    assert_eq!((r.width, r.height), (1, 1));
    assert_eq!(
        r.data,
        vec![
            ((100u16 * 128 + 127) / 255) as u8,
            ((50u16 * 128 + 127) / 255) as u8,
            ((200u16 * 128 + 127) / 255) as u8,
            128
        ]
    );
}

#[test]
fn decode_image_rejects_garbage() {
    assert!(decode_image(b"definitely not an image").is_err());
}

#[test]
fn decode_logo_fits_raster_and_svg() {
    let raster = decode_logo(&png_bytes(200, 100, [0, 0, 255, 255]), 50, 50).unwrap();
    assert_eq!((raster.width, raster.height), (50, 25));

    let svg = br##"<svg xmlns="http://www.w3.org/2000/svg" width="40" height="20">
        <rect width="40" height="20" fill="#00ff00"/></svg>"##;
    let logo = decode_logo(svg, 80, 80).unwrap();
    assert_eq!((logo.width, logo.height), (80, 40));
    assert!(!logo.has_transparency());
}
