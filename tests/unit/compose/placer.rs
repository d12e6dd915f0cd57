use std::io::Cursor;

use super::*;
use crate::assets::fetch::MemoryFetcher;
use crate::foundation::core::Rgba8;
use crate::model::stages::ProductSize;

fn encode_png(r: &Raster) -> Vec<u8> {
    let img = image::RgbaImage::from_raw(
        r.width,
        r.height,
        crate::effects::composite::unpremultiply(&r.data),
    )
    .unwrap();
    let mut buf = Vec::new();
    image::DynamicImage::ImageRgba8(img)
        .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .unwrap();
    buf
}

fn product_photo() -> Vec<u8> {
    let mut r = Raster::filled(60, 40, Rgba8::WHITE);
    r.fill(PixelBox::new(10, 10, 40, 20), Rgba8::rgb(20, 60, 200));
    encode_png(&r)
}

fn placement(position: &str, size: ProductSize, treatment: &str) -> ProductPlacement {
    ProductPlacement {
        position: position.to_string(),
        size,
        treatment: treatment.to_string(),
    }
}

#[test]
fn position_and_treatment_parsing() {
    assert_eq!(
        Position::parse("bottom-left"),
        Position {
            horizontal: Anchor::Start,
            vertical: Anchor::End
        }
    );
    assert_eq!(
        Position::parse("somewhere"),
        Position {
            horizontal: Anchor::Center,
            vertical: Anchor::Center
        }
    );
    assert_eq!(Treatment::parse("Floating above"), Treatment::Floating);
    assert_eq!(Treatment::parse("drop shadow"), Treatment::Floating);
    assert_eq!(Treatment::parse("on surface"), Treatment::OnSurface);
    assert!(Treatment::parse("on surface").shadow().is_none());
    assert_eq!(Treatment::parse(""), Treatment::Default);
}

#[test]
fn size_category_sets_long_edge() {
    let fetcher = MemoryFetcher::new().with("p.png", product_photo());
    let region = PixelBox::new(100, 50, 400, 200);
    for (size, expected) in [
        (ProductSize::Dominant, 180),
        (ProductSize::Balanced, 140),
        (ProductSize::Subtle, 90),
    ] {
        let placed = place_product(
            &fetcher,
            "p.png",
            &placement("center", size, "on surface"),
            region,
            &PlacerOptions::default(),
        )
        .unwrap();
        assert!(placed.segmented);
        assert_eq!(placed.sprite.width.max(placed.sprite.height), expected);
        assert!(region.contains(placed.bounds()));
    }
}

#[test]
fn anchors_inside_region() {
    let fetcher = MemoryFetcher::new().with("p.png", product_photo());
    let region = PixelBox::new(0, 0, 300, 100);
    let right = place_product(
        &fetcher,
        "p.png",
        &placement("bottom right", ProductSize::Subtle, ""),
        region,
        &PlacerOptions::default(),
    )
    .unwrap();
    let b = right.bounds();
    assert_eq!(b.right(), 300);
    assert_eq!(b.bottom(), 100);
    assert!(right.shadow.is_some());
}

#[test]
fn transparent_input_skips_segmentation() {
    let mut r = Raster::transparent(20, 20);
    r.fill(PixelBox::new(5, 5, 10, 10), Rgba8::BLACK);
    let fetcher = MemoryFetcher::new().with("cut.png", encode_png(&r));
    let placed = place_product(
        &fetcher,
        "cut.png",
        &ProductPlacement::default(),
        PixelBox::new(0, 0, 100, 100),
        &PlacerOptions::default(),
    )
    .unwrap();
    assert!(!placed.segmented);
    assert_eq!((placed.sprite.width, placed.sprite.height), (70, 70));
}

#[test]
fn missing_or_corrupt_image_is_asset_error() {
    let fetcher = MemoryFetcher::new().with("bad.png", b"nope".to_vec());
    for reference in ["missing.png", "bad.png"] {
        let err = place_product(
            &fetcher,
            reference,
            &ProductPlacement::default(),
            PixelBox::new(0, 0, 100, 100),
            &PlacerOptions::default(),
        )
        .unwrap_err();
        assert!(matches!(err, AdError::AssetResolution(_)), "{err}");
    }
}

#[test]
fn product_draws_over_canvas() {
    let fetcher = MemoryFetcher::new().with("p.png", product_photo());
    let mut canvas = Raster::filled(200, 200, Rgba8::rgb(240, 200, 160));
    let placed = place_product(
        &fetcher,
        "p.png",
        &placement("center", ProductSize::Dominant, "floating"),
        PixelBox::new(0, 0, 200, 200),
        &PlacerOptions::default(),
    )
    .unwrap();
    placed.draw(&mut canvas).unwrap();
    let c = canvas.pixel(100, 100);
    assert!(c[2] > c[0], "product color should dominate the center: {c:?}");
    assert!(!canvas.has_transparency());
}
