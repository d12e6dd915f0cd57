use super::*;

fn dims(w: u32, h: u32) -> Dimensions {
    Dimensions::new(w, h).unwrap()
}

fn assert_disjoint_and_inside(d: &LayoutDirective) {
    let boxes: Vec<_> = d
        .regions
        .all()
        .iter()
        .map(|(region, _)| (*region, d.pixel_box(*region)))
        .collect();
    let canvas = PixelBox::new(0, 0, d.dimensions.width, d.dimensions.height);
    for (i, (ra, a)) in boxes.iter().enumerate() {
        assert!(!a.is_empty(), "{ra:?} empty in {}", d.archetype);
        assert!(canvas.contains(*a), "{ra:?} outside canvas");
        for (rb, b) in &boxes[i + 1..] {
            assert!(
                !a.intersects(*b),
                "{ra:?} overlaps {rb:?} in {} ({:?})",
                d.archetype,
                d.orientation
            );
        }
    }
}

#[test]
fn every_archetype_is_disjoint_in_every_orientation() {
    for name in archetype_names() {
        for (w, h) in [(1080, 1080), (1080, 1920), (1200, 628), (1080, 1350), (300, 250)] {
            let d = resolve_layout(name, dims(w, h));
            assert_eq!(d.archetype, name);
            assert_disjoint_and_inside(&d);
        }
    }
}

#[test]
fn unknown_name_resolves_to_default() {
    let d = resolve_layout("Cinematic Noir Collage", dims(1080, 1080));
    assert_eq!(d.archetype, DEFAULT_ARCHETYPE);
    assert_eq!(d.matched_by, ArchetypeMatch::Default);
    let d = resolve_layout("", dims(1080, 1080));
    assert_eq!(d.archetype, DEFAULT_ARCHETYPE);
}

#[test]
fn matching_stages() {
    let d = resolve_layout("Lifestyle Context Shot", dims(1080, 1080));
    assert_eq!(d.matched_by, ArchetypeMatch::Exact);

    let d = resolve_layout("problem / solution split", dims(1080, 1080));
    assert_eq!(d.archetype, "Problem/Solution Split");
    assert_eq!(d.matched_by, ArchetypeMatch::Normalized);

    let d = resolve_layout("Hero Product Stat Overlay", dims(1080, 1080));
    assert_eq!(d.archetype, "Hero Product with Stat Overlay");
    assert_eq!(d.matched_by, ArchetypeMatch::Fuzzy);
}

#[test]
fn portrait_stacks_text_below_product() {
    let d = resolve_layout("Problem/Solution Split", dims(1080, 1920));
    assert_eq!(d.orientation, Orientation::Portrait);
    let product = d.pixel_box(Region::Product);
    let headline = d.pixel_box(Region::Headline);
    let body = d.pixel_box(Region::Body);
    let cta = d.pixel_box(Region::Cta);
    assert!(headline.y >= product.bottom());
    assert!(body.y >= headline.bottom());
    assert!(cta.y >= body.bottom());
}

#[test]
fn landscape_keeps_archetype_product_side() {
    let split = resolve_layout("Problem/Solution Split", dims(1200, 628));
    let p = split.pixel_box(Region::Product);
    assert!(p.x >= 600, "product should stay on the right: {p:?}");

    let minimal = resolve_layout(DEFAULT_ARCHETYPE, dims(1200, 628));
    let p = minimal.pixel_box(Region::Product);
    assert!(p.right() <= 600, "product should sit on the left: {p:?}");
}

#[test]
fn typography_scales_with_height() {
    let d = resolve_layout(DEFAULT_ARCHETYPE, dims(1000, 1000));
    assert!((d.headline_px() - 40.0).abs() < 1e-3);
    assert!(d.headline_px() > d.body_px());
}
