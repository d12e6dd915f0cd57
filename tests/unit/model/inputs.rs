use super::*;

fn inputs_json() -> &'static str {
    r##"{
        "product": {
            "id": "sku-1",
            "name": "Trail Bottle",
            "price": { "value": 24.5 },
            "images": ["bottle.png", "bottle-side.png"]
        },
        "store_brand": {
            "brand_name": "Northwind",
            "palette": { "primary": "#1a2b3c", "accent": "#ff6600" }
        },
        "brand_strategy": "product_dominant",
        "product_brand": { "brand_name": "Hydra" },
        "channel": { "platform": "instagram", "dimensions": { "width": 1080, "height": 1080 } },
        "store_context": { "price_positioning": "mid-range", "competitors": ["A"] }
    }"##
}

#[test]
fn run_inputs_parse_with_defaults() {
    let inputs: RunInputs = serde_json::from_str(inputs_json()).unwrap();
    inputs.validate().unwrap();
    assert_eq!(inputs.brand_strategy, BrandStrategy::ProductDominant);
    assert_eq!(inputs.product.hero_image(), Some("bottle.png"));
    assert_eq!(inputs.channel.text_limits, TextLimits::default());
    assert_eq!(inputs.product.price.as_ref().unwrap().currency, "USD");
    assert_eq!(
        inputs.store_context.unwrap().price_positioning,
        PricePositioning::MidRange
    );
}

#[test]
fn palette_accent_falls_back_to_primary() {
    let mut p = ColorPalette {
        primary: "#102030".to_string(),
        ..ColorPalette::default()
    };
    assert_eq!(p.accent_or_primary().unwrap(), Rgba8::rgb(0x10, 0x20, 0x30));
    p.accent = Some("#ff0000".to_string());
    assert_eq!(p.accent_or_primary().unwrap(), Rgba8::rgb(255, 0, 0));
}

#[test]
fn validation_flags_structural_defects() {
    let mut inputs: RunInputs = serde_json::from_str(inputs_json()).unwrap();
    inputs.product.name = "  ".to_string();
    assert!(matches!(
        inputs.validate(),
        Err(AdError::SchemaViolation(_))
    ));

    let mut inputs: RunInputs = serde_json::from_str(inputs_json()).unwrap();
    inputs.channel.dimensions.height = 0;
    assert!(matches!(
        inputs.validate(),
        Err(AdError::SchemaViolation(_))
    ));

    let mut inputs: RunInputs = serde_json::from_str(inputs_json()).unwrap();
    inputs.store_brand.palette.primary = "blue".to_string();
    assert!(inputs.validate().is_err());
}

#[test]
fn strategy_names_are_snake_case() {
    for s in [
        BrandStrategy::StoreDominant,
        BrandStrategy::ProductDominant,
        BrandStrategy::CoBranded,
    ] {
        let json = serde_json::to_string(&s).unwrap();
        assert_eq!(json, format!("\"{}\"", s.as_str()));
    }
}
