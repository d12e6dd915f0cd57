use super::*;

#[test]
fn unusable_chain_falls_back_to_builtin() {
    let chain = vec![
        FontSource::File {
            path: PathBuf::from("/definitely/missing/font.ttf"),
        },
        FontSource::Bytes {
            label: "garbage".to_string(),
            data: Arc::from(&b"not a font"[..]),
        },
        FontSource::System {
            family: "No Such Family 7f3a".to_string(),
        },
    ];
    let book = FontBook::resolve(&chain);
    assert!(book.is_builtin());
    assert_eq!(book.skipped().len(), 3);
    assert_eq!(book.skipped()[1], "garbage");
}

#[test]
fn empty_chain_is_builtin() {
    assert!(FontBook::resolve(&[]).is_builtin());
    assert!(FontBook::builtin_only().skipped().is_empty());
}

#[test]
fn font_sources_deserialize_tagged() {
    let chain: Vec<FontSource> = serde_json::from_str(
        r#"[{"kind":"file","path":"fonts/Brand.ttf"},{"kind":"system","family":"Inter"}]"#,
    )
    .unwrap();
    assert_eq!(chain[0].label(), "fonts/Brand.ttf");
    assert_eq!(chain[1].label(), "system:Inter");
}

#[test]
fn default_chain_is_non_empty_system_list() {
    let chain = default_font_chain();
    assert!(!chain.is_empty());
    assert!(
        chain
            .iter()
            .all(|s| matches!(s, FontSource::System { .. }))
    );
}
