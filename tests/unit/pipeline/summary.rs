use std::sync::Arc;

use super::*;
use crate::foundation::error::ErrorKind;
use crate::model::inputs::{BrandIdentity, ChannelSpec, Product, RunInputs};
use crate::model::stages::{AdCopy, Segment};

fn state() -> SharedRunState {
    let inputs = RunInputs {
        product: Product {
            id: "sku".to_string(),
            name: "Trail Bottle".to_string(),
            description: String::new(),
            features: Vec::new(),
            benefits: Vec::new(),
            price: None,
            category: None,
            images: vec!["b.png".to_string()],
            metadata: Default::default(),
        },
        store_brand: BrandIdentity::named("Northwind"),
        product_brand: None,
        brand_strategy: BrandStrategy::StoreDominant,
        channel: ChannelSpec::new(100, 100),
        store_context: None,
    };
    SharedRunState::new("run-42", Arc::new(inputs))
}

fn populated() -> (SharedRunState, ErrorLedger) {
    let state = state();
    let ledger = ErrorLedger::new();
    state.insert_segment(Segment::new("a", "Athletes")).unwrap();
    state.insert_segment(Segment::new("b", "Commuters")).unwrap();

    let a = SegmentKey::new("a");
    state
        .update(&a, |s| {
            s.transition(SegmentStatus::Running)?;
            s.copy = Some(AdCopy::new("h", "b", "c"));
            s.transition(SegmentStatus::Failed)
        })
        .unwrap();
    let rec = ErrorRecord::new(Some(a.clone()), StageName::Scene, ErrorKind::ExternalCall, "boom");
    ledger.append(rec.clone());
    state
        .update(&a, |s| {
            s.errors.push(rec);
            Ok(())
        })
        .unwrap();
    (state, ledger)
}

#[test]
fn summary_reflects_segment_state() {
    let (state, ledger) = populated();
    let summary = RunSummary::build(&state, &ledger);
    assert_eq!(summary.run_id, "run-42");
    assert_eq!(summary.status, RunStatus::Failed);
    assert_eq!(summary.segments_count, 2);
    assert_eq!(summary.assets_produced, 0);
    assert_eq!(summary.errors_count, 1);

    let a = summary.segment(&SegmentKey::new("a")).unwrap();
    assert_eq!(a.status, SegmentStatus::Failed);
    assert!(a.has_copy && !a.has_scene && !a.has_final_asset);
    assert_eq!(a.error_count, 1);
    assert_eq!(a.errors[0].message, "boom");
    let b = summary.segment(&SegmentKey::new("b")).unwrap();
    assert_eq!(b.status, SegmentStatus::Pending);
    assert!(b.errors.is_empty());
    assert!(summary.elapsed_seconds >= 0.0);
}

#[test]
fn segment_errors_come_from_the_ledger_in_order() {
    let (state, ledger) = populated();
    let a = SegmentKey::new("a");
    ledger.append(ErrorRecord::new(None, StageName::Discovery, ErrorKind::Deadline, "late"));
    ledger.append(ErrorRecord::new(
        Some(a.clone()),
        StageName::Composition,
        ErrorKind::Internal,
        "second",
    ));
    let summary = RunSummary::build(&state, &ledger);
    let seg = summary.segment(&a).unwrap();
    let messages: Vec<_> = seg.errors.iter().map(|e| e.message.as_str()).collect();
    assert_eq!(messages, vec!["boom", "second"]);
    assert_eq!(seg.error_count, 2);
    assert_eq!(summary.errors_count, 3);

    let json = serde_json::to_string(&summary).unwrap();
    let back: RunSummary = serde_json::from_str(&json).unwrap();
    assert_eq!(back.segment(&a).unwrap().errors, seg.errors);
}

#[test]
fn json_is_written_under_run_directory() {
    let (state, ledger) = populated();
    let summary = RunSummary::build(&state, &ledger);
    let dir = tempfile::tempdir().unwrap();
    let path = summary.write_json(dir.path()).unwrap();
    assert_eq!(path, dir.path().join("run-42").join(SUMMARY_FILE_NAME));
    let back: RunSummary = serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
    assert_eq!(back, summary);

    let v: serde_json::Value = serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
    assert_eq!(v["brand_strategy"], "store_dominant");
    assert_eq!(v["segments"][0]["has_copy"], true);
    assert_eq!(v["errors"][0]["stage"], "scene");
}

#[test]
fn report_lists_every_segment_and_error() {
    let (state, ledger) = populated();
    let report = RunSummary::build(&state, &ledger).render_report();
    assert!(report.contains("AD RUN FAILED"));
    assert!(report.contains("Trail Bottle"));
    assert!(report.contains("[FAIL] Athletes (a)"));
    assert!(report.contains("[FAIL] Commuters (b)"));
    assert!(report.contains("- [scene] (a): boom"));
}
