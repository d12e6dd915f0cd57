use super::*;
use crate::foundation::error::CallFailure;

#[test]
fn backoff_grows_and_caps() {
    let p = RetryPolicy {
        max_attempts: 6,
        base_delay_ms: 100,
        multiplier: 2.0,
        max_delay_ms: 500,
    };
    let err = AdError::timeout("slow");
    let delays: Vec<u64> = (1..=5)
        .map(|a| p.delay_for(a, &err).as_millis() as u64)
        .collect();
    assert_eq!(delays, vec![100, 200, 400, 500, 500]);
}

#[test]
fn retry_after_hint_extends_delay() {
    let p = RetryPolicy {
        max_attempts: 3,
        base_delay_ms: 100,
        multiplier: 2.0,
        max_delay_ms: 1_000,
    };
    let hinted = AdError::rate_limited("429", Some(700));
    assert_eq!(p.delay_for(1, &hinted), Duration::from_millis(700));
    let huge = AdError::rate_limited("429", Some(60_000));
    assert_eq!(p.delay_for(1, &huge), Duration::from_millis(1_000));
}

#[test]
fn only_transient_failures_are_retried() {
    let p = RetryPolicy::immediate(3);
    assert!(p.should_retry(&AdError::timeout("t"), 1));
    assert!(p.should_retry(&AdError::external(CallFailure::Transport, "reset"), 2));
    assert!(!p.should_retry(&AdError::timeout("t"), 3));
    assert!(!p.should_retry(&AdError::schema("bad"), 1));
    assert!(!p.should_retry(
        &AdError::external(CallFailure::MalformedOutput, "not json"),
        1
    ));
    assert!(!RetryPolicy::none().should_retry(&AdError::timeout("t"), 1));
}

#[test]
fn validation_rejects_nonsense() {
    RetryPolicy::default().validate().unwrap();
    RetryPolicy::immediate(1).validate().unwrap();
    for bad in [
        RetryPolicy {
            max_attempts: 0,
            ..RetryPolicy::default()
        },
        RetryPolicy {
            multiplier: 0.5,
            ..RetryPolicy::default()
        },
        RetryPolicy {
            base_delay_ms: 10,
            max_delay_ms: 5,
            ..RetryPolicy::default()
        },
    ] {
        assert!(matches!(bad.validate(), Err(AdError::Configuration(_))));
    }
}
