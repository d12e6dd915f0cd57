use super::*;

#[test]
fn zero_rpm_disables_limiting() {
    let l = CallLimiter::new(&RateLimitConfig::default()).unwrap();
    assert!(!l.is_enabled());
    for _ in 0..1_000 {
        assert!(l.try_acquire());
    }
}

#[test]
fn burst_defaults_to_rpm() {
    let l = CallLimiter::new(&RateLimitConfig::per_minute(3)).unwrap();
    assert!(l.is_enabled());
    assert!(l.try_acquire());
    assert!(l.try_acquire());
    assert!(l.try_acquire());
    assert!(!l.try_acquire());
}

#[test]
fn explicit_burst_is_honored() {
    let l = CallLimiter::new(&RateLimitConfig {
        requests_per_minute: 60,
        burst: 1,
    })
    .unwrap();
    assert!(l.try_acquire());
    assert!(!l.try_acquire());
}

#[test]
fn absurd_burst_is_configuration_error() {
    let err = CallLimiter::new(&RateLimitConfig {
        requests_per_minute: 1,
        burst: 1_000,
    })
    .unwrap_err();
    assert!(matches!(err, AdError::Configuration(_)));
}

#[tokio::test]
async fn acquire_returns_immediately_with_tokens() {
    let l = CallLimiter::new(&RateLimitConfig::per_minute(10)).unwrap();
    tokio::time::timeout(std::time::Duration::from_secs(1), l.acquire())
        .await
        .unwrap();
}
