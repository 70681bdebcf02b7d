//! Cache adapter properties exercised through the public port.

use std::time::Duration;

use backplane::domain::HealthStatus;
use backplane::domain::ports::CacheService;
use backplane::test_support::BackendBehaviour;
use rstest::rstest;

mod support;

use support::cache_pair;

#[rstest]
#[case("user:1")]
#[case("")]
#[case("ключ")]
#[tokio::test]
async fn never_written_keys_are_misses(#[case] key: &str) {
    let (cache, _) = cache_pair();
    assert_eq!(cache.get(key).await, None);
}

#[rstest]
#[tokio::test]
async fn set_get_delete_round_trip() {
    let (cache, backend) = cache_pair();
    let value = r#"{"name":"a"}"#;

    cache
        .set("user:42", value, Some(Duration::from_secs(3600)))
        .await
        .expect("set succeeds");
    assert_eq!(cache.get("user:42").await.as_deref(), Some(value));
    assert_eq!(
        backend.ttl("user:42"),
        Some(Some(Duration::from_secs(3600)))
    );

    assert!(cache.delete("user:42").await);
    assert_eq!(cache.get("user:42").await, None);
    assert!(!cache.delete("user:42").await);
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn stalled_set_returns_within_deadline() {
    let (cache, backend) = cache_pair();
    backend.set_behaviour(BackendBehaviour::Stall);

    let started = tokio::time::Instant::now();
    let outcome = cache.set("k", "v", Some(Duration::from_secs(60))).await;
    let elapsed = started.elapsed();

    let err = outcome.expect_err("stalled set must fail");
    assert!(err.is_timeout(), "unexpected error: {err}");
    assert!(elapsed >= Duration::from_secs(2));
    assert!(elapsed < Duration::from_millis(2100), "took {elapsed:?}");
}

#[rstest]
#[tokio::test]
async fn health_tracks_backend_reachability() {
    let (cache, backend) = cache_pair();
    assert_eq!(cache.health_check().await.status(), HealthStatus::Up);

    backend.set_behaviour(BackendBehaviour::Fail("dial tcp: connection refused".to_owned()));
    let report = cache.health_check().await;
    assert_eq!(report.status(), HealthStatus::Down);
    assert!(report.error().is_some_and(|detail| !detail.is_empty()));
}

#[rstest]
#[tokio::test]
async fn close_is_safe_without_traffic() {
    let (cache, backend) = cache_pair();
    cache.close().await;
    cache.close().await;
    assert_eq!(backend.close_count(), 1);
}
