//! Behavioural tests for the cache adapter over an in-memory backend.

use std::sync::Arc;
use std::time::Duration;

use rstest::{fixture, rstest};

use super::*;
use crate::domain::HealthStatus;
use crate::test_support::{BackendBehaviour, InMemoryCacheBackend};

type Adapter = CacheAdapter<Arc<InMemoryCacheBackend>>;

#[fixture]
fn backend() -> Arc<InMemoryCacheBackend> {
    Arc::new(InMemoryCacheBackend::default())
}

fn adapter(backend: &Arc<InMemoryCacheBackend>) -> Adapter {
    CacheAdapter::new(Arc::clone(backend))
}

#[rstest]
#[tokio::test]
async fn set_then_get_returns_stored_value(backend: Arc<InMemoryCacheBackend>) {
    let cache = adapter(&backend);
    cache
        .set("user:1", r#"{"name":"alice"}"#, Some(Duration::from_secs(60)))
        .await
        .expect("set succeeds");

    assert_eq!(
        cache.get("user:1").await.as_deref(),
        Some(r#"{"name":"alice"}"#)
    );
    assert_eq!(backend.ttl("user:1"), Some(Some(Duration::from_secs(60))));
}

#[rstest]
#[case(None)]
#[case(Some(Duration::ZERO))]
#[tokio::test]
async fn absent_or_zero_ttl_stores_without_expiry(
    backend: Arc<InMemoryCacheBackend>,
    #[case] ttl: Option<Duration>,
) {
    let cache = adapter(&backend);
    cache.set("k", "1", ttl).await.expect("set succeeds");
    assert_eq!(backend.ttl("k"), Some(None));
}

#[rstest]
#[tokio::test]
async fn get_of_missing_key_is_none(backend: Arc<InMemoryCacheBackend>) {
    assert!(adapter(&backend).get("nope").await.is_none());
}

#[rstest]
#[tokio::test]
async fn backend_failure_reads_as_miss(backend: Arc<InMemoryCacheBackend>) {
    backend.insert("k", "v");
    backend.set_behaviour(BackendBehaviour::Fail("CLUSTERDOWN".to_owned()));
    assert!(adapter(&backend).get("k").await.is_none());
}

#[rstest]
#[tokio::test]
async fn set_failure_is_reported(backend: Arc<InMemoryCacheBackend>) {
    backend.set_behaviour(BackendBehaviour::Fail("READONLY".to_owned()));
    let err = adapter(&backend)
        .set("k", "v", None)
        .await
        .expect_err("set must fail");
    assert!(err.is_backend());
    assert!(err.to_string().contains("READONLY"));
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn stalled_get_returns_none_at_deadline(backend: Arc<InMemoryCacheBackend>) {
    backend.insert("k", "v");
    backend.set_behaviour(BackendBehaviour::Stall);
    let cache = adapter(&backend);

    let started = tokio::time::Instant::now();
    assert!(cache.get("k").await.is_none());
    assert_eq!(started.elapsed(), CALL_TIMEOUT);
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn stalled_set_times_out(backend: Arc<InMemoryCacheBackend>) {
    backend.set_behaviour(BackendBehaviour::Stall);
    let err = adapter(&backend)
        .set("k", "v", None)
        .await
        .expect_err("timeout");
    assert!(err.is_timeout());
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn custom_deadline_is_honoured(backend: Arc<InMemoryCacheBackend>) {
    backend.set_behaviour(BackendBehaviour::Stall);
    let cache = adapter(&backend).with_call_timeout(Duration::from_millis(250));

    let started = tokio::time::Instant::now();
    assert!(!cache.delete("k").await);
    assert_eq!(started.elapsed(), Duration::from_millis(250));
}

#[rstest]
#[tokio::test]
async fn delete_reports_whether_an_entry_was_removed(backend: Arc<InMemoryCacheBackend>) {
    backend.insert("k", "v");
    let cache = adapter(&backend);
    assert!(cache.delete("k").await);
    assert!(!cache.delete("k").await);
    assert!(cache.get("k").await.is_none());
}

#[rstest]
#[tokio::test]
async fn delete_failure_reads_as_not_deleted(backend: Arc<InMemoryCacheBackend>) {
    backend.insert("k", "v");
    backend.set_behaviour(BackendBehaviour::Fail("boom".to_owned()));
    assert!(!adapter(&backend).delete("k").await);
    assert_eq!(backend.entry("k").as_deref(), Some("v"));
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn health_reports_ping_reply(backend: Arc<InMemoryCacheBackend>) {
    let report = adapter(&backend).health_check().await;
    assert_eq!(
        report,
        HealthReport::up_with_response("PONG").with_latency(Duration::ZERO)
    );
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn health_reports_ping_round_trip(backend: Arc<InMemoryCacheBackend>) {
    backend.set_behaviour(BackendBehaviour::Delay(Duration::from_millis(250)));
    let report = adapter(&backend).health_check().await;
    assert!(report.is_up());
    assert_eq!(report.latency(), Some(Duration::from_millis(250)));
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn health_is_down_when_backend_stalls(backend: Arc<InMemoryCacheBackend>) {
    backend.set_behaviour(BackendBehaviour::Stall);
    let report = adapter(&backend).health_check().await;
    assert_eq!(report.status(), HealthStatus::Down);
    assert!(report.error().is_some_and(|e| e.contains("timed out")));
}

#[rstest]
#[tokio::test]
async fn health_is_down_when_backend_fails(backend: Arc<InMemoryCacheBackend>) {
    backend.set_behaviour(BackendBehaviour::Fail("connection refused".to_owned()));
    let report = adapter(&backend).health_check().await;
    assert!(!report.is_up());
    assert!(report.error().is_some_and(|e| e.contains("connection refused")));
}

#[rstest]
#[tokio::test]
async fn close_is_idempotent_and_rejects_later_calls(backend: Arc<InMemoryCacheBackend>) {
    backend.insert("k", "v");
    let cache = adapter(&backend);
    cache.close().await;
    cache.close().await;

    assert_eq!(backend.close_count(), 1);
    assert!(cache.get("k").await.is_none());
    assert!(cache.set("k", "w", None).await.expect_err("closed").is_closed());
    assert!(!cache.health_check().await.is_up());
    assert_eq!(backend.entry("k").as_deref(), Some("v"));
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn connect_tolerates_unreachable_backend(backend: Arc<InMemoryCacheBackend>) {
    backend.set_behaviour(BackendBehaviour::Stall);
    let cache = CacheAdapter::connect(Arc::clone(&backend)).await;

    backend.set_behaviour(BackendBehaviour::Healthy);
    cache.set("k", "v", None).await.expect("recovers after startup");
}

#[rstest]
#[tokio::test]
async fn concurrent_callers_share_one_adapter(backend: Arc<InMemoryCacheBackend>) {
    let cache = Arc::new(adapter(&backend));
    let writes = (0..16).map(|i| {
        let cache = Arc::clone(&cache);
        tokio::spawn(async move {
            cache
                .set(&format!("k{i}"), &i.to_string(), None)
                .await
                .expect("set succeeds");
        })
    });
    for handle in writes {
        handle.await.expect("task completes");
    }
    for i in 0..16 {
        assert_eq!(cache.get(&format!("k{i}")).await, Some(i.to_string()));
    }
}
