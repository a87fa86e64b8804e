use httpmock::prelude::*;
use skybridge::core::{ApiClient, ProbeRunner, RetryPolicy};
use skybridge::{LocalStore, Metrics, ObjectStore, PrometheusMetrics};
use std::sync::Arc;
use tempfile::TempDir;

fn fast_policy(max_retries: u32) -> RetryPolicy {
    RetryPolicy {
        max_retries,
        jitter: 0.0,
        max_backoff: 0.05,
        ..Default::default()
    }
}

#[tokio::test]
async fn test_probe_sweep_all_healthy() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/health");
        then.status(200)
            .json_body(serde_json::json!({"status": "ok"}));
    });

    let temp_dir = TempDir::new().unwrap();
    let store = LocalStore::new(temp_dir.path());
    store.put("ping.txt", b"ok", None).await.unwrap();

    let api = ApiClient::new(&server.base_url()).unwrap();

    let mut runner = ProbeRunner::new();
    runner.register(Arc::new(api));
    runner.register(Arc::new(store));

    let report = runner.run().await;
    assert!(report.all_healthy());
    assert_eq!(report.statuses.len(), 2);
}

#[tokio::test]
async fn test_probe_reports_failing_api() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(GET).path("/health");
        then.status(503);
    });

    let api = ApiClient::new(&server.base_url())
        .unwrap()
        .with_retry_policy(fast_policy(3));

    let mut runner = ProbeRunner::new();
    runner.register(Arc::new(api));

    let report = runner.run().await;
    assert!(!report.all_healthy());
    let failed = report.failed();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].name, "api");
    // Health checks make exactly one attempt regardless of retry policy
    assert_eq!(mock.hits(), 1);
}

#[tokio::test]
async fn test_retries_show_up_in_metrics() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(GET).path("/flaky");
        then.status(500);
    });

    let metrics = Arc::new(PrometheusMetrics::new().unwrap());
    let api = ApiClient::new(&server.base_url())
        .unwrap()
        .with_retry_policy(fast_policy(2))
        .with_metrics(Arc::clone(&metrics) as Arc<dyn Metrics>);

    assert!(api.get("/flaky").await.is_err());
    assert_eq!(mock.hits(), 3);

    let families = metrics.registry().gather();
    let retries = families
        .iter()
        .find(|f| f.get_name() == "api_client_retries_total")
        .expect("retry counter family");
    let total: u64 = retries
        .get_metric()
        .iter()
        .map(|m| m.get_counter().get_value() as u64)
        .sum();
    assert_eq!(total, 2);

    let durations = families
        .iter()
        .find(|f| f.get_name() == "api_client_request_duration_seconds")
        .expect("request duration family");
    let samples: u64 = durations
        .get_metric()
        .iter()
        .map(|m| m.get_histogram().get_sample_count())
        .sum();
    assert_eq!(samples, 3);
}

#[tokio::test]
async fn test_rate_limit_respects_retry_after() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(GET).path("/limited");
        then.status(429).header("Retry-After", "0");
    });

    let api = ApiClient::new(&server.base_url())
        .unwrap()
        .with_retry_policy(fast_policy(1));

    assert!(api.get("/limited").await.is_err());
    assert_eq!(mock.hits(), 2);
}
