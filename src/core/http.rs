use crate::core::retry::{RetryPolicy, RetryReason};
use crate::domain::model::{HealthStatus, TraceId};
use crate::domain::ports::{HealthCheck, Metrics};
use crate::utils::error::{AdapterError, Result};
use async_trait::async_trait;
use reqwest::{Client, Method, Response, StatusCode};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::adapters::metrics::NoopMetrics;

const DEFAULT_TIMEOUT_SECS: u64 = 10;
const TRACE_HEADER: &str = "X-Trace-Id";

/// Per-request overrides. Everything defaults to the client's settings.
#[derive(Debug, Default)]
pub struct RequestOptions {
    pub headers: HashMap<String, String>,
    pub query: Vec<(String, String)>,
    pub retry_policy: Option<RetryPolicy>,
    pub trace_id: Option<TraceId>,
}

/// Neutral HTTP client: base URL joining, default headers, trace-id
/// propagation and retry with exponential backoff around `reqwest`.
pub struct ApiClient {
    base_url: String,
    default_headers: HashMap<String, String>,
    client: Client,
    retry_policy: RetryPolicy,
    metrics: Arc<dyn Metrics>,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Result<Self> {
        Self::with_timeout(base_url, Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    pub fn with_timeout(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            default_headers: HashMap::new(),
            client,
            retry_policy: RetryPolicy::default(),
            metrics: Arc::new(NoopMetrics),
        })
    }

    pub fn with_default_headers(mut self, headers: HashMap<String, String>) -> Self {
        self.default_headers = headers;
        self
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = policy;
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<dyn Metrics>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn get(&self, endpoint: &str) -> Result<Option<Value>> {
        self.request(Method::GET, endpoint, None, RequestOptions::default())
            .await
    }

    pub async fn get_with_query(
        &self,
        endpoint: &str,
        query: &[(&str, &str)],
    ) -> Result<Option<Value>> {
        let options = RequestOptions {
            query: query
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            ..Default::default()
        };
        self.request(Method::GET, endpoint, None, options).await
    }

    pub async fn post(&self, endpoint: &str, body: &Value) -> Result<Option<Value>> {
        self.request(Method::POST, endpoint, Some(Body::Json(body)), RequestOptions::default())
            .await
    }

    pub async fn post_form(
        &self,
        endpoint: &str,
        form: &[(&str, &str)],
    ) -> Result<Option<Value>> {
        self.request(
            Method::POST,
            endpoint,
            Some(Body::Form(form)),
            RequestOptions::default(),
        )
        .await
    }

    pub async fn put(&self, endpoint: &str, body: &Value) -> Result<Option<Value>> {
        self.request(Method::PUT, endpoint, Some(Body::Json(body)), RequestOptions::default())
            .await
    }

    pub async fn patch(&self, endpoint: &str, body: &Value) -> Result<Option<Value>> {
        self.request(Method::PATCH, endpoint, Some(Body::Json(body)), RequestOptions::default())
            .await
    }

    pub async fn delete(&self, endpoint: &str) -> Result<Option<Value>> {
        self.request(Method::DELETE, endpoint, None, RequestOptions::default())
            .await
    }

    /// Execute a request with retry. One trace id covers every attempt of
    /// the logical request.
    pub async fn request(
        &self,
        method: Method,
        endpoint: &str,
        body: Option<Body<'_>>,
        options: RequestOptions,
    ) -> Result<Option<Value>> {
        let url = format!("{}/{}", self.base_url, endpoint.trim_start_matches('/'));
        let policy = options
            .retry_policy
            .clone()
            .unwrap_or_else(|| self.retry_policy.clone());
        let trace_id = options.trace_id.clone().unwrap_or_default();

        let mut attempt: u32 = 0;
        loop {
            let start = Instant::now();
            let result = self
                .send_once(&method, &url, body.as_ref(), &options, &trace_id)
                .await;
            self.metrics
                .observe_request(method.as_str(), endpoint, start.elapsed().as_secs_f64());

            match result {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        return handle_response(response).await;
                    }

                    let code = status.as_u16();
                    if !policy.retry_on.contains(&code) {
                        return Err(AdapterError::HttpStatusError {
                            status: code,
                            endpoint: endpoint.to_string(),
                        });
                    }

                    let reason = RetryReason::from_status(code);
                    if !policy.should_retry(code, attempt) {
                        return Err(AdapterError::RetryExhaustedError {
                            endpoint: endpoint.to_string(),
                            attempts: attempt + 1,
                            reason: reason.to_string(),
                        });
                    }

                    let retry_after = parse_retry_after(&response);
                    let wait = policy.backoff_time(attempt, retry_after);
                    tracing::warn!(
                        "[Retry #{}] [{}] {} {} (reason: {}, sleeping {:.1}s)",
                        attempt + 1,
                        trace_id,
                        method,
                        url,
                        reason,
                        wait
                    );
                    self.metrics
                        .record_retry(method.as_str(), endpoint, &reason.to_string(), wait);
                    tokio::time::sleep(Duration::from_secs_f64(wait)).await;
                }
                Err(err) => {
                    if attempt >= policy.max_retries {
                        return Err(AdapterError::ApiError(err));
                    }

                    let reason = RetryReason::from_request_error(&err);
                    let wait = policy.backoff_time(attempt, None);
                    tracing::warn!(
                        "[Retry #{}] [{}] {} {} (reason: {}, sleeping {:.1}s)",
                        attempt + 1,
                        trace_id,
                        method,
                        url,
                        reason,
                        wait
                    );
                    self.metrics
                        .record_retry(method.as_str(), endpoint, &reason.to_string(), wait);
                    tokio::time::sleep(Duration::from_secs_f64(wait)).await;
                }
            }

            attempt += 1;
        }
    }

    /// GET /health with retries disabled. Never errors; failures log and
    /// report false.
    pub async fn health_check(&self) -> bool {
        let options = RequestOptions {
            retry_policy: Some(RetryPolicy::no_retry()),
            ..Default::default()
        };
        match self
            .request(Method::GET, "/health", None, options)
            .await
        {
            Ok(_) => true,
            Err(e) => {
                tracing::warn!("Health check failed: {}", e);
                false
            }
        }
    }

    async fn send_once(
        &self,
        method: &Method,
        url: &str,
        body: Option<&Body<'_>>,
        options: &RequestOptions,
        trace_id: &TraceId,
    ) -> std::result::Result<Response, reqwest::Error> {
        let mut request = self.client.request(method.clone(), url);

        for (key, value) in &self.default_headers {
            request = request.header(key, value);
        }
        for (key, value) in &options.headers {
            request = request.header(key, value);
        }
        request = request.header(TRACE_HEADER, trace_id.as_str());

        if !options.query.is_empty() {
            request = request.query(&options.query);
        }

        match body {
            Some(Body::Json(json)) => request = request.json(json),
            Some(Body::Form(form)) => request = request.form(form),
            None => {}
        }

        request.send().await
    }
}

/// Request body, JSON or form-encoded.
#[derive(Debug)]
pub enum Body<'a> {
    Json(&'a Value),
    Form(&'a [(&'a str, &'a str)]),
}

async fn handle_response(response: Response) -> Result<Option<Value>> {
    if response.status() == StatusCode::NO_CONTENT {
        return Ok(None);
    }
    let value = response.json::<Value>().await?;
    Ok(Some(value))
}

fn parse_retry_after(response: &Response) -> Option<u64> {
    response
        .headers()
        .get("Retry-After")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.parse::<u64>().ok())
}

#[async_trait]
impl HealthCheck for ApiClient {
    fn name(&self) -> &str {
        "api"
    }

    async fn check(&self) -> HealthStatus {
        if self.health_check().await {
            HealthStatus::healthy("api")
        } else {
            HealthStatus::unhealthy("api", format!("GET {}/health failed", self.base_url))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    fn fast_policy(max_retries: u32) -> RetryPolicy {
        RetryPolicy {
            max_retries,
            jitter: 0.0,
            max_backoff: 0.05,
            ..Default::default()
        }
    }

    fn client(server: &MockServer, max_retries: u32) -> ApiClient {
        ApiClient::new(&server.base_url())
            .unwrap()
            .with_retry_policy(fast_policy(max_retries))
    }

    #[tokio::test]
    async fn test_get_success_returns_json() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET).path("/objects/1");
            then.status(200)
                .header("Content-Type", "application/json")
                .json_body(serde_json::json!({"id": 1, "name": "Item"}));
        });

        let result = client(&server, 0).get("/objects/1").await.unwrap();

        mock.assert();
        let value = result.unwrap();
        assert_eq!(value["id"], 1);
        assert_eq!(value["name"], "Item");
    }

    #[tokio::test]
    async fn test_post_with_payload() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/create")
                .json_body(serde_json::json!({"name": "Item"}));
            then.status(201).json_body(serde_json::json!({"id": 1}));
        });

        let body = serde_json::json!({"name": "Item"});
        let result = client(&server, 0).post("/create", &body).await.unwrap();

        mock.assert();
        assert_eq!(result.unwrap()["id"], 1);
    }

    #[tokio::test]
    async fn test_delete_no_content_returns_none() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(DELETE).path("/resource/123");
            then.status(204);
        });

        let result = client(&server, 0).delete("/resource/123").await.unwrap();

        mock.assert();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_requests_carry_trace_id_header() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET).path("/traced").header_exists("X-Trace-Id");
            then.status(200).json_body(serde_json::json!({}));
        });

        client(&server, 0).get("/traced").await.unwrap();

        mock.assert();
    }

    #[tokio::test]
    async fn test_trace_id_is_stable_across_retries() {
        let server = MockServer::start();
        // The mock only matches this exact trace id, so every hit proves the
        // attempt reused it rather than generating a fresh one.
        let mock = server.mock(|when, then| {
            when.method(GET)
                .path("/flaky")
                .header("X-Trace-Id", "trace-retries-1");
            then.status(500);
        });

        let api = client(&server, 2);
        let options = RequestOptions {
            trace_id: Some(TraceId::from_string("trace-retries-1".to_string())),
            ..Default::default()
        };
        let err = api
            .request(Method::GET, "/flaky", None, options)
            .await
            .unwrap_err();

        assert_eq!(mock.hits(), 3);
        assert!(matches!(err, AdapterError::RetryExhaustedError { .. }));
    }

    #[tokio::test]
    async fn test_default_headers_are_sent() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET)
                .path("/secure")
                .header("Authorization", "Bearer token-1");
            then.status(200).json_body(serde_json::json!({}));
        });

        let mut headers = HashMap::new();
        headers.insert("Authorization".to_string(), "Bearer token-1".to_string());
        let api = client(&server, 0).with_default_headers(headers);
        api.get("/secure").await.unwrap();

        mock.assert();
    }

    #[tokio::test]
    async fn test_server_error_is_retried_until_exhausted() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET).path("/flaky");
            then.status(500);
        });

        let err = client(&server, 2).get("/flaky").await.unwrap_err();

        // 1 attempt + 2 retries
        assert_eq!(mock.hits(), 3);
        match err {
            AdapterError::RetryExhaustedError {
                attempts, reason, ..
            } => {
                assert_eq!(attempts, 3);
                assert_eq!(reason, "5xx");
            }
            other => panic!("expected retry exhaustion, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_client_error_is_not_retried() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET).path("/missing");
            then.status(404);
        });

        let err = client(&server, 3).get("/missing").await.unwrap_err();

        assert_eq!(mock.hits(), 1);
        assert!(matches!(
            err,
            AdapterError::HttpStatusError { status: 404, .. }
        ));
    }

    #[tokio::test]
    async fn test_health_check_does_not_retry() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET).path("/health");
            then.status(503);
        });

        let api = client(&server, 3);
        assert!(!api.health_check().await);
        assert_eq!(mock.hits(), 1);
    }

    #[tokio::test]
    async fn test_health_check_ok() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/health");
            then.status(200).json_body(serde_json::json!({"status": "ok"}));
        });

        assert!(client(&server, 0).health_check().await);
    }

    #[tokio::test]
    async fn test_query_parameters_are_appended() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET)
                .path("/search")
                .query_param("q", "widgets")
                .query_param("limit", "5");
            then.status(200).json_body(serde_json::json!([]));
        });

        client(&server, 0)
            .get_with_query("/search", &[("q", "widgets"), ("limit", "5")])
            .await
            .unwrap();

        mock.assert();
    }

    #[tokio::test]
    async fn test_form_body() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/login")
                .header("Content-Type", "application/x-www-form-urlencoded")
                .body_contains("user=alice");
            then.status(200).json_body(serde_json::json!({"ok": true}));
        });

        client(&server, 0)
            .post_form("/login", &[("user", "alice"), ("pass", "secret")])
            .await
            .unwrap();

        mock.assert();
    }
}
