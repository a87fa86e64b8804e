use crate::core::breaker::CircuitBreaker;
use crate::domain::model::HealthStatus;
use crate::domain::ports::{HealthCheck, Metrics, ObjectStore};
use crate::utils::error::{AdapterError, Result};
use async_trait::async_trait;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client as S3Client;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

const DEFAULT_REGION: &str = "us-east-1";

/// Object storage over a single S3 bucket. Every operation is timed,
/// counted and gated by a per-bucket circuit breaker.
pub struct S3Store {
    client: S3Client,
    bucket: String,
    metrics: Arc<dyn Metrics>,
    breaker: Arc<CircuitBreaker>,
}

impl S3Store {
    pub fn new(client: S3Client, bucket: impl Into<String>, metrics: Arc<dyn Metrics>) -> Self {
        let bucket = bucket.into();
        let breaker = Arc::new(CircuitBreaker::new(
            format!("s3:{}", bucket),
            CircuitBreaker::DEFAULT_FAIL_MAX,
            CircuitBreaker::DEFAULT_RESET_TIMEOUT,
            Arc::clone(&metrics),
        ));
        Self {
            client,
            bucket,
            metrics,
            breaker,
        }
    }

    /// Replace the store's own breaker with a shared one, so state persists
    /// across store instances for the same bucket.
    pub fn with_breaker(mut self, breaker: Arc<CircuitBreaker>) -> Self {
        self.breaker = breaker;
        self
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    pub fn breaker(&self) -> &Arc<CircuitBreaker> {
        &self.breaker
    }

    /// Region the bucket lives in. Falls back to the default region when the
    /// lookup fails; callers use this for client selection, not correctness.
    pub async fn bucket_region(&self) -> String {
        lookup_bucket_region(&self.client, &self.bucket).await
    }

    async fn observe<T, F>(&self, operation: &str, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        self.breaker.check()?;
        let start = Instant::now();
        match fut.await {
            Ok(value) => {
                self.metrics.observe_operation(
                    operation,
                    &self.bucket,
                    start.elapsed().as_secs_f64(),
                    true,
                );
                self.breaker.record_success();
                Ok(value)
            }
            Err(e) => {
                self.metrics.observe_operation(
                    operation,
                    &self.bucket,
                    start.elapsed().as_secs_f64(),
                    false,
                );
                self.metrics
                    .record_error(operation, &self.bucket, classify_storage_error(&e.to_string()));
                self.breaker.record_failure();
                tracing::warn!("[S3 ERROR] {} on {}: {}", operation, self.bucket, e);
                Err(e)
            }
        }
    }

    fn storage_error<E>(&self, operation: &str, err: E) -> AdapterError
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        AdapterError::StorageError {
            operation: operation.to_string(),
            bucket: self.bucket.clone(),
            message: format!("{}", DisplayErrorContext(&err)),
        }
    }
}

/// GetBucketLocation with a fallback to the default region. An empty
/// location constraint means us-east-1.
pub async fn lookup_bucket_region(client: &S3Client, bucket: &str) -> String {
    match client.get_bucket_location().bucket(bucket).send().await {
        Ok(output) => output
            .location_constraint()
            .map(|c| c.as_str().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_REGION.to_string()),
        Err(e) => {
            tracing::warn!(
                "[S3] Failed to get region for {}: {}",
                bucket,
                DisplayErrorContext(&e)
            );
            DEFAULT_REGION.to_string()
        }
    }
}

/// Coarse error class for metrics labels, derived from the rendered SDK
/// error message.
pub fn classify_storage_error(message: &str) -> &'static str {
    let lower = message.to_lowercase();
    if lower.contains("timeout") {
        "timeout"
    } else if lower.contains("503") || lower.contains("slowdown") || lower.contains("slow down") {
        "rate_limited"
    } else if lower.contains("connection") || lower.contains("dispatch") {
        "connection_error"
    } else if lower.contains("access denied") || lower.contains("forbidden") {
        "access_denied"
    } else if lower.contains("not found") || lower.contains("nosuchkey") || lower.contains("404") {
        "not_found"
    } else if lower.contains("circuit open") {
        "circuit_open"
    } else {
        "other"
    }
}

#[async_trait]
impl ObjectStore for S3Store {
    async fn put(&self, key: &str, data: &[u8], content_type: Option<&str>) -> Result<()> {
        tracing::debug!("[S3] PUT {}/{}", self.bucket, key);
        self.observe("upload", async {
            self.client
                .put_object()
                .bucket(&self.bucket)
                .key(key)
                .body(ByteStream::from(data.to_vec()))
                .set_content_type(content_type.map(String::from))
                .send()
                .await
                .map_err(|e| self.storage_error("upload", e))?;
            Ok(())
        })
        .await
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>> {
        tracing::debug!("[S3] GET {}/{}", self.bucket, key);
        self.observe("download", async {
            let resp = self
                .client
                .get_object()
                .bucket(&self.bucket)
                .key(key)
                .send()
                .await
                .map_err(|e| self.storage_error("download", e))?;
            let data = resp
                .body
                .collect()
                .await
                .map_err(|e| self.storage_error("download", e))?;
            Ok(data.into_bytes().to_vec())
        })
        .await
    }

    async fn delete(&self, key: &str) -> Result<()> {
        tracing::debug!("[S3] DELETE {}/{}", self.bucket, key);
        self.observe("delete", async {
            self.client
                .delete_object()
                .bucket(&self.bucket)
                .key(key)
                .send()
                .await
                .map_err(|e| self.storage_error("delete", e))?;
            Ok(())
        })
        .await
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>> {
        tracing::debug!("[S3] LIST {}/{}", self.bucket, prefix);
        self.observe("list", async {
            let mut keys = Vec::new();
            let mut pages = self
                .client
                .list_objects_v2()
                .bucket(&self.bucket)
                .prefix(prefix)
                .into_paginator()
                .send();
            while let Some(page) = pages.next().await {
                let page = page.map_err(|e| self.storage_error("list", e))?;
                for object in page.contents() {
                    if let Some(key) = object.key() {
                        keys.push(key.to_string());
                    }
                }
            }
            Ok(keys)
        })
        .await
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        self.observe("exists", async {
            match self
                .client
                .head_object()
                .bucket(&self.bucket)
                .key(key)
                .send()
                .await
            {
                Ok(_) => Ok(true),
                Err(err) => {
                    let service_err = err.into_service_error();
                    if service_err.is_not_found() {
                        Ok(false)
                    } else {
                        Err(self.storage_error("exists", service_err))
                    }
                }
            }
        })
        .await
    }
}

#[async_trait]
impl HealthCheck for S3Store {
    fn name(&self) -> &str {
        "storage"
    }

    async fn check(&self) -> HealthStatus {
        match self
            .client
            .head_bucket()
            .bucket(&self.bucket)
            .send()
            .await
        {
            Ok(_) => HealthStatus::healthy("storage"),
            Err(e) => HealthStatus::unhealthy(
                "storage",
                format!("head_bucket {} failed: {}", self.bucket, DisplayErrorContext(&e)),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_storage_error() {
        assert_eq!(classify_storage_error("request timeout elapsed"), "timeout");
        assert_eq!(classify_storage_error("503 Slow Down"), "rate_limited");
        assert_eq!(classify_storage_error("connection refused"), "connection_error");
        assert_eq!(classify_storage_error("Access Denied"), "access_denied");
        assert_eq!(classify_storage_error("NoSuchKey: missing"), "not_found");
        assert_eq!(classify_storage_error("Circuit open for s3:b"), "circuit_open");
        assert_eq!(classify_storage_error("something else"), "other");
    }
}
