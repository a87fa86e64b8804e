use crate::domain::model::{HealthStatus, QueueMessage};
use crate::utils::error::Result;
use async_trait::async_trait;

/// Library-agnostic object storage interface. Implemented by the S3 adapter
/// and by the local filesystem adapter used in development and tests.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn put(&self, key: &str, data: &[u8], content_type: Option<&str>) -> Result<()>;
    async fn get(&self, key: &str) -> Result<Vec<u8>>;
    async fn delete(&self, key: &str) -> Result<()>;
    async fn list(&self, prefix: &str) -> Result<Vec<String>>;
    /// Returns `Ok(false)` when the key does not exist; errors are reserved
    /// for real failures.
    async fn exists(&self, key: &str) -> Result<bool>;
}

/// Library-agnostic message queue interface.
#[async_trait]
pub trait MessageQueue: Send + Sync {
    /// Returns the backend-assigned message id.
    async fn send(&self, body: &str) -> Result<String>;
    async fn receive(&self, max_messages: i32) -> Result<Vec<QueueMessage>>;
    async fn acknowledge(&self, receipt_handle: &str) -> Result<()>;
}

/// Metrics sink. Adapters record into this instead of talking to a metrics
/// library directly, so tests can run with a no-op implementation.
pub trait Metrics: Send + Sync {
    /// Duration of an outbound HTTP request (one attempt).
    fn observe_request(&self, method: &str, endpoint: &str, seconds: f64);
    /// A retry attempt, with the classified reason and the backoff slept.
    fn record_retry(&self, method: &str, endpoint: &str, reason: &str, sleep_seconds: f64);
    /// Duration of a storage/queue/database operation.
    fn observe_operation(&self, operation: &str, resource: &str, seconds: f64, success: bool);
    fn record_error(&self, operation: &str, resource: &str, error: &str);
    /// Circuit breaker state: 0=closed, 1=half-open, 2=open.
    fn set_circuit_state(&self, resource: &str, state: i64);
}

/// Anything that can report liveness. Every adapter implements this so the
/// probe runner can sweep a deployment's dependencies.
#[async_trait]
pub trait HealthCheck: Send + Sync {
    fn name(&self) -> &str;
    async fn check(&self) -> HealthStatus;
}

/// Configuration surface the composition layer reads. Each config source
/// (CLI flags, environment, TOML file) implements this.
pub trait ConfigProvider: Send + Sync {
    fn api_base_url(&self) -> Option<&str>;
    fn request_timeout_secs(&self) -> u64;
    fn storage_bucket(&self) -> Option<&str>;
    fn queue_name(&self) -> Option<&str>;
    fn database_url(&self) -> Option<&str>;
    /// Environment prefix applied to cloud resource names, e.g. "dev".
    fn env_prefix(&self) -> &str;
}
