pub mod breaker;
pub mod db;
pub mod http;
pub mod probe;
pub mod retry;

pub use breaker::{BreakerRegistry, CircuitBreaker, CircuitState};
pub use db::DbClient;
pub use http::{ApiClient, RequestOptions};
pub use probe::{ProbeReport, ProbeRunner};
pub use retry::{RetryPolicy, RetryReason};
