pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod platform;
pub mod utils;

pub use adapters::{LocalStore, NoopMetrics, PrometheusMetrics, S3Store, SqsQueue};
pub use config::{CliConfig, EnvConfig, TomlConfig};
pub use core::{ApiClient, CircuitBreaker, DbClient, ProbeRunner, RetryPolicy};
pub use domain::ports::{ConfigProvider, HealthCheck, MessageQueue, Metrics, ObjectStore};
pub use platform::{AwsPlatform, RegionalS3Factory};
pub use utils::error::{AdapterError, Result};
