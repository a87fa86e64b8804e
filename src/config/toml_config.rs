use crate::core::retry::RetryPolicy;
use crate::domain::ports::ConfigProvider;
use crate::utils::error::{AdapterError, Result};
use crate::utils::validation::{self, validate_url, Validate};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

use super::DEFAULT_TIMEOUT_SECS;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TomlConfig {
    pub api: Option<ApiConfig>,
    pub storage: Option<StorageConfig>,
    pub queue: Option<QueueConfig>,
    pub database: Option<DatabaseConfig>,
    pub metrics: Option<MetricsConfig>,
    #[serde(default = "default_env_prefix")]
    pub env_prefix: String,
}

fn default_env_prefix() -> String {
    "dev".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub base_url: String,
    pub timeout_seconds: Option<u64>,
    pub retry_attempts: Option<u32>,
    pub retry_backoff_factor: Option<f64>,
    pub retry_max_backoff_seconds: Option<f64>,
    pub headers: Option<HashMap<String, String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub bucket: String,
    pub region: Option<String>,
    pub endpoint: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueConfig {
    pub name: String,
    pub wait_time_seconds: Option<i32>,
    pub visibility_timeout_seconds: Option<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: Option<u32>,
    pub slow_query_threshold_ms: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    pub enabled: bool,
}

impl TomlConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| AdapterError::ConfigError {
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// Retry policy from the `[api]` section, falling back to defaults for
    /// anything unset.
    pub fn retry_policy(&self) -> RetryPolicy {
        let mut policy = RetryPolicy::default();
        if let Some(api) = &self.api {
            if let Some(attempts) = api.retry_attempts {
                policy.max_retries = attempts;
            }
            if let Some(factor) = api.retry_backoff_factor {
                policy.backoff_factor = factor;
            }
            if let Some(max_backoff) = api.retry_max_backoff_seconds {
                policy.max_backoff = max_backoff;
            }
        }
        policy
    }

    pub fn metrics_enabled(&self) -> bool {
        self.metrics.as_ref().map(|m| m.enabled).unwrap_or(true)
    }
}

impl ConfigProvider for TomlConfig {
    fn api_base_url(&self) -> Option<&str> {
        self.api.as_ref().map(|a| a.base_url.as_str())
    }

    fn request_timeout_secs(&self) -> u64 {
        self.api
            .as_ref()
            .and_then(|a| a.timeout_seconds)
            .unwrap_or(DEFAULT_TIMEOUT_SECS)
    }

    fn storage_bucket(&self) -> Option<&str> {
        self.storage.as_ref().map(|s| s.bucket.as_str())
    }

    fn queue_name(&self) -> Option<&str> {
        self.queue.as_ref().map(|q| q.name.as_str())
    }

    fn database_url(&self) -> Option<&str> {
        self.database.as_ref().map(|d| d.url.as_str())
    }

    fn env_prefix(&self) -> &str {
        &self.env_prefix
    }
}

impl Validate for TomlConfig {
    fn validate(&self) -> Result<()> {
        if let Some(api) = &self.api {
            validate_url("api.base_url", &api.base_url)?;
            if let Some(timeout) = api.timeout_seconds {
                validation::validate_positive_number(
                    "api.timeout_seconds",
                    timeout as usize,
                    1,
                )?;
            }
        }
        if let Some(storage) = &self.storage {
            validation::validate_bucket_name("storage.bucket", &storage.bucket)?;
            if let Some(region) = &storage.region {
                validation::validate_aws_region("storage.region", region)?;
            }
            if let Some(endpoint) = &storage.endpoint {
                validate_url("storage.endpoint", endpoint)?;
            }
        }
        if let Some(queue) = &self.queue {
            validation::validate_non_empty_string("queue.name", &queue.name)?;
            if let Some(wait) = queue.wait_time_seconds {
                // SQS caps long polling at 20 seconds.
                validation::validate_range("queue.wait_time_seconds", wait as usize, 0, 20)?;
            }
        }
        if let Some(database) = &self.database {
            validation::validate_non_empty_string("database.url", &database.url)?;
            if let Some(max) = database.max_connections {
                validation::validate_positive_number("database.max_connections", max as usize, 1)?;
            }
        }
        Ok(())
    }
}
