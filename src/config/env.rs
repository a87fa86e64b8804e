use crate::domain::ports::ConfigProvider;
use crate::utils::error::{AdapterError, Result};
use crate::utils::validation::{validate_non_empty_string, validate_url, Validate};
use std::env;

use super::DEFAULT_TIMEOUT_SECS;

/// Configuration read from `SKYBRIDGE_*` environment variables, for
/// container and serverless deployments where flags are impractical.
#[derive(Debug, Clone)]
pub struct EnvConfig {
    pub api_base_url: Option<String>,
    pub storage_bucket: Option<String>,
    pub queue_name: Option<String>,
    pub database_url: Option<String>,
    pub env_prefix: String,
    pub timeout_secs: u64,
}

impl EnvConfig {
    pub fn from_env() -> Result<Self> {
        let timeout_secs = parse_timeout(env::var("SKYBRIDGE_TIMEOUT_SECS").ok())?;

        Ok(Self {
            api_base_url: env::var("SKYBRIDGE_API_BASE_URL").ok(),
            storage_bucket: env::var("SKYBRIDGE_BUCKET").ok(),
            queue_name: env::var("SKYBRIDGE_QUEUE").ok(),
            database_url: env::var("DATABASE_URL").ok(),
            env_prefix: env::var("SKYBRIDGE_ENV").unwrap_or_else(|_| "dev".to_string()),
            timeout_secs,
        })
    }
}

fn parse_timeout(raw: Option<String>) -> Result<u64> {
    match raw {
        Some(raw) => raw
            .parse::<u64>()
            .map_err(|_| AdapterError::InvalidConfigValueError {
                field: "SKYBRIDGE_TIMEOUT_SECS".to_string(),
                value: raw,
                reason: "Expected a positive integer".to_string(),
            }),
        None => Ok(DEFAULT_TIMEOUT_SECS),
    }
}

impl ConfigProvider for EnvConfig {
    fn api_base_url(&self) -> Option<&str> {
        self.api_base_url.as_deref()
    }

    fn request_timeout_secs(&self) -> u64 {
        self.timeout_secs
    }

    fn storage_bucket(&self) -> Option<&str> {
        self.storage_bucket.as_deref()
    }

    fn queue_name(&self) -> Option<&str> {
        self.queue_name.as_deref()
    }

    fn database_url(&self) -> Option<&str> {
        self.database_url.as_deref()
    }

    fn env_prefix(&self) -> &str {
        &self.env_prefix
    }
}

impl Validate for EnvConfig {
    fn validate(&self) -> Result<()> {
        if let Some(url) = &self.api_base_url {
            validate_url("SKYBRIDGE_API_BASE_URL", url)?;
        }
        if let Some(bucket) = &self.storage_bucket {
            crate::utils::validation::validate_bucket_name("SKYBRIDGE_BUCKET", bucket)?;
        }
        if let Some(queue) = &self.queue_name {
            validate_non_empty_string("SKYBRIDGE_QUEUE", queue)?;
        }
        if self.timeout_secs == 0 {
            return Err(AdapterError::InvalidConfigValueError {
                field: "SKYBRIDGE_TIMEOUT_SECS".to_string(),
                value: "0".to_string(),
                reason: "Timeout must be at least 1 second".to_string(),
            });
        }
        Ok(())
    }
}
