pub mod env;
pub mod toml_config;

use crate::domain::ports::ConfigProvider;
use crate::utils::error::Result;
use crate::utils::validation::{
    self, validate_non_empty_string, validate_url, Validate,
};
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub use env::EnvConfig;
pub use toml_config::TomlConfig;

pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone, Serialize, Deserialize, Parser)]
#[command(name = "skybridge")]
#[command(about = "Cloud service adapter toolkit: probes and wires HTTP, S3, SQS and Postgres")]
pub struct CliConfig {
    /// Base URL of the upstream HTTP API
    #[arg(long)]
    pub api_base_url: Option<String>,

    /// Path to a TOML config file; file values override CLI flags
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// S3 bucket name (without the environment prefix)
    #[arg(long)]
    pub bucket: Option<String>,

    /// SQS queue name (without the environment prefix)
    #[arg(long)]
    pub queue: Option<String>,

    #[arg(long, env = "DATABASE_URL")]
    pub database_url: Option<String>,

    /// Environment prefix applied to cloud resource names
    #[arg(long, default_value = "dev")]
    pub env_prefix: String,

    #[arg(long, default_value_t = DEFAULT_TIMEOUT_SECS)]
    pub timeout_secs: u64,

    #[arg(long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Emit logs as JSON")]
    pub json_logs: bool,
}

impl ConfigProvider for CliConfig {
    fn api_base_url(&self) -> Option<&str> {
        self.api_base_url.as_deref()
    }

    fn request_timeout_secs(&self) -> u64 {
        self.timeout_secs
    }

    fn storage_bucket(&self) -> Option<&str> {
        self.bucket.as_deref()
    }

    fn queue_name(&self) -> Option<&str> {
        self.queue.as_deref()
    }

    fn database_url(&self) -> Option<&str> {
        self.database_url.as_deref()
    }

    fn env_prefix(&self) -> &str {
        &self.env_prefix
    }
}

impl Validate for CliConfig {
    fn validate(&self) -> Result<()> {
        if let Some(url) = &self.api_base_url {
            validate_url("api_base_url", url)?;
        }
        if let Some(bucket) = &self.bucket {
            validation::validate_bucket_name("bucket", bucket)?;
        }
        if let Some(queue) = &self.queue {
            validate_non_empty_string("queue", queue)?;
        }
        if let Some(db) = &self.database_url {
            validate_non_empty_string("database_url", db)?;
        }
        validation::validate_positive_number("timeout_secs", self.timeout_secs as usize, 1)?;
        Ok(())
    }
}
