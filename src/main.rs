use clap::Parser;
use skybridge::config::{CliConfig, TomlConfig};
use skybridge::core::{ApiClient, DbClient, ProbeRunner};
use skybridge::domain::ports::{ConfigProvider, Metrics};
use skybridge::platform::AwsPlatform;
use skybridge::utils::{logger, validation::Validate};
use skybridge::{NoopMetrics, PrometheusMetrics};
use std::sync::Arc;
use std::time::Duration;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = CliConfig::parse();

    if cli.json_logs {
        logger::init_json_logger();
    } else {
        logger::init_cli_logger(cli.verbose);
    }

    tracing::info!("Starting skybridge probe");
    if cli.verbose {
        tracing::debug!("CLI config: {:?}", cli);
    }

    if let Err(e) = cli.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        eprintln!("❌ {}", e);
        std::process::exit(1);
    }

    let file_config = match &cli.config {
        Some(path) => {
            let config = TomlConfig::from_file(path).and_then(|c| {
                c.validate()?;
                Ok(c)
            });
            match config {
                Ok(c) => Some(c),
                Err(e) => {
                    tracing::error!("❌ Failed to load {}: {}", path.display(), e);
                    eprintln!("❌ {}", e);
                    std::process::exit(1);
                }
            }
        }
        None => None,
    };

    // File values override CLI flags where both are present.
    let api_base_url = file_config
        .as_ref()
        .and_then(|c| c.api_base_url())
        .or(cli.api_base_url());
    let storage_bucket = file_config
        .as_ref()
        .and_then(|c| c.storage_bucket())
        .or(cli.storage_bucket());
    let queue_name = file_config
        .as_ref()
        .and_then(|c| c.queue_name())
        .or(cli.queue_name());
    let database_url = file_config
        .as_ref()
        .and_then(|c| c.database_url())
        .or(cli.database_url());
    let env_prefix = file_config
        .as_ref()
        .map(|c| c.env_prefix())
        .unwrap_or(cli.env_prefix());
    let timeout = Duration::from_secs(
        file_config
            .as_ref()
            .map(|c| c.request_timeout_secs())
            .unwrap_or(cli.request_timeout_secs()),
    );

    let metrics_enabled = file_config
        .as_ref()
        .map(|c| c.metrics_enabled())
        .unwrap_or(true);
    let metrics: Arc<dyn Metrics> = if metrics_enabled {
        Arc::new(PrometheusMetrics::new()?)
    } else {
        Arc::new(NoopMetrics)
    };

    let mut runner = ProbeRunner::new();

    if let Some(base_url) = api_base_url {
        let mut client = ApiClient::with_timeout(base_url, timeout)?
            .with_metrics(Arc::clone(&metrics));
        if let Some(config) = &file_config {
            client = client.with_retry_policy(config.retry_policy());
            if let Some(headers) = config.api.as_ref().and_then(|a| a.headers.clone()) {
                client = client.with_default_headers(headers);
            }
        }
        runner.register(Arc::new(client));
    }

    if storage_bucket.is_some() || queue_name.is_some() {
        let aws = AwsPlatform::from_env(env_prefix, Arc::clone(&metrics)).await;

        if let Some(bucket) = storage_bucket {
            runner.register(Arc::new(aws.object_store(bucket)));
        }

        if let Some(name) = queue_name {
            match aws.queue(name).await {
                Ok(queue) => runner.register(Arc::new(queue)),
                Err(e) => {
                    tracing::error!("❌ Failed to resolve queue {}: {}", name, e);
                    eprintln!("❌ {}", e);
                    std::process::exit(1);
                }
            }
        }
    }

    if let Some(url) = database_url {
        let max_connections = file_config
            .as_ref()
            .and_then(|c| c.database.as_ref())
            .and_then(|d| d.max_connections)
            .unwrap_or(5);
        match DbClient::connect(url, max_connections, Arc::clone(&metrics)).await {
            Ok(db) => runner.register(Arc::new(db)),
            Err(e) => {
                tracing::error!("❌ Failed to connect to database: {}", e);
                eprintln!("❌ {}", e);
                std::process::exit(1);
            }
        }
    }

    if runner.is_empty() {
        eprintln!("Nothing to probe; pass --api-base-url, --bucket, --queue or --database-url");
        std::process::exit(1);
    }

    let report = runner.run().await;

    if report.all_healthy() {
        tracing::info!("✅ All dependencies healthy");
        println!("✅ All dependencies healthy");
    } else {
        for status in report.failed() {
            eprintln!(
                "❌ {}: {}",
                status.name,
                status.detail.as_deref().unwrap_or("unhealthy")
            );
        }
        std::process::exit(1);
    }

    Ok(())
}
