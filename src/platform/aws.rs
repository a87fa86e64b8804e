use crate::adapters::s3::{lookup_bucket_region, S3Store};
use crate::adapters::sqs::SqsQueue;
use crate::core::breaker::BreakerRegistry;
use crate::domain::ports::Metrics;
use crate::utils::error::Result;
use aws_config::{BehaviorVersion, SdkConfig};
use aws_sdk_s3::config::{Credentials, Region};
use std::collections::HashMap;
use std::env;
use std::sync::{Arc, Mutex};

const ENV_ENDPOINT_URL: &str = "SKYBRIDGE_ENDPOINT_URL";

/// AWS composition layer: resolves credentials, region and endpoint into
/// SDK clients and applies environment-scoped resource naming.
pub struct AwsPlatform {
    sdk_config: SdkConfig,
    env_prefix: String,
    metrics: Arc<dyn Metrics>,
    // Shared per-resource breakers, so adapter instances built for the same
    // bucket or queue keep one failure history.
    s3_breakers: Arc<BreakerRegistry>,
    sqs_breakers: Arc<BreakerRegistry>,
}

impl AwsPlatform {
    /// Build from the ambient environment (env vars, profile, instance
    /// metadata). `SKYBRIDGE_ENDPOINT_URL` overrides the endpoint for
    /// localstack-style setups.
    pub async fn from_env(env_prefix: impl Into<String>, metrics: Arc<dyn Metrics>) -> Self {
        let mut loader = aws_config::defaults(BehaviorVersion::latest());
        if let Ok(endpoint) = env::var(ENV_ENDPOINT_URL) {
            tracing::info!("Using custom AWS endpoint: {}", endpoint);
            loader = loader.endpoint_url(endpoint);
        }
        let sdk_config = loader.load().await;
        Self::from_sdk_config(sdk_config, env_prefix, metrics)
    }

    /// Build with explicitly injected credentials, for platforms that hand
    /// out scoped keys instead of ambient configuration.
    pub async fn with_static_credentials(
        access_key_id: &str,
        secret_access_key: &str,
        session_token: Option<String>,
        region: &str,
        env_prefix: impl Into<String>,
        metrics: Arc<dyn Metrics>,
    ) -> Self {
        let credentials = Credentials::new(
            access_key_id,
            secret_access_key,
            session_token,
            None,
            "skybridge-static",
        );
        let sdk_config = aws_config::defaults(BehaviorVersion::latest())
            .credentials_provider(credentials)
            .region(Region::new(region.to_string()))
            .load()
            .await;
        Self::from_sdk_config(sdk_config, env_prefix, metrics)
    }

    fn from_sdk_config(
        sdk_config: SdkConfig,
        env_prefix: impl Into<String>,
        metrics: Arc<dyn Metrics>,
    ) -> Self {
        Self {
            sdk_config,
            env_prefix: env_prefix.into(),
            s3_breakers: Arc::new(BreakerRegistry::new("s3", Arc::clone(&metrics))),
            sqs_breakers: Arc::new(BreakerRegistry::new("sqs", Arc::clone(&metrics))),
            metrics,
        }
    }

    pub fn sdk_config(&self) -> &SdkConfig {
        &self.sdk_config
    }

    /// Environment-scoped resource name, e.g. `dev-reports` for `reports`.
    pub fn resource_name(&self, name: &str) -> String {
        if self.env_prefix.is_empty() {
            name.to_string()
        } else {
            format!("{}-{}", self.env_prefix, name)
        }
    }

    pub fn s3_client(&self) -> aws_sdk_s3::Client {
        aws_sdk_s3::Client::new(&self.sdk_config)
    }

    pub fn sqs_client(&self) -> aws_sdk_sqs::Client {
        aws_sdk_sqs::Client::new(&self.sdk_config)
    }

    /// Object store for an environment-scoped bucket.
    pub fn object_store(&self, bucket: &str) -> S3Store {
        let scoped = self.resource_name(bucket);
        S3Store::new(self.s3_client(), &scoped, Arc::clone(&self.metrics))
            .with_breaker(self.s3_breakers.get(&scoped))
    }

    /// Queue adapter for an environment-scoped queue, resolving its URL.
    pub async fn queue(&self, name: &str) -> Result<SqsQueue> {
        let scoped = self.resource_name(name);
        let queue =
            SqsQueue::resolve(self.sqs_client(), &scoped, Arc::clone(&self.metrics)).await?;
        Ok(queue.with_breaker(self.sqs_breakers.get(&scoped)))
    }
}

/// Builds S3 stores with a client matching each bucket's region, caching
/// one client per region. Buckets outside the default region would
/// otherwise see redirects on every call.
pub struct RegionalS3Factory {
    sdk_config: SdkConfig,
    default_client: aws_sdk_s3::Client,
    metrics: Arc<dyn Metrics>,
    breakers: Arc<BreakerRegistry>,
    clients_by_region: Mutex<HashMap<String, aws_sdk_s3::Client>>,
}

impl RegionalS3Factory {
    pub fn new(platform: &AwsPlatform) -> Self {
        Self {
            sdk_config: platform.sdk_config().clone(),
            default_client: platform.s3_client(),
            metrics: Arc::clone(&platform.metrics),
            breakers: Arc::clone(&platform.s3_breakers),
            clients_by_region: Mutex::new(HashMap::new()),
        }
    }

    pub async fn store_for_bucket(&self, bucket: &str) -> S3Store {
        let region = lookup_bucket_region(&self.default_client, bucket).await;
        let client = self.client_for_region(&region);
        S3Store::new(client, bucket, Arc::clone(&self.metrics))
            .with_breaker(self.breakers.get(bucket))
    }

    fn client_for_region(&self, region: &str) -> aws_sdk_s3::Client {
        let mut clients = self
            .clients_by_region
            .lock()
            .expect("region cache lock poisoned");
        clients
            .entry(region.to_string())
            .or_insert_with(|| {
                tracing::info!("[S3] Creating regional client for {}", region);
                let config = aws_sdk_s3::config::Builder::from(&self.sdk_config)
                    .region(Region::new(region.to_string()))
                    .build();
                aws_sdk_s3::Client::from_conf(config)
            })
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::metrics::NoopMetrics;

    async fn platform(prefix: &str) -> AwsPlatform {
        AwsPlatform::with_static_credentials(
            "AKIATEST",
            "secret",
            None,
            "ap-southeast-2",
            prefix,
            Arc::new(NoopMetrics),
        )
        .await
    }

    #[tokio::test]
    async fn test_resource_name_applies_env_prefix() {
        let aws = platform("dev").await;
        assert_eq!(aws.resource_name("reports"), "dev-reports");
    }

    #[tokio::test]
    async fn test_empty_prefix_leaves_name_unchanged() {
        let aws = platform("").await;
        assert_eq!(aws.resource_name("reports"), "reports");
    }

    #[tokio::test]
    async fn test_object_store_uses_scoped_bucket_name() {
        let aws = platform("staging").await;
        let store = aws.object_store("reports");
        assert_eq!(store.bucket(), "staging-reports");
    }

    #[tokio::test]
    async fn test_object_store_breaker_persists_across_calls() {
        use crate::core::breaker::CircuitState;

        let aws = platform("dev").await;
        let first = aws.object_store("reports");
        let second = aws.object_store("reports");
        assert!(Arc::ptr_eq(first.breaker(), second.breaker()));

        // Trip the breaker through one store; a store built later sees it open
        for _ in 0..3 {
            first.breaker().record_failure();
        }
        let third = aws.object_store("reports");
        assert_eq!(third.breaker().state(), CircuitState::Open);

        // A different bucket keeps its own breaker
        let other = aws.object_store("exports");
        assert_eq!(other.breaker().state(), CircuitState::Closed);
    }

    #[tokio::test]
    async fn test_queue_breakers_are_keyed_separately_from_storage() {
        let aws = platform("dev").await;
        let queue = SqsQueue::new(
            aws.sqs_client(),
            "dev-events",
            "http://localhost/queue/dev-events",
            Arc::new(NoopMetrics),
        )
        .with_breaker(aws.sqs_breakers.get("dev-events"));

        assert_eq!(queue.breaker().name(), "sqs:dev-events");
        assert!(Arc::ptr_eq(
            queue.breaker(),
            &aws.sqs_breakers.get("dev-events")
        ));
    }

    #[tokio::test]
    async fn test_regional_factory_shares_platform_breakers() {
        let aws = platform("dev").await;
        let factory = RegionalS3Factory::new(&aws);
        assert!(Arc::ptr_eq(&factory.breakers, &aws.s3_breakers));
    }

    #[tokio::test]
    async fn test_regional_factory_caches_clients() {
        let aws = platform("dev").await;
        let factory = RegionalS3Factory::new(&aws);

        factory.client_for_region("eu-west-1");
        factory.client_for_region("eu-west-1");
        factory.client_for_region("us-east-1");

        let clients = factory.clients_by_region.lock().unwrap();
        assert_eq!(clients.len(), 2);
    }
}
