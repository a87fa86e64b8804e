use crate::core::breaker::CircuitBreaker;
use crate::domain::model::{HealthStatus, QueueMessage};
use crate::domain::ports::{HealthCheck, MessageQueue, Metrics};
use crate::utils::error::{AdapterError, Result};
use async_trait::async_trait;
use aws_sdk_sqs::error::DisplayErrorContext;
use aws_sdk_sqs::types::QueueAttributeName;
use aws_sdk_sqs::Client as SqsClient;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

/// SQS allows at most 10 messages per receive call.
const MAX_RECEIVE_BATCH: i32 = 10;

/// Message queue over a single SQS queue, with the same metrics and
/// circuit-breaker discipline as the storage adapter.
pub struct SqsQueue {
    client: SqsClient,
    queue_name: String,
    queue_url: String,
    wait_time_seconds: i32,
    visibility_timeout_seconds: i32,
    metrics: Arc<dyn Metrics>,
    breaker: Arc<CircuitBreaker>,
}

impl SqsQueue {
    pub fn new(
        client: SqsClient,
        queue_name: impl Into<String>,
        queue_url: impl Into<String>,
        metrics: Arc<dyn Metrics>,
    ) -> Self {
        let queue_name = queue_name.into();
        let breaker = Arc::new(CircuitBreaker::new(
            format!("sqs:{}", queue_name),
            CircuitBreaker::DEFAULT_FAIL_MAX,
            CircuitBreaker::DEFAULT_RESET_TIMEOUT,
            Arc::clone(&metrics),
        ));
        Self {
            client,
            queue_name,
            queue_url: queue_url.into(),
            wait_time_seconds: 0,
            visibility_timeout_seconds: 30,
            metrics,
            breaker,
        }
    }

    /// Look the queue URL up by name and build the adapter.
    pub async fn resolve(
        client: SqsClient,
        queue_name: &str,
        metrics: Arc<dyn Metrics>,
    ) -> Result<Self> {
        let output = client
            .get_queue_url()
            .queue_name(queue_name)
            .send()
            .await
            .map_err(|e| AdapterError::QueueError {
                operation: "resolve".to_string(),
                queue: queue_name.to_string(),
                message: format!("{}", DisplayErrorContext(&e)),
            })?;
        let queue_url = output
            .queue_url()
            .ok_or_else(|| AdapterError::QueueError {
                operation: "resolve".to_string(),
                queue: queue_name.to_string(),
                message: "GetQueueUrl returned no URL".to_string(),
            })?
            .to_string();
        Ok(Self::new(client, queue_name, queue_url, metrics))
    }

    /// Replace the queue's own breaker with a shared one, so state persists
    /// across adapter instances for the same queue.
    pub fn with_breaker(mut self, breaker: Arc<CircuitBreaker>) -> Self {
        self.breaker = breaker;
        self
    }

    pub fn breaker(&self) -> &Arc<CircuitBreaker> {
        &self.breaker
    }

    pub fn with_wait_time_seconds(mut self, seconds: i32) -> Self {
        self.wait_time_seconds = seconds;
        self
    }

    pub fn with_visibility_timeout_seconds(mut self, seconds: i32) -> Self {
        self.visibility_timeout_seconds = seconds;
        self
    }

    pub fn queue_url(&self) -> &str {
        &self.queue_url
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
                    &self.queue_name,
                    start.elapsed().as_secs_f64(),
                    true,
                );
                self.breaker.record_success();
                Ok(value)
            }
            Err(e) => {
                self.metrics.observe_operation(
                    operation,
                    &self.queue_name,
                    start.elapsed().as_secs_f64(),
                    false,
                );
                self.metrics
                    .record_error(operation, &self.queue_name, e.kind());
                self.breaker.record_failure();
                tracing::warn!("[SQS ERROR] {} on {}: {}", operation, self.queue_name, e);
                Err(e)
            }
        }
    }

    fn queue_error<E>(&self, operation: &str, err: E) -> AdapterError
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        AdapterError::QueueError {
            operation: operation.to_string(),
            queue: self.queue_name.clone(),
            message: format!("{}", DisplayErrorContext(&err)),
        }
    }
}

#[async_trait]
impl MessageQueue for SqsQueue {
    async fn send(&self, body: &str) -> Result<String> {
        tracing::debug!("[SQS] SEND {}", self.queue_name);
        self.observe("send", async {
            let output = self
                .client
                .send_message()
                .queue_url(&self.queue_url)
                .message_body(body)
                .send()
                .await
                .map_err(|e| self.queue_error("send", e))?;
            Ok(output.message_id().unwrap_or_default().to_string())
        })
        .await
    }

    async fn receive(&self, max_messages: i32) -> Result<Vec<QueueMessage>> {
        let batch = max_messages.clamp(1, MAX_RECEIVE_BATCH);
        tracing::debug!("[SQS] RECEIVE {} (max {})", self.queue_name, batch);
        self.observe("receive", async {
            let output = self
                .client
                .receive_message()
                .queue_url(&self.queue_url)
                .max_number_of_messages(batch)
                .wait_time_seconds(self.wait_time_seconds)
                .visibility_timeout(self.visibility_timeout_seconds)
                .send()
                .await
                .map_err(|e| self.queue_error("receive", e))?;

            let messages = output
                .messages()
                .iter()
                .filter_map(|m| {
                    let receipt_handle = m.receipt_handle()?;
                    Some(QueueMessage {
                        id: m.message_id().unwrap_or_default().to_string(),
                        receipt_handle: receipt_handle.to_string(),
                        body: m.body().unwrap_or_default().to_string(),
                    })
                })
                .collect();
            Ok(messages)
        })
        .await
    }

    async fn acknowledge(&self, receipt_handle: &str) -> Result<()> {
        tracing::debug!("[SQS] DELETE {}", self.queue_name);
        self.observe("ack", async {
            self.client
                .delete_message()
                .queue_url(&self.queue_url)
                .receipt_handle(receipt_handle)
                .send()
                .await
                .map_err(|e| self.queue_error("ack", e))?;
            Ok(())
        })
        .await
    }
}

#[async_trait]
impl HealthCheck for SqsQueue {
    fn name(&self) -> &str {
        "queue"
    }

    async fn check(&self) -> HealthStatus {
        match self
            .client
            .get_queue_attributes()
            .queue_url(&self.queue_url)
            .attribute_names(QueueAttributeName::ApproximateNumberOfMessages)
            .send()
            .await
        {
            Ok(_) => HealthStatus::healthy("queue"),
            Err(e) => HealthStatus::unhealthy(
                "queue",
                format!(
                    "get_queue_attributes {} failed: {}",
                    self.queue_name,
                    DisplayErrorContext(&e)
                ),
            ),
        }
    }
}
