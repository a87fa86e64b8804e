use crate::domain::ports::Metrics;
use crate::utils::error::Result;
use prometheus::{HistogramOpts, HistogramVec, IntCounterVec, IntGaugeVec, Opts, Registry};

/// Prometheus-backed metrics sink. Owns its registry; the embedding
/// application gathers from it however it exposes metrics.
pub struct PrometheusMetrics {
    registry: Registry,
    request_duration: HistogramVec,
    retries_total: IntCounterVec,
    retry_sleep: HistogramVec,
    success_op_duration: HistogramVec,
    failure_op_duration: HistogramVec,
    errors_total: IntCounterVec,
    circuit_state: IntGaugeVec,
}

impl PrometheusMetrics {
    pub fn new() -> Result<Self> {
        let registry = Registry::new();

        let request_duration = HistogramVec::new(
            HistogramOpts::new(
                "api_client_request_duration_seconds",
                "Time taken for outbound API requests",
            ),
            &["method", "endpoint"],
        )?;
        registry.register(Box::new(request_duration.clone()))?;

        let retries_total = IntCounterVec::new(
            Opts::new("api_client_retries_total", "Total number of retry attempts"),
            &["method", "endpoint", "reason"],
        )?;
        registry.register(Box::new(retries_total.clone()))?;

        let retry_sleep = HistogramVec::new(
            HistogramOpts::new(
                "api_client_retry_sleep_seconds",
                "Backoff slept before retry attempts",
            ),
            &["method", "endpoint", "reason"],
        )?;
        registry.register(Box::new(retry_sleep.clone()))?;

        let success_op_duration = HistogramVec::new(
            HistogramOpts::new(
                "adapter_success_op_duration_seconds",
                "Time taken for successful adapter operations",
            ),
            &["operation", "resource"],
        )?;
        registry.register(Box::new(success_op_duration.clone()))?;

        let failure_op_duration = HistogramVec::new(
            HistogramOpts::new(
                "adapter_failure_op_duration_seconds",
                "Time taken for failed adapter operations",
            ),
            &["operation", "resource"],
        )?;
        registry.register(Box::new(failure_op_duration.clone()))?;

        let errors_total = IntCounterVec::new(
            Opts::new("adapter_errors_total", "Adapter error count"),
            &["operation", "resource", "error"],
        )?;
        registry.register(Box::new(errors_total.clone()))?;

        let circuit_state = IntGaugeVec::new(
            Opts::new(
                "adapter_circuit_state",
                "Circuit breaker state: 0=closed, 1=half-open, 2=open",
            ),
            &["resource"],
        )?;
        registry.register(Box::new(circuit_state.clone()))?;

        Ok(Self {
            registry,
            request_duration,
            retries_total,
            retry_sleep,
            success_op_duration,
            failure_op_duration,
            errors_total,
            circuit_state,
        })
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }
}

impl Metrics for PrometheusMetrics {
    fn observe_request(&self, method: &str, endpoint: &str, seconds: f64) {
        self.request_duration
            .with_label_values(&[method, endpoint])
            .observe(seconds);
    }

    fn record_retry(&self, method: &str, endpoint: &str, reason: &str, sleep_seconds: f64) {
        self.retries_total
            .with_label_values(&[method, endpoint, reason])
            .inc();
        self.retry_sleep
            .with_label_values(&[method, endpoint, reason])
            .observe(sleep_seconds);
    }

    fn observe_operation(&self, operation: &str, resource: &str, seconds: f64, success: bool) {
        let histogram = if success {
            &self.success_op_duration
        } else {
            &self.failure_op_duration
        };
        histogram
            .with_label_values(&[operation, resource])
            .observe(seconds);
    }

    fn record_error(&self, operation: &str, resource: &str, error: &str) {
        self.errors_total
            .with_label_values(&[operation, resource, error])
            .inc();
    }

    fn set_circuit_state(&self, resource: &str, state: i64) {
        self.circuit_state.with_label_values(&[resource]).set(state);
    }
}

/// Discards everything. Default sink for tests and for embedders that do
/// not care about metrics.
pub struct NoopMetrics;

impl Metrics for NoopMetrics {
    fn observe_request(&self, _method: &str, _endpoint: &str, _seconds: f64) {}
    fn record_retry(&self, _method: &str, _endpoint: &str, _reason: &str, _sleep_seconds: f64) {}
    fn observe_operation(&self, _operation: &str, _resource: &str, _seconds: f64, _success: bool) {}
    fn record_error(&self, _operation: &str, _resource: &str, _error: &str) {}
    fn set_circuit_state(&self, _resource: &str, _state: i64) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retry_counter_accumulates_by_reason() {
        let metrics = PrometheusMetrics::new().unwrap();
        metrics.record_retry("GET", "/tenants", "5xx", 1.0);
        metrics.record_retry("GET", "/tenants", "5xx", 2.0);
        metrics.record_retry("GET", "/tenants", "timeout", 1.0);

        assert_eq!(
            metrics
                .retries_total
                .with_label_values(&["GET", "/tenants", "5xx"])
                .get(),
            2
        );
        assert_eq!(
            metrics
                .retries_total
                .with_label_values(&["GET", "/tenants", "timeout"])
                .get(),
            1
        );
    }

    #[test]
    fn test_operation_duration_split_by_outcome() {
        let metrics = PrometheusMetrics::new().unwrap();
        metrics.observe_operation("upload", "my-bucket", 0.2, true);
        metrics.observe_operation("upload", "my-bucket", 0.4, false);

        assert_eq!(
            metrics
                .success_op_duration
                .with_label_values(&["upload", "my-bucket"])
                .get_sample_count(),
            1
        );
        assert_eq!(
            metrics
                .failure_op_duration
                .with_label_values(&["upload", "my-bucket"])
                .get_sample_count(),
            1
        );
    }

    #[test]
    fn test_circuit_state_gauge() {
        let metrics = PrometheusMetrics::new().unwrap();
        metrics.set_circuit_state("s3:my-bucket", 2);
        assert_eq!(
            metrics
                .circuit_state
                .with_label_values(&["s3:my-bucket"])
                .get(),
            2
        );
        metrics.set_circuit_state("s3:my-bucket", 0);
        assert_eq!(
            metrics
                .circuit_state
                .with_label_values(&["s3:my-bucket"])
                .get(),
            0
        );
    }

    #[test]
    fn test_families_are_registered() {
        let metrics = PrometheusMetrics::new().unwrap();
        metrics.observe_request("GET", "/health", 0.01);
        metrics.record_error("download", "my-bucket", "not_found");

        let names: Vec<String> = metrics
            .registry()
            .gather()
            .iter()
            .map(|family| family.get_name().to_string())
            .collect();
        assert!(names.contains(&"api_client_request_duration_seconds".to_string()));
        assert!(names.contains(&"adapter_errors_total".to_string()));
    }
}
