use crate::domain::model::HealthStatus;
use crate::domain::ports::HealthCheck;
use std::sync::Arc;

/// Aggregated result of a probe sweep.
#[derive(Debug)]
pub struct ProbeReport {
    pub statuses: Vec<HealthStatus>,
}

impl ProbeReport {
    pub fn all_healthy(&self) -> bool {
        self.statuses.iter().all(|s| s.healthy)
    }

    pub fn failed(&self) -> Vec<&HealthStatus> {
        self.statuses.iter().filter(|s| !s.healthy).collect()
    }
}

/// Runs every registered health check in turn and reports the outcome.
pub struct ProbeRunner {
    checks: Vec<Arc<dyn HealthCheck>>,
}

impl ProbeRunner {
    pub fn new() -> Self {
        Self { checks: Vec::new() }
    }

    pub fn register(&mut self, check: Arc<dyn HealthCheck>) {
        self.checks.push(check);
    }

    pub fn is_empty(&self) -> bool {
        self.checks.is_empty()
    }

    pub async fn run(&self) -> ProbeReport {
        tracing::info!("Probing {} dependencies...", self.checks.len());

        let mut statuses = Vec::with_capacity(self.checks.len());
        for check in &self.checks {
            let status = check.check().await;
            if status.healthy {
                tracing::info!("{}: healthy", status.name);
            } else {
                tracing::warn!(
                    "{}: unhealthy ({})",
                    status.name,
                    status.detail.as_deref().unwrap_or("no detail")
                );
            }
            statuses.push(status);
        }

        ProbeReport { statuses }
    }
}

impl Default for ProbeRunner {
    fn default() -> Self {
        Self::new()
    }
}
