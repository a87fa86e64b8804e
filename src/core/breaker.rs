use crate::domain::ports::Metrics;
use crate::utils::error::{AdapterError, Result};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Circuit breaker states. Gauge values: 0=closed, 1=half-open, 2=open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

impl CircuitState {
    pub fn as_gauge(&self) -> i64 {
        match self {
            Self::Closed => 0,
            Self::HalfOpen => 1,
            Self::Open => 2,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Closed => "closed",
            Self::Open => "open",
            Self::HalfOpen => "half_open",
        }
    }
}

struct BreakerInner {
    state: CircuitState,
    consecutive_failures: u32,
    opened_at: Option<Instant>,
}

/// Trips open after `fail_max` consecutive failures; after `reset_timeout`
/// callers pass through again (half-open). The next recorded success closes
/// the circuit, the next failure re-opens it.
pub struct CircuitBreaker {
    name: String,
    fail_max: u32,
    reset_timeout: Duration,
    metrics: Arc<dyn Metrics>,
    inner: Mutex<BreakerInner>,
}

impl CircuitBreaker {
    pub const DEFAULT_FAIL_MAX: u32 = 3;
    pub const DEFAULT_RESET_TIMEOUT: Duration = Duration::from_secs(300);

    pub fn new(
        name: impl Into<String>,
        fail_max: u32,
        reset_timeout: Duration,
        metrics: Arc<dyn Metrics>,
    ) -> Self {
        Self {
            name: name.into(),
            fail_max,
            reset_timeout,
            metrics,
            inner: Mutex::new(BreakerInner {
                state: CircuitState::Closed,
                consecutive_failures: 0,
                opened_at: None,
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> CircuitState {
        self.inner.lock().expect("breaker lock poisoned").state
    }

    /// Gate a call. Errors with `CircuitOpenError` while the circuit is open;
    /// transitions to half-open once the reset timeout has elapsed.
    pub fn check(&self) -> Result<()> {
        let mut inner = self.inner.lock().expect("breaker lock poisoned");
        match inner.state {
            CircuitState::Closed | CircuitState::HalfOpen => Ok(()),
            CircuitState::Open => {
                let elapsed = inner
                    .opened_at
                    .map(|at| at.elapsed())
                    .unwrap_or(Duration::ZERO);
                if elapsed >= self.reset_timeout {
                    self.transition(&mut inner, CircuitState::HalfOpen);
                    Ok(())
                } else {
                    tracing::warn!("[Circuit OPEN] Blocking call for {}", self.name);
                    Err(AdapterError::CircuitOpenError {
                        resource: self.name.clone(),
                    })
                }
            }
        }
    }

    pub fn record_success(&self) {
        let mut inner = self.inner.lock().expect("breaker lock poisoned");
        inner.consecutive_failures = 0;
        if inner.state != CircuitState::Closed {
            self.transition(&mut inner, CircuitState::Closed);
        }
    }

    pub fn record_failure(&self) {
        let mut inner = self.inner.lock().expect("breaker lock poisoned");
        inner.consecutive_failures += 1;
        match inner.state {
            CircuitState::HalfOpen => {
                inner.opened_at = Some(Instant::now());
                self.transition(&mut inner, CircuitState::Open);
            }
            CircuitState::Closed if inner.consecutive_failures >= self.fail_max => {
                inner.opened_at = Some(Instant::now());
                self.transition(&mut inner, CircuitState::Open);
            }
            _ => {}
        }
    }

    fn transition(&self, inner: &mut BreakerInner, new_state: CircuitState) {
        let old_state = inner.state;
        inner.state = new_state;
        tracing::warn!(
            "[Circuit] {} changed from {} to {}",
            self.name,
            old_state.as_str(),
            new_state.as_str()
        );
        self.metrics.set_circuit_state(&self.name, new_state.as_gauge());
    }
}

/// Lazily creates one breaker per resource key, so a failing bucket or
/// queue does not trip calls to healthy ones.
pub struct BreakerRegistry {
    prefix: String,
    fail_max: u32,
    reset_timeout: Duration,
    metrics: Arc<dyn Metrics>,
    breakers: Mutex<HashMap<String, Arc<CircuitBreaker>>>,
}

impl BreakerRegistry {
    pub fn new(prefix: impl Into<String>, metrics: Arc<dyn Metrics>) -> Self {
        Self {
            prefix: prefix.into(),
            fail_max: CircuitBreaker::DEFAULT_FAIL_MAX,
            reset_timeout: CircuitBreaker::DEFAULT_RESET_TIMEOUT,
            metrics,
            breakers: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_limits(mut self, fail_max: u32, reset_timeout: Duration) -> Self {
        self.fail_max = fail_max;
        self.reset_timeout = reset_timeout;
        self
    }

    pub fn get(&self, key: &str) -> Arc<CircuitBreaker> {
        let mut breakers = self.breakers.lock().expect("registry lock poisoned");
        breakers
            .entry(key.to_string())
            .or_insert_with(|| {
                Arc::new(CircuitBreaker::new(
                    format!("{}:{}", self.prefix, key),
                    self.fail_max,
                    self.reset_timeout,
                    Arc::clone(&self.metrics),
                ))
            })
            .clone()
    }
}
