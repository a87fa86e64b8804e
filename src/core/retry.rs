use rand::Rng;
use std::fmt;

/// Configuration for automatic retry behavior on outbound requests.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum number of retry attempts (the first attempt is not a retry).
    pub max_retries: u32,
    /// Base factor for exponential backoff.
    pub backoff_factor: f64,
    /// Status codes that trigger retry.
    pub retry_on: Vec<u16>,
    /// Whether to respect the Retry-After header.
    pub respect_retry_after: bool,
    /// Maximum backoff time in seconds.
    pub max_backoff: f64,
    /// Jitter factor (0.1 = ±10%).
    pub jitter: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            backoff_factor: 2.0,
            retry_on: vec![429, 500, 502, 503],
            respect_retry_after: true,
            max_backoff: 60.0,
            jitter: 0.1,
        }
    }
}

impl RetryPolicy {
    /// Policy performing exactly one attempt. Used by health checks.
    pub fn no_retry() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    pub fn should_retry(&self, status_code: u16, attempt: u32) -> bool {
        if attempt >= self.max_retries {
            return false;
        }
        self.retry_on.contains(&status_code)
    }

    /// Backoff in seconds before the next attempt.
    ///
    /// Exponential with jitter, capped at `max_backoff`. A Retry-After value
    /// wins when present and respected.
    pub fn backoff_time(&self, attempt: u32, retry_after: Option<u64>) -> f64 {
        if let Some(ra) = retry_after {
            if self.respect_retry_after {
                return (ra as f64).min(self.max_backoff);
            }
        }

        let base_wait = self.backoff_factor.powi(attempt as i32);

        let wait_time = if self.jitter > 0.0 {
            let jitter_range = base_wait * self.jitter;
            let mut rng = rand::thread_rng();
            let jitter = rng.gen_range(-jitter_range..jitter_range);
            base_wait + jitter
        } else {
            base_wait
        };

        wait_time.min(self.max_backoff)
    }
}

/// Why a request attempt failed. Used as a metrics label and in retry logs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryReason {
    Timeout,
    ConnectionError,
    RateLimit,
    ServerError,
    Status(u16),
    Other(String),
}

impl RetryReason {
    pub fn from_status(status: u16) -> Self {
        if status >= 500 {
            Self::ServerError
        } else if status == 429 {
            Self::RateLimit
        } else {
            Self::Status(status)
        }
    }

    pub fn from_request_error(err: &reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else if err.is_connect() {
            Self::ConnectionError
        } else {
            Self::Other("request_error".to_string())
        }
    }
}

impl fmt::Display for RetryReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timeout => write!(f, "timeout"),
            Self::ConnectionError => write!(f, "connection_error"),
            Self::RateLimit => write!(f, "rate_limit"),
            Self::ServerError => write!(f, "5xx"),
            Self::Status(code) => write!(f, "status_{}", code),
            Self::Other(label) => write!(f, "{}", label),
        }
    }
}
