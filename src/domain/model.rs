use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Correlation id attached to outbound requests as `X-Trace-Id`.
///
/// A single trace id covers all retry attempts of one logical request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceId(String);

impl TraceId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn from_string(value: String) -> Self {
        Self(value)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for TraceId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TraceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A message pulled from a queue. The receipt handle is required to
/// acknowledge (delete) the message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueMessage {
    pub id: String,
    pub receipt_handle: String,
    pub body: String,
}

/// Outcome of a single health check.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    pub name: String,
    pub healthy: bool,
    pub detail: Option<String>,
}

impl HealthStatus {
    pub fn healthy(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            healthy: true,
            detail: None,
        }
    }

    pub fn unhealthy(name: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            healthy: false,
            detail: Some(detail.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trace_ids_are_unique() {
        assert_ne!(TraceId::new().as_str(), TraceId::new().as_str());
    }

    #[test]
    fn test_trace_id_roundtrip() {
        let id = TraceId::from_string("abc-123".to_string());
        assert_eq!(id.to_string(), "abc-123");
    }

    #[test]
    fn test_health_status_constructors() {
        let ok = HealthStatus::healthy("api");
        assert!(ok.healthy);
        assert!(ok.detail.is_none());

        let bad = HealthStatus::unhealthy("db", "connection refused");
        assert!(!bad.healthy);
        assert_eq!(bad.detail.as_deref(), Some("connection refused"));
    }
}
