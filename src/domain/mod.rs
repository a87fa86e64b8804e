pub mod model;
pub mod ports;

pub use model::{HealthStatus, QueueMessage, TraceId};
pub use ports::{ConfigProvider, HealthCheck, MessageQueue, Metrics, ObjectStore};
