pub mod local;
pub mod metrics;
pub mod s3;
pub mod sqs;

pub use local::LocalStore;
pub use metrics::{NoopMetrics, PrometheusMetrics};
pub use s3::S3Store;
pub use sqs::SqsQueue;
