pub mod aws;

pub use aws::{AwsPlatform, RegionalS3Factory};
