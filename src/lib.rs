//! s3device - signed REST client for S3-compatible object storage

pub mod cli;
pub mod config;
pub mod s3;

pub use config::{Config, StorageEndpointConfig};
pub use s3::{S3Client, S3Error};
