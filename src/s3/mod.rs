//! S3 client module with AWS SigV4 signing
//!
//! This module provides:
//! - Canonical request construction and AWS Signature Version 4 signing
//! - A pluggable HTTP transport and the invoker that decodes S3 responses
//! - ListObjectsV2 pagination and prefix deletion through DeleteObjects batches

pub mod canonical;
pub mod client;
pub mod delete;
pub mod error;
pub mod paginate;
pub mod signer;
pub mod transport;
pub mod types;
pub mod xml;

// Re-export main types for convenience
pub use canonical::{CanonicalRequest, CanonicalRequestBuilder};
pub use client::{S3Client, DEFAULT_PAGE_SIZE};
pub use error::{Result, S3Error};
pub use paginate::ObjectPager;
pub use signer::{S3SignerV4, SignedRequest};
pub use transport::{HttpRequest, HttpResponse, HyperTransport, Transport};
pub use types::{
    DeleteBatch, DeleteError, DeleteObjectsResponse, DeletedObject, ObjectListingPage, S3Object,
    MAX_DELETE_BATCH,
};
