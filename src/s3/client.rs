//! S3 client: one signing/transport engine parameterized by endpoint config.
//!
//! Every call builds its own [`CanonicalRequest`], signs it with a timestamp taken
//! once for that call, and sends it through the [`Transport`]. The client holds no
//! per-request state, so concurrent calls on a shared client never interfere.

use bytes::Bytes;
use chrono::Utc;
use hyper::Method;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::config::{regions, ClientOptions, StorageEndpointConfig};
use crate::s3::canonical::{CanonicalRequest, CanonicalRequestBuilder, HEADER_AMZ_ACL};
use crate::s3::error::{Result, S3Error};
use crate::s3::signer::S3SignerV4;
use crate::s3::transport::{
    invoke, BodyKind, HyperTransport, ResponseBody, S3Response, Transport,
};
use crate::s3::types::{DeleteBatch, DeleteObjectsResponse, ObjectListingPage};

/// Default `max-keys` per listing page
pub const DEFAULT_PAGE_SIZE: i32 = 1000;

/// S3 client over any [`Transport`]
///
/// Clone is cheap when the transport is.
#[derive(Debug, Clone)]
pub struct S3Client<T = HyperTransport> {
    config: Arc<StorageEndpointConfig>,
    signer: S3SignerV4,
    transport: T,
    page_size: i32,
    max_list_pages: Option<usize>,
}

impl S3Client<HyperTransport> {
    /// Client over HTTP(S) with the given options
    pub fn new(config: StorageEndpointConfig, options: &ClientOptions) -> Result<Self> {
        let transport = HyperTransport::new(
            Duration::from_secs(options.request_timeout),
            options.insecure_tls,
        )?;
        Ok(Self::with_transport(config, transport)
            .with_page_size(options.page_size)?
            .with_max_list_pages(options.max_list_pages))
    }
}

impl<T: Transport> S3Client<T> {
    /// Client over a caller-supplied transport
    pub fn with_transport(config: StorageEndpointConfig, transport: T) -> Self {
        if !regions::is_aws_region(config.region()) {
            debug!(region = config.region(), "using non-AWS region in signing scope");
        }
        let signer = S3SignerV4::from_config(&config);
        Self {
            config: Arc::new(config),
            signer,
            transport,
            page_size: DEFAULT_PAGE_SIZE,
            max_list_pages: None,
        }
    }

    /// Set the `max-keys` used for paginated listing and prefix deletes
    pub fn with_page_size(mut self, page_size: i32) -> Result<Self> {
        validate_max_keys(page_size)?;
        self.page_size = page_size;
        Ok(self)
    }

    /// Fail listings that need more than `limit` pages
    pub fn with_max_list_pages(mut self, limit: Option<usize>) -> Self {
        self.max_list_pages = limit;
        self
    }

    pub fn config(&self) -> &StorageEndpointConfig {
        &self.config
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn page_size(&self) -> i32 {
        self.page_size
    }

    pub(crate) fn max_list_pages(&self) -> Option<usize> {
        self.max_list_pages
    }

    pub fn name(&self) -> &'static str {
        "MinIO Object Storage"
    }

    pub fn description(&self) -> &'static str {
        "MinIO Object Storage"
    }

    fn request(&self, method: Method) -> CanonicalRequestBuilder {
        CanonicalRequest::builder(method, &self.config)
    }

    /// Sign with a timestamp taken now and send
    async fn execute(&self, request: CanonicalRequest, kind: BodyKind) -> Result<S3Response> {
        let signed = self.signer.sign(request, Utc::now())?;
        invoke(&self.transport, &self.config, signed, kind).await
    }

    /// One ListObjectsV2 page under the root prefix
    pub async fn list_objects(
        &self,
        prefix: &str,
        max_keys: i32,
        continuation_token: Option<&str>,
    ) -> Result<ObjectListingPage> {
        validate_max_keys(max_keys)?;

        let mut request = self
            .request(Method::GET)
            .content_type("text/plain")
            .query("list-type", "2")
            .query("prefix", prefix)
            .query("max-keys", max_keys.to_string());
        if let Some(token) = continuation_token.filter(|t| !t.is_empty()) {
            request = request.query("continuation-token", token);
        }

        let response = self.execute(request.build(), BodyKind::Xml).await?;
        let page = ObjectListingPage::from_xml(response.xml()?)?;

        debug!(
            prefix,
            key_count = page.key_count,
            has_more = page.next_continuation_token.is_some(),
            "listed page"
        );
        Ok(page)
    }

    /// Delete one batch of keys with a single DeleteObjects request
    pub async fn delete_batch(&self, batch: &DeleteBatch) -> Result<DeleteObjectsResponse> {
        let request = self
            .request(Method::POST)
            .content_type("application/xml")
            .query("delete", "")
            .body(batch.to_xml()?)
            .build();

        let response = self.execute(request, BodyKind::Xml).await?;
        match &response.body {
            ResponseBody::Xml(value) => Ok(DeleteObjectsResponse::from_xml(value)),
            // Quiet deletes with nothing to report may come back empty
            _ => Ok(DeleteObjectsResponse::new()),
        }
    }

    /// Delete up to 1000 keys (quiet mode)
    pub async fn delete_objects(&self, keys: &[String]) -> Result<DeleteObjectsResponse> {
        if keys.is_empty() {
            return Ok(DeleteObjectsResponse::new());
        }
        self.delete_batch(&DeleteBatch::new(keys.to_vec())?).await
    }

    /// Delete a single object
    pub async fn delete_object(&self, key: &str) -> Result<()> {
        let request = self.request(Method::DELETE).resource(non_empty_key(key)?).build();
        self.execute(request, BodyKind::Raw).await?;
        Ok(())
    }

    /// Fetch an object's bytes
    pub async fn get_object(&self, key: &str) -> Result<Bytes> {
        let request = self.request(Method::GET).resource(non_empty_key(key)?).build();
        Ok(self.execute(request, BodyKind::Raw).await?.into_bytes())
    }

    /// Create the configured bucket with the default ACL
    pub async fn create_bucket(&self) -> Result<()> {
        let request = self
            .request(Method::PUT)
            .bucket(self.config.bucket())
            .header(HEADER_AMZ_ACL, self.config.acl().as_header_value())
            .build();
        self.execute(request, BodyKind::Raw).await?;
        Ok(())
    }
}

fn validate_max_keys(max_keys: i32) -> Result<()> {
    if max_keys < 1 {
        return Err(S3Error::InvalidArgument(format!(
            "max-keys must be at least 1, got {}",
            max_keys
        )));
    }
    Ok(())
}

fn non_empty_key(key: &str) -> Result<&str> {
    if key.trim_start_matches('/').is_empty() {
        return Err(S3Error::InvalidArgument("object key is empty".to_string()));
    }
    Ok(key)
}
