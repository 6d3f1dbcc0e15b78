//! HTTP transport and the invoker that turns signed requests into parsed responses.
//!
//! [`Transport`] is the only place network I/O happens. [`HyperTransport`] is the
//! production implementation:
//! - HTTP/1.1 only (matching mc behavior for S3 workloads)
//! - Tuned connection pool (90s idle timeout)
//! - TCP_NODELAY for low latency
//! - native-tls (OpenSSL) for TLS
//! - Whole-request timeout; no retries

use async_trait::async_trait;
use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::{Method, Request, StatusCode};
use hyper_tls::HttpsConnector;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client as HyperClient;
use hyper_util::rt::TokioExecutor;
use native_tls::TlsConnector;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::StorageEndpointConfig;
use crate::s3::error::{Result, S3Error};
use crate::s3::signer::SignedRequest;
use crate::s3::xml::{self, XmlValue};

/// A fully signed request, ready for the wire
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: Method,
    /// Absolute URL
    pub uri: String,
    pub headers: BTreeMap<String, String>,
    pub body: Bytes,
}

/// Raw response as received
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: StatusCode,
    /// Lower-cased header names
    pub headers: BTreeMap<String, String>,
    pub body: Bytes,
}

/// Sends one request and returns the response. Implementations must not retry.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for std::sync::Arc<T> {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        (**self).send(request).await
    }
}

/// Hyper-based HTTP(S) transport
///
/// Clone is cheap - the underlying HTTP client uses Arc internally.
#[derive(Clone)]
pub struct HyperTransport {
    client: HyperClient<HttpsConnector<HttpConnector>, Full<Bytes>>,
    timeout: Duration,
}

impl std::fmt::Debug for HyperTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HyperTransport")
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl HyperTransport {
    pub fn new(timeout: Duration, insecure_tls: bool) -> Result<Self> {
        let mut http = HttpConnector::new();
        http.set_nodelay(true);
        http.enforce_http(false);
        http.set_connect_timeout(Some(Duration::from_secs(10)));
        http.set_keepalive(Some(Duration::from_secs(90)));

        let tls = if insecure_tls {
            warn!("INSECURE TLS MODE ENABLED: Certificate verification is disabled!");
            TlsConnector::builder()
                .danger_accept_invalid_certs(true)
                .danger_accept_invalid_hostnames(true)
                .build()
        } else {
            TlsConnector::new()
        }
        .map_err(|e| S3Error::Configuration(format!("Failed to build TLS connector: {}", e)))?;

        let https = HttpsConnector::from((http, tls.into()));

        let client = HyperClient::builder(TokioExecutor::new())
            .pool_idle_timeout(Duration::from_secs(90))
            .set_host(false)
            .build(https);

        Ok(Self { client, timeout })
    }

    async fn send_inner(&self, request: HttpRequest) -> Result<HttpResponse> {
        let mut req = Request::builder().method(request.method).uri(&request.uri);
        for (key, value) in &request.headers {
            req = req.header(key, value);
        }
        let req = req.body(Full::new(request.body))?;

        let response = self.client.request(req).await?;
        let status = response.status();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        let body = response
            .collect()
            .await
            .map_err(|e| S3Error::Transport(format!("Body error: {}", e)))?
            .to_bytes();

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

#[async_trait]
impl Transport for HyperTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        let uri = request.uri.clone();
        tokio::time::timeout(self.timeout, self.send_inner(request))
            .await
            .map_err(|_| {
                S3Error::Transport(format!("Request to {} timed out after {:?}", uri, self.timeout))
            })?
    }
}

/// How the response body should be decoded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyKind {
    Xml,
    Raw,
}

/// Decoded response body
#[derive(Debug, Clone)]
pub enum ResponseBody {
    Xml(XmlValue),
    Raw(Bytes),
    Empty,
}

/// Successful (2xx) response
#[derive(Debug, Clone)]
pub struct S3Response {
    pub status: StatusCode,
    pub headers: BTreeMap<String, String>,
    pub body: ResponseBody,
}

impl S3Response {
    /// Parsed XML root content
    pub fn xml(&self) -> Result<&XmlValue> {
        match &self.body {
            ResponseBody::Xml(value) => Ok(value),
            _ => Err(S3Error::InvalidResponse("expected an XML body".to_string())),
        }
    }

    pub fn into_bytes(self) -> Bytes {
        match self.body {
            ResponseBody::Raw(bytes) => bytes,
            _ => Bytes::new(),
        }
    }
}

/// Send a signed request and decode the response.
///
/// Non-2xx statuses become [`S3Error::S3Response`] with the `Code`/`Message` of the
/// S3 error document when the body has one.
pub async fn invoke<T: Transport + ?Sized>(
    transport: &T,
    config: &StorageEndpointConfig,
    signed: SignedRequest,
    kind: BodyKind,
) -> Result<S3Response> {
    let request = signed.into_request();
    let uri = format!("{}{}", config.base_url(), request.path_and_query());
    let method = request.method().clone();

    debug!(method = %method, uri = %uri, "sending S3 request");

    let response = transport
        .send(HttpRequest {
            method: method.clone(),
            uri,
            headers: request.headers().clone(),
            body: request.body().clone(),
        })
        .await?;

    debug!(method = %method, path = request.path(), status = %response.status, "S3 response");

    if !response.status.is_success() {
        return Err(error_from_response(&response));
    }

    let body = match kind {
        BodyKind::Raw => ResponseBody::Raw(response.body),
        BodyKind::Xml if response.body.is_empty() => ResponseBody::Empty,
        BodyKind::Xml => ResponseBody::Xml(xml::parse(&response.body)?.value),
    };

    Ok(S3Response {
        status: response.status,
        headers: response.headers,
        body,
    })
}

fn error_from_response(response: &HttpResponse) -> S3Error {
    let parsed = xml::parse(&response.body)
        .ok()
        .filter(|doc| doc.name == "Error");

    match parsed {
        Some(doc) => S3Error::S3Response {
            status: response.status,
            code: doc.value.text("Code").map(str::to_string),
            message: doc.value.text("Message").unwrap_or_default().to_string(),
        },
        None => S3Error::S3Response {
            status: response.status,
            code: None,
            message: String::from_utf8_lossy(&response.body).to_string(),
        },
    }
}
