//! Canonical request construction for SigV4.
//!
//! A [`CanonicalRequest`] is built fresh for every call through a builder that is
//! consumed on `build()`, so header maps are never shared between requests. The
//! digest headers are always derived from the body that is actually sent.

use base64::Engine;
use bytes::Bytes;
use hyper::Method;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

use crate::config::StorageEndpointConfig;

/// Hex lookup table for zero-allocation percent encoding
static HEX_UPPER: &[u8; 16] = b"0123456789ABCDEF";

/// SHA-256 of zero bytes
pub const EMPTY_SHA256: &str = "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";

/// Base64 MD5 of zero bytes
pub const EMPTY_MD5_BASE64: &str = "1B2M2Y8AsgTpgAmY7PhCfg==";

pub const HEADER_HOST: &str = "host";
pub const HEADER_CONTENT_TYPE: &str = "content-type";
pub const HEADER_CONTENT_MD5: &str = "content-md5";
pub const HEADER_CONTENT_SHA256: &str = "x-amz-content-sha256";
pub const HEADER_AMZ_DATE: &str = "x-amz-date";
pub const HEADER_AMZ_ACL: &str = "x-amz-acl";
pub const HEADER_AUTHORIZATION: &str = "authorization";

/// A request in the exact shape the signature covers
#[derive(Debug, Clone)]
pub struct CanonicalRequest {
    method: Method,
    /// URI-encoded absolute path
    path: String,
    /// Raw (unencoded) query parameters, sorted by key
    query: BTreeMap<String, String>,
    /// Lower-cased header names
    headers: BTreeMap<String, String>,
    body: Bytes,
    content_sha256: String,
}

impl CanonicalRequest {
    /// Start a request against the configured root prefix
    pub fn builder(method: Method, config: &StorageEndpointConfig) -> CanonicalRequestBuilder {
        CanonicalRequestBuilder {
            method,
            host: config.host().to_string(),
            base: config.root().to_string(),
            resource: None,
            query: BTreeMap::new(),
            headers: BTreeMap::new(),
            content_type: "text/plain".to_string(),
            body: Bytes::new(),
        }
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn query(&self) -> &BTreeMap<String, String> {
        &self.query
    }

    pub fn headers(&self) -> &BTreeMap<String, String> {
        &self.headers
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(String::as_str)
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Hex SHA-256 of the body
    pub fn content_sha256(&self) -> &str {
        &self.content_sha256
    }

    /// Canonical query string. Also used verbatim on the wire so the signed and sent
    /// forms cannot drift apart.
    pub fn query_string(&self) -> String {
        let mut result = String::with_capacity(self.query.len() * 32);
        for (key, value) in &self.query {
            if !result.is_empty() {
                result.push('&');
            }
            uri_encode_into(&mut result, key, true);
            result.push('=');
            uri_encode_into(&mut result, value, true);
        }
        result
    }

    /// Path plus `?query` when there is one
    pub fn path_and_query(&self) -> String {
        let query = self.query_string();
        if query.is_empty() {
            self.path.clone()
        } else {
            format!("{}?{}", self.path, query)
        }
    }

    /// `name:value\n` for every header, in name order
    pub fn canonical_headers(&self) -> String {
        let mut result = String::with_capacity(self.headers.len() * 64);
        for (k, v) in &self.headers {
            result.push_str(k);
            result.push(':');
            result.push_str(v.trim());
            result.push('\n');
        }
        result
    }

    /// `;`-joined header names
    pub fn signed_headers(&self) -> String {
        self.headers
            .keys()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(";")
    }

    /// The full canonical request string hashed into the string to sign
    pub fn canonical_string(&self) -> String {
        format!(
            "{}\n{}\n{}\n{}\n{}\n{}",
            self.method.as_str(),
            self.path,
            self.query_string(),
            self.canonical_headers(),
            self.signed_headers(),
            self.content_sha256
        )
    }

    /// Returns a copy with one more header; used by the signer for `x-amz-date`.
    pub(crate) fn with_header(mut self, name: &str, value: String) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value);
        self
    }
}

/// Builder for [`CanonicalRequest`]
#[derive(Debug)]
pub struct CanonicalRequestBuilder {
    method: Method,
    host: String,
    base: String,
    resource: Option<String>,
    query: BTreeMap<String, String>,
    headers: BTreeMap<String, String>,
    content_type: String,
    body: Bytes,
}

impl CanonicalRequestBuilder {
    /// Address an object key under the root prefix
    pub fn resource(mut self, key: &str) -> Self {
        self.resource = Some(key.trim_start_matches('/').to_string());
        self
    }

    /// Address the bucket itself instead of the root prefix
    pub fn bucket(mut self, bucket: &str) -> Self {
        self.base = bucket.trim_matches('/').to_string();
        self
    }

    /// Add a query parameter; an empty value renders as `key=`
    pub fn query(mut self, key: &str, value: impl Into<String>) -> Self {
        self.query.insert(key.to_string(), value.into());
        self
    }

    /// Add an extra signed header
    pub fn header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
        self
    }

    pub fn content_type(mut self, content_type: &str) -> Self {
        self.content_type = content_type.to_string();
        self
    }

    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    pub fn build(self) -> CanonicalRequest {
        let mut path = String::with_capacity(self.base.len() + 64);
        path.push('/');
        uri_encode_into(&mut path, &self.base, false);
        if let Some(resource) = self.resource.as_deref().filter(|r| !r.is_empty()) {
            if !path.ends_with('/') {
                path.push('/');
            }
            uri_encode_into(&mut path, resource, false);
        }

        let content_sha256 = sha256_hex(&self.body);

        let mut headers = self.headers;
        headers.insert(HEADER_HOST.to_string(), self.host);
        headers.insert(HEADER_CONTENT_TYPE.to_string(), self.content_type);
        headers.insert(HEADER_CONTENT_MD5.to_string(), md5_base64(&self.body));
        headers.insert(HEADER_CONTENT_SHA256.to_string(), content_sha256.clone());

        CanonicalRequest {
            method: self.method,
            path,
            query: self.query,
            headers,
            body: self.body,
            content_sha256,
        }
    }
}

/// Hex SHA-256, using the fixed constant for empty input
pub fn sha256_hex(data: &[u8]) -> String {
    if data.is_empty() {
        EMPTY_SHA256.to_string()
    } else {
        hex::encode(Sha256::digest(data))
    }
}

/// Base64 of the raw 16-byte MD5 digest
pub fn md5_base64(data: &[u8]) -> String {
    let digest = md5::compute(data);
    base64::engine::general_purpose::STANDARD.encode(&digest[..])
}

/// URI encode (RFC 3986) using the hex lookup table
pub(crate) fn uri_encode_into(buf: &mut String, s: &str, encode_slash: bool) {
    for byte in s.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                buf.push(byte as char);
            }
            b'/' if !encode_slash => {
                buf.push('/');
            }
            _ => {
                buf.push('%');
                buf.push(HEX_UPPER[(byte >> 4) as usize] as char);
                buf.push(HEX_UPPER[(byte & 0xf) as usize] as char);
            }
        }
    }
}
