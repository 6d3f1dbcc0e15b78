//! In-memory S3 bucket behind the `Transport` seam

#![allow(dead_code)]

use async_trait::async_trait;
use base64::Engine;
use bytes::Bytes;
use hyper::{Method, StatusCode};
use hmac::{Hmac, Mac};
use quick_xml::escape::escape;
use quick_xml::events::Event;
use quick_xml::Reader;
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex};

use s3device::config::{Acl, Profile, Protocol};
use s3device::s3::{HttpRequest, HttpResponse, Result, S3Client, Transport};
use s3device::StorageEndpointConfig;

pub const HOST: &str = "localhost:9000";
pub const BUCKET: &str = "media";
pub const REGION: &str = "us-east-1";
pub const ACCESS_KEY: &str = "minioadmin";
pub const SECRET_KEY: &str = "minioadmin";

/// A request the mock received
#[derive(Debug, Clone)]
pub struct Call {
    pub method: Method,
    pub path: String,
    pub query: BTreeMap<String, String>,
    /// Keys named in a DeleteObjects body
    pub delete_keys: Vec<String>,
    pub quiet: bool,
}

#[derive(Default)]
pub struct MockBucket {
    objects: Mutex<BTreeMap<String, Bytes>>,
    calls: Mutex<Vec<Call>>,
    /// 1-based index of the DeleteObjects call that fails with a 500
    fail_delete_batch: Option<usize>,
    /// Send a continuation token with empty listing pages
    token_on_empty_page: bool,
    /// Answer listings with these tokens in rotation
    token_cycle: Vec<String>,
    listings_served: Mutex<usize>,
    /// Keys DeleteObjects reports as AccessDenied
    refused: BTreeSet<String>,
}

impl MockBucket {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_objects<I, S>(self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        {
            let mut objects = self.objects.lock().unwrap();
            for key in keys {
                let key = key.into();
                let body = Bytes::from(format!("contents of {}", key));
                objects.insert(key, body);
            }
        }
        self
    }

    pub fn with_object(self, key: &str, body: &'static [u8]) -> Self {
        self.objects
            .lock()
            .unwrap()
            .insert(key.to_string(), Bytes::from_static(body));
        self
    }

    pub fn fail_delete_batch(mut self, n: usize) -> Self {
        self.fail_delete_batch = Some(n);
        self
    }

    pub fn token_on_empty_page(mut self) -> Self {
        self.token_on_empty_page = true;
        self
    }

    pub fn stuck_token(self, token: &str) -> Self {
        self.token_cycle(&[token])
    }

    pub fn token_cycle(mut self, tokens: &[&str]) -> Self {
        self.token_cycle = tokens.iter().map(|t| t.to_string()).collect();
        self
    }

    pub fn refuse(mut self, key: &str) -> Self {
        self.refused.insert(key.to_string());
        self
    }

    pub fn keys(&self) -> Vec<String> {
        self.objects.lock().unwrap().keys().cloned().collect()
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn list_calls(&self) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|c| c.method == Method::GET && c.query.contains_key("list-type"))
            .collect()
    }

    pub fn delete_batches(&self) -> Vec<Vec<String>> {
        self.calls()
            .into_iter()
            .filter(|c| c.method == Method::POST && c.query.contains_key("delete"))
            .map(|c| c.delete_keys)
            .collect()
    }

    fn list(&self, query: &BTreeMap<String, String>) -> HttpResponse {
        let prefix = query.get("prefix").cloned().unwrap_or_default();
        let max_keys: usize = query
            .get("max-keys")
            .and_then(|m| m.parse().ok())
            .unwrap_or(1000);
        let after = query.get("continuation-token").map(|t| decode_token(t));

        let objects = self.objects.lock().unwrap();
        let matching: Vec<(&String, &Bytes)> = objects
            .iter()
            .filter(|(key, _)| key.starts_with(&prefix))
            .filter(|(key, _)| after.as_ref().map_or(true, |after| key.as_str() > after.as_str()))
            .collect();
        let page: Vec<_> = matching.iter().take(max_keys).collect();
        let truncated = matching.len() > page.len();

        let mut xml = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>");
        xml.push_str("<ListBucketResult xmlns=\"http://s3.amazonaws.com/doc/2006-03-01/\">");
        xml.push_str(&format!("<Name>{}</Name>", BUCKET));
        xml.push_str(&format!("<Prefix>{}</Prefix>", escape(prefix.as_str())));
        xml.push_str(&format!("<KeyCount>{}</KeyCount>", page.len()));
        xml.push_str(&format!("<MaxKeys>{}</MaxKeys>", max_keys));
        xml.push_str(&format!("<IsTruncated>{}</IsTruncated>", truncated));
        for (key, body) in &page {
            xml.push_str(&format!(
                "<Contents><Key>{}</Key><LastModified>2024-05-01T12:00:00.000Z</LastModified>\
                 <ETag>&quot;{}&quot;</ETag><Size>{}</Size><StorageClass>STANDARD</StorageClass></Contents>",
                escape(key.as_str()),
                hex::encode(md5::compute(body).0),
                body.len()
            ));
        }

        let served = {
            let mut served = self.listings_served.lock().unwrap();
            *served += 1;
            *served - 1
        };
        let token = if !self.token_cycle.is_empty() {
            Some(self.token_cycle[served % self.token_cycle.len()].clone())
        } else if truncated {
            page.last().map(|(key, _)| encode_token(key))
        } else if page.is_empty() && self.token_on_empty_page {
            Some("bogus-token".to_string())
        } else {
            None
        };
        if let Some(token) = token {
            xml.push_str(&format!(
                "<NextContinuationToken>{}</NextContinuationToken>",
                escape(token.as_str())
            ));
        }
        xml.push_str("</ListBucketResult>");

        ok(xml)
    }

    fn delete_batch(&self, keys: &[String], batch_number: usize) -> HttpResponse {
        if self.fail_delete_batch == Some(batch_number) {
            return error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "InternalError",
                "We encountered an internal error. Please try again.",
            );
        }

        let mut objects = self.objects.lock().unwrap();
        let mut xml = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?><DeleteResult>");
        for key in keys {
            if self.refused.contains(key) {
                xml.push_str(&format!(
                    "<Error><Key>{}</Key><Code>AccessDenied</Code><Message>Access Denied</Message></Error>",
                    escape(key.as_str())
                ));
            } else {
                objects.remove(key);
            }
        }
        xml.push_str("</DeleteResult>");
        ok(xml)
    }
}

#[async_trait]
impl Transport for MockBucket {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        assert_eq!(request.headers["host"], HOST);
        assert_eq!(
            request.headers["x-amz-content-sha256"],
            hex::encode(Sha256::digest(&request.body))
        );
        assert_eq!(
            request.headers["content-md5"],
            base64::engine::general_purpose::STANDARD.encode(md5::compute(&request.body).0)
        );

        let rest = request
            .uri
            .strip_prefix(&format!("http://{}", HOST))
            .expect("request for another host");
        let (path, raw_query) = rest.split_once('?').unwrap_or((rest, ""));
        let query = parse_query(raw_query);

        if request.headers.get("authorization") != Some(&expected_authorization(&request, path, raw_query)) {
            return Ok(error(
                StatusCode::FORBIDDEN,
                "SignatureDoesNotMatch",
                "The request signature we calculated does not match the signature you provided.",
            ));
        }

        let root = format!("/{}", BUCKET);
        let (delete_keys, quiet) = if request.method == Method::POST {
            parse_delete_body(&request.body)
        } else {
            (Vec::new(), false)
        };

        let call = Call {
            method: request.method.clone(),
            path: path.to_string(),
            query: query.clone(),
            delete_keys: delete_keys.clone(),
            quiet,
        };
        let batch_number = {
            let mut calls = self.calls.lock().unwrap();
            calls.push(call);
            calls
                .iter()
                .filter(|c| c.method == Method::POST && c.query.contains_key("delete"))
                .count()
        };

        let response = match request.method {
            Method::GET if path == root && query.contains_key("list-type") => self.list(&query),
            Method::POST if path == root && query.contains_key("delete") => {
                assert_eq!(request.headers["content-type"], "application/xml");
                self.delete_batch(&delete_keys, batch_number)
            }
            Method::GET => match self.objects.lock().unwrap().get(object_key(path)) {
                Some(body) => HttpResponse {
                    status: StatusCode::OK,
                    headers: BTreeMap::new(),
                    body: body.clone(),
                },
                None => error(
                    StatusCode::NOT_FOUND,
                    "NoSuchKey",
                    "The specified key does not exist.",
                ),
            },
            Method::DELETE => {
                self.objects.lock().unwrap().remove(object_key(path));
                HttpResponse {
                    status: StatusCode::NO_CONTENT,
                    headers: BTreeMap::new(),
                    body: Bytes::new(),
                }
            }
            Method::PUT if path == root => ok(String::new()),
            _ => error(
                StatusCode::METHOD_NOT_ALLOWED,
                "MethodNotAllowed",
                "The specified method is not allowed against this resource.",
            ),
        };
        Ok(response)
    }
}

/// SigV4 `authorization` recomputed from what went over the wire
fn expected_authorization(request: &HttpRequest, path: &str, raw_query: &str) -> String {
    let Some(amz_date) = request.headers.get("x-amz-date") else {
        return String::new();
    };
    let date = &amz_date[..8];

    let signed: Vec<(&String, &String)> = request
        .headers
        .iter()
        .filter(|(name, _)| name.as_str() != "authorization")
        .collect();
    let canonical_headers: String = signed
        .iter()
        .map(|(name, value)| format!("{}:{}\n", name, value.trim()))
        .collect();
    let signed_headers = signed
        .iter()
        .map(|(name, _)| name.as_str())
        .collect::<Vec<_>>()
        .join(";");

    let canonical_request = format!(
        "{}\n{}\n{}\n{}\n{}\n{}",
        request.method.as_str(),
        path,
        raw_query,
        canonical_headers,
        signed_headers,
        hex::encode(Sha256::digest(&request.body))
    );
    let scope = format!("{}/{}/s3/aws4_request", date, REGION);
    let string_to_sign = format!(
        "AWS4-HMAC-SHA256\n{}\n{}\n{}",
        amz_date,
        scope,
        hex::encode(Sha256::digest(canonical_request.as_bytes()))
    );

    let mut key = hmac_sha256(format!("AWS4{}", SECRET_KEY).as_bytes(), date.as_bytes());
    for part in [REGION, "s3", "aws4_request"] {
        key = hmac_sha256(&key, part.as_bytes());
    }
    let signature = hex::encode(hmac_sha256(&key, string_to_sign.as_bytes()));

    format!(
        "AWS4-HMAC-SHA256 Credential={}/{}, SignedHeaders={}, Signature={}",
        ACCESS_KEY, scope, signed_headers, signature
    )
}

fn hmac_sha256(key: &[u8], msg: &[u8]) -> Vec<u8> {
    let mut mac = Hmac::<Sha256>::new_from_slice(key).unwrap();
    mac.update(msg);
    mac.finalize().into_bytes().to_vec()
}

fn object_key(path: &str) -> &str {
    path.trim_start_matches('/')
        .strip_prefix(BUCKET)
        .unwrap_or(path)
        .trim_start_matches('/')
}

fn encode_token(key: &str) -> String {
    format!("next:{}", key)
}

fn decode_token(token: &str) -> String {
    token.strip_prefix("next:").unwrap_or(token).to_string()
}

fn parse_query(raw: &str) -> BTreeMap<String, String> {
    raw.split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| {
            let (k, v) = pair.split_once('=').unwrap_or((pair, ""));
            (
                urlencoding::decode(k).unwrap().into_owned(),
                urlencoding::decode(v).unwrap().into_owned(),
            )
        })
        .collect()
}

fn parse_delete_body(body: &[u8]) -> (Vec<String>, bool) {
    let mut reader = Reader::from_reader(body);
    reader.config_mut().trim_text(true);

    let mut keys = Vec::new();
    let mut quiet = false;
    let mut current: Option<Vec<u8>> = None;
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf).unwrap() {
            Event::Start(e) => current = Some(e.name().as_ref().to_vec()),
            Event::Text(t) => {
                let text = t.unescape().unwrap().into_owned();
                match current.as_deref() {
                    Some(b"Key") => keys.push(text),
                    Some(b"Quiet") => quiet = text == "true",
                    _ => {}
                }
            }
            Event::End(_) => current = None,
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    (keys, quiet)
}

fn ok(body: String) -> HttpResponse {
    HttpResponse {
        status: StatusCode::OK,
        headers: BTreeMap::new(),
        body: Bytes::from(body),
    }
}

fn error(status: StatusCode, code: &str, message: &str) -> HttpResponse {
    HttpResponse {
        status,
        headers: BTreeMap::new(),
        body: Bytes::from(format!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?><Error><Code>{}</Code><Message>{}</Message>\
             <Resource>/{}</Resource></Error>",
            code, message, BUCKET
        )),
    }
}

pub fn endpoint() -> StorageEndpointConfig {
    endpoint_with_secret(SECRET_KEY)
}

pub fn endpoint_with_secret(secret_key: &str) -> StorageEndpointConfig {
    StorageEndpointConfig::try_from(Profile {
        protocol: Protocol::Http,
        host: HOST.to_string(),
        bucket: BUCKET.to_string(),
        root: String::new(),
        region: REGION.to_string(),
        acl: Acl::Private,
        access_key: ACCESS_KEY.to_string(),
        secret_key: secret_key.to_string(),
    })
    .unwrap()
}

/// Client over `mock` with the given page size
pub fn client(mock: &Arc<MockBucket>, page_size: i32) -> S3Client<Arc<MockBucket>> {
    S3Client::with_transport(endpoint(), Arc::clone(mock))
        .with_page_size(page_size)
        .unwrap()
}

/// `prefix/00000` .. `prefix/{n-1}`
pub fn numbered_keys(prefix: &str, n: usize) -> Vec<String> {
    (0..n).map(|i| format!("{}{:05}", prefix, i)).collect()
}
