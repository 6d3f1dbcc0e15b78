//! AWS Signature Version 4 signer for S3 requests
//!
//! - Pre-computed AWS4+secret_key bytes
//! - Daily signing key cache (avoids 4 HMAC operations per request)
//! - Fixed-size [u8; 32] arrays instead of Vec<u8> for HMAC results
//! - Timestamp passed in by the caller, so a request signs identically every time

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};
use std::sync::Mutex;
use tracing::trace;

use crate::config::StorageEndpointConfig;
use crate::s3::canonical::{CanonicalRequest, HEADER_AMZ_DATE, HEADER_AUTHORIZATION};
use crate::s3::error::{Result, S3Error};

type HmacSha256 = Hmac<Sha256>;

pub const ALGORITHM: &str = "AWS4-HMAC-SHA256";

const SERVICE: &str = "s3";

/// `x-amz-date` format
pub fn amz_date(timestamp: &DateTime<Utc>) -> String {
    timestamp.format("%Y%m%dT%H%M%SZ").to_string()
}

fn date_stamp(timestamp: &DateTime<Utc>) -> String {
    timestamp.format("%Y%m%d").to_string()
}

/// A canonical request plus its signature
#[derive(Debug, Clone)]
pub struct SignedRequest {
    request: CanonicalRequest,
    timestamp: DateTime<Utc>,
}

impl SignedRequest {
    pub fn request(&self) -> &CanonicalRequest {
        &self.request
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn authorization(&self) -> &str {
        self.request.header(HEADER_AUTHORIZATION).unwrap_or_default()
    }

    pub fn into_request(self) -> CanonicalRequest {
        self.request
    }
}

/// AWS Signature Version 4 signer
pub struct S3SignerV4 {
    access_key: String,
    region: String,
    /// "AWS4" + secret_key as bytes
    aws4_key: Vec<u8>,
    /// Cached signing key per day: (date_stamp, derived_key)
    cached_signing_key: Mutex<Option<(String, [u8; 32])>>,
}

impl Clone for S3SignerV4 {
    fn clone(&self) -> Self {
        Self {
            access_key: self.access_key.clone(),
            region: self.region.clone(),
            aws4_key: self.aws4_key.clone(),
            // Each clone gets its own cache (populated on first use)
            cached_signing_key: Mutex::new(None),
        }
    }
}

impl std::fmt::Debug for S3SignerV4 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("S3SignerV4")
            .field("access_key", &self.access_key)
            .field("region", &self.region)
            .finish_non_exhaustive()
    }
}

impl S3SignerV4 {
    pub fn new(access_key: &str, secret_key: &str, region: &str) -> Self {
        Self {
            access_key: access_key.to_string(),
            region: region.to_string(),
            aws4_key: format!("AWS4{}", secret_key).into_bytes(),
            cached_signing_key: Mutex::new(None),
        }
    }

    pub fn from_config(config: &StorageEndpointConfig) -> Self {
        Self::new(config.access_key(), config.secret_key(), config.region())
    }

    /// `date/region/s3/aws4_request`
    pub fn credential_scope(&self, timestamp: &DateTime<Utc>) -> String {
        format!(
            "{}/{}/{}/aws4_request",
            date_stamp(timestamp),
            self.region,
            SERVICE
        )
    }

    /// Attach `x-amz-date` and `authorization` to a canonical request.
    ///
    /// Fails if the request already carries an `x-amz-date` for a different instant.
    pub fn sign(&self, request: CanonicalRequest, timestamp: DateTime<Utc>) -> Result<SignedRequest> {
        let authorization = self.authorization(&request, &timestamp)?;
        let request = request
            .with_header(HEADER_AMZ_DATE, amz_date(&timestamp))
            .with_header(HEADER_AUTHORIZATION, authorization);
        Ok(SignedRequest { request, timestamp })
    }

    /// Compute the `authorization` header value for a request.
    ///
    /// If the request carries `x-amz-date` it must match `timestamp`; when absent the
    /// date header is signed as if present.
    pub fn authorization(
        &self,
        request: &CanonicalRequest,
        timestamp: &DateTime<Utc>,
    ) -> Result<String> {
        let amz_date = amz_date(timestamp);
        let request = match request.header(HEADER_AMZ_DATE) {
            Some(existing) if existing == amz_date => request.clone(),
            Some(existing) => {
                return Err(S3Error::Signing(format!(
                    "x-amz-date header {} does not match signing time {}",
                    existing, amz_date
                )))
            }
            None => request.clone().with_header(HEADER_AMZ_DATE, amz_date.clone()),
        };

        let canonical_request = request.canonical_string();
        let credential_scope = self.credential_scope(timestamp);
        let canonical_request_hash = hex::encode(Sha256::digest(canonical_request.as_bytes()));
        let string_to_sign = format!(
            "{}\n{}\n{}\n{}",
            ALGORITHM, amz_date, credential_scope, canonical_request_hash
        );

        trace!(
            canonical_request = %canonical_request,
            string_to_sign = %string_to_sign,
            "SigV4 inputs"
        );

        let signature = self.calculate_signature(&date_stamp(timestamp), &string_to_sign);

        Ok(format!(
            "{} Credential={}/{}, SignedHeaders={}, Signature={}",
            ALGORITHM,
            self.access_key,
            credential_scope,
            request.signed_headers(),
            signature
        ))
    }

    /// Calculate the signature with daily signing key cache
    fn calculate_signature(&self, date_stamp: &str, string_to_sign: &str) -> String {
        let signing_key = {
            let mut cache = self
                .cached_signing_key
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            match cache.as_ref() {
                Some((cached_date, cached_key)) if cached_date == date_stamp => *cached_key,
                _ => {
                    let key = self.derive_signing_key(date_stamp);
                    *cache = Some((date_stamp.to_string(), key));
                    key
                }
            }
        };

        hex::encode(Self::hmac_sha256(&signing_key, string_to_sign.as_bytes()))
    }

    /// Derive signing key from date stamp (4 chained HMAC operations)
    fn derive_signing_key(&self, date_stamp: &str) -> [u8; 32] {
        let k_date = Self::hmac_sha256(&self.aws4_key, date_stamp.as_bytes());
        let k_region = Self::hmac_sha256(&k_date, self.region.as_bytes());
        let k_service = Self::hmac_sha256(&k_region, SERVICE.as_bytes());
        Self::hmac_sha256(&k_service, b"aws4_request")
    }

    /// HMAC-SHA256 returning fixed-size array (no heap allocation)
    fn hmac_sha256(key: &[u8], msg: &[u8]) -> [u8; 32] {
        let mut mac = HmacSha256::new_from_slice(key).expect("HMAC can take key of any size");
        mac.update(msg);
        let result = mac.finalize().into_bytes();
        let mut output = [0u8; 32];
        output.copy_from_slice(&result);
        output
    }
}
