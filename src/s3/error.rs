//! Error type shared by every S3 operation

use hyper::StatusCode;
use thiserror::Error;

/// S3 client errors
#[derive(Error, Debug)]
pub enum S3Error {
    /// Missing or empty endpoint/credential settings. Never retried.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Caller input rejected before any request was built.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Internal signing invariant violated.
    #[error("Signing error: {0}")]
    Signing(String),

    #[error("HTTP error: {0}")]
    Http(#[from] hyper::http::Error),

    /// Network failure or timeout before a status line was received.
    #[error("Transport error: {0}")]
    Transport(String),

    /// Non-2xx response, with the `Code`/`Message` of the S3 error body when present.
    #[error("S3 error: {status} {} - {message}", .code.as_deref().unwrap_or("-"))]
    S3Response {
        status: StatusCode,
        code: Option<String>,
        message: String,
    },

    #[error("XML parse error: {0}")]
    XmlParse(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Listing exceeded the configured page ceiling.
    #[error("Listing stopped after {0} pages")]
    PaginationLimit(usize),

    /// A prefix delete failed after some batches were already committed.
    /// Objects from committed batches are gone; the rest are still stored.
    #[error(
        "Prefix delete aborted after {batches_committed} batches ({keys_deleted} keys deleted): {source}"
    )]
    PartialDelete {
        batches_committed: usize,
        keys_deleted: usize,
        #[source]
        source: Box<S3Error>,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("UTF-8 error: {0}")]
    Utf8(#[from] std::str::Utf8Error),
}

impl From<quick_xml::Error> for S3Error {
    fn from(err: quick_xml::Error) -> Self {
        S3Error::XmlParse(err.to_string())
    }
}

impl From<hyper_util::client::legacy::Error> for S3Error {
    fn from(err: hyper_util::client::legacy::Error) -> Self {
        S3Error::Transport(format!("Client error: {}", err))
    }
}

impl S3Error {
    /// Whether a caller-side retry could succeed.
    ///
    /// The client itself never retries; this only classifies.
    pub fn is_retryable(&self) -> bool {
        match self {
            S3Error::Transport(_) => true,
            S3Error::S3Response { status, .. } => {
                status.is_server_error() || *status == StatusCode::TOO_MANY_REQUESTS
            }
            S3Error::PartialDelete { source, .. } => source.is_retryable(),
            _ => false,
        }
    }

    /// S3 error code (`NoSuchBucket`, `AccessDenied`, ...) if the server sent one.
    pub fn code(&self) -> Option<&str> {
        match self {
            S3Error::S3Response { code, .. } => code.as_deref(),
            S3Error::PartialDelete { source, .. } => source.code(),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, S3Error>;
