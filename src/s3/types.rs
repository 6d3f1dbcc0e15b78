//! S3 types and response structures

use serde::{Deserialize, Serialize};

use crate::s3::error::{Result, S3Error};
use crate::s3::xml::{self, XmlValue};

/// Server-side cap on keys per multi-object delete
pub const MAX_DELETE_BATCH: usize = 1000;

/// S3 Object metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct S3Object {
    /// Object key
    pub key: String,
    /// Object size in bytes
    pub size: u64,
    /// Last modified timestamp (optional)
    pub last_modified: Option<String>,
    /// ETag, quotes stripped (optional)
    pub etag: Option<String>,
    /// Storage class (STANDARD, STANDARD_IA, GLACIER, etc.)
    pub storage_class: Option<String>,
}

impl S3Object {
    /// Create a new S3Object
    pub fn new(key: String, size: u64) -> Self {
        Self {
            key,
            size,
            last_modified: None,
            etag: None,
            storage_class: None,
        }
    }

    fn from_xml(value: &XmlValue) -> Result<Self> {
        let key = value
            .text("Key")
            .ok_or_else(|| S3Error::InvalidResponse("Contents entry without Key".to_string()))?;
        let size = match value.text("Size") {
            Some(size) => size
                .trim()
                .parse()
                .map_err(|_| S3Error::InvalidResponse(format!("bad Size '{}' for {}", size, key)))?,
            None => 0,
        };
        Ok(Self {
            key: key.to_string(),
            size,
            last_modified: value.text("LastModified").map(str::to_string),
            etag: value.text("ETag").map(|e| e.trim_matches('"').to_string()),
            storage_class: value.text("StorageClass").map(str::to_string),
        })
    }
}

/// One ListObjectsV2 response
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectListingPage {
    /// Objects on this page
    pub contents: Vec<S3Object>,
    /// Number of keys the server reports for this page
    pub key_count: usize,
    /// Whether the server has more keys after this page
    pub is_truncated: bool,
    /// Token for the next page; always `None` on an empty page
    pub next_continuation_token: Option<String>,
    /// Prefix echoed by the server
    pub prefix: Option<String>,
}

impl ObjectListingPage {
    /// Build a page from a parsed `ListBucketResult`.
    ///
    /// A missing `KeyCount` falls back to the number of `Contents` entries. A page
    /// with zero keys never carries a continuation token.
    pub fn from_xml(value: &XmlValue) -> Result<Self> {
        let contents = value
            .children("Contents")
            .into_iter()
            .map(S3Object::from_xml)
            .collect::<Result<Vec<_>>>()?;

        let key_count = match value.text("KeyCount") {
            Some(count) => count.trim().parse().map_err(|_| {
                S3Error::InvalidResponse(format!("bad KeyCount '{}'", count))
            })?,
            None => contents.len(),
        };

        let next_continuation_token = value
            .text("NextContinuationToken")
            .filter(|token| !token.is_empty() && key_count > 0)
            .map(str::to_string);

        Ok(Self {
            contents,
            key_count,
            is_truncated: value.text("IsTruncated") == Some("true"),
            next_continuation_token,
            prefix: value.text("Prefix").map(str::to_string),
        })
    }

    pub fn is_empty(&self) -> bool {
        self.key_count == 0 || self.contents.is_empty()
    }

    pub fn keys(&self) -> Vec<String> {
        self.contents.iter().map(|obj| obj.key.clone()).collect()
    }
}

/// Keys for one multi-object delete request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteBatch {
    keys: Vec<String>,
    quiet: bool,
}

impl DeleteBatch {
    /// Quiet batch; 1..=1000 keys
    pub fn new(keys: Vec<String>) -> Result<Self> {
        if keys.is_empty() {
            return Err(S3Error::InvalidArgument("delete batch is empty".to_string()));
        }
        if keys.len() > MAX_DELETE_BATCH {
            return Err(S3Error::InvalidArgument(format!(
                "cannot delete more than {} objects at once, got {}",
                MAX_DELETE_BATCH,
                keys.len()
            )));
        }
        Ok(Self { keys, quiet: true })
    }

    pub fn from_page(page: &ObjectListingPage) -> Result<Self> {
        Self::new(page.keys())
    }

    /// Report every deleted key instead of only failures
    pub fn verbose(mut self) -> Self {
        self.quiet = false;
        self
    }

    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn is_quiet(&self) -> bool {
        self.quiet
    }

    /// `<Delete>` request body
    pub fn to_xml(&self) -> Result<Vec<u8>> {
        xml::write_delete_body(&self.keys, self.quiet)
    }
}

/// Response from DeleteObjects batch operation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteObjectsResponse {
    /// Successfully deleted objects (empty in quiet mode)
    pub deleted: Vec<DeletedObject>,
    /// Per-key failures
    pub errors: Vec<DeleteError>,
}

impl DeleteObjectsResponse {
    /// Create a new empty response
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from a parsed `DeleteResult`
    pub fn from_xml(value: &XmlValue) -> Self {
        let deleted = value
            .children("Deleted")
            .into_iter()
            .map(|d| DeletedObject {
                key: d.text("Key").unwrap_or_default().to_string(),
                version_id: d.text("VersionId").map(str::to_string),
                delete_marker: d.text("DeleteMarker").map(|m| m == "true"),
                delete_marker_version_id: d.text("DeleteMarkerVersionId").map(str::to_string),
            })
            .collect();

        let errors = value
            .children("Error")
            .into_iter()
            .map(|e| DeleteError {
                key: e.text("Key").unwrap_or_default().to_string(),
                code: e.text("Code").unwrap_or_default().to_string(),
                message: e.text("Message").unwrap_or_default().to_string(),
            })
            .collect();

        Self { deleted, errors }
    }
}

/// Deleted object information
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeletedObject {
    /// Object key
    pub key: String,
    /// Version ID (optional)
    pub version_id: Option<String>,
    /// Delete marker (optional)
    pub delete_marker: Option<bool>,
    /// Delete marker version ID (optional)
    pub delete_marker_version_id: Option<String>,
}

/// Delete error information
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteError {
    /// Object key
    pub key: String,
    /// Error code
    pub code: String,
    /// Error message
    pub message: String,
}
