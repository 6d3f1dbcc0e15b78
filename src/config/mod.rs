use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use crate::s3::S3Error;

pub mod regions;

/// URL scheme used to reach the endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    Http,
    #[default]
    Https,
}

impl Protocol {
    pub fn as_str(&self) -> &'static str {
        match self {
            Protocol::Http => "http",
            Protocol::Https => "https",
        }
    }
}

impl FromStr for Protocol {
    type Err = S3Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "http" => Ok(Protocol::Http),
            "https" => Ok(Protocol::Https),
            other => Err(S3Error::Configuration(format!(
                "unknown protocol '{}', expected http or https",
                other
            ))),
        }
    }
}

/// Canned ACL attached as `x-amz-acl`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Acl {
    #[default]
    Private,
    PublicRead,
    PublicReadWrite,
    AuthenticatedRead,
}

impl Acl {
    pub fn as_header_value(&self) -> &'static str {
        match self {
            Acl::Private => "private",
            Acl::PublicRead => "public-read",
            Acl::PublicReadWrite => "public-read-write",
            Acl::AuthenticatedRead => "authenticated-read",
        }
    }
}

impl FromStr for Acl {
    type Err = S3Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "private" => Ok(Acl::Private),
            "public-read" => Ok(Acl::PublicRead),
            "public-read-write" => Ok(Acl::PublicReadWrite),
            "authenticated-read" => Ok(Acl::AuthenticatedRead),
            other => Err(S3Error::Configuration(format!("unknown ACL '{}'", other))),
        }
    }
}

/// Storage profile as written in a config file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    /// http or https (default: https)
    #[serde(default)]
    pub protocol: Protocol,

    /// Endpoint host, with port if not the scheme default
    pub host: String,

    /// Bucket name
    pub bucket: String,

    /// Path prefix every request is issued under (default: the bucket)
    #[serde(default)]
    pub root: String,

    /// Region used in the signing scope (default: us-east-1)
    #[serde(default = "default_region")]
    pub region: String,

    /// Default canned ACL
    #[serde(default)]
    pub acl: Acl,

    pub access_key: String,

    pub secret_key: String,
}

fn default_region() -> String {
    regions::US_EAST_1.to_string()
}

/// Validated, immutable endpoint and credential bundle.
///
/// Built once per client and only read afterwards.
#[derive(Clone, PartialEq, Eq)]
pub struct StorageEndpointConfig {
    protocol: Protocol,
    host: String,
    bucket: String,
    root: String,
    region: String,
    acl: Acl,
    access_key: String,
    secret_key: String,
}

impl StorageEndpointConfig {
    pub fn protocol(&self) -> Protocol {
        self.protocol
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Path prefix without surrounding slashes
    pub fn root(&self) -> &str {
        &self.root
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    pub fn acl(&self) -> Acl {
        self.acl
    }

    pub fn access_key(&self) -> &str {
        &self.access_key
    }

    pub fn secret_key(&self) -> &str {
        &self.secret_key
    }

    /// `{protocol}://{host}`
    pub fn base_url(&self) -> String {
        format!("{}://{}", self.protocol.as_str(), self.host)
    }
}

impl TryFrom<Profile> for StorageEndpointConfig {
    type Error = S3Error;

    fn try_from(profile: Profile) -> std::result::Result<Self, Self::Error> {
        let required = [
            ("access_key", &profile.access_key),
            ("secret_key", &profile.secret_key),
            ("host", &profile.host),
            ("bucket", &profile.bucket),
            ("region", &profile.region),
        ];
        for (name, value) in required {
            if value.trim().is_empty() {
                return Err(S3Error::Configuration(format!("{} must not be empty", name)));
            }
        }

        let host = profile
            .host
            .trim()
            .trim_start_matches("https://")
            .trim_start_matches("http://")
            .trim_end_matches('/')
            .to_string();
        if host.contains('/') {
            return Err(S3Error::Configuration(format!(
                "host '{}' must not contain a path, use root instead",
                profile.host
            )));
        }

        let root = match profile.root.trim_matches('/') {
            "" => profile.bucket.trim().to_string(),
            root => root.to_string(),
        };

        Ok(Self {
            protocol: profile.protocol,
            host,
            bucket: profile.bucket.trim().to_string(),
            root,
            region: profile.region.trim().to_string(),
            acl: profile.acl,
            access_key: profile.access_key,
            secret_key: profile.secret_key,
        })
    }
}

impl fmt::Debug for StorageEndpointConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StorageEndpointConfig")
            .field("protocol", &self.protocol)
            .field("host", &self.host)
            .field("bucket", &self.bucket)
            .field("root", &self.root)
            .field("region", &self.region)
            .field("acl", &self.acl)
            .field("access_key", &self.access_key)
            .field("secret_key", &"<redacted>")
            .finish()
    }
}

/// Client tuning knobs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientOptions {
    /// `max-keys` sent with every listing page
    #[serde(default = "default_page_size")]
    pub page_size: i32,

    /// Stop listing with an error after this many pages (default: unbounded)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_list_pages: Option<usize>,

    /// Per-request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout: u64,

    /// Skip TLS certificate verification
    #[serde(default)]
    pub insecure_tls: bool,
}

fn default_page_size() -> i32 {
    1000
}

fn default_request_timeout() -> u64 {
    300
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            max_list_pages: None,
            request_timeout: default_request_timeout(),
            insecure_tls: false,
        }
    }
}

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Named storage profiles
    #[serde(default)]
    pub profiles: HashMap<String, Profile>,

    /// Profile used when none is requested
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_profile: Option<String>,

    #[serde(default)]
    pub client: ClientOptions,
}

impl Config {
    /// Get a profile by name, or the default profile if not specified
    pub fn get_profile(&self, name: Option<&str>) -> Option<&Profile> {
        if let Some(name) = name {
            self.profiles.get(name)
        } else if let Some(default) = &self.default_profile {
            self.profiles.get(default)
        } else if self.profiles.len() == 1 {
            self.profiles.values().next()
        } else {
            None
        }
    }

    /// Resolve and validate a profile into an endpoint config
    pub fn endpoint(&self, name: Option<&str>) -> Result<StorageEndpointConfig> {
        let profile = self
            .get_profile(name)
            .ok_or_else(|| anyhow::anyhow!("No matching profile in configuration"))?;
        let endpoint = StorageEndpointConfig::try_from(profile.clone())
            .context("Invalid storage profile")?;
        Ok(endpoint)
    }
}

/// Load configuration from a YAML file
pub fn load_from_yaml<P: AsRef<Path>>(path: P) -> Result<Config> {
    let content = std::fs::read_to_string(path.as_ref())
        .context(format!("Failed to read config file: {:?}", path.as_ref()))?;

    let config: Config =
        serde_yaml::from_str(&content).context("Failed to parse YAML configuration")?;

    Ok(config)
}

/// Load configuration from environment variables
///
/// - AWS_ACCESS_KEY_ID / S3_KEY
/// - AWS_SECRET_ACCESS_KEY / S3_SECRET
/// - AWS_REGION (optional, defaults to us-east-1)
/// - S3_HOST, S3_BUCKET
/// - S3_ROOT, S3_PROTOCOL, S3_ACL, S3_PAGE_SIZE (optional)
pub fn load_from_env() -> Result<Config> {
    // A missing .env file is fine
    let _ = dotenvy::dotenv();

    let access_key = std::env::var("AWS_ACCESS_KEY_ID")
        .or_else(|_| std::env::var("S3_KEY"))
        .context("Neither AWS_ACCESS_KEY_ID nor S3_KEY environment variable is set")?;

    let secret_key = std::env::var("AWS_SECRET_ACCESS_KEY")
        .or_else(|_| std::env::var("S3_SECRET"))
        .context("Neither AWS_SECRET_ACCESS_KEY nor S3_SECRET environment variable is set")?;

    let host = std::env::var("S3_HOST").context("S3_HOST environment variable not set")?;
    let bucket = std::env::var("S3_BUCKET").context("S3_BUCKET environment variable not set")?;

    let region = std::env::var("AWS_REGION").unwrap_or_else(|_| default_region());
    let root = std::env::var("S3_ROOT").unwrap_or_default();

    let protocol = match std::env::var("S3_PROTOCOL") {
        Ok(value) => value.parse().context("Invalid S3_PROTOCOL")?,
        Err(_) => Protocol::default(),
    };
    let acl = match std::env::var("S3_ACL") {
        Ok(value) => value.parse().context("Invalid S3_ACL")?,
        Err(_) => Acl::default(),
    };

    let profile = Profile {
        protocol,
        host,
        bucket,
        root,
        region,
        acl,
        access_key,
        secret_key,
    };

    let mut config = Config::default();
    config.profiles.insert("default".to_string(), profile);
    config.default_profile = Some("default".to_string());

    if let Ok(page_size) = std::env::var("S3_PAGE_SIZE") {
        config.client.page_size = page_size.parse().context("Invalid S3_PAGE_SIZE")?;
    }

    Ok(config)
}

/// Load configuration from file or environment
///
/// Tries the YAML file when given, otherwise falls back to environment variables.
pub fn load_config(config_path: Option<&str>, profile_name: Option<&str>) -> Result<Config> {
    if let Some(path) = config_path {
        let mut config = load_from_yaml(path)?;

        if let Some(name) = profile_name {
            if !config.profiles.contains_key(name) {
                anyhow::bail!("Profile '{}' not found in config file", name);
            }
            config.default_profile = Some(name.to_string());
        }

        Ok(config)
    } else {
        load_from_env()
    }
}
