//! Storage configuration
//!
//! [`StorageConfig`] carries everything needed to build the backend client: bucket, endpoint,
//! credentials and region. It is read once at startup and never mutated afterwards.

use serde::{Deserialize, Serialize};

pub const DEFAULT_REGION: &str = "us-east-1";

/// Storage backend configuration.
///
/// # Example
/// ```
/// use s3s_browse::config::StorageConfig;
///
/// let config = StorageConfig::new("my-bucket")
///     .with_endpoint("http://localhost:9000")
///     .with_credentials("access", "secret");
/// assert_eq!(config.region, "us-east-1");
/// assert!(config.force_path_style);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
#[non_exhaustive]
pub struct StorageConfig {
    /// Bucket whose contents are browsed.
    pub bucket: String,

    /// Custom endpoint URL for S3-compatible services.
    pub endpoint: Option<String>,

    /// Static access key. Used only together with `secret_key`.
    pub access_key: Option<String>,

    /// Static secret key. Used only together with `access_key`.
    pub secret_key: Option<String>,

    /// Default: `us-east-1`
    pub region: String,

    /// Address buckets as `endpoint/bucket` instead of `bucket.endpoint`.
    pub force_path_style: bool,

    /// Operation timeout for backend calls, in seconds. `None` means no timeout.
    pub timeout_secs: Option<u64>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            bucket: String::new(),
            endpoint: None,
            access_key: None,
            secret_key: None,
            region: DEFAULT_REGION.to_owned(),
            force_path_style: false,
            timeout_secs: None,
        }
    }
}

impl StorageConfig {
    #[must_use]
    pub fn new(bucket: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            ..Default::default()
        }
    }

    /// Sets a custom endpoint and switches to path-style addressing.
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self.force_path_style = true;
        self
    }

    #[must_use]
    pub fn with_credentials(mut self, access_key: impl Into<String>, secret_key: impl Into<String>) -> Self {
        self.access_key = Some(access_key.into());
        self.secret_key = Some(secret_key.into());
        self
    }

    #[must_use]
    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = region.into();
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = Some(timeout_secs);
        self
    }

    /// Returns the static credentials if both halves are configured.
    #[must_use]
    pub fn static_credentials(&self) -> Option<(&str, &str)> {
        match (&self.access_key, &self.secret_key) {
            (Some(ak), Some(sk)) => Some((ak.as_str(), sk.as_str())),
            _ => None,
        }
    }
}
