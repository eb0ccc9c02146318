//! Object storage gateway.
//!
//! The HTTP layer talks to storage through [`ObjectStorage`] so tests can swap in a
//! mock; [`s3::S3Storage`] is the production implementation.

use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;

pub mod s3;

pub use s3::S3Storage;

/// Lifetime of a pre-signed PUT URL.
pub const UPLOAD_URL_TTL: Duration = Duration::from_secs(3600);
/// Lifetime of a pre-signed GET URL.
pub const DOWNLOAD_URL_TTL: Duration = Duration::from_secs(300);

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Storage bucket name is not configured")]
    BucketNotConfigured,
    #[error("Failed to sign {method} URL for `{key}`: {message}")]
    Presign {
        method: &'static str,
        key: String,
        message: String,
    },
    #[error("Failed to write object `{key}`: {message}")]
    Put { key: String, message: String },
}

#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Writes the object, overwriting any existing object with the same key.
    async fn put_object(
        &self,
        key: &str,
        body: Vec<u8>,
        content_type: &str,
    ) -> Result<(), StorageError>;

    /// Pre-signed PUT URL, valid for [`UPLOAD_URL_TTL`].
    async fn generate_upload_url(
        &self,
        key: &str,
        content_type: &str,
    ) -> Result<String, StorageError>;

    /// Pre-signed GET URL, valid for [`DOWNLOAD_URL_TTL`].
    async fn generate_download_url(&self, key: &str) -> Result<String, StorageError>;

    /// Unsigned virtual-hosted URL of the object.
    fn public_url(&self, key: &str) -> String;
}

static WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("whitespace pattern is valid"));

/// Builds `{prefix/}{timestamp_ms}-{filename}` with whitespace runs in the filename
/// replaced by `-`. Two uploads of the same file get two different keys.
pub fn build_object_key(prefix: Option<&str>, filename: &str, timestamp_ms: i64) -> String {
    let filename = WHITESPACE.replace_all(filename.trim(), "-");
    let name = format!("{timestamp_ms}-{filename}");

    match prefix.map(|p| p.trim().trim_matches('/')) {
        Some(prefix) if !prefix.is_empty() => format!("{prefix}/{name}"),
        _ => name,
    }
}
