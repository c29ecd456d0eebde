//! Uploading distribution files to a PyPI-compatible registry.
//!
//! GitLab implements the legacy PyPI upload API (the one `twine` speaks):
//! a multipart POST to `/projects/{id}/packages/pypi` authenticated with
//! HTTP basic auth.

use std::fmt;
use std::path::Path;
use std::time::Duration as StdDuration;

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::gitlab::Package;
use crate::gitlab::error::short_body;

/// Upload timeout. Distribution files can be large.
pub const UPLOAD_TIMEOUT: StdDuration = StdDuration::from_secs(300);

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Upload request failed: {0}")]
    Http(String),

    #[error("File already exists: {filename}")]
    AlreadyExists { filename: String },

    #[error("Upload rejected ({status}): {message}")]
    Rejected { status: u16, message: String },
}

/// Where and as whom to upload.
#[derive(Clone)]
pub struct UploadTarget {
    /// Legacy upload endpoint, e.g. `{server}/api/v4/projects/{id}/packages/pypi`.
    pub url: String,
    pub username: String,
    pub token: String,
}

impl fmt::Debug for UploadTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadTarget")
            .field("url", &self.url)
            .field("username", &self.username)
            .field("token", &"[REDACTED]")
            .finish()
    }
}

/// Uploads one distribution file.
#[async_trait]
pub trait PackageUploader: Send + Sync {
    async fn upload(
        &self,
        target: &UploadTarget,
        path: &Path,
        package: &Package,
    ) -> Result<(), UploadError>;
}

/// `filetype` form value for a distribution file.
pub fn filetype(filename: &str) -> &'static str {
    if filename.ends_with(".whl") {
        "bdist_wheel"
    } else {
        "sdist"
    }
}

/// `pyversion` form value: the python tag of a wheel, `source` otherwise.
pub fn pyversion(filename: &str) -> String {
    filename
        .strip_suffix(".whl")
        .and_then(|stem| {
            let parts: Vec<&str> = stem.split('-').collect();
            (parts.len() >= 5).then(|| parts[parts.len() - 3].to_string())
        })
        .unwrap_or_else(|| "source".to_string())
}

/// Hex-encoded SHA-256 of `bytes`.
pub fn sha256_hex(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

/// Classify a non-2xx upload response.
pub fn classify_rejection(status: u16, body: &str, filename: &str) -> UploadError {
    let message = short_body(body);
    if matches!(status, 400 | 409) && message.to_ascii_lowercase().contains("exist") {
        UploadError::AlreadyExists {
            filename: filename.to_string(),
        }
    } else {
        UploadError::Rejected { status, message }
    }
}

/// Uploads with reqwest using the legacy multipart protocol.
#[derive(Clone)]
pub struct RegistryUploader {
    client: reqwest::Client,
}

impl RegistryUploader {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    pub fn with_timeout(timeout: StdDuration) -> Result<Self, UploadError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("pyferry/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| UploadError::Http(e.to_string()))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl PackageUploader for RegistryUploader {
    async fn upload(
        &self,
        target: &UploadTarget,
        path: &Path,
        package: &Package,
    ) -> Result<(), UploadError> {
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let bytes = tokio::fs::read(path).await.map_err(|source| UploadError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let digest = sha256_hex(&bytes);

        let content = reqwest::multipart::Part::bytes(bytes)
            .file_name(filename.clone())
            .mime_str("application/octet-stream")
            .map_err(|e| UploadError::Http(e.to_string()))?;

        let form = reqwest::multipart::Form::new()
            .text(":action", "file_upload")
            .text("protocol_version", "1")
            .text("metadata_version", "1.0")
            .text("name", package.name.clone())
            .text("version", package.version.clone())
            .text("filetype", filetype(&filename))
            .text("pyversion", pyversion(&filename))
            .text("sha256_digest", digest)
            .part("content", content);

        tracing::debug!(url = %target.url, %filename, "Uploading file");

        let response = self
            .client
            .post(&target.url)
            .basic_auth(&target.username, Some(&target.token))
            .multipart(form)
            .send()
            .await
            .map_err(|e| UploadError::Http(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        Err(classify_rejection(status.as_u16(), &body, &filename))
    }
}
