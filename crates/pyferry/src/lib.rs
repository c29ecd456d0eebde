//! pyferry - manage PyPI packages in GitLab package registries.
//!
//! This library lists, inspects, mirrors, inventories and deletes the PyPI
//! packages of a GitLab project, authenticating with either an access token
//! or GitLab's OAuth authorization-code flow.
//!
//! # Example
//!
//! ```ignore
//! use pyferry::{GitLabClient, MirrorRequest, RegistryUploader, mirror_packages};
//!
//! let client = GitLabClient::new("https://gitlab.example.com", token.as_str())?;
//! let uploader = RegistryUploader::with_timeout(pyferry::upload::UPLOAD_TIMEOUT)?;
//! let request = MirrorRequest::new(&client, "group/source", "group/mirror", "alice");
//! let report = mirror_packages(&client, &uploader, &request, None).await?;
//! println!("uploaded {} files, {} failures", report.uploaded, report.failed());
//! ```

pub mod delete;
pub mod gitlab;
pub mod http;
pub mod inventory;
pub mod mirror;
pub mod oauth;
pub mod progress;
pub mod simple_index;
pub mod upload;

pub use delete::{DeleteFailure, DeleteOutcome, delete_all_packages};
pub use gitlab::{Credential, GitLabClient, GitLabError, Package, RegistryEndpoint};
pub use http::{HttpError, HttpMethod, HttpRequest, HttpResponse, HttpTransport, header_get};
pub use inventory::{DEFAULT_CSV_PATH, InventoryError, export_inventory, write_inventory};
pub use mirror::{MirrorError, MirrorReport, MirrorRequest, TransferFailure, mirror_packages};
pub use oauth::OAuthError;
pub use progress::{ProgressCallback, RegistryProgress};
pub use upload::{PackageUploader, RegistryUploader, UploadError, UploadTarget};
