//! GitLab package registry access.
//!
//! # Module Structure
//!
//! - [`error`] - Error types for GitLab API operations
//! - [`types`] - Packages, endpoints and credentials
//! - [`client`] - Package listing, lookup, download and deletion
//! - [`oauth`] - Authorization-code flow against a GitLab instance
//!
//! # Example
//!
//! ```ignore
//! use pyferry::gitlab::GitLabClient;
//!
//! let client = GitLabClient::new("https://gitlab.example.com", token.as_str())?;
//! for id in client.list_package_ids("group/project", None).await? {
//!     let package = client.get_package("group/project", id).await?;
//!     println!("{} {}", package.name, package.version);
//! }
//! ```

mod client;
pub(crate) mod error;
pub mod oauth;
mod types;

pub use error::GitLabError;

pub use types::{Credential, GitLabUser, Package, RegistryEndpoint};

pub use client::{DOWNLOAD_TIMEOUT, DownloadedFile, GitLabClient, PAGE_SIZE, TOTAL_PAGES_HEADER};

#[cfg(test)]
pub(crate) use client::test_support;
