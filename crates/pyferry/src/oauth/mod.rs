//! Shared OAuth utilities.
//!
//! - [`OAuthError`] - error type for the authorization-code flow
//! - [`callback`] - single-shot local HTTP listener that captures the code
//!
//! The GitLab-specific flow that ties these together lives in
//! [`crate::gitlab::oauth`].
//!
//! # Example
//!
//! ```ignore
//! use pyferry::gitlab::oauth::{OAuthConfig, SystemBrowser, authorize};
//! use pyferry::http::reqwest_transport::ReqwestTransport;
//!
//! let config = OAuthConfig::from_env()?;
//! let transport = ReqwestTransport::with_timeout(DEFAULT_TIMEOUT)?;
//! let user = authorize("https://gitlab.example.com", &config, &transport, &SystemBrowser).await?;
//! println!("Authenticated as {}", user.username);
//! ```

pub mod callback;
mod error;

pub use callback::{CallbackListener, DEFAULT_CALLBACK_PORT, redirect_uri};
pub use error::OAuthError;

/// Normalize a host string into a base URL with HTTPS scheme.
///
/// Accepts bare hostnames, hostnames with scheme, and URLs with trailing slashes.
///
/// # Example
///
/// ```
/// use pyferry::oauth::normalize_host;
///
/// assert_eq!(normalize_host("gitlab.com"), "https://gitlab.com");
/// assert_eq!(normalize_host("https://gitlab.com/"), "https://gitlab.com");
/// assert_eq!(normalize_host("http://localhost:3000"), "http://localhost:3000");
/// ```
pub fn normalize_host(host: &str) -> String {
    let host = host.trim().trim_end_matches('/');
    if host.starts_with("http://") || host.starts_with("https://") {
        host.to_string()
    } else {
        format!("https://{}", host)
    }
}
