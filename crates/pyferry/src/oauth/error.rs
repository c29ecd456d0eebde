//! OAuth error types.

use thiserror::Error;

use crate::http::HttpError;

/// Errors that can occur during the authorization-code flow.
#[derive(Debug, Error)]
pub enum OAuthError {
    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    Http(#[from] HttpError),

    /// Failed to parse a response from the identity provider.
    #[error("Failed to parse response: {0}")]
    Parse(String),

    /// The callback did not arrive within the configured timeout.
    #[error("Authorization expired. Please try again.")]
    Expired,

    /// The callback request carried no authorization code.
    #[error("Failed to capture authorization code")]
    MissingCode,

    /// The token endpoint rejected the authorization code.
    #[error("Failed to authenticate with GitLab ({status}): {message}")]
    TokenExchange { status: u16, message: String },

    /// The identity endpoint rejected the access token.
    #[error("Failed to fetch user information ({status}): {message}")]
    UserLookup { status: u16, message: String },

    /// The callback listener failed.
    #[error("Callback server error: {0}")]
    Server(String),

    /// OAuth configuration error.
    #[error("OAuth configuration error: {0}")]
    Configuration(String),
}
