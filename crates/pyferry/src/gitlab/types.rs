//! GitLab API data types.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A package as returned by the GitLab packages API.
///
/// Only the fields the tool needs are typed; the raw JSON is available via
/// [`crate::gitlab::GitLabClient::get_package_json`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Package {
    /// Package ID within the project.
    pub id: u64,
    /// Package name.
    pub name: String,
    /// Package version.
    pub version: String,
    /// Package type ("pypi", "npm", ...).
    #[serde(default)]
    pub package_type: String,
}

/// GitLab user information from `/api/v4/user`.
#[derive(Debug, Clone, Deserialize)]
pub struct GitLabUser {
    /// User ID.
    #[serde(default)]
    pub id: u64,
    /// Username.
    pub username: String,
    /// Display name.
    pub name: Option<String>,
}

/// A package registry endpoint: GitLab server plus project.
///
/// Project identifiers may be numeric ids or `group/project` paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryEndpoint {
    server: String,
    project: String,
}

impl RegistryEndpoint {
    pub fn new(server: &str, project: impl Into<String>) -> Self {
        Self {
            server: crate::oauth::normalize_host(server),
            project: project.into(),
        }
    }

    pub fn server(&self) -> &str {
        &self.server
    }

    /// `{server}/api/v4/projects/{project}` with the project percent-encoded.
    pub fn project_api_url(&self) -> String {
        format!(
            "{}/api/v4/projects/{}",
            self.server,
            urlencoding::encode(&self.project)
        )
    }

    /// Legacy PyPI upload endpoint for this project.
    pub fn pypi_upload_url(&self) -> String {
        format!("{}/packages/pypi", self.project_api_url())
    }
}

/// Credentials used against the registry.
///
/// Held for the lifetime of the process only.
#[derive(Clone, PartialEq, Eq)]
pub enum Credential {
    /// A personal/project access token, optionally with the username needed
    /// for uploads.
    Token {
        token: String,
        username: Option<String>,
    },
    /// An OAuth access token and the username it belongs to.
    OAuth { access_token: String, username: String },
}

impl Credential {
    pub fn token(&self) -> &str {
        match self {
            Credential::Token { token, .. } => token,
            Credential::OAuth { access_token, .. } => access_token,
        }
    }

    pub fn username(&self) -> Option<&str> {
        match self {
            Credential::Token { username, .. } => username.as_deref(),
            Credential::OAuth { username, .. } => Some(username),
        }
    }

    /// Header GitLab expects for this kind of token.
    ///
    /// Access tokens go in `PRIVATE-TOKEN`; OAuth tokens are only accepted
    /// as `Authorization: Bearer`.
    pub fn auth_header(&self) -> (&'static str, String) {
        match self {
            Credential::Token { token, .. } => ("PRIVATE-TOKEN", token.clone()),
            Credential::OAuth { access_token, .. } => {
                ("Authorization", format!("Bearer {access_token}"))
            }
        }
    }
}

impl From<&str> for Credential {
    /// An access token with no username.
    fn from(token: &str) -> Self {
        Credential::Token {
            token: token.to_string(),
            username: None,
        }
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Credential::Token { username, .. } => f
                .debug_struct("Token")
                .field("token", &"[REDACTED]")
                .field("username", username)
                .finish(),
            Credential::OAuth { username, .. } => f
                .debug_struct("OAuth")
                .field("access_token", &"[REDACTED]")
                .field("username", username)
                .finish(),
        }
    }
}
