//! GitLab OAuth authorization-code flow.
//!
//! The flow uses a confidential OAuth application registered on the GitLab
//! instance (client id + client secret) and a local callback listener.
//!
//! 1. Bind the callback listener and spawn it in the background
//! 2. Send the user to `{server}/oauth/authorize` in their browser
//! 3. Wait for the listener to capture the authorization code
//! 4. Exchange the code at `{server}/oauth/token`
//! 5. Resolve the username via `{server}/api/v4/user`
//!
//! # Registering an OAuth App
//!
//! 1. Go to User Settings → Applications (or Admin → Applications)
//! 2. Redirect URI: `http://localhost:8000/callback`
//! 3. Check "Confidential" and grant the `read_user` and `api` scopes
//! 4. Export the Application ID as `GITLAB_CLIENT_ID` and the secret as
//!    `GITLAB_CLIENT_SECRET`
//!
//! # Example
//!
//! ```ignore
//! use pyferry::gitlab::oauth::{OAuthConfig, SystemBrowser, authenticate};
//!
//! let config = OAuthConfig::from_env()?;
//! let Some(user) = authenticate("https://gitlab.example.com", &config, &transport, &SystemBrowser).await else {
//!     eprintln!("There is a problem with SSO authentication");
//!     std::process::exit(1);
//! };
//! ```

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::sync::oneshot;

use super::error::short_body;
use super::types::{Credential, GitLabUser};
use crate::http::{HttpMethod, HttpRequest, HttpTransport};
use crate::oauth::{CallbackListener, DEFAULT_CALLBACK_PORT, OAuthError, normalize_host, redirect_uri};

/// OAuth scopes requested from GitLab.
///
/// - `read_user` - Resolve the username for uploads
/// - `api` - List, read, upload and delete packages
pub const DEFAULT_SCOPE: &str = "read_user api";

/// Environment variable holding the OAuth application id.
pub const CLIENT_ID_ENV: &str = "GITLAB_CLIENT_ID";

/// Environment variable holding the OAuth application secret.
pub const CLIENT_SECRET_ENV: &str = "GITLAB_CLIENT_SECRET";

/// OAuth application settings.
#[derive(Clone)]
pub struct OAuthConfig {
    client_id: String,
    client_secret: String,
    callback_port: u16,
    callback_timeout: Option<Duration>,
}

impl OAuthConfig {
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            callback_port: DEFAULT_CALLBACK_PORT,
            callback_timeout: None,
        }
    }

    /// Build a configuration from optional parts.
    ///
    /// Missing or blank values are a configuration error.
    pub fn from_parts(
        client_id: Option<String>,
        client_secret: Option<String>,
    ) -> Result<Self, OAuthError> {
        let present = |value: Option<String>| value.filter(|v| !v.trim().is_empty());

        let client_id = present(client_id).ok_or_else(|| {
            OAuthError::Configuration(format!("{} is not set", CLIENT_ID_ENV))
        })?;
        let client_secret = present(client_secret).ok_or_else(|| {
            OAuthError::Configuration(format!("{} is not set", CLIENT_SECRET_ENV))
        })?;

        Ok(Self::new(client_id, client_secret))
    }

    /// Read `GITLAB_CLIENT_ID` and `GITLAB_CLIENT_SECRET` from the environment.
    pub fn from_env() -> Result<Self, OAuthError> {
        Self::from_parts(
            std::env::var(CLIENT_ID_ENV).ok(),
            std::env::var(CLIENT_SECRET_ENV).ok(),
        )
    }

    /// Port for the local callback listener. `0` picks a free port.
    pub fn with_callback_port(mut self, port: u16) -> Self {
        self.callback_port = port;
        self
    }

    /// Give up waiting for the browser redirect after `timeout`.
    pub fn with_callback_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.callback_timeout = timeout;
        self
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    pub fn callback_port(&self) -> u16 {
        self.callback_port
    }

    pub fn callback_timeout(&self) -> Option<Duration> {
        self.callback_timeout
    }
}

impl fmt::Debug for OAuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OAuthConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .field("callback_port", &self.callback_port)
            .field("callback_timeout", &self.callback_timeout)
            .finish()
    }
}

/// Successful access token response from GitLab.
#[derive(Clone, Deserialize)]
pub struct AccessTokenResponse {
    /// The OAuth access token.
    pub access_token: String,

    /// The token type (usually "Bearer").
    #[serde(default)]
    pub token_type: Option<String>,

    #[serde(default)]
    pub refresh_token: Option<String>,

    #[serde(default)]
    pub scope: Option<String>,

    /// How long until the token expires (in seconds).
    #[serde(default)]
    pub expires_in: Option<u64>,
}

impl fmt::Debug for AccessTokenResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessTokenResponse")
            .field("access_token", &"[REDACTED]")
            .field("token_type", &self.token_type)
            .field(
                "refresh_token",
                &self.refresh_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("scope", &self.scope)
            .field("expires_in", &self.expires_in)
            .finish()
    }
}

/// Result of a successful authorization: the access token and its owner.
#[derive(Clone)]
pub struct AuthenticatedUser {
    pub access_token: String,
    pub username: String,
}

impl AuthenticatedUser {
    pub fn into_credential(self) -> Credential {
        Credential::OAuth {
            access_token: self.access_token,
            username: self.username,
        }
    }
}

impl fmt::Debug for AuthenticatedUser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthenticatedUser")
            .field("access_token", &"[REDACTED]")
            .field("username", &self.username)
            .finish()
    }
}

/// Sends the user to the authorization page.
#[async_trait]
pub trait UrlOpener: Send + Sync {
    async fn open(&self, url: &str) -> Result<(), String>;
}

/// Opens URLs in the system's default browser.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemBrowser;

#[async_trait]
impl UrlOpener for SystemBrowser {
    async fn open(&self, url: &str) -> Result<(), String> {
        open::that(url).map_err(|e| e.to_string())
    }
}

/// Build the authorization URL.
pub fn build_authorize_url(server: &str, client_id: &str, redirect_uri: &str) -> String {
    format!(
        "{}/oauth/authorize?\
         client_id={}&\
         redirect_uri={}&\
         response_type=code&\
         scope={}",
        server,
        urlencoding::encode(client_id),
        urlencoding::encode(redirect_uri),
        urlencoding::encode(DEFAULT_SCOPE)
    )
}

/// Exchange an authorization code for an access token.
///
/// Anything but a 200 is a [`OAuthError::TokenExchange`].
pub async fn exchange_code(
    transport: &dyn HttpTransport,
    server: &str,
    config: &OAuthConfig,
    code: &str,
    redirect_uri: &str,
) -> Result<AccessTokenResponse, OAuthError> {
    let request = HttpRequest::new(HttpMethod::Post, format!("{}/oauth/token", server))
        .header("Accept", "application/json")
        .form(&[
            ("client_id", config.client_id.as_str()),
            ("client_secret", config.client_secret.as_str()),
            ("code", code),
            ("grant_type", "authorization_code"),
            ("redirect_uri", redirect_uri),
        ]);

    let response = transport.send(request).await?;

    if response.status != 200 {
        return Err(OAuthError::TokenExchange {
            status: response.status,
            message: short_body(&response.text()),
        });
    }

    serde_json::from_slice::<AccessTokenResponse>(&response.body)
        .map_err(|e| OAuthError::Parse(format!("Failed to parse token response: {}", e)))
}

/// Resolve the user an access token belongs to.
///
/// Anything but a 200 is a [`OAuthError::UserLookup`].
pub async fn fetch_user(
    transport: &dyn HttpTransport,
    server: &str,
    access_token: &str,
) -> Result<GitLabUser, OAuthError> {
    let request = HttpRequest::new(HttpMethod::Get, format!("{}/api/v4/user", server))
        .header("Accept", "application/json")
        .header("Authorization", format!("Bearer {}", access_token));

    let response = transport.send(request).await?;

    if response.status != 200 {
        return Err(OAuthError::UserLookup {
            status: response.status,
            message: short_body(&response.text()),
        });
    }

    serde_json::from_slice::<GitLabUser>(&response.body)
        .map_err(|e| OAuthError::Parse(format!("Failed to parse user response: {}", e)))
}

/// Perform the complete authorization-code flow.
///
/// Blocks until the browser hits the callback listener, or until the
/// configured callback timeout elapses. A callback without a code fails
/// with [`OAuthError::MissingCode`] and never contacts the token endpoint.
pub async fn authorize(
    server: &str,
    config: &OAuthConfig,
    transport: &dyn HttpTransport,
    opener: &dyn UrlOpener,
) -> Result<AuthenticatedUser, OAuthError> {
    let server = normalize_host(server);

    // Fresh state per attempt.
    let (code_tx, mut code_rx) = oneshot::channel();
    let listener = CallbackListener::bind(config.callback_port, code_tx).await?;
    let callback_uri = redirect_uri(listener.local_addr()?.port());
    let mut server_task = tokio::spawn(listener.serve_one());

    let auth_url = build_authorize_url(&server, &config.client_id, &callback_uri);
    println!("Please go to the following URL to authenticate:\n{}", auth_url);

    tracing::info!("Opening browser for authorization...");
    if let Err(e) = opener.open(&auth_url).await {
        tracing::warn!("Failed to open browser automatically: {}", e);
    }

    let joined = match config.callback_timeout {
        Some(timeout) => match tokio::time::timeout(timeout, &mut server_task).await {
            Ok(joined) => joined,
            Err(_) => {
                server_task.abort();
                return Err(OAuthError::Expired);
            }
        },
        None => server_task.await,
    };
    joined.map_err(|e| OAuthError::Server(format!("Callback task failed: {}", e)))??;

    let code = code_rx.try_recv().map_err(|_| OAuthError::MissingCode)?;

    let token = exchange_code(transport, &server, config, &code, &callback_uri).await?;
    let user = fetch_user(transport, &server, &token.access_token).await?;

    tracing::info!(username = %user.username, "Authenticated with GitLab");

    Ok(AuthenticatedUser {
        access_token: token.access_token,
        username: user.username,
    })
}

/// Run [`authorize`] and collapse every failure into `None`.
///
/// The cause is logged; callers treat `None` as the only failure signal.
pub async fn authenticate(
    server: &str,
    config: &OAuthConfig,
    transport: &dyn HttpTransport,
    opener: &dyn UrlOpener,
) -> Option<AuthenticatedUser> {
    match authorize(server, config, transport, opener).await {
        Ok(user) => Some(user),
        Err(e) => {
            tracing::error!(error = %e, "SSO authentication failed");
            None
        }
    }
}
