//! Configuration file support for pyferry.
//!
//! Configuration is loaded with the following precedence (highest to lowest):
//! 1. CLI flags
//! 2. Environment variables (prefixed with `PYFERRY_`, sections separated by
//!    `__`, e.g., `PYFERRY_GITLAB__TOKEN`)
//! 3. Config file (./pyferry.toml, then ~/.config/pyferry/config.toml)
//! 4. Built-in defaults
//!
//! The OAuth application credentials are additionally read from
//! `GITLAB_CLIENT_ID` and `GITLAB_CLIENT_SECRET`, which win over the file.
//!
//! Example config file:
//! ```toml
//! [gitlab]
//! server = "https://gitlab.example.com"
//! token = "glpat-..."  # or use PYFERRY_GITLAB__TOKEN env var
//! user = "deploy-bot"
//!
//! [oauth]
//! client_id = "..."
//! client_secret = "..."
//! callback_port = 8000
//! callback_timeout_secs = 300  # unset waits forever
//!
//! [http]
//! timeout_secs = 30
//!
//! [export]
//! csv_path = "get-uniq-pypi-package-name-and-version.csv"
//! ```

use std::path::PathBuf;
use std::time::Duration;

use config::{Config as ConfigBuilder, Environment, File, FileFormat};
use directories::ProjectDirs;
use serde::Deserialize;

use pyferry::gitlab::oauth::{CLIENT_ID_ENV, CLIENT_SECRET_ENV, OAuthConfig};
use pyferry::oauth::DEFAULT_CALLBACK_PORT;
use pyferry::{DEFAULT_CSV_PATH, OAuthError};

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// GitLab connection settings.
    pub gitlab: GitLabConfig,
    /// OAuth application settings for `--sso`.
    pub oauth: OAuthSettings,
    /// HTTP client settings.
    pub http: HttpConfig,
    /// CSV export settings.
    pub export: ExportConfig,
}

/// GitLab configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct GitLabConfig {
    /// GitLab server URL (e.g., "https://gitlab.example.com").
    pub server: Option<String>,
    /// GitLab access token.
    pub token: Option<String>,
    /// Username used for uploads when cloning.
    pub user: Option<String>,
}

/// OAuth application configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct OAuthSettings {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    /// Port for the local callback listener.
    pub callback_port: u16,
    /// Stop waiting for the browser redirect after this many seconds.
    pub callback_timeout_secs: Option<u64>,
}

impl Default for OAuthSettings {
    fn default() -> Self {
        Self {
            client_id: None,
            client_secret: None,
            callback_port: DEFAULT_CALLBACK_PORT,
            callback_timeout_secs: None,
        }
    }
}

/// HTTP client configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Request timeout for registry calls.
    pub timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self { timeout_secs: 30 }
    }
}

/// CSV export configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Default output path for `get-csv`.
    pub csv_path: PathBuf,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            csv_path: PathBuf::from(DEFAULT_CSV_PATH),
        }
    }
}

impl Config {
    /// Load configuration using the config crate's layered approach.
    ///
    /// Sources are loaded in order (later sources override earlier):
    /// 1. Built-in defaults
    /// 2. XDG config file (~/.config/pyferry/config.toml)
    /// 3. Local config file (./pyferry.toml)
    /// 4. Environment variables with PYFERRY_ prefix
    pub fn load() -> Self {
        let mut builder = ConfigBuilder::builder();

        if let Some(xdg_config) = Self::default_config_path()
            && xdg_config.exists()
        {
            tracing::debug!("Loading config from {:?}", xdg_config);
            builder = builder.add_source(
                File::from(xdg_config)
                    .format(FileFormat::Toml)
                    .required(false),
            );
        }

        let local_config = PathBuf::from("pyferry.toml");
        if local_config.exists() {
            tracing::debug!("Loading config from ./pyferry.toml");
            builder = builder.add_source(
                File::from(local_config)
                    .format(FileFormat::Toml)
                    .required(false),
            );
        }

        // e.g., PYFERRY_OAUTH__CALLBACK_PORT -> oauth.callback_port
        builder = builder.add_source(
            Environment::with_prefix("PYFERRY")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        match builder.build() {
            Ok(settings) => match settings.try_deserialize::<Config>() {
                Ok(config) => config,
                Err(e) => {
                    tracing::warn!("Failed to deserialize config: {}", e);
                    Config::default()
                }
            },
            Err(e) => {
                tracing::warn!("Failed to build config: {}", e);
                Config::default()
            }
        }
    }

    /// Request timeout for registry calls.
    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http.timeout_secs.max(1))
    }

    /// OAuth settings, with `GITLAB_CLIENT_ID` / `GITLAB_CLIENT_SECRET`
    /// taking precedence over the config file.
    pub fn oauth_config(&self) -> Result<OAuthConfig, OAuthError> {
        self.oauth_config_with(
            std::env::var(CLIENT_ID_ENV).ok(),
            std::env::var(CLIENT_SECRET_ENV).ok(),
        )
    }

    fn oauth_config_with(
        &self,
        env_client_id: Option<String>,
        env_client_secret: Option<String>,
    ) -> Result<OAuthConfig, OAuthError> {
        let client_id = env_client_id.or_else(|| self.oauth.client_id.clone());
        let client_secret = env_client_secret.or_else(|| self.oauth.client_secret.clone());

        Ok(OAuthConfig::from_parts(client_id, client_secret)?
            .with_callback_port(self.oauth.callback_port)
            .with_callback_timeout(self.oauth.callback_timeout_secs.map(Duration::from_secs)))
    }

    /// Get the default config file path.
    pub fn default_config_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "pyferry").map(|dirs| dirs.config_dir().join("config.toml"))
    }
}
