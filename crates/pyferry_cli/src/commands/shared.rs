use std::sync::Arc;

use console::style;
use pyferry::gitlab::oauth::{SystemBrowser, authorize};
use pyferry::http::reqwest_transport::ReqwestTransport;
use pyferry::{Credential, GitLabClient, OAuthError, ProgressCallback};

use crate::config::Config;
use crate::progress::ProgressReporter;

/// Connection options gathered from flags and configuration.
pub(crate) struct Connection {
    pub(crate) server: Option<String>,
    pub(crate) token: Option<String>,
    pub(crate) user: Option<String>,
    pub(crate) sso: bool,
}

/// An authenticated registry client plus the uploading username, if any.
pub(crate) struct Session {
    pub(crate) client: GitLabClient,
    pub(crate) username: Option<String>,
}

/// Resolve a credential without touching the network.
///
/// Only the token path is handled here; SSO goes through [`open_session`].
fn static_credential(
    connection: &Connection,
    needs_user: bool,
) -> Result<Credential, &'static str> {
    let Some(token) = connection.token.clone() else {
        return Err("GitLab token is required if SSO is not used.");
    };
    if needs_user && connection.user.is_none() {
        return Err("GitLab username is required for cloning if SSO is not used.");
    }
    Ok(Credential::Token {
        token,
        username: connection.user.clone(),
    })
}

/// User-facing message for a failed browser login, keeping the cause.
fn sso_failure(error: &OAuthError) -> String {
    format!("There is a problem with SSO authentication: {}", error)
}

/// Authenticate (token or browser) and build the registry client.
pub(crate) async fn open_session(
    connection: Connection,
    config: &Config,
    needs_user: bool,
) -> Result<Session, Box<dyn std::error::Error>> {
    let Some(server) = connection.server.clone() else {
        return Err("GitLab server URL is required.".into());
    };
    let timeout = config.http_timeout();

    let credential = if connection.sso {
        let oauth = match config.oauth_config() {
            Ok(oauth) => oauth,
            Err(e) => {
                tracing::error!(error = %e, "SSO is not configured");
                return Err(format!("There is a problem with SSO authentication: {}", e).into());
            }
        };
        let transport = ReqwestTransport::with_timeout(timeout)?;

        let user = match authorize(&server, &oauth, &transport, &SystemBrowser).await {
            Ok(user) => user,
            Err(e) => {
                tracing::error!(error = %e, "SSO authentication failed");
                return Err(sso_failure(&e).into());
            }
        };
        println!(
            "{} Authenticated with SSO as {}",
            style("✓").green().bold(),
            style(&user.username).cyan()
        );
        user.into_credential()
    } else {
        static_credential(&connection, needs_user)?
    };

    let username = credential.username().map(str::to_string);
    tracing::debug!(credential = ?credential, "Opening session");
    let client = GitLabClient::with_timeout(&server, credential, timeout)?;

    Ok(Session { client, username })
}

/// Progress reporter plus the callback handed to the library.
pub(crate) fn reporter() -> (Arc<ProgressReporter>, Arc<ProgressCallback>) {
    let reporter = Arc::new(ProgressReporter::new());
    let callback = reporter.as_callback();
    (reporter, callback)
}
