//! Single-shot local HTTP listener for the OAuth redirect.
//!
//! The listener binds a loopback port, answers exactly one request and then
//! shuts down. A request carrying a `code` query parameter writes that code
//! into the oneshot channel handed over at construction time and receives a
//! plain-text confirmation. Anything else gets an empty 400 and leaves the
//! channel untouched.
//!
//! # Example
//!
//! ```ignore
//! use pyferry::oauth::callback::{CallbackListener, DEFAULT_CALLBACK_PORT};
//! use tokio::sync::oneshot;
//!
//! let (tx, mut rx) = oneshot::channel();
//! let listener = CallbackListener::bind(DEFAULT_CALLBACK_PORT, tx).await?;
//! let handle = tokio::spawn(listener.serve_one());
//! // ... send the user to the authorization URL ...
//! handle.await??;
//! let code = rx.try_recv().ok();
//! ```

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::{
    Router,
    extract::{RawQuery, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use tokio::net::TcpListener;
use tokio::sync::oneshot;

use super::error::OAuthError;

/// Default port for the OAuth callback listener.
pub const DEFAULT_CALLBACK_PORT: u16 = 8000;

/// Path the identity provider redirects to.
pub const CALLBACK_PATH: &str = "/callback";

/// Body returned to the browser once a code has been captured.
pub const SUCCESS_BODY: &str = "Authorization successful. You can close this tab.";

/// Build the redirect URI for a callback listener on `port`.
pub fn redirect_uri(port: u16) -> String {
    format!("http://localhost:{}{}", port, CALLBACK_PATH)
}

/// Shared state for the request handlers.
struct CallbackState {
    /// Authorization state slot. Taken by the first request only.
    code_tx: Mutex<Option<oneshot::Sender<String>>>,
    /// Fired once the first request has been answered.
    done_tx: Mutex<Option<oneshot::Sender<()>>>,
}

impl CallbackState {
    /// Claim the right to answer. Returns `None` for any request after the first.
    fn claim(&self) -> Option<Option<oneshot::Sender<String>>> {
        let done = self.done_tx.lock().ok()?.take()?;
        let _ = done.send(());
        Some(self.code_tx.lock().ok().and_then(|mut slot| slot.take()))
    }
}

/// A bound, not yet serving, callback listener.
pub struct CallbackListener {
    listener: TcpListener,
    code_tx: oneshot::Sender<String>,
}

impl CallbackListener {
    /// Bind the listener on `127.0.0.1:{port}`.
    ///
    /// Port `0` picks an ephemeral port; use [`CallbackListener::local_addr`]
    /// to build the matching redirect URI.
    pub async fn bind(port: u16, code_tx: oneshot::Sender<String>) -> Result<Self, OAuthError> {
        let addr = SocketAddr::from(([127, 0, 0, 1], port));
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| OAuthError::Server(format!("Failed to bind to port {}: {}", port, e)))?;
        Ok(Self { listener, code_tx })
    }

    /// The address the listener is bound to.
    pub fn local_addr(&self) -> Result<SocketAddr, OAuthError> {
        self.listener
            .local_addr()
            .map_err(|e| OAuthError::Server(e.to_string()))
    }

    /// Serve exactly one request, then stop.
    ///
    /// There is no timeout here: callers that need one wrap the spawned task.
    pub async fn serve_one(self) -> Result<(), OAuthError> {
        let (done_tx, done_rx) = oneshot::channel();
        let state = Arc::new(CallbackState {
            code_tx: Mutex::new(Some(self.code_tx)),
            done_tx: Mutex::new(Some(done_tx)),
        });

        let app = Router::new()
            .route(CALLBACK_PATH, get(handle_callback))
            .fallback(handle_other)
            .with_state(state);

        if let Ok(addr) = self.listener.local_addr() {
            tracing::debug!("OAuth callback listener on http://{}{}", addr, CALLBACK_PATH);
        }

        axum::serve(self.listener, app)
            .with_graceful_shutdown(async {
                let _ = done_rx.await;
            })
            .await
            .map_err(|e| OAuthError::Server(format!("Server error: {}", e)))
    }
}

/// Extract the `code` query parameter, if present and non-empty.
fn code_from_query(query: Option<&str>) -> Option<String> {
    url::form_urlencoded::parse(query?.as_bytes())
        .find(|(key, _)| key == "code")
        .map(|(_, value)| value.into_owned())
        .filter(|code| !code.is_empty())
}

async fn handle_callback(
    State(state): State<Arc<CallbackState>>,
    RawQuery(query): RawQuery,
) -> Response {
    let Some(code_tx) = state.claim() else {
        return StatusCode::BAD_REQUEST.into_response();
    };

    match (code_from_query(query.as_deref()), code_tx) {
        (Some(code), Some(tx)) => {
            let _ = tx.send(code);
            tracing::debug!("Captured authorization code");
            (
                StatusCode::OK,
                [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
                SUCCESS_BODY,
            )
                .into_response()
        }
        _ => {
            tracing::warn!("OAuth callback arrived without an authorization code");
            StatusCode::BAD_REQUEST.into_response()
        }
    }
}

async fn handle_other(State(state): State<Arc<CallbackState>>) -> Response {
    let _ = state.claim();
    tracing::warn!("Unexpected request on the OAuth callback listener");
    StatusCode::BAD_REQUEST.into_response()
}
