//! HTTP transport boundary.
//!
//! Every request the library makes to a registry or identity provider goes
//! through [`HttpTransport`], so the pipelines can be exercised against an
//! in-memory transport in unit tests.

use async_trait::async_trait;
use thiserror::Error;
use tokio::io::{AsyncWrite, AsyncWriteExt};

/// Minimal HTTP method enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Post,
    Delete,
}

impl HttpMethod {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Delete => "DELETE",
        }
    }
}

/// HTTP headers represented as key/value pairs.
///
/// Header names are treated case-insensitively by helper functions.
pub type HttpHeaders = Vec<(String, String)>;

/// A minimal HTTP request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: HttpHeaders,
    pub body: Vec<u8>,
}

impl HttpRequest {
    /// Start a request with no headers and an empty body.
    #[must_use]
    pub fn new(method: HttpMethod, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: Vec::new(),
            body: Vec::new(),
        }
    }

    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Set an `application/x-www-form-urlencoded` body.
    #[must_use]
    pub fn form(mut self, fields: &[(&str, &str)]) -> Self {
        self.body = form_encode(fields).into_bytes();
        self.header("Content-Type", "application/x-www-form-urlencoded")
    }
}

/// A minimal HTTP response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: HttpHeaders,
    pub body: Vec<u8>,
}

impl HttpResponse {
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        header_get(&self.headers, name)
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Response body decoded lossily as UTF-8.
    #[must_use]
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

#[derive(Debug, Error)]
pub enum HttpError {
    #[error("http transport error: {0}")]
    Transport(String),

    #[error("no mock response registered for {method} {url}")]
    NoMockResponse { method: String, url: String },

    #[error("failed to write response body: {0}")]
    Write(#[source] std::io::Error),
}

/// Transport boundary for all HTTP I/O.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, HttpError>;

    /// Send a request and write a successful response body into `sink`.
    ///
    /// On success the returned response has an empty body. Error responses
    /// keep their body in memory and nothing is written.
    async fn send_to(
        &self,
        request: HttpRequest,
        sink: &mut (dyn AsyncWrite + Unpin + Send),
    ) -> Result<HttpResponse, HttpError> {
        let mut response = self.send(request).await?;
        if response.is_success() {
            sink.write_all(&response.body)
                .await
                .map_err(HttpError::Write)?;
            response.body.clear();
        }
        Ok(response)
    }
}

/// Get the first header value matching `name` (case-insensitive).
#[must_use]
pub fn header_get<'a>(headers: &'a HttpHeaders, name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(name))
        .map(|(_, v)| v.as_str())
}

/// Encode key/value pairs as an `application/x-www-form-urlencoded` string.
#[must_use]
pub fn form_encode(fields: &[(&str, &str)]) -> String {
    url::form_urlencoded::Serializer::new(String::new())
        .extend_pairs(fields)
        .finish()
}

pub mod reqwest_transport {
    use super::*;

    use std::time::Duration as StdDuration;

    /// Default request timeout for registry calls.
    pub const DEFAULT_TIMEOUT: StdDuration = StdDuration::from_secs(30);

    /// A real HTTP transport backed by reqwest.
    #[derive(Clone)]
    pub struct ReqwestTransport {
        client: reqwest::Client,
    }

    impl ReqwestTransport {
        pub fn new(client: reqwest::Client) -> Self {
            Self { client }
        }

        pub fn with_timeout(timeout: StdDuration) -> Result<Self, HttpError> {
            let client = reqwest::Client::builder()
                .timeout(timeout)
                .user_agent(concat!("pyferry/", env!("CARGO_PKG_VERSION")))
                .build()
                .map_err(|e| HttpError::Transport(e.to_string()))?;
            Ok(Self { client })
        }
    }

    fn transport_error(e: reqwest::Error) -> HttpError {
        HttpError::Transport(e.to_string())
    }

    impl ReqwestTransport {
        async fn execute(&self, request: HttpRequest) -> Result<reqwest::Response, HttpError> {
            let HttpRequest {
                method,
                url,
                headers,
                body,
            } = request;

            let method = reqwest::Method::from_bytes(method.as_str().as_bytes())
                .map_err(|e| HttpError::Transport(e.to_string()))?;

            let mut builder = self.client.request(method, &url);
            for (name, value) in &headers {
                builder = builder.header(name, value);
            }
            if !body.is_empty() {
                builder = builder.body(body);
            }

            builder.send().await.map_err(transport_error)
        }
    }

    // Non-UTF-8 header values are dropped rather than mangled.
    fn response_headers(resp: &reqwest::Response) -> HttpHeaders {
        resp.headers()
            .iter()
            .filter_map(|(name, value)| {
                Some((name.as_str().to_string(), value.to_str().ok()?.to_string()))
            })
            .collect()
    }

    #[async_trait]
    impl HttpTransport for ReqwestTransport {
        async fn send(&self, request: HttpRequest) -> Result<HttpResponse, HttpError> {
            let resp = self.execute(request).await?;
            let status = resp.status().as_u16();
            let headers = response_headers(&resp);
            let body = resp.bytes().await.map_err(transport_error)?.to_vec();

            Ok(HttpResponse {
                status,
                headers,
                body,
            })
        }

        async fn send_to(
            &self,
            request: HttpRequest,
            sink: &mut (dyn AsyncWrite + Unpin + Send),
        ) -> Result<HttpResponse, HttpError> {
            let mut resp = self.execute(request).await?;
            let status = resp.status().as_u16();
            let headers = response_headers(&resp);

            if !resp.status().is_success() {
                let body = resp.bytes().await.map_err(transport_error)?.to_vec();
                return Ok(HttpResponse {
                    status,
                    headers,
                    body,
                });
            }

            while let Some(chunk) = resp.chunk().await.map_err(transport_error)? {
                sink.write_all(&chunk).await.map_err(HttpError::Write)?;
            }
            sink.flush().await.map_err(HttpError::Write)?;

            Ok(HttpResponse {
                status,
                headers,
                body: Vec::new(),
            })
        }
    }
}

// ---------- Test-only mock transport ----------

#[cfg(test)]
use std::collections::{HashMap, VecDeque};
#[cfg(test)]
use std::sync::{Arc, Mutex, MutexGuard};

/// Scripted transport for unit tests.
///
/// Responses are queued per `(method, url)` and handed out in the order they
/// were pushed. Every request is recorded, matched or not.
#[cfg(test)]
#[derive(Clone, Default)]
pub struct MockTransport {
    state: Arc<Mutex<MockState>>,
}

#[cfg(test)]
#[derive(Default)]
struct MockState {
    scripted: HashMap<(HttpMethod, String), VecDeque<HttpResponse>>,
    seen: Vec<HttpRequest>,
}

#[cfg(test)]
impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Queue `response` for the next `method` request to `url`.
    pub fn push_response(&self, method: HttpMethod, url: impl Into<String>, response: HttpResponse) {
        self.state()
            .scripted
            .entry((method, url.into()))
            .or_default()
            .push_back(response);
    }

    /// Every request sent so far, in order.
    #[must_use]
    pub fn requests(&self) -> Vec<HttpRequest> {
        self.state().seen.clone()
    }

    /// Number of recorded requests with the given method.
    #[must_use]
    pub fn count(&self, method: HttpMethod) -> usize {
        self.state().seen.iter().filter(|r| r.method == method).count()
    }
}

#[cfg(test)]
#[async_trait]
impl HttpTransport for MockTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, HttpError> {
        let mut state = self.state();
        let key = (request.method, request.url.clone());
        state.seen.push(request);

        let next = state.scripted.get_mut(&key).and_then(VecDeque::pop_front);
        next.ok_or_else(|| HttpError::NoMockResponse {
            method: key.0.as_str().to_string(),
            url: key.1,
        })
    }
}

/// Build a canned response for tests.
#[cfg(test)]
pub(crate) fn response(
    status: u16,
    headers: Vec<(&str, &str)>,
    body: impl AsRef<[u8]>,
) -> HttpResponse {
    HttpResponse {
        status,
        headers: headers
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect(),
        body: body.as_ref().to_vec(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_get_is_case_insensitive_and_returns_first_match() {
        let headers: HttpHeaders = vec![
            ("X-Total-Pages".to_string(), "3".to_string()),
            ("x-total-pages".to_string(), "9".to_string()),
        ];
        assert_eq!(header_get(&headers, "x-total-pages"), Some("3"));
        assert_eq!(header_get(&headers, "X-TOTAL-PAGES"), Some("3"));
        assert_eq!(header_get(&headers, "missing"), None);
    }

    #[test]
    fn form_encode_escapes_reserved_characters() {
        let body = form_encode(&[
            ("redirect_uri", "http://localhost:8000/callback"),
            ("scope", "read_user api"),
        ]);
        assert_eq!(
            body,
            "redirect_uri=http%3A%2F%2Flocalhost%3A8000%2Fcallback&scope=read_user+api"
        );
    }

    #[test]
    fn request_form_sets_body_and_content_type() {
        let req = HttpRequest::new(HttpMethod::Post, "https://gitlab.test/oauth/token")
            .form(&[("code", "abc")]);
        assert_eq!(req.body, b"code=abc".to_vec());
        assert_eq!(
            header_get(&req.headers, "content-type"),
            Some("application/x-www-form-urlencoded")
        );
    }

    #[test]
    fn http_response_helpers() {
        let resp = response(201, vec![("Content-Type", "text/plain")], "made");
        assert!(resp.is_success());
        assert_eq!(resp.header("content-type"), Some("text/plain"));
        assert_eq!(resp.text(), "made");
        assert!(!response(404, vec![], "").is_success());
    }

    #[tokio::test]
    async fn mock_transport_returns_registered_responses_in_fifo_order() {
        let transport = MockTransport::new();
        let url = "https://gitlab.test/api";
        transport.push_response(HttpMethod::Get, url, response(200, vec![], "first"));
        transport.push_response(HttpMethod::Get, url, response(200, vec![], "second"));

        let first = transport
            .send(HttpRequest::new(HttpMethod::Get, url))
            .await
            .expect("mock response");
        let second = transport
            .send(HttpRequest::new(HttpMethod::Get, url))
            .await
            .expect("mock response");

        assert_eq!(first.text(), "first");
        assert_eq!(second.text(), "second");
        assert_eq!(transport.count(HttpMethod::Get), 2);
    }

    #[tokio::test]
    async fn mock_transport_errors_when_no_response_is_registered() {
        let transport = MockTransport::new();
        let err = transport
            .send(HttpRequest::new(
                HttpMethod::Delete,
                "https://gitlab.test/missing",
            ))
            .await
            .expect_err("missing mock should error");
        match err {
            HttpError::NoMockResponse { method, url } => {
                assert_eq!(method, "DELETE");
                assert_eq!(url, "https://gitlab.test/missing");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn send_to_writes_only_successful_bodies() {
        let transport = MockTransport::new();
        let url = "https://gitlab.test/files/a.whl";
        transport.push_response(HttpMethod::Get, url, response(200, vec![], "wheel"));
        transport.push_response(HttpMethod::Get, url, response(404, vec![], "gone"));

        let mut sink = Vec::new();
        let ok = transport
            .send_to(HttpRequest::new(HttpMethod::Get, url), &mut sink)
            .await
            .expect("mock response");
        assert!(ok.is_success());
        assert!(ok.body.is_empty());
        assert_eq!(sink, b"wheel".to_vec());

        let mut sink = Vec::new();
        let missing = transport
            .send_to(HttpRequest::new(HttpMethod::Get, url), &mut sink)
            .await
            .expect("mock response");
        assert_eq!(missing.status, 404);
        assert_eq!(missing.text(), "gone");
        assert!(sink.is_empty());
    }

    #[test]
    fn reqwest_transport_with_timeout_builds_client() {
        let transport = reqwest_transport::ReqwestTransport::with_timeout(
            std::time::Duration::from_millis(1),
        )
        .expect("reqwest transport should build");
        let _ = transport;
    }

    #[tokio::test]
    async fn reqwest_transport_returns_transport_error_for_invalid_url() {
        let transport = reqwest_transport::ReqwestTransport::new(reqwest::Client::new());
        let err = transport
            .send(HttpRequest::new(HttpMethod::Get, "not a url"))
            .await
            .expect_err("expected error");
        assert!(matches!(err, HttpError::Transport(_)));
    }
}
