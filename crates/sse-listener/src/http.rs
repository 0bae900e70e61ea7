//! Bundled HTTP stream opener built on `reqwest`.
//!
//! [`HttpOpener`] issues one request per open, with
//! `Accept: text/event-stream`, `Cache-Control: no-cache` and, once an id has
//! been seen, `Last-Event-ID`. [`listen`] and [`listen_request`] wire it into
//! a [`SseSession`].

use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use http::{
    HeaderMap, HeaderValue, Method,
    header::{ACCEPT, CACHE_CONTROL},
};
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::{
    error::{ListenerError, ListenerResult},
    parse::{Continuation, constants::EVENT_STREAM_MEDIA_TYPE},
    session::{ListenerConfig, OpenedStream, SseSession, StreamOpener},
};

const LAST_EVENT_ID: &str = "last-event-id";

/// Request settings for [`HttpOpener`].
#[derive(Clone, Debug)]
pub struct HttpOpenerConfig {
    /// Event stream URL.
    pub url: String,
    /// HTTP method (usually GET, some APIs use POST).
    pub method: Method,
    /// Additional HTTP headers to include with every request.
    pub headers: HeaderMap,
    /// Optional request body (for POST-based streams).
    pub body: Option<Vec<u8>>,
    /// Time allowed for connecting and receiving the response headers.
    pub connect_timeout: Duration,
}

impl Default for HttpOpenerConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            method: Method::GET,
            headers: HeaderMap::new(),
            body: None,
            connect_timeout: Duration::from_secs(10),
        }
    }
}

impl HttpOpenerConfig {
    /// Create a request configuration for the given URL.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    /// Set the HTTP method.
    #[must_use]
    pub fn method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    /// Set additional HTTP headers.
    #[must_use]
    pub fn headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    /// Set the request body.
    #[must_use]
    pub fn body(mut self, body: Vec<u8>) -> Self {
        self.body = Some(body);
        self
    }

    /// Set the connection timeout.
    #[must_use]
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error message string if any field has an invalid value.
    pub fn validate(&self) -> Result<(), String> {
        if self.url.is_empty() {
            return Err("URL cannot be empty".to_string());
        }
        if let Err(e) = reqwest::Url::parse(&self.url) {
            return Err(format!("Invalid URL {:?}: {e}", self.url));
        }
        if self.connect_timeout.is_zero() {
            return Err("Connect timeout must be > 0".to_string());
        }
        Ok(())
    }
}

/// [`StreamOpener`] that sends an HTTP request per open.
#[derive(Clone, Debug)]
pub struct HttpOpener {
    client: reqwest::Client,
    config: HttpOpenerConfig,
}

impl HttpOpener {
    /// Build an opener and its HTTP client.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the client cannot
    /// be built.
    pub fn new(config: HttpOpenerConfig) -> ListenerResult<Self> {
        config.validate().map_err(ListenerError::config)?;

        let client = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .build()
            .map_err(|e| ListenerError::config(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self { client, config })
    }

    /// The request configuration.
    pub fn config(&self) -> &HttpOpenerConfig {
        &self.config
    }

    fn request(&self, continuation: &Continuation) -> ListenerResult<reqwest::Request> {
        let mut headers = self.config.headers.clone();
        headers.insert(ACCEPT, HeaderValue::from_static(EVENT_STREAM_MEDIA_TYPE));
        headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache"));

        // Last-Event-ID for resumption.
        if !continuation.is_empty() {
            match HeaderValue::from_str(continuation.last_event_id()) {
                Ok(value) => {
                    headers.insert(LAST_EVENT_ID, value);
                }
                Err(_) => warn!(
                    last_event_id = %continuation.last_event_id(),
                    "Last event id is not a valid header value, not sent"
                ),
            }
        }

        let mut req = self
            .client
            .request(self.config.method.clone(), &self.config.url)
            .headers(headers);
        if let Some(body) = &self.config.body {
            req = req.body(body.clone());
        }

        Ok(req.build()?)
    }
}

#[async_trait]
impl StreamOpener for HttpOpener {
    async fn open(&self, continuation: &Continuation) -> ListenerResult<OpenedStream> {
        let request = self.request(continuation)?;
        debug!(method = %request.method(), url = %request.url(), "Sending SSE request");

        let resp = timeout(self.config.connect_timeout, self.client.execute(request))
            .await
            .map_err(|_| ListenerError::timeout(self.config.connect_timeout))??;

        let status = resp.status();
        let headers = resp.headers().clone();
        let body = resp
            .bytes_stream()
            .map(|chunk| chunk.map_err(ListenerError::from));

        Ok(OpenedStream::new(status, headers, body))
    }
}

/// Listen to `url` with default settings.
///
/// # Errors
///
/// Returns an error if the URL is invalid or the first open fails fatally.
pub async fn listen(url: impl Into<String>) -> ListenerResult<SseSession> {
    listen_request(HttpOpenerConfig::new(url), ListenerConfig::default()).await
}

/// Listen with a custom request and session configuration.
///
/// # Errors
///
/// Returns an error if either configuration is invalid or the first open
/// fails fatally.
pub async fn listen_request(
    request: HttpOpenerConfig,
    config: ListenerConfig,
) -> ListenerResult<SseSession> {
    let opener = HttpOpener::new(request)?;
    SseSession::start(opener, config).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = HttpOpenerConfig::default();
        assert!(config.url.is_empty());
        assert_eq!(config.method, Method::GET);
        assert!(config.headers.is_empty());
        assert!(config.body.is_none());
        assert_eq!(config.connect_timeout, Duration::from_secs(10));
    }

    #[test]
    fn test_builder_pattern() {
        let mut headers = HeaderMap::new();
        headers.insert("X-Api-Key", "test-key".parse().expect("valid header value"));

        let config = HttpOpenerConfig::new("https://example.com/stream")
            .method(Method::POST)
            .headers(headers)
            .body(b"subscribe".to_vec())
            .connect_timeout(Duration::from_secs(3));

        assert_eq!(config.url, "https://example.com/stream");
        assert_eq!(config.method, Method::POST);
        assert_eq!(
            config
                .headers
                .get("X-Api-Key")
                .map(|v| v.to_str().expect("valid str")),
            Some("test-key")
        );
        assert_eq!(config.body.as_deref(), Some(b"subscribe".as_slice()));
        assert_eq!(config.connect_timeout, Duration::from_secs(3));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation() {
        assert_eq!(
            HttpOpenerConfig::default()
                .validate()
                .expect_err("should fail"),
            "URL cannot be empty"
        );
        assert!(
            HttpOpenerConfig::new("not a url")
                .validate()
                .expect_err("should fail")
                .starts_with("Invalid URL")
        );
        assert_eq!(
            HttpOpenerConfig::new("http://localhost/")
                .connect_timeout(Duration::ZERO)
                .validate()
                .expect_err("should fail"),
            "Connect timeout must be > 0"
        );
    }

    #[test]
    fn test_invalid_config_rejected_by_opener() {
        let err = HttpOpener::new(HttpOpenerConfig::default()).expect_err("empty url");
        assert!(matches!(err, ListenerError::Config { .. }));
    }

    #[test]
    fn test_request_headers() {
        let opener = HttpOpener::new(HttpOpenerConfig::new("http://localhost/events"))
            .expect("valid config");
        assert_eq!(opener.config().url, "http://localhost/events");

        let request = opener
            .request(&Continuation::default())
            .expect("request builds");
        assert_eq!(request.method(), Method::GET);
        assert_eq!(request.headers()[ACCEPT], "text/event-stream");
        assert_eq!(request.headers()[CACHE_CONTROL], "no-cache");
        assert!(request.headers().get(LAST_EVENT_ID).is_none());

        let request = opener
            .request(&Continuation::new("42"))
            .expect("request builds");
        assert_eq!(request.headers()[LAST_EVENT_ID], "42");
    }

    #[test]
    fn test_request_custom_method_and_body() {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert("x-channel", HeaderValue::from_static("trades"));

        let opener = HttpOpener::new(
            HttpOpenerConfig::new("http://localhost/events")
                .method(Method::POST)
                .headers(headers)
                .body(b"{}".to_vec()),
        )
        .expect("valid config");

        let request = opener
            .request(&Continuation::default())
            .expect("request builds");
        assert_eq!(request.method(), Method::POST);
        assert_eq!(request.headers()["x-channel"], "trades");
        // The event-stream Accept header always wins.
        assert_eq!(request.headers()[ACCEPT], "text/event-stream");
        assert_eq!(
            request.body().and_then(reqwest::Body::as_bytes),
            Some(b"{}".as_slice())
        );
    }

    #[test]
    fn test_unprintable_last_event_id_is_skipped() {
        let opener = HttpOpener::new(HttpOpenerConfig::new("http://localhost/events"))
            .expect("valid config");
        let request = opener
            .request(&Continuation::new("bad\u{7f}id"))
            .expect("request builds");
        assert!(request.headers().get(LAST_EVENT_ID).is_none());
    }
}
