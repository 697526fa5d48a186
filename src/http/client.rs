//! API client: merges per-call options over the client configuration and
//! drives the attempt loop.

use async_trait::async_trait;
use log::debug;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Method};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

use super::error::{ApiError, INVALID_CONFIG};
use super::executor::{Attempt, build_url, execute, merge_headers};
use super::request::{Payload, RequestOptions};
use super::retry::{RetryOptions, with_retry};

/// Default per-attempt timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(30_000);

/// Connection settings owned by an [`ApiClient`].
#[derive(Debug, Clone)]
pub struct ClientConfig {
    base_url: String,
    pub headers: HeaderMap,
    pub timeout: Duration,
    pub retry: RetryOptions,
}

impl ClientConfig {
    /// Creates a config for an absolute http(s) base URL. Trailing slashes
    /// are removed.
    pub fn new(base_url: &str) -> Result<Self, ApiError> {
        let trimmed = base_url.trim().trim_end_matches('/');
        let parsed = Url::parse(trimmed).map_err(|e| {
            ApiError::generic(INVALID_CONFIG, format!("Invalid base URL: {}", base_url))
                .with_source(e)
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ApiError::generic(
                INVALID_CONFIG,
                format!("Base URL must use http or https: {}", base_url),
            ));
        }
        if parsed.query().is_some() || parsed.fragment().is_some() {
            return Err(ApiError::generic(
                INVALID_CONFIG,
                format!("Base URL must not carry a query or fragment: {}", base_url),
            ));
        }

        Ok(Self {
            base_url: trimmed.to_string(),
            headers: HeaderMap::new(),
            timeout: DEFAULT_TIMEOUT,
            retry: RetryOptions::default(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Adds a static header sent with every request. Replaces an existing
    /// header of the same name.
    pub fn with_header(mut self, name: &str, value: &str) -> Result<Self, ApiError> {
        let name = HeaderName::from_bytes(name.as_bytes()).map_err(|e| {
            ApiError::generic(INVALID_CONFIG, format!("Invalid header name: {}", name))
                .with_source(e)
        })?;
        let value = HeaderValue::from_str(value).map_err(|e| {
            ApiError::generic(INVALID_CONFIG, format!("Invalid value for header {}", name))
                .with_source(e)
        })?;
        self.headers.insert(name, value);
        Ok(self)
    }

    /// Like [`with_header`](Self::with_header), but the value is hidden from
    /// debug output.
    pub fn with_secret_header(self, name: &str, value: &str) -> Result<Self, ApiError> {
        let mut config = self.with_header(name, value)?;
        if let Some(value) = config.headers.get_mut(name) {
            value.set_sensitive(true);
        }
        Ok(config)
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_retry(mut self, retry: RetryOptions) -> Self {
        self.retry = retry;
        self
    }
}

/// Anything that can execute a logical request against the service.
///
/// Implemented by [`ApiClient`]; the pager and the SDK are written against
/// this trait.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Requester: Send + Sync {
    async fn request(
        &self,
        method: Method,
        path: &str,
        options: RequestOptions,
    ) -> Result<Payload, ApiError>;
}

/// HTTP client for the service with retry and error classification.
///
/// Cheap to clone; clones share the connection pool and configuration.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: Client,
    config: Arc<ClientConfig>,
}

impl ApiClient {
    pub fn new(config: ClientConfig) -> Result<Self, ApiError> {
        let http = Client::builder()
            .user_agent(concat!("tablectl/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| {
                ApiError::generic(INVALID_CONFIG, "Failed to build HTTP client").with_source(e)
            })?;
        Self::with_http_client(http, config)
    }

    /// Uses an existing reqwest client, e.g. one with custom TLS settings.
    pub fn with_http_client(http: Client, config: ClientConfig) -> Result<Self, ApiError> {
        if config.timeout.is_zero() {
            return Err(ApiError::generic(INVALID_CONFIG, "Timeout must be positive"));
        }
        Ok(Self {
            http,
            config: Arc::new(config),
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Issues a request, retrying per the effective retry policy.
    ///
    /// The error returned after exhausting retries is the last attempt's.
    #[tracing::instrument(skip(self, options))]
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        options: RequestOptions,
    ) -> Result<Payload, ApiError> {
        let url = build_url(&self.config.base_url, path, &options.query)?;
        let headers = merge_headers(&self.config.headers, &options.headers)?;
        let retry = options.retry.as_ref().unwrap_or(&self.config.retry);
        let timeout = options.timeout.unwrap_or(self.config.timeout);
        if timeout.is_zero() {
            return Err(ApiError::generic(INVALID_CONFIG, "Timeout must be positive"));
        }
        let cancel = options.cancel.as_ref();

        if cancel.is_some_and(|token| token.is_cancelled()) {
            return Err(ApiError::cancelled());
        }

        let attempt = Attempt {
            method: method.clone(),
            url,
            headers,
            body: options.body.as_ref(),
            timeout,
            cancel,
        };

        let operation_name = format!("{} {}", method, path);
        let name = operation_name.as_str();
        let http = &self.http;
        let attempt = &attempt;
        with_retry(name, retry, cancel, move |n| {
            debug!("{}: attempt {}/{}", name, n, retry.attempt_budget());
            execute(http, attempt)
        })
        .await
    }

    /// Issues a request and deserializes the payload into `T`.
    pub async fn request_json<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        options: RequestOptions,
    ) -> Result<T, ApiError> {
        self.request(method, path, options).await?.decode()
    }
}

#[async_trait]
impl Requester for ApiClient {
    async fn request(
        &self,
        method: Method,
        path: &str,
        options: RequestOptions,
    ) -> Result<Payload, ApiError> {
        ApiClient::request(self, method, path, options).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::error::ErrorKind;
    use crate::http::executor::tests::silent_server;
    use mockito::Matcher;
    use serde_json::json;
    use tokio_util::sync::CancellationToken;

    fn client(base_url: &str, retry: RetryOptions) -> ApiClient {
        let config = ClientConfig::new(base_url).unwrap().with_retry(retry);
        ApiClient::new(config).unwrap()
    }

    #[test]
    fn test_config_trims_trailing_slashes() {
        let config = ClientConfig::new("https://example.test/api///").unwrap();
        assert_eq!(config.base_url(), "https://example.test/api");
        assert_eq!(config.timeout, Duration::from_millis(30_000));
        assert_eq!(config.retry, RetryOptions::default());
    }

    #[test]
    fn test_config_rejects_relative_and_non_http() {
        assert_eq!(ClientConfig::new("/api").unwrap_err().code(), INVALID_CONFIG);
        assert_eq!(
            ClientConfig::new("ftp://example.test").unwrap_err().code(),
            INVALID_CONFIG
        );
        assert_eq!(
            ClientConfig::new("https://example.test/api#frag")
                .unwrap_err()
                .code(),
            INVALID_CONFIG
        );
        assert_eq!(
            ClientConfig::new("https://example.test/api?k=v")
                .unwrap_err()
                .code(),
            INVALID_CONFIG
        );
    }

    #[test]
    fn test_config_headers_are_case_insensitive() {
        let config = ClientConfig::new("https://example.test")
            .unwrap()
            .with_header("X-Token", "a")
            .unwrap()
            .with_secret_header("x-token", "b")
            .unwrap();
        assert_eq!(config.headers.len(), 1);
        assert_eq!(config.headers["x-token"], "b");
        assert!(config.headers["x-token"].is_sensitive());
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let config = ClientConfig::new("https://example.test")
            .unwrap()
            .with_timeout(Duration::ZERO);
        assert_eq!(ApiClient::new(config).unwrap_err().code(), INVALID_CONFIG);
    }

    #[tokio::test]
    async fn test_zero_per_call_timeout_rejected_without_request() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/ping")
            .with_status(204)
            .expect(0)
            .create_async()
            .await;

        let err = client(&server.url(), RetryOptions::disabled())
            .request(
                Method::GET,
                "/ping",
                RequestOptions::new().timeout(Duration::ZERO),
            )
            .await
            .unwrap_err();

        assert_eq!(err.code(), INVALID_CONFIG);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_request_scenario_with_static_header() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/api/ping")
            .match_query(Matcher::UrlEncoded("a".into(), "1".into()))
            .match_header("x-token", "abc")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"ok":true}"#)
            .create_async()
            .await;

        let config = ClientConfig::new(&format!("{}/api/", server.url()))
            .unwrap()
            .with_header("x-token", "abc")
            .unwrap();
        let client = ApiClient::new(config).unwrap();

        let result = client
            .request(Method::GET, "/ping", RequestOptions::new().query("a", "1"))
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(result, Payload::Json(json!({"ok": true})));
    }

    #[tokio::test]
    async fn test_request_header_overrides_client_header() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/ping")
            .match_header("x-token", "override")
            .with_status(204)
            .create_async()
            .await;

        let config = ClientConfig::new(&server.url())
            .unwrap()
            .with_header("x-token", "abc")
            .unwrap();
        let client = ApiClient::new(config).unwrap();

        client
            .request(
                Method::GET,
                "ping",
                RequestOptions::new().header("X-Token", "override"),
            )
            .await
            .unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_retry_then_success() {
        let mut server = mockito::Server::new_async().await;
        let failing = server
            .mock("GET", "/flaky")
            .with_status(500)
            .expect(1)
            .create_async()
            .await;
        let ok = server
            .mock("GET", "/flaky")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"ok":true}"#)
            .expect(1)
            .create_async()
            .await;

        let client = client(
            &server.url(),
            RetryOptions::new(2, 0).with_status_codes([500]),
        );
        let result = client
            .request(Method::GET, "/flaky", RequestOptions::new())
            .await
            .unwrap();

        failing.assert_async().await;
        ok.assert_async().await;
        assert_eq!(result, Payload::Json(json!({"ok": true})));
    }

    #[tokio::test]
    async fn test_retry_exhausted_surfaces_last_error() {
        let mut server = mockito::Server::new_async().await;
        let first = server
            .mock("GET", "/busy")
            .with_status(503)
            .with_header("content-type", "application/json")
            .with_body(r#"{"msg": "first"}"#)
            .expect(2)
            .create_async()
            .await;
        let last = server
            .mock("GET", "/busy")
            .with_status(429)
            .with_header("content-type", "application/json")
            .with_body(r#"{"msg": "last"}"#)
            .expect(1)
            .create_async()
            .await;

        let client = client(&server.url(), RetryOptions::new(3, 0));
        let err = client
            .request(Method::GET, "/busy", RequestOptions::new())
            .await
            .unwrap_err();

        first.assert_async().await;
        last.assert_async().await;
        assert_eq!(err.status(), Some(429));
        assert_eq!(err.message(), "last");
    }

    #[tokio::test]
    async fn test_failure_streak_shorter_than_budget() {
        let mut server = mockito::Server::new_async().await;
        let failing = server
            .mock("GET", "/x")
            .with_status(502)
            .expect(2)
            .create_async()
            .await;
        let ok = server
            .mock("GET", "/x")
            .with_status(204)
            .expect(1)
            .create_async()
            .await;

        let client = client(&server.url(), RetryOptions::new(5, 0));
        let result = client
            .request(Method::GET, "/x", RequestOptions::new())
            .await
            .unwrap();

        failing.assert_async().await;
        ok.assert_async().await;
        assert!(result.is_empty());
    }

    #[tokio::test]
    async fn test_non_retryable_status_makes_one_call() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/missing")
            .with_status(404)
            .expect(1)
            .create_async()
            .await;

        let client = client(&server.url(), RetryOptions::new(5, 0));
        let err = client
            .request(Method::GET, "/missing", RequestOptions::new())
            .await
            .unwrap_err();

        mock.assert_async().await;
        assert_eq!(err.kind(), &ErrorKind::NotFound);
        assert_eq!(err.status(), Some(404));
    }

    #[tokio::test]
    async fn test_disabled_retry_makes_one_call() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/down")
            .with_status(503)
            .expect(1)
            .create_async()
            .await;

        let client = client(&server.url(), RetryOptions::disabled());
        let err = client
            .request(Method::GET, "/down", RequestOptions::new())
            .await
            .unwrap_err();

        mock.assert_async().await;
        assert_eq!(err.status(), Some(503));
    }

    #[tokio::test]
    async fn test_per_call_retry_replaces_client_policy() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/rows")
            .with_status(500)
            .expect(1)
            .create_async()
            .await;

        let client = client(&server.url(), RetryOptions::new(5, 0));
        let err = client
            .request(Method::POST, "/rows", RequestOptions::new().no_retry())
            .await
            .unwrap_err();

        mock.assert_async().await;
        assert_eq!(err.kind(), &ErrorKind::Network);
    }

    #[tokio::test]
    async fn test_per_call_status_codes_do_not_merge() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/x")
            .with_status(503)
            .expect(1)
            .create_async()
            .await;

        let client = client(&server.url(), RetryOptions::new(5, 0));
        let per_call = RetryOptions::new(5, 0).with_status_codes([500]);
        client
            .request(Method::GET, "/x", RequestOptions::new().retry(per_call))
            .await
            .unwrap_err();

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_timeout_is_retried() {
        let base = silent_server().await;
        let client = client(&base, RetryOptions::new(2, 0));

        let started = std::time::Instant::now();
        let err = client
            .request(
                Method::GET,
                "/slow",
                RequestOptions::new().timeout(Duration::from_millis(100)),
            )
            .await
            .unwrap_err();

        assert!(err.is_timeout());
        assert!(started.elapsed() >= Duration::from_millis(200));
    }

    #[tokio::test]
    async fn test_cancel_stops_retry_loop() {
        let base = silent_server().await;
        let client = client(&base, RetryOptions::new(5, 0));
        let token = CancellationToken::new();

        let canceller = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            canceller.cancel();
        });

        let started = std::time::Instant::now();
        let err = client
            .request(
                Method::GET,
                "/slow",
                RequestOptions::new()
                    .timeout(Duration::from_secs(10))
                    .cancel_with(token),
            )
            .await
            .unwrap_err();

        assert!(err.is_cancelled());
        assert_eq!(err.kind(), &ErrorKind::Network);
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_already_cancelled_makes_no_call() {
        let mut server = mockito::Server::new_async().await;
        let mock = server.mock("GET", "/x").expect(0).create_async().await;

        let token = CancellationToken::new();
        token.cancel();

        let client = client(&server.url(), RetryOptions::default());
        let err = client
            .request(Method::GET, "/x", RequestOptions::new().cancel_with(token))
            .await
            .unwrap_err();

        mock.assert_async().await;
        assert!(err.is_cancelled());
    }

    #[tokio::test]
    async fn test_request_json_decodes() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/n")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body("[1,2,3]")
            .create_async()
            .await;

        let client = client(&server.url(), RetryOptions::disabled());
        let values: Vec<u32> = client
            .request_json(Method::GET, "/n", RequestOptions::new())
            .await
            .unwrap();
        assert_eq!(values, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_client_is_shareable_across_tasks() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/ping")
            .with_status(204)
            .expect(4)
            .create_async()
            .await;

        let client = client(&server.url(), RetryOptions::disabled());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let client = client.clone();
                tokio::spawn(async move {
                    client
                        .request(Method::GET, "/ping", RequestOptions::new())
                        .await
                })
            })
            .collect();

        for handle in handles {
            assert!(handle.await.unwrap().unwrap().is_empty());
        }
        mock.assert_async().await;
    }
}
