//! Per-call request options and decoded response payloads.

use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::BTreeMap;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use super::error::{ApiError, DECODE_ERROR};
use super::retry::RetryOptions;

/// Request body sent with a call.
#[derive(Debug, Clone, PartialEq)]
pub enum Body {
    /// Serialized as JSON with `content-type: application/json`.
    Json(Value),
    /// Pre-built bytes sent as-is, e.g. a multipart form.
    Bytes { content_type: String, data: Vec<u8> },
}

/// Everything a caller can set on a single call besides method and path.
///
/// Headers are merged over the client's headers (request wins on conflict),
/// and `retry` / `timeout` replace the client-level settings for this call.
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    pub query: BTreeMap<String, String>,
    pub headers: Vec<(String, String)>,
    pub body: Option<Body>,
    pub retry: Option<RetryOptions>,
    pub timeout: Option<Duration>,
    pub cancel: Option<CancellationToken>,
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a query parameter, replacing any previous value for `key`.
    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.insert(key.into(), value.into());
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn json(mut self, body: Value) -> Self {
        self.body = Some(Body::Json(body));
        self
    }

    pub fn bytes(mut self, content_type: impl Into<String>, data: Vec<u8>) -> Self {
        self.body = Some(Body::Bytes {
            content_type: content_type.into(),
            data,
        });
        self
    }

    pub fn retry(mut self, retry: RetryOptions) -> Self {
        self.retry = Some(retry);
        self
    }

    pub fn no_retry(self) -> Self {
        self.retry(RetryOptions::disabled())
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn cancel_with(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }
}

/// Decoded body of a successful response.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// No body, e.g. 204 or HEAD.
    Empty,
    Json(Value),
    Text(String),
}

impl Payload {
    pub fn is_empty(&self) -> bool {
        matches!(self, Payload::Empty)
    }

    /// Converts into a JSON value: `Empty` becomes `null`, text becomes a
    /// JSON string.
    pub fn into_json(self) -> Value {
        match self {
            Payload::Empty => Value::Null,
            Payload::Json(value) => value,
            Payload::Text(text) => Value::String(text),
        }
    }

    /// Deserializes the payload into `T`.
    ///
    /// Text bodies are parsed as JSON first, for servers that omit the JSON
    /// content type.
    pub fn decode<T: DeserializeOwned>(self) -> Result<T, ApiError> {
        let result = match self {
            Payload::Empty => serde_json::from_value(Value::Null),
            Payload::Json(value) => serde_json::from_value(value),
            Payload::Text(text) => serde_json::from_str(&text),
        };
        result.map_err(|e| {
            ApiError::generic(DECODE_ERROR, format!("Failed to decode response: {}", e))
                .with_source(e)
        })
    }
}
