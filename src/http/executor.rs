//! Single request attempt: URL building, timeout, cancellation and response
//! classification. No retries happen here.

use log::debug;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Method};
use std::collections::BTreeMap;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use url::Url;

use super::error::{ApiError, DECODE_ERROR, INVALID_ARGUMENT};
use super::request::{Body, Payload};

/// One fully resolved attempt.
pub(crate) struct Attempt<'a> {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Option<&'a Body>,
    pub timeout: Duration,
    pub cancel: Option<&'a CancellationToken>,
}

/// Joins `base_url` and `path` and appends `query` URL-encoded.
///
/// Empty query values are kept as `key=`.
pub fn build_url(
    base_url: &str,
    path: &str,
    query: &BTreeMap<String, String>,
) -> Result<Url, ApiError> {
    let joined = format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        path.trim_start_matches('/')
    );
    let mut url = Url::parse(&joined).map_err(|e| {
        ApiError::generic(INVALID_ARGUMENT, format!("Invalid request URL: {}", joined))
            .with_source(e)
    })?;

    if !query.is_empty() {
        let mut pairs = url.query_pairs_mut();
        for (key, value) in query {
            pairs.append_pair(key, value);
        }
    }

    Ok(url)
}

/// Applies request headers over `base`; a request header replaces every
/// client value with the same (case-insensitive) name.
pub fn merge_headers(base: &HeaderMap, extra: &[(String, String)]) -> Result<HeaderMap, ApiError> {
    let mut headers = base.clone();
    for (name, value) in extra {
        let name = HeaderName::from_bytes(name.as_bytes()).map_err(|e| {
            ApiError::generic(INVALID_ARGUMENT, format!("Invalid header name: {}", name))
                .with_source(e)
        })?;
        let value = HeaderValue::from_str(value).map_err(|e| {
            ApiError::generic(INVALID_ARGUMENT, format!("Invalid value for header {}", name))
                .with_source(e)
        })?;
        headers.insert(name, value);
    }
    Ok(headers)
}

/// Performs exactly one network call.
pub(crate) async fn execute(client: &Client, attempt: &Attempt<'_>) -> Result<Payload, ApiError> {
    debug!("{} {}", attempt.method, attempt.url);

    let timed = tokio::time::timeout(attempt.timeout, send(client, attempt));

    match attempt.cancel {
        Some(token) => tokio::select! {
            biased;
            _ = token.cancelled() => Err(ApiError::cancelled()),
            result = timed => result.unwrap_or_else(|_| Err(ApiError::timed_out())),
        },
        None => timed.await.unwrap_or_else(|_| Err(ApiError::timed_out())),
    }
}

async fn send(client: &Client, attempt: &Attempt<'_>) -> Result<Payload, ApiError> {
    let mut builder = client
        .request(attempt.method.clone(), attempt.url.clone())
        .headers(attempt.headers.clone());

    builder = match attempt.body {
        Some(Body::Json(value)) => builder.json(value),
        Some(Body::Bytes { content_type, data }) => builder
            .header(CONTENT_TYPE, content_type.as_str())
            .body(data.clone()),
        None => builder,
    };

    let response = builder.send().await.map_err(|e| {
        ApiError::network(format!("Failed to send request to {}", attempt.url), e)
    })?;

    let status = response.status();
    let is_json = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.to_ascii_lowercase().contains("json"));

    let body = response
        .text()
        .await
        .map_err(|e| ApiError::network("Failed to read response body", e))?;

    debug!("{} {} -> {}", attempt.method, attempt.url, status.as_u16());

    if !status.is_success() {
        return Err(ApiError::from_response(status.as_u16(), &body));
    }

    if body.is_empty() {
        return Ok(Payload::Empty);
    }

    if is_json {
        let value = serde_json::from_str(&body).map_err(|e| {
            ApiError::generic(DECODE_ERROR, "Response declared JSON but could not be parsed")
                .with_status(status.as_u16())
                .with_source(e)
        })?;
        Ok(Payload::Json(value))
    } else {
        Ok(Payload::Text(body))
    }
}
