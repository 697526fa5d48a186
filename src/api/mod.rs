//! Typed wrappers over the service's v2 REST API.
//!
//! # Structure
//!
//! - `meta` - Bases, tables, views, columns, filters and sorts
//! - `data` - Rows and links
//! - `types` - Entity types shared by both

mod data;
mod meta;
mod types;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::http::{ApiError, Method, RequestOptions, Requester, error::INVALID_ARGUMENT};

pub use types::{Base, Column, Filter, RowCount, RowQuery, Sort, Table, View};

pub(crate) const META_PREFIX: &str = "/api/v2/meta";
pub(crate) const DATA_PREFIX: &str = "/api/v2/tables";

/// Entry point of the SDK.
///
/// Generic over [`Requester`] so it runs on an [`ApiClient`](crate::http::ApiClient)
/// in production and on a mock in tests.
pub struct Sdk<R: Requester> {
    requester: R,
}

impl<R: Requester> Sdk<R> {
    pub fn new(requester: R) -> Self {
        Self { requester }
    }

    pub fn requester(&self) -> &R {
        &self.requester
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        options: RequestOptions,
    ) -> Result<T, ApiError> {
        self.requester.request(method, path, options).await?.decode()
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.call(Method::GET, path, RequestOptions::new()).await
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Value,
    ) -> Result<T, ApiError> {
        self.call(method, path, RequestOptions::new().json(body)).await
    }
}

/// Checks that an id can be used as one path segment.
pub(crate) fn segment(id: &str) -> Result<&str, ApiError> {
    if id.is_empty() || id.contains(['/', '?', '#']) || id == "." || id == ".." {
        return Err(ApiError::generic(
            INVALID_ARGUMENT,
            format!("Invalid id: {:?}", id),
        ));
    }
    Ok(id)
}
