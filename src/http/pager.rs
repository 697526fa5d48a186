//! Offset/limit pagination folded into a single result.

use log::debug;
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::client::Requester;
use super::error::{ApiError, INVALID_ARGUMENT};
use super::request::RequestOptions;

/// Largest page the service hands out by default.
pub const DEFAULT_PAGE_SIZE: usize = 1000;

/// Paging metadata as reported by list endpoints.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_rows: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_size: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_first_page: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_last_page: Option<bool>,
}

impl PageInfo {
    /// Metadata for a result that holds every row: one page covering all.
    pub fn complete(total_rows: Option<u64>, count: usize) -> Self {
        Self {
            total_rows,
            page: Some(1),
            page_size: Some(count as u64),
            is_first_page: Some(true),
            is_last_page: Some(true),
        }
    }
}

/// A list envelope: `{"list": [...], "pageInfo": {...}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListResult<T> {
    pub list: Vec<T>,
    #[serde(default)]
    pub page_info: PageInfo,
}

/// Drives repeated `limit`/`offset` requests until every row is fetched.
///
/// Pages are requested strictly one after another.
pub struct Pager<'a, R: Requester + ?Sized> {
    requester: &'a R,
    page_size: usize,
}

impl<'a, R: Requester + ?Sized> Pager<'a, R> {
    pub fn new(requester: &'a R) -> Self {
        Self {
            requester,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    pub fn page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    /// Fetches all pages of a list endpoint.
    ///
    /// Other query parameters in `options` are sent unchanged with every
    /// page. Stops on a short page, once `totalRows` is reached, or on an
    /// empty page. Any failure aborts and discards what was fetched.
    #[tracing::instrument(skip(self, options))]
    pub async fn fetch_all<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        options: RequestOptions,
    ) -> Result<ListResult<T>, ApiError> {
        if self.page_size == 0 {
            return Err(ApiError::generic(
                INVALID_ARGUMENT,
                "Page size must be at least 1",
            ));
        }

        let mut rows: Vec<T> = Vec::new();
        let mut total_rows = None;
        let mut offset = 0usize;

        loop {
            let page_options = options
                .clone()
                .query("limit", self.page_size.to_string())
                .query("offset", offset.to_string());

            let page: ListResult<T> = self
                .requester
                .request(method.clone(), path, page_options)
                .await?
                .decode()?;

            let count = page.list.len();
            if page.page_info.total_rows.is_some() {
                total_rows = page.page_info.total_rows;
            }
            rows.extend(page.list);
            offset += count;

            debug!(
                "{}: fetched {} row(s) at offset {}, {} so far (total {:?})",
                path,
                count,
                offset - count,
                rows.len(),
                total_rows
            );

            if count < self.page_size {
                break;
            }
            if page
                .page_info
                .total_rows
                .is_some_and(|total| rows.len() as u64 >= total)
            {
                break;
            }
            if count == 0 {
                break;
            }
        }

        Ok(ListResult {
            page_info: PageInfo::complete(total_rows, rows.len()),
            list: rows,
        })
    }
}
