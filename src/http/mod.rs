//! HTTP client module with retry logic, error classification and paging.

mod client;
pub mod error;
mod executor;
mod pager;
mod request;
mod retry;

pub use reqwest::Method;

pub use client::{ApiClient, ClientConfig, DEFAULT_TIMEOUT, Requester};
pub use error::{ApiError, ErrorKind, FieldErrors};
pub use executor::{build_url, merge_headers};
pub use pager::{DEFAULT_PAGE_SIZE, ListResult, PageInfo, Pager};
pub use request::{Body, Payload, RequestOptions};
pub use retry::{
    DEFAULT_MAX_ATTEMPTS, DEFAULT_RETRY_DELAY_MS, DEFAULT_RETRYABLE_STATUS_CODES, RetryDecision,
    RetryOptions, with_retry,
};

#[cfg(test)]
pub use client::MockRequester;
