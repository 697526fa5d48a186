use serde_json::Value;

use super::types::{RowCount, RowQuery};
use super::{DATA_PREFIX, Sdk, segment};
use crate::http::{ApiError, ListResult, Method, Pager, RequestOptions, Requester};

impl RowQuery {
    /// Adds the query's parameters to `options`.
    pub fn apply(&self, mut options: RequestOptions) -> RequestOptions {
        let params = [
            ("where", &self.where_clause),
            ("sort", &self.sort),
            ("fields", &self.fields),
            ("viewId", &self.view_id),
        ];
        for (key, value) in params {
            if let Some(value) = value {
                options = options.query(key, value.as_str());
            }
        }
        options
    }
}

impl<R: Requester> Sdk<R> {
    /// Lists one page of rows.
    #[tracing::instrument(skip(self))]
    pub async fn list_rows(
        &self,
        table_id: &str,
        query: &RowQuery,
        limit: Option<usize>,
        offset: Option<usize>,
    ) -> Result<ListResult<Value>, ApiError> {
        let path = format!("{}/{}/records", DATA_PREFIX, segment(table_id)?);
        let mut options = query.apply(RequestOptions::new());
        if let Some(limit) = limit {
            options = options.query("limit", limit.to_string());
        }
        if let Some(offset) = offset {
            options = options.query("offset", offset.to_string());
        }
        self.call(Method::GET, &path, options).await
    }

    /// Lists every row matching `query`, following pages.
    #[tracing::instrument(skip(self))]
    pub async fn list_all_rows(
        &self,
        table_id: &str,
        query: &RowQuery,
        page_size: usize,
    ) -> Result<ListResult<Value>, ApiError> {
        let path = format!("{}/{}/records", DATA_PREFIX, segment(table_id)?);
        Pager::new(self.requester())
            .page_size(page_size)
            .fetch_all(Method::GET, &path, query.apply(RequestOptions::new()))
            .await
    }

    #[tracing::instrument(skip(self))]
    pub async fn get_row(&self, table_id: &str, row_id: &str) -> Result<Value, ApiError> {
        let path = format!(
            "{}/{}/records/{}",
            DATA_PREFIX,
            segment(table_id)?,
            segment(row_id)?
        );
        self.get(&path).await
    }

    /// Creates one row (object body) or several (array body).
    #[tracing::instrument(skip(self, rows))]
    pub async fn create_rows(&self, table_id: &str, rows: Value) -> Result<Value, ApiError> {
        let path = format!("{}/{}/records", DATA_PREFIX, segment(table_id)?);
        self.send_json(Method::POST, &path, rows).await
    }

    /// Updates rows; each row carries its primary key.
    #[tracing::instrument(skip(self, rows))]
    pub async fn update_rows(&self, table_id: &str, rows: Value) -> Result<Value, ApiError> {
        let path = format!("{}/{}/records", DATA_PREFIX, segment(table_id)?);
        self.send_json(Method::PATCH, &path, rows).await
    }

    /// Deletes rows identified by their primary keys.
    #[tracing::instrument(skip(self, rows))]
    pub async fn delete_rows(&self, table_id: &str, rows: Value) -> Result<Value, ApiError> {
        let path = format!("{}/{}/records", DATA_PREFIX, segment(table_id)?);
        self.send_json(Method::DELETE, &path, rows).await
    }

    #[tracing::instrument(skip(self))]
    pub async fn count_rows(&self, table_id: &str, query: &RowQuery) -> Result<u64, ApiError> {
        let path = format!("{}/{}/records/count", DATA_PREFIX, segment(table_id)?);
        let count: RowCount = self
            .call(Method::GET, &path, query.apply(RequestOptions::new()))
            .await?;
        Ok(count.count)
    }

    fn links_path(&self, table_id: &str, link_field_id: &str, row_id: &str) -> Result<String, ApiError> {
        Ok(format!(
            "{}/{}/links/{}/records/{}",
            DATA_PREFIX,
            segment(table_id)?,
            segment(link_field_id)?,
            segment(row_id)?
        ))
    }

    /// Lists every row linked to `row_id` through `link_field_id`.
    #[tracing::instrument(skip(self))]
    pub async fn list_links(
        &self,
        table_id: &str,
        link_field_id: &str,
        row_id: &str,
        page_size: usize,
    ) -> Result<ListResult<Value>, ApiError> {
        let path = self.links_path(table_id, link_field_id, row_id)?;
        Pager::new(self.requester())
            .page_size(page_size)
            .fetch_all(Method::GET, &path, RequestOptions::new())
            .await
    }

    /// Links `targets` (`[{"Id": ..}, ..]`) to `row_id`.
    #[tracing::instrument(skip(self, targets))]
    pub async fn link_rows(
        &self,
        table_id: &str,
        link_field_id: &str,
        row_id: &str,
        targets: Value,
    ) -> Result<Value, ApiError> {
        let path = self.links_path(table_id, link_field_id, row_id)?;
        self.send_json(Method::POST, &path, targets).await
    }

    #[tracing::instrument(skip(self, targets))]
    pub async fn unlink_rows(
        &self,
        table_id: &str,
        link_field_id: &str,
        row_id: &str,
        targets: Value,
    ) -> Result<Value, ApiError> {
        let path = self.links_path(table_id, link_field_id, row_id)?;
        self.send_json(Method::DELETE, &path, targets).await
    }
}
