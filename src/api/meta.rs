use log::debug;
use serde_json::Value;

use super::types::{Base, Column, Filter, Sort, Table, View};
use super::{META_PREFIX, Sdk, segment};
use crate::http::{ApiError, ListResult, Method, Requester};

impl<R: Requester> Sdk<R> {
    #[tracing::instrument(skip(self))]
    pub async fn list_bases(&self) -> Result<ListResult<Base>, ApiError> {
        self.get(&format!("{}/bases", META_PREFIX)).await
    }

    #[tracing::instrument(skip(self))]
    pub async fn get_base(&self, base_id: &str) -> Result<Base, ApiError> {
        self.get(&format!("{}/bases/{}", META_PREFIX, segment(base_id)?))
            .await
    }

    #[tracing::instrument(skip(self))]
    pub async fn list_tables(&self, base_id: &str) -> Result<ListResult<Table>, ApiError> {
        self.get(&format!("{}/bases/{}/tables", META_PREFIX, segment(base_id)?))
            .await
    }

    /// Fetches a table including its columns.
    #[tracing::instrument(skip(self))]
    pub async fn get_table(&self, table_id: &str) -> Result<Table, ApiError> {
        self.get(&format!("{}/tables/{}", META_PREFIX, segment(table_id)?))
            .await
    }

    #[tracing::instrument(skip(self, body))]
    pub async fn create_table(&self, base_id: &str, body: Value) -> Result<Table, ApiError> {
        let path = format!("{}/bases/{}/tables", META_PREFIX, segment(base_id)?);
        self.send_json(Method::POST, &path, body).await
    }

    #[tracing::instrument(skip(self))]
    pub async fn delete_table(&self, table_id: &str) -> Result<Value, ApiError> {
        let path = format!("{}/tables/{}", META_PREFIX, segment(table_id)?);
        self.call(Method::DELETE, &path, Default::default()).await
    }

    #[tracing::instrument(skip(self))]
    pub async fn list_views(&self, table_id: &str) -> Result<ListResult<View>, ApiError> {
        self.get(&format!("{}/tables/{}/views", META_PREFIX, segment(table_id)?))
            .await
    }

    /// Columns come embedded in the table metadata.
    #[tracing::instrument(skip(self))]
    pub async fn list_columns(&self, table_id: &str) -> Result<Vec<Column>, ApiError> {
        let table = self.get_table(table_id).await?;
        debug!("Table {} has {} column(s)", table.id, table.columns.len());
        Ok(table.columns)
    }

    #[tracing::instrument(skip(self, body))]
    pub async fn create_column(&self, table_id: &str, body: Value) -> Result<Value, ApiError> {
        let path = format!("{}/tables/{}/columns", META_PREFIX, segment(table_id)?);
        self.send_json(Method::POST, &path, body).await
    }

    #[tracing::instrument(skip(self))]
    pub async fn delete_column(&self, column_id: &str) -> Result<Value, ApiError> {
        let path = format!("{}/columns/{}", META_PREFIX, segment(column_id)?);
        self.call(Method::DELETE, &path, Default::default()).await
    }

    #[tracing::instrument(skip(self))]
    pub async fn list_filters(&self, view_id: &str) -> Result<ListResult<Filter>, ApiError> {
        self.get(&format!("{}/views/{}/filters", META_PREFIX, segment(view_id)?))
            .await
    }

    #[tracing::instrument(skip(self, body))]
    pub async fn create_filter(&self, view_id: &str, body: Value) -> Result<Filter, ApiError> {
        let path = format!("{}/views/{}/filters", META_PREFIX, segment(view_id)?);
        self.send_json(Method::POST, &path, body).await
    }

    #[tracing::instrument(skip(self))]
    pub async fn delete_filter(&self, filter_id: &str) -> Result<Value, ApiError> {
        let path = format!("{}/filters/{}", META_PREFIX, segment(filter_id)?);
        self.call(Method::DELETE, &path, Default::default()).await
    }

    #[tracing::instrument(skip(self))]
    pub async fn list_sorts(&self, view_id: &str) -> Result<ListResult<Sort>, ApiError> {
        self.get(&format!("{}/views/{}/sorts", META_PREFIX, segment(view_id)?))
            .await
    }

    #[tracing::instrument(skip(self, body))]
    pub async fn create_sort(&self, view_id: &str, body: Value) -> Result<Sort, ApiError> {
        let path = format!("{}/views/{}/sorts", META_PREFIX, segment(view_id)?);
        self.send_json(Method::POST, &path, body).await
    }

    #[tracing::instrument(skip(self))]
    pub async fn delete_sort(&self, sort_id: &str) -> Result<Value, ApiError> {
        let path = format!("{}/sorts/{}", META_PREFIX, segment(sort_id)?);
        self.call(Method::DELETE, &path, Default::default()).await
    }
}
