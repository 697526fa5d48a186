use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A base: the top-level container holding tables.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Base {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Table {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table_name: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub columns: Vec<Column>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Column {
    pub id: String,
    #[serde(default)]
    pub title: String,
    /// UI data type, e.g. `SingleLineText` or `LinkToAnotherRecord`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uidt: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct View {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Filter {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fk_column_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comparison_op: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Sort {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fk_column_id: Option<String>,
    /// `asc` or `desc`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub direction: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowCount {
    pub count: u64,
}

/// Filtering and projection for row listings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RowQuery {
    /// Filter expression, e.g. `(Status,eq,Done)`.
    pub where_clause: Option<String>,
    /// Comma separated fields, `-` prefix for descending.
    pub sort: Option<String>,
    /// Comma separated fields to return.
    pub fields: Option<String>,
    pub view_id: Option<String>,
}
