use anyhow::{Result, bail};
use clap::{Args, Subcommand};
use serde_json::{Value, json};

use super::context::Context;
use crate::api::{RowQuery, Sdk};
use crate::http::{DEFAULT_PAGE_SIZE, Requester};
use crate::runtime::Runtime;

/// Row filters shared by `list` and `count`.
#[derive(Args, Debug, Default)]
pub struct QueryArgs {
    /// Filter expression, e.g. "(Status,eq,Done)"
    #[arg(long = "where", value_name = "EXPR")]
    pub where_clause: Option<String>,

    /// Comma-separated sort fields, prefix with - for descending
    #[arg(long)]
    pub sort: Option<String>,

    /// Comma-separated fields to return
    #[arg(long)]
    pub fields: Option<String>,

    /// Restrict to a view's filters and sorts
    #[arg(long, value_name = "VIEW")]
    pub view: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum RowCommand {
    /// List rows of a table
    List {
        table: String,
        #[command(flatten)]
        query: QueryArgs,
        /// Page size
        #[arg(long)]
        limit: Option<usize>,
        #[arg(long)]
        offset: Option<usize>,
        /// Follow pages until every row is fetched
        #[arg(long, conflicts_with = "offset")]
        all: bool,
    },
    /// Show a row
    Get { table: String, row: String },
    /// Create rows from a JSON object or array (or @file)
    Create {
        table: String,
        #[arg(long = "data", short = 'd', value_name = "JSON")]
        data: String,
    },
    /// Update rows; each row must carry its primary key
    Update {
        table: String,
        #[arg(long = "data", short = 'd', value_name = "JSON")]
        data: String,
    },
    /// Delete rows by primary key
    Delete {
        table: String,
        /// Row ids
        #[arg(required = true)]
        rows: Vec<String>,
    },
    /// Count rows matching a filter
    Count {
        table: String,
        #[command(flatten)]
        query: QueryArgs,
    },
}

impl<R: Runtime> Context<R> {
    fn row_query(&self, args: QueryArgs) -> RowQuery {
        RowQuery {
            where_clause: args.where_clause,
            sort: args.sort,
            fields: args.fields,
            view_id: args.view.map(|view| self.resolve(&view).to_string()),
        }
    }
}

/// Turns ids into `[{"Id": ..}]`, keeping numeric ids numeric.
pub fn row_keys(ids: &[String]) -> Value {
    Value::Array(
        ids.iter()
            .map(|id| match id.parse::<u64>() {
                Ok(n) => json!({ "Id": n }),
                Err(_) => json!({ "Id": id }),
            })
            .collect(),
    )
}

#[tracing::instrument(skip(ctx, sdk))]
pub async fn run<R: Runtime, Q: Requester>(
    ctx: &Context<R>,
    sdk: &Sdk<Q>,
    command: RowCommand,
) -> Result<()> {
    match command {
        RowCommand::List {
            table,
            query,
            limit,
            offset,
            all,
        } => {
            let table = ctx.resolve(&table);
            let query = ctx.row_query(query);
            let rows = if all {
                sdk.list_all_rows(table, &query, limit.unwrap_or(DEFAULT_PAGE_SIZE))
                    .await?
            } else {
                sdk.list_rows(table, &query, limit, offset).await?
            };
            ctx.output.emit(&rows)
        }
        RowCommand::Get { table, row } => ctx.output.emit(&sdk.get_row(ctx.resolve(&table), &row).await?),
        RowCommand::Create { table, data } => {
            let rows = ctx.read_json(&data)?;
            ctx.output.emit(&sdk.create_rows(ctx.resolve(&table), rows).await?)
        }
        RowCommand::Update { table, data } => {
            let rows = ctx.read_json(&data)?;
            if !(rows.is_object() || rows.is_array()) {
                bail!("Row data must be a JSON object or array");
            }
            ctx.output.emit(&sdk.update_rows(ctx.resolve(&table), rows).await?)
        }
        RowCommand::Delete { table, rows } => {
            ctx.output
                .emit(&sdk.delete_rows(ctx.resolve(&table), row_keys(&rows)).await?)
        }
        RowCommand::Count { table, query } => {
            let count = sdk.count_rows(ctx.resolve(&table), &ctx.row_query(query)).await?;
            ctx.output.emit(&json!({ "count": count }))
        }
    }
}
