use anyhow::Result;
use clap::Subcommand;
use serde_json::{Value, json};

use super::context::{ConnectionArgs, Context};
use crate::api::Sdk;
use crate::http::Requester;
use crate::runtime::Runtime;

#[derive(Subcommand, Debug)]
pub enum BaseCommand {
    /// List bases
    List,
    /// Show a base
    Get { base: String },
}

#[derive(Subcommand, Debug)]
pub enum TableCommand {
    /// List tables of the selected base
    List,
    /// Show a table with its columns
    Get { table: String },
    /// Create a table in the selected base
    Create {
        #[arg(long)]
        title: String,
        /// Column definitions as a JSON array, or @file
        #[arg(long, value_name = "JSON")]
        columns: Option<String>,
    },
    /// Delete a table
    Delete { table: String },
}

#[derive(Subcommand, Debug)]
pub enum ViewCommand {
    /// List views of a table
    List { table: String },
}

#[derive(Subcommand, Debug)]
pub enum ColumnCommand {
    /// List columns of a table
    List { table: String },
    /// Add a column to a table
    Create {
        table: String,
        #[arg(long)]
        title: String,
        /// Column type, e.g. SingleLineText
        #[arg(long = "type", value_name = "UIDT", default_value = "SingleLineText")]
        uidt: String,
    },
    /// Delete a column
    Delete { column: String },
}

#[derive(Subcommand, Debug)]
pub enum FilterCommand {
    /// List filters of a view
    List { view: String },
    /// Add a filter to a view
    Create {
        view: String,
        #[arg(long, value_name = "COLUMN")]
        column: String,
        /// Comparison operator, e.g. eq, like, gt
        #[arg(long, value_name = "OP")]
        op: String,
        #[arg(long)]
        value: Option<String>,
    },
    /// Delete a filter
    Delete { filter: String },
}

#[derive(Subcommand, Debug)]
pub enum SortCommand {
    /// List sorts of a view
    List { view: String },
    /// Add a sort to a view
    Create {
        view: String,
        #[arg(long, value_name = "COLUMN")]
        column: String,
        #[arg(long, default_value = "asc", value_parser = ["asc", "desc"])]
        direction: String,
    },
    /// Delete a sort
    Delete { sort: String },
}

#[tracing::instrument(skip(ctx, sdk))]
pub async fn base<R: Runtime, Q: Requester>(
    ctx: &Context<R>,
    sdk: &Sdk<Q>,
    command: BaseCommand,
) -> Result<()> {
    match command {
        BaseCommand::List => ctx.output.emit(&sdk.list_bases().await?),
        BaseCommand::Get { base } => ctx.output.emit(&sdk.get_base(ctx.resolve(&base)).await?),
    }
}

#[tracing::instrument(skip(ctx, sdk, conn))]
pub async fn table<R: Runtime, Q: Requester>(
    ctx: &Context<R>,
    sdk: &Sdk<Q>,
    conn: &ConnectionArgs,
    command: TableCommand,
) -> Result<()> {
    match command {
        TableCommand::List => {
            let base_id = ctx.base_id(conn)?;
            ctx.output.emit(&sdk.list_tables(&base_id).await?)
        }
        TableCommand::Get { table } => {
            ctx.output.emit(&sdk.get_table(ctx.resolve(&table)).await?)
        }
        TableCommand::Create { title, columns } => {
            let base_id = ctx.base_id(conn)?;
            let mut body = json!({ "title": title });
            if let Some(columns) = columns {
                body["columns"] = ctx.read_json(&columns)?;
            }
            ctx.output.emit(&sdk.create_table(&base_id, body).await?)
        }
        TableCommand::Delete { table } => {
            ctx.output.emit(&sdk.delete_table(ctx.resolve(&table)).await?)
        }
    }
}

#[tracing::instrument(skip(ctx, sdk))]
pub async fn view<R: Runtime, Q: Requester>(
    ctx: &Context<R>,
    sdk: &Sdk<Q>,
    command: ViewCommand,
) -> Result<()> {
    match command {
        ViewCommand::List { table } => {
            ctx.output.emit(&sdk.list_views(ctx.resolve(&table)).await?)
        }
    }
}

#[tracing::instrument(skip(ctx, sdk))]
pub async fn column<R: Runtime, Q: Requester>(
    ctx: &Context<R>,
    sdk: &Sdk<Q>,
    command: ColumnCommand,
) -> Result<()> {
    match command {
        ColumnCommand::List { table } => {
            ctx.output.emit(&sdk.list_columns(ctx.resolve(&table)).await?)
        }
        ColumnCommand::Create { table, title, uidt } => {
            let body = json!({ "title": title, "column_name": title, "uidt": uidt });
            ctx.output
                .emit(&sdk.create_column(ctx.resolve(&table), body).await?)
        }
        ColumnCommand::Delete { column } => {
            ctx.output.emit(&sdk.delete_column(ctx.resolve(&column)).await?)
        }
    }
}

#[tracing::instrument(skip(ctx, sdk))]
pub async fn filter<R: Runtime, Q: Requester>(
    ctx: &Context<R>,
    sdk: &Sdk<Q>,
    command: FilterCommand,
) -> Result<()> {
    match command {
        FilterCommand::List { view } => {
            ctx.output.emit(&sdk.list_filters(ctx.resolve(&view)).await?)
        }
        FilterCommand::Create {
            view,
            column,
            op,
            value,
        } => {
            let body = json!({
                "fk_column_id": ctx.resolve(&column),
                "comparison_op": op,
                "value": value.map(Value::String).unwrap_or(Value::Null),
            });
            ctx.output
                .emit(&sdk.create_filter(ctx.resolve(&view), body).await?)
        }
        FilterCommand::Delete { filter } => {
            ctx.output.emit(&sdk.delete_filter(ctx.resolve(&filter)).await?)
        }
    }
}

#[tracing::instrument(skip(ctx, sdk))]
pub async fn sort<R: Runtime, Q: Requester>(
    ctx: &Context<R>,
    sdk: &Sdk<Q>,
    command: SortCommand,
) -> Result<()> {
    match command {
        SortCommand::List { view } => ctx.output.emit(&sdk.list_sorts(ctx.resolve(&view)).await?),
        SortCommand::Create {
            view,
            column,
            direction,
        } => {
            let body = json!({ "fk_column_id": ctx.resolve(&column), "direction": direction });
            ctx.output
                .emit(&sdk.create_sort(ctx.resolve(&view), body).await?)
        }
        SortCommand::Delete { sort } => ctx.output.emit(&sdk.delete_sort(ctx.resolve(&sort)).await?),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::output::Output;
    use crate::config::Settings;
    use crate::http::{Body, ErrorKind, Method, MockRequester, Payload};
    use crate::runtime::MockRuntime;
    use std::path::PathBuf;

    fn context() -> Context<MockRuntime> {
        let mut settings = Settings::default();
        settings.set_alias("crm", "p_1").unwrap();
        settings.set_alias("tasks", "t_1").unwrap();
        settings.set_alias("title", "c_1").unwrap();
        Context {
            runtime: MockRuntime::new(),
            config_path: PathBuf::from("/cfg/config.json"),
            settings,
            output: Output::new(true),
        }
    }

    #[tokio::test]
    async fn test_table_list_uses_resolved_base() {
        let mut requester = MockRequester::new();
        requester
            .expect_request()
            .withf(|m, p, _| *m == Method::GET && p == "/api/v2/meta/bases/p_1/tables")
            .times(1)
            .returning(|_, _, _| Ok(Payload::Json(json!({"list": [], "pageInfo": {}}))));

        let conn = ConnectionArgs {
            base_id: Some("crm".into()),
            ..Default::default()
        };
        table(&context(), &Sdk::new(requester), &conn, TableCommand::List)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_table_list_without_base_fails_before_request() {
        let requester = MockRequester::new();
        let err = table(
            &context(),
            &Sdk::new(requester),
            &ConnectionArgs::default(),
            TableCommand::List,
        )
        .await
        .unwrap_err();
        assert!(err.to_string().contains("No base selected"));
    }

    #[tokio::test]
    async fn test_table_create_with_columns() {
        let mut requester = MockRequester::new();
        requester
            .expect_request()
            .withf(|m, p, options| {
                *m == Method::POST
                    && p == "/api/v2/meta/bases/p_9/tables"
                    && options.body
                        == Some(Body::Json(json!({
                            "title": "Tasks",
                            "columns": [{"title": "Name", "uidt": "SingleLineText"}]
                        })))
            })
            .times(1)
            .returning(|_, _, _| Ok(Payload::Json(json!({"id": "t_2", "title": "Tasks"}))));

        let conn = ConnectionArgs {
            base_id: Some("p_9".into()),
            ..Default::default()
        };
        table(
            &context(),
            &Sdk::new(requester),
            &conn,
            TableCommand::Create {
                title: "Tasks".into(),
                columns: Some(r#"[{"title": "Name", "uidt": "SingleLineText"}]"#.into()),
            },
        )
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_filter_create_resolves_aliases() {
        let mut requester = MockRequester::new();
        requester
            .expect_request()
            .withf(|m, p, options| {
                *m == Method::POST
                    && p == "/api/v2/meta/views/v_1/filters"
                    && options.body
                        == Some(Body::Json(json!({
                            "fk_column_id": "c_1",
                            "comparison_op": "like",
                            "value": "%bug%"
                        })))
            })
            .times(1)
            .returning(|_, _, _| Ok(Payload::Json(json!({"id": "f_1"}))));

        filter(
            &context(),
            &Sdk::new(requester),
            FilterCommand::Create {
                view: "v_1".into(),
                column: "title".into(),
                op: "like".into(),
                value: Some("%bug%".into()),
            },
        )
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_column_list_not_found() {
        let mut requester = MockRequester::new();
        requester
            .expect_request()
            .withf(|_, p, _| p == "/api/v2/meta/tables/t_1")
            .returning(|_, _, _| Err(crate::http::ApiError::not_found("Table not found")));

        let err = column(
            &context(),
            &Sdk::new(requester),
            ColumnCommand::List {
                table: "tasks".into(),
            },
        )
        .await
        .unwrap_err();
        let api = err.downcast_ref::<crate::http::ApiError>().unwrap();
        assert_eq!(api.kind(), &ErrorKind::NotFound);
    }
}
