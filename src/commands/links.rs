use anyhow::Result;
use clap::Subcommand;

use super::context::Context;
use super::rows::row_keys;
use crate::api::Sdk;
use crate::http::{DEFAULT_PAGE_SIZE, Requester};
use crate::runtime::Runtime;

#[derive(Subcommand, Debug)]
pub enum LinkCommand {
    /// List rows linked to a row
    List {
        table: String,
        /// Link column id
        field: String,
        row: String,
        #[arg(long, default_value_t = DEFAULT_PAGE_SIZE)]
        page_size: usize,
    },
    /// Link rows to a row
    Add {
        table: String,
        field: String,
        row: String,
        /// Ids of the rows to link
        #[arg(required = true)]
        targets: Vec<String>,
    },
    /// Unlink rows from a row
    Remove {
        table: String,
        field: String,
        row: String,
        #[arg(required = true)]
        targets: Vec<String>,
    },
}

#[tracing::instrument(skip(ctx, sdk))]
pub async fn run<R: Runtime, Q: Requester>(
    ctx: &Context<R>,
    sdk: &Sdk<Q>,
    command: LinkCommand,
) -> Result<()> {
    match command {
        LinkCommand::List {
            table,
            field,
            row,
            page_size,
        } => {
            let linked = sdk
                .list_links(ctx.resolve(&table), ctx.resolve(&field), &row, page_size)
                .await?;
            ctx.output.emit(&linked)
        }
        LinkCommand::Add {
            table,
            field,
            row,
            targets,
        } => {
            let result = sdk
                .link_rows(ctx.resolve(&table), ctx.resolve(&field), &row, row_keys(&targets))
                .await?;
            ctx.output.emit(&result)
        }
        LinkCommand::Remove {
            table,
            field,
            row,
            targets,
        } => {
            let result = sdk
                .unlink_rows(ctx.resolve(&table), ctx.resolve(&field), &row, row_keys(&targets))
                .await?;
            ctx.output.emit(&result)
        }
    }
}
