use anyhow::{Context as _, Result};
use clap::Subcommand;
use serde_json::{Value, json};
use std::collections::BTreeMap;

use super::context::{ConnectionArgs, Context};
use crate::config::Workspace;
use crate::http::RetryOptions;
use crate::runtime::Runtime;

#[derive(Subcommand, Debug)]
pub enum WorkspaceCommand {
    /// Add or replace a workspace from the connection flags
    /// (--base-url, --token, --base, --timeout-ms, --retries, --retry-delay-ms)
    Add {
        /// Workspace name
        name: String,

        /// Extra header sent with every request (NAME:VALUE, repeatable)
        #[arg(long = "header", short = 'H', value_name = "NAME:VALUE")]
        headers: Vec<String>,

        /// Make this the current workspace
        #[arg(long = "use")]
        make_current: bool,
    },

    /// List workspaces (tokens are masked)
    List,

    /// Switch the current workspace
    Use { name: String },

    /// Remove a workspace
    Remove { name: String },
}

/// Splits `NAME:VALUE` into its trimmed parts.
pub fn parse_header(raw: &str) -> Result<(String, String)> {
    match raw.split_once(':') {
        Some((name, value)) if !name.trim().is_empty() => {
            Ok((name.trim().to_string(), value.trim().to_string()))
        }
        _ => anyhow::bail!("Invalid header {:?}, expected NAME:VALUE", raw),
    }
}

fn mask(token: &str) -> String {
    let count = token.chars().count();
    if count <= 4 {
        return "****".to_string();
    }
    let tail: String = token.chars().skip(count - 4).collect();
    format!("****{}", tail)
}

fn describe(name: &str, ws: &Workspace, current: bool) -> Value {
    json!({
        "name": name,
        "current": current,
        "baseUrl": ws.base_url,
        "token": ws.token.as_deref().map(mask),
        "baseId": ws.base_id,
        "headers": ws.headers.keys().collect::<Vec<_>>(),
        "timeoutMs": ws.timeout_ms,
        "retry": ws.retry,
    })
}

/// Builds a workspace from the connection flags.
fn from_flags(conn: &ConnectionArgs, headers: &[String]) -> Result<Workspace> {
    let base_url = conn
        .base_url
        .clone()
        .context("--base-url is required to add a workspace")?;
    let headers = headers
        .iter()
        .map(|raw| parse_header(raw))
        .collect::<Result<BTreeMap<_, _>>>()?;
    let retry = if conn.no_retry {
        Some(RetryOptions::disabled())
    } else if conn.retries.is_some() || conn.retry_delay_ms.is_some() {
        let defaults = RetryOptions::default();
        Some(RetryOptions::new(
            conn.retries.unwrap_or(defaults.max_attempts),
            conn.retry_delay_ms.unwrap_or(defaults.delay_ms),
        ))
    } else {
        None
    };
    Ok(Workspace {
        base_url,
        token: conn.token.clone(),
        headers,
        base_id: conn.base_id.clone(),
        timeout_ms: conn.timeout_ms,
        retry,
    })
}

#[tracing::instrument(skip(ctx, conn))]
pub fn run<R: Runtime>(
    ctx: &mut Context<R>,
    conn: &ConnectionArgs,
    command: WorkspaceCommand,
) -> Result<()> {
    match command {
        WorkspaceCommand::Add {
            name,
            headers,
            make_current,
        } => {
            let workspace = from_flags(conn, &headers)?;
            ctx.settings.add_workspace(&name, workspace)?;
            if make_current {
                ctx.settings.use_workspace(&name)?;
            }
            ctx.save()?;
            ctx.output.status(&format!("Saved workspace '{}'", name));
        }
        WorkspaceCommand::List => {
            let current = ctx.settings.current_workspace.as_deref();
            let list: Vec<Value> = ctx
                .settings
                .workspaces
                .iter()
                .map(|(name, ws)| describe(name, ws, current == Some(name.as_str())))
                .collect();
            ctx.output.emit(&list)?;
        }
        WorkspaceCommand::Use { name } => {
            ctx.settings.use_workspace(&name)?;
            ctx.save()?;
            ctx.output.status(&format!("Now using workspace '{}'", name));
        }
        WorkspaceCommand::Remove { name } => {
            ctx.settings.remove_workspace(&name)?;
            ctx.save()?;
            ctx.output.status(&format!("Removed workspace '{}'", name));
        }
    }
    Ok(())
}
