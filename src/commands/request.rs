use anyhow::{Result, bail};
use clap::Args;

use super::context::Context;
use super::workspace::parse_header;
use crate::http::{Method, Payload, RequestOptions, Requester};
use crate::runtime::Runtime;

/// Sends an arbitrary request through the client's retry and error handling.
#[derive(Args, Debug)]
pub struct RequestArgs {
    /// HTTP method
    #[arg(value_name = "METHOD")]
    pub method: String,

    /// Path relative to the base URL, e.g. /api/v2/meta/bases
    #[arg(value_name = "PATH")]
    pub path: String,

    /// Query parameter (KEY=VALUE, repeatable)
    #[arg(long = "query", short = 'q', value_name = "KEY=VALUE")]
    pub query: Vec<String>,

    /// Extra header (NAME:VALUE, repeatable)
    #[arg(long = "header", short = 'H', value_name = "NAME:VALUE")]
    pub headers: Vec<String>,

    /// JSON body, or @file
    #[arg(long = "data", short = 'd', value_name = "JSON")]
    pub data: Option<String>,
}

fn parse_query(raw: &str) -> Result<(String, String)> {
    match raw.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => bail!("Invalid query parameter {:?}, expected KEY=VALUE", raw),
    }
}

impl RequestArgs {
    pub fn method(&self) -> Result<Method> {
        match self.method.to_ascii_uppercase().as_str() {
            "GET" => Ok(Method::GET),
            "POST" => Ok(Method::POST),
            "PUT" => Ok(Method::PUT),
            "PATCH" => Ok(Method::PATCH),
            "DELETE" => Ok(Method::DELETE),
            "HEAD" => Ok(Method::HEAD),
            "OPTIONS" => Ok(Method::OPTIONS),
            _ => bail!("Unsupported HTTP method: {}", self.method),
        }
    }

    pub fn options<R: Runtime>(&self, ctx: &Context<R>) -> Result<RequestOptions> {
        let mut options = RequestOptions::new();
        for raw in &self.query {
            let (key, value) = parse_query(raw)?;
            options = options.query(key, value);
        }
        for raw in &self.headers {
            let (name, value) = parse_header(raw)?;
            options = options.header(name, value);
        }
        if let Some(data) = &self.data {
            options = options.json(ctx.read_json(data)?);
        }
        Ok(options)
    }
}

#[tracing::instrument(skip(ctx, requester, args))]
pub async fn run<R: Runtime, Q: Requester>(
    ctx: &Context<R>,
    requester: &Q,
    args: RequestArgs,
) -> Result<()> {
    let method = args.method()?;
    let options = args.options(ctx)?;
    match requester.request(method, &args.path, options).await? {
        Payload::Empty => Ok(()),
        Payload::Json(value) => ctx.output.emit(&value),
        Payload::Text(text) => {
            if !ctx.output.quiet {
                println!("{}", text);
            }
            Ok(())
        }
    }
}
