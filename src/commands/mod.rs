//! Command-line handlers.
//!
//! Each submodule owns a clap subcommand enum and the async handler that
//! runs it against an [`Sdk`](crate::api::Sdk).

pub mod alias;
pub mod context;
pub mod links;
pub mod meta;
pub mod output;
pub mod request;
pub mod rows;
pub mod workspace;

pub use context::{ConnectionArgs, Context, TOKEN_HEADER};
pub use output::{Output, exit_code, report};
