use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use tablectl::commands::{
    ConnectionArgs, Context, Output, alias, exit_code, links, meta, report, request, rows,
    workspace,
};

/// tablectl - command-line client for a tabular database service
///
/// Connection settings come from flags, TABLECTL_* environment variables,
/// or a saved workspace, in that order.
///
/// Examples:
///   tablectl workspace add prod --base-url https://db.example.com --token XYZ
///   tablectl table list --base p_abc
///   tablectl row list tasks --where "(Status,eq,Done)" --all
#[derive(Parser, Debug)]
#[command(author, version = env!("TABLECTL_VERSION"), about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[command(flatten)]
    connection: ConnectionArgs,

    /// Settings file (defaults to <config dir>/tablectl/config.json; also via TABLECTL_CONFIG)
    #[arg(long = "config", value_name = "PATH", global = true)]
    config: Option<PathBuf>,

    /// More logging (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Print nothing on success
    #[arg(long, short = 'Q', global = true)]
    quiet: bool,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Manage saved connections
    #[command(subcommand)]
    Workspace(workspace::WorkspaceCommand),

    /// Manage friendly names for ids
    #[command(subcommand)]
    Alias(alias::AliasCommand),

    /// Bases
    #[command(subcommand)]
    Base(meta::BaseCommand),

    /// Tables
    #[command(subcommand)]
    Table(meta::TableCommand),

    /// Views
    #[command(subcommand)]
    View(meta::ViewCommand),

    /// Columns
    #[command(subcommand)]
    Column(meta::ColumnCommand),

    /// View filters
    #[command(subcommand)]
    Filter(meta::FilterCommand),

    /// View sorts
    #[command(subcommand)]
    Sort(meta::SortCommand),

    /// Rows
    #[command(subcommand)]
    Row(rows::RowCommand),

    /// Linked rows
    #[command(subcommand)]
    Link(links::LinkCommand),

    /// Send a raw request
    Request(request::RequestArgs),
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

async fn run(cli: Cli) -> Result<()> {
    let runtime = tablectl::runtime::RealRuntime;
    let mut ctx = Context::load(runtime, cli.config, Output::new(cli.quiet))?;
    let conn = cli.connection;

    match cli.command {
        Commands::Workspace(command) => workspace::run(&mut ctx, &conn, command),
        Commands::Alias(command) => alias::run(&mut ctx, command),
        Commands::Base(command) => meta::base(&ctx, &ctx.sdk(&conn)?, command).await,
        Commands::Table(command) => meta::table(&ctx, &ctx.sdk(&conn)?, &conn, command).await,
        Commands::View(command) => meta::view(&ctx, &ctx.sdk(&conn)?, command).await,
        Commands::Column(command) => meta::column(&ctx, &ctx.sdk(&conn)?, command).await,
        Commands::Filter(command) => meta::filter(&ctx, &ctx.sdk(&conn)?, command).await,
        Commands::Sort(command) => meta::sort(&ctx, &ctx.sdk(&conn)?, command).await,
        Commands::Row(command) => rows::run(&ctx, &ctx.sdk(&conn)?, command).await,
        Commands::Link(command) => links::run(&ctx, &ctx.sdk(&conn)?, command).await,
        Commands::Request(args) => request::run(&ctx, &ctx.client(&conn)?, args).await,
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{}", report(&err));
            ExitCode::from(exit_code(&err))
        }
    }
}
