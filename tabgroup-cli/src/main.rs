//! tabgroup: classify open tabs into named groups.
//!
//! # Usage
//!
//! ```text
//! tabgroup [--home <dir>] [--verbose] [--log-json] <command>
//!
//! tabgroup config show [--json]
//! tabgroup config set-key <KEY>
//! tabgroup config auto on|off|toggle
//! tabgroup labels list
//! tabgroup labels add <LABEL>
//! tabgroup labels rename <N> <LABEL>
//! tabgroup labels remove <N>
//! tabgroup labels set <LABEL>...
//! tabgroup labels reset
//! tabgroup classify --tabs <FILE> --endpoint <URL> [--strict]
//! ```
//!
//! Every invocation first hydrates settings from `<home>/.tabgroup/storage.json`,
//! migrating legacy keys forward.

mod commands;
mod session;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use commands::{classify::ClassifyArgs, config::ConfigCommand, labels::LabelsCommand};
use session::Session;

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "tabgroup",
    version,
    about = "Group open tabs into user-defined categories",
    long_about = None,
)]
struct Cli {
    /// Directory holding `.tabgroup/storage.json`. Defaults to the home directory.
    #[arg(long, global = true, env = "TABGROUP_HOME", value_name = "DIR")]
    home: Option<PathBuf>,

    /// Log at debug level (overridden by RUST_LOG).
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    /// Emit logs as JSON lines on stderr.
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Show or edit the credential and auto-classify setting.
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },

    /// Show or edit the group labels.
    Labels {
        #[command(subcommand)]
        command: LabelsCommand,
    },

    /// Classify the tabs in a snapshot file.
    Classify(ClassifyArgs),
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.log_json);

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;

    runtime.block_on(async move {
        let session = Session::open(cli.home).await?;
        match cli.command {
            Commands::Config { command } => commands::config::run(&session, command).await,
            Commands::Labels { command } => commands::labels::run(&session, command).await,
            Commands::Classify(args) => args.run(&session).await,
        }
    })
}

fn init_tracing(verbose: bool, json: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let builder = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);
    let _ = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
}
