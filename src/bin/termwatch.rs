//! termwatch - command-line client for the termwatch daemon
//!
//! # Usage
//!
//! ```text
//! termwatch windows          # List tracked windows, most urgent first
//! termwatch windows --json   # Raw JSON from the daemon
//! termwatch focus 501-1      # Raise a window by id
//! termwatch health           # Check the daemon is answering
//! termwatch hook < event.json  # Record an agent hook event (run by the agent)
//! ```

use std::io;
use std::process;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use termwatch_core::{HookStore, WindowId};
use tracing::warn;
use tracing_subscriber::EnvFilter;

use termwatch_cli::client::ApiClient;
use termwatch_cli::hook::{self, HookInput};
use termwatch_cli::output::format_table;
use termwatchd::config::Config;

// ============================================================================
// CLI Arguments
// ============================================================================

/// termwatch - see which terminal windows need your attention
#[derive(Parser, Debug)]
#[command(name = "termwatch")]
#[command(about = "Query and focus terminal windows tracked by termwatchd")]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Daemon port (defaults to the port file the daemon writes)
    #[arg(long, global = true)]
    port: Option<u16>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List tracked windows
    Windows {
        /// Print the daemon's JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Bring a window to the front
    Focus {
        /// Window id as shown by `termwatch windows` (pid-index)
        id: WindowId,
    },
    /// Check that the daemon is answering
    Health,
    /// Record an agent hook event read from stdin
    Hook,
}

fn init_logging() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("termwatch=warn".parse()?)
                .add_directive("termwatch_cli=warn".parse()?),
        )
        .init();
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging()?;

    match args.command {
        Command::Hook => {
            // A failing hook must never disturb the agent; report and exit 0
            let config = Config::load_or_default();
            let store = HookStore::new(&config.hook_state_dir);
            let result = HookInput::read_from(io::stdin().lock())
                .and_then(|input| hook::apply(&store, &input, hook::now_timestamp()));
            if let Err(e) = result {
                warn!(error = %e, "Hook event not recorded");
            }
            Ok(())
        }
        command => {
            let config = Config::load().context("Failed to load configuration")?;
            run_query(command, args.port, &config)
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn run_query(command: Command, port: Option<u16>, config: &Config) -> Result<()> {
    let client = ApiClient::discover(port, &config.port_file)?;

    match command {
        Command::Windows { json } => {
            let windows = client.windows().await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&windows)?);
            } else {
                print!("{}", format_table(&windows));
            }
        }
        Command::Focus { id } => match client.focus(id).await {
            Ok(()) => {}
            Err(e) if e.is_not_found() => {
                eprintln!("{e}");
                eprintln!("Window ids change as windows open and close; run 'termwatch windows' for current ids.");
                process::exit(1);
            }
            Err(e) => return Err(e.into()),
        },
        Command::Health => {
            let health = client.health().await?;
            println!("{} (API {}, port {})", health.status, health.version, client.port());
        }
        Command::Hook => {}
    }
    Ok(())
}
