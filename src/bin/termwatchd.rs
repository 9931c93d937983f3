//! termwatch daemon - window tracker and loopback query service
//!
//! This binary runs the refresh loop that tracks terminal windows and the
//! agents inside them, and serves the result on a local HTTP port.
//!
//! # Usage
//!
//! ```bash
//! # Start the daemon (foreground)
//! termwatchd start
//!
//! # Start the daemon (background/daemonized)
//! termwatchd start -d
//!
//! # Stop the daemon
//! termwatchd stop
//!
//! # Check daemon status
//! termwatchd status
//! ```

use std::fs::{self, OpenOptions};
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use termwatch_core::paths::read_port_file;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use termwatchd::config::Config;
use termwatchd::server::{QueryServer, ServerConfig};
use termwatchd::system_tracker;
use termwatchd::tracker::{FocusHandler, SnapshotProvider};

/// How long `stop` waits for the daemon to exit.
const STOP_TIMEOUT: Duration = Duration::from_secs(5);

const STOP_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// termwatch daemon - terminal window and agent state tracker
#[derive(Parser, Debug)]
#[command(name = "termwatchd", version, about)]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the daemon
    Start {
        /// Run as a background daemon (fork to background)
        #[arg(short = 'd', long)]
        daemon: bool,
    },
    /// Stop the running daemon
    Stop,
    /// Show daemon status
    Status,
}

/// `<state_dir>/termwatch`, holding the PID file and the daemon log.
fn state_dir() -> PathBuf {
    dirs::state_dir()
        .or_else(dirs::cache_dir)
        .unwrap_or_else(std::env::temp_dir)
        .join("termwatch")
}

/// PID file guarding against a second daemon instance.
struct PidFile {
    path: PathBuf,
}

impl PidFile {
    fn new() -> Self {
        Self {
            path: state_dir().join("termwatchd.pid"),
        }
    }

    fn read(&self) -> Option<u32> {
        fs::read_to_string(&self.path).ok()?.trim().parse().ok()
    }

    /// PID of a live daemon; a PID file left by a dead one is removed.
    fn running(&self) -> Option<u32> {
        let pid = self.read()?;
        if is_alive(pid) {
            return Some(pid);
        }
        self.remove();
        None
    }

    fn claim(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        fs::write(&self.path, process::id().to_string())
            .with_context(|| format!("Failed to write {}", self.path.display()))
    }

    fn remove(&self) {
        let _ = fs::remove_file(&self.path);
    }
}

/// Signal 0 checks for existence without delivering anything.
fn is_alive(pid: u32) -> bool {
    let Ok(pid) = libc::pid_t::try_from(pid) else {
        return false;
    };
    unsafe { libc::kill(pid, 0) == 0 }
}

fn send_sigterm(pid: u32) -> Result<()> {
    let target = libc::pid_t::try_from(pid).context("PID out of range")?;
    if unsafe { libc::kill(target, libc::SIGTERM) } != 0 {
        bail!("Failed to send SIGTERM to process {pid}");
    }
    Ok(())
}

/// Polls until `pid` exits or `limit` elapses.
fn wait_for_exit(pid: u32, limit: Duration) -> bool {
    let deadline = Instant::now() + limit;
    while Instant::now() < deadline {
        if !is_alive(pid) {
            return true;
        }
        std::thread::sleep(STOP_POLL_INTERVAL);
    }
    !is_alive(pid)
}

fn main() -> Result<()> {
    let args = Args::parse();
    let pid_file = PidFile::new();

    match args.command.unwrap_or(Command::Start { daemon: false }) {
        Command::Start { daemon } => {
            if let Some(pid) = pid_file.running() {
                eprintln!("termwatchd already running as PID {pid}; run 'termwatchd stop' first.");
                process::exit(1);
            }

            // Parse config before forking so errors reach the terminal
            let config = Config::load().context("Failed to load configuration")?;

            if daemon {
                daemonize()?;
            }

            pid_file.claim()?;
            let result = run_daemon(config);
            pid_file.remove();
            result
        }
        Command::Stop => {
            let Some(pid) = pid_file.running() else {
                println!("termwatchd is not running.");
                return Ok(());
            };

            println!("Stopping termwatchd (PID {pid})...");
            send_sigterm(pid)?;
            if wait_for_exit(pid, STOP_TIMEOUT) {
                println!("Stopped.");
                Ok(())
            } else {
                bail!("termwatchd (PID {pid}) did not exit within {}s", STOP_TIMEOUT.as_secs());
            }
        }
        Command::Status => {
            let Some(pid) = pid_file.running() else {
                println!("termwatchd is not running.");
                process::exit(1);
            };

            println!("termwatchd running (PID {pid})");
            let config = Config::load().context("Failed to load configuration")?;
            match read_port_file(&config.port_file) {
                Some(port) => println!("Query API: http://127.0.0.1:{port}/api/windows"),
                None => println!("Query API: not bound"),
            }
            Ok(())
        }
    }
}

/// Forks into the background with stdout and stderr appended to the log.
fn daemonize() -> Result<()> {
    use daemonize::Daemonize;

    let log_path = state_dir().join("termwatchd.log");
    if let Some(parent) = log_path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }

    let log = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .with_context(|| format!("Failed to open {}", log_path.display()))?;
    let log_err = log.try_clone().context("Failed to duplicate log handle")?;

    Daemonize::new()
        .working_directory("/")
        .stdout(log)
        .stderr(log_err)
        .start()
        .context("Failed to daemonize")?;

    Ok(())
}

#[tokio::main]
async fn run_daemon(config: Config) -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("termwatchd=info".parse()?)
                .add_directive("termwatch_core=info".parse()?)
                .add_directive("termwatch_protocol=info".parse()?),
        )
        .init();

    info!(
        version = env!("CARGO_PKG_VERSION"),
        pid = process::id(),
        app = %config.app_name,
        projects = config.projects.len(),
        "termwatch daemon starting"
    );

    let cancel_token = CancellationToken::new();

    let shutdown_token = cancel_token.clone();
    tokio::spawn(async move {
        if let Err(e) = wait_for_shutdown_signal().await {
            error!(error = %e, "Error waiting for shutdown signal");
        }
        info!("Shutdown signal received");
        shutdown_token.cancel();
    });

    let (tracker, handle) = system_tracker(&config);
    let tracker_task = tracker.spawn(config.refresh_interval(), cancel_token.clone());

    let handle = Arc::new(handle);
    let snapshots: Arc<dyn SnapshotProvider> = handle.clone();
    let focus: Arc<dyn FocusHandler> = handle;

    match QueryServer::bind(ServerConfig::from(&config), snapshots, Some(focus), cancel_token.clone()).await {
        Ok(server) => server.run().await,
        Err(e) => {
            // Tracking still runs; only the query service is unavailable
            error!(error = %e, "Query service not started");
            cancel_token.cancelled().await;
        }
    }

    if let Err(e) = tracker_task.await {
        error!(error = %e, "Tracker task failed");
    }

    info!("termwatch daemon stopped");
    Ok(())
}

async fn wait_for_shutdown_signal() -> Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigterm = signal(SignalKind::terminate())?;
        let mut sigint = signal(SignalKind::interrupt())?;

        tokio::select! {
            _ = sigterm.recv() => {
                info!("Received SIGTERM");
            }
            _ = sigint.recv() => {
                info!("Received SIGINT");
            }
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await?;
        info!("Received Ctrl+C");
    }

    Ok(())
}
