//! Daemon configuration.
//!
//! Loaded from TOML at `$TERMWATCH_CONFIG`, falling back to
//! `<config_dir>/termwatch/config.toml`. Every field has a default, so a
//! missing file (or a partial one) is fine. `TERMWATCH_PORT` and
//! `TERMWATCH_APP` override the file.
//!
//! ```toml
//! app_name = "Ghostty"
//! refresh_interval_ms = 1000
//!
//! [sigils]
//! ready = "✳"
//!
//! [[projects]]
//! name = "proj"
//! path = "/Users/me/proj"
//! ```

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use termwatch_core::paths::{default_hook_dir, default_port_file};
use termwatch_core::{Project, TitleSigils};
use thiserror::Error;
use tracing::{debug, warn};

/// Default first port tried by the query service.
pub const DEFAULT_BASE_PORT: u16 = 7681;

/// Default number of consecutive ports tried (base + 9).
pub const DEFAULT_PORT_ATTEMPTS: u16 = 10;

/// Default refresh cadence.
pub const DEFAULT_REFRESH_INTERVAL_MS: u64 = 1000;

/// Environment variable naming the config file.
pub const CONFIG_ENV: &str = "TERMWATCH_CONFIG";

/// Which process-table source the tracker uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessListerKind {
    /// `ps -axo pid=,ppid=,comm=`
    #[default]
    Ps,
    /// In-process listing via `sysinfo`
    Sysinfo,
}

/// Errors that can occur while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid value for {name}: {value}")]
    InvalidEnv { name: String, value: String },
}

/// Daemon configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Terminal application whose windows are tracked.
    pub app_name: String,
    /// Agent process name (matched case-insensitively against the command basename).
    pub agent_process: String,
    pub refresh_interval_ms: u64,
    pub base_port: u16,
    pub port_attempts: u16,
    pub port_file: PathBuf,
    pub hook_state_dir: PathBuf,
    pub process_lister: ProcessListerKind,
    pub sigils: TitleSigils,
    pub projects: Vec<Project>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            app_name: "Ghostty".to_string(),
            agent_process: "claude".to_string(),
            refresh_interval_ms: DEFAULT_REFRESH_INTERVAL_MS,
            base_port: DEFAULT_BASE_PORT,
            port_attempts: DEFAULT_PORT_ATTEMPTS,
            port_file: default_port_file(),
            hook_state_dir: default_hook_dir(),
            process_lister: ProcessListerKind::default(),
            sigils: TitleSigils::default(),
            projects: Vec::new(),
        }
    }
}

impl Config {
    /// Default config file location.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("/tmp"))
            .join("termwatch")
            .join("config.toml")
    }

    /// Path from `$TERMWATCH_CONFIG`, else the default location.
    pub fn resolve_path() -> PathBuf {
        env::var_os(CONFIG_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(Self::default_path)
    }

    /// Loads the config file at the resolved path and applies env overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::load_from(&Self::resolve_path())?;
        config.apply_env()?;
        Ok(config)
    }

    /// Like [`load`](Config::load), but never fails: an unreadable file or
    /// a bad override is logged and defaults stand in.
    pub fn load_or_default() -> Self {
        Self::load_lenient(
            &Self::resolve_path(),
            env::var("TERMWATCH_PORT").ok(),
            env::var("TERMWATCH_APP").ok(),
        )
    }

    fn load_lenient(path: &Path, port: Option<String>, app: Option<String>) -> Self {
        let mut config = Self::load_from(path).unwrap_or_else(|e| {
            warn!(error = %e, "Configuration not loaded, using defaults");
            Self::default()
        });
        if let Err(e) = config.apply_overrides(port, app) {
            warn!(error = %e, "Environment override ignored");
        }
        config
    }

    /// Loads a config file. A missing file yields defaults.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        match fs::read_to_string(path) {
            Ok(raw) => Self::parse(&raw).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "No config file, using defaults");
                Ok(Self::default())
            }
            Err(source) => Err(ConfigError::Read {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    pub fn parse(raw: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(raw)
    }

    /// Applies `TERMWATCH_PORT` and `TERMWATCH_APP`.
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(env::var("TERMWATCH_PORT").ok(), env::var("TERMWATCH_APP").ok())
    }

    fn apply_overrides(
        &mut self,
        port: Option<String>,
        app: Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(port) = port {
            self.base_port = port.trim().parse().map_err(|_| ConfigError::InvalidEnv {
                name: "TERMWATCH_PORT".to_string(),
                value: port.clone(),
            })?;
        }
        if let Some(app) = app.filter(|a| !a.trim().is_empty()) {
            self.app_name = app;
        }
        Ok(())
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_millis(self.refresh_interval_ms.max(100))
    }
}
