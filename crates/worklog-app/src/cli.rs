//! CLI argument definitions for the worklog binary.
//!
//! Priority resolution: CLI args > env vars > config file > defaults.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Ask questions about your dated markdown work logs.
#[derive(Parser, Debug)]
#[command(name = "worklog", version, about)]
pub struct CliArgs {
    /// Path to the configuration file.
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,

    /// Directory holding the dated markdown work logs.
    #[arg(short = 'd', long = "data-dir")]
    pub data_dir: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short = 'l', long = "log-level")]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, PartialEq)]
pub enum Command {
    /// Answer a single question and exit.
    Ask {
        /// The question, e.g. "what did I do last week".
        #[arg(required = true, num_args = 1..)]
        query: Vec<String>,

        /// Maximum number of log entries to consider.
        #[arg(short = 'n', long = "max-results")]
        max_results: Option<usize>,

        /// Print the response as JSON.
        #[arg(long = "json")]
        json: bool,

        /// Print the language-model prompt built from the selected entries
        /// instead of an answer.
        #[arg(long = "prompt")]
        prompt: bool,
    },
    /// Interactive question loop on stdin. Type "exit" to quit.
    Chat {
        /// Maximum number of log entries to consider per question.
        #[arg(short = 'n', long = "max-results")]
        max_results: Option<usize>,
    },
    /// Embed work logs modified since the last run into the saved index.
    Embed {
        /// Rebuild the whole index instead of updating it.
        #[arg(short = 'f', long = "force")]
        force: bool,
    },
    /// Report the data directory and saved index state.
    Status,
}

impl CliArgs {
    /// Resolve the configuration file path.
    ///
    /// Priority: --config flag > WORKLOG_CONFIG env var > platform default (~/.worklog/config.toml).
    pub fn resolve_config_path(&self) -> PathBuf {
        if let Some(ref p) = self.config {
            return p.clone();
        }
        if let Ok(p) = std::env::var("WORKLOG_CONFIG") {
            return PathBuf::from(p);
        }
        default_config_path()
    }

    /// Resolve the data directory.
    ///
    /// Priority: --data-dir flag > config file value. `~` is expanded.
    pub fn resolve_data_dir(&self, config_data_dir: &str) -> PathBuf {
        match self.data_dir {
            Some(ref p) => p.clone(),
            None => expand_home(config_data_dir),
        }
    }

    /// Resolve the log level.
    ///
    /// Priority: --log-level flag > config file value.
    pub fn resolve_log_level(&self, config_level: &str) -> String {
        self.log_level
            .clone()
            .unwrap_or_else(|| config_level.to_string())
    }
}

/// Home directory for the current platform, if known.
fn home_dir() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    let home = std::env::var("USERPROFILE");
    #[cfg(not(target_os = "windows"))]
    let home = std::env::var("HOME");
    home.ok().map(PathBuf::from)
}

/// Expand a leading `~` to the home directory.
pub fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/").or_else(|| path.strip_prefix("~\\")) {
        if let Some(home) = home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}

/// Default config file path for the current platform.
fn default_config_path() -> PathBuf {
    match home_dir() {
        Some(home) => home.join(".worklog").join("config.toml"),
        None => PathBuf::from("config.toml"),
    }
}
