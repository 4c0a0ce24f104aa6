//! Command-line parsing and validation helpers.

mod defaults;
mod keymap;
#[cfg(test)]
mod tests;
mod validation;

use clap::{Parser, ValueEnum};
use regex::Regex;
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::filter::LevelFilter;

use crate::supervisor::LaunchSpec;

pub use defaults::{
    DEFAULT_TERMINATE_GRACE_MS, DEFAULT_TICK_INTERVAL_MS, DEFAULT_WINDOW_POLL_MS,
    DEFAULT_WINDOW_TIMEOUT_MS, DEFAULT_WINDOW_TITLE, DEFAULT_XDOTOOL_TIMEOUT_MS,
    MAX_TICK_INTERVAL_MS, MIN_TICK_INTERVAL_MS,
};
pub use keymap::KeyMap;

/// CLI options for livegba. Positional order matches `<commands> <emulator> <rom>`.
#[derive(Debug, Parser, Clone)]
#[command(
    name = "livegba",
    about = "livegba: replay a growing command file as key presses into an emulator window",
    author,
    version
)]
pub struct AppConfig {
    /// Command file to tail (one key or button name per line)
    #[arg(value_name = "COMMAND_FILE")]
    pub command_file: PathBuf,

    /// Emulator executable to launch (e.g. mgba-qt)
    #[arg(value_name = "EMULATOR")]
    pub emulator: PathBuf,

    /// ROM passed to the emulator as its first argument
    #[arg(value_name = "ROM")]
    pub rom: PathBuf,

    /// Extra emulator arguments, split with shell quoting rules
    #[arg(long = "emulator-args", value_name = "ARGS", allow_hyphen_values = true)]
    pub emulator_args: Option<String>,

    /// Dispatch tick interval (milliseconds)
    #[arg(long = "interval-ms", default_value_t = DEFAULT_TICK_INTERVAL_MS)]
    pub interval_ms: u64,

    /// Regex the emulator window title must match
    #[arg(long = "window-title", default_value = DEFAULT_WINDOW_TITLE)]
    pub window_title: String,

    /// How long to wait for the emulator window after launch (milliseconds)
    #[arg(long = "window-timeout-ms", default_value_t = DEFAULT_WINDOW_TIMEOUT_MS)]
    pub window_timeout_ms: u64,

    /// Delay between window lookups while waiting (milliseconds)
    #[arg(long = "window-poll-ms", default_value_t = DEFAULT_WINDOW_POLL_MS)]
    pub window_poll_ms: u64,

    /// Bring the emulator window to the front when it loses focus
    #[arg(long = "activate-window", default_value_t = false)]
    pub activate_window: bool,

    /// Grace period between SIGTERM and SIGKILL on shutdown (milliseconds)
    #[arg(long = "terminate-grace-ms", default_value_t = DEFAULT_TERMINATE_GRACE_MS)]
    pub terminate_grace_ms: u64,

    /// YAML file of `token: key` aliases applied before key injection
    #[arg(long, value_name = "PATH")]
    pub keymap: Option<PathBuf>,

    /// Translate GBA button names (a, b, l, r, start, select) to mGBA's default keys
    #[arg(long = "gba-buttons", default_value_t = false)]
    pub gba_buttons: bool,

    /// Path to the xdotool binary used for window lookup and key injection
    #[arg(long = "xdotool-cmd", default_value = "xdotool")]
    pub xdotool_cmd: String,

    /// Longest a single xdotool call may run before it is killed (milliseconds)
    #[arg(long = "xdotool-timeout-ms", default_value_t = DEFAULT_XDOTOOL_TIMEOUT_MS)]
    pub xdotool_timeout_ms: u64,

    /// Print key presses instead of sending them (no window checks)
    #[arg(long = "dry-run", default_value_t = false)]
    pub dry_run: bool,

    /// Start immediately and run until a signal arrives (no stdin control)
    #[arg(long, env = "LIVEGBA_HEADLESS", default_value_t = false)]
    pub headless: bool,

    /// Enable file logging
    #[arg(long = "logs", env = "LIVEGBA_LOGS", default_value_t = false)]
    pub logs: bool,

    /// Disable all file logging (overrides --logs and log env vars)
    #[arg(long = "no-logs", env = "LIVEGBA_NO_LOGS", default_value_t = false)]
    pub no_logs: bool,

    /// Log file location (defaults to livegba.log in the temp dir)
    #[arg(long = "log-file", env = "LIVEGBA_LOG_FILE", value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Write the log file as JSON lines
    #[arg(long = "log-json", default_value_t = false)]
    pub log_json: bool,

    /// Minimum level for console and file logs
    #[arg(long = "log-level", value_enum, default_value_t = LogLevel::Info)]
    pub log_level: LogLevel,
}

/// Log verbosity selectable from the CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn filter(self) -> LevelFilter {
        match self {
            LogLevel::Error => LevelFilter::ERROR,
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Trace => LevelFilter::TRACE,
        }
    }
}

/// Everything the coordinator needs to run one emulator session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub command_file: PathBuf,
    pub launch: LaunchSpec,
    pub window: WindowConfig,
    pub tick_interval: Duration,
    pub terminate_grace: Duration,
    pub keymap: KeyMap,
}

/// How the emulator window is located and kept in front.
#[derive(Debug, Clone)]
pub struct WindowConfig {
    pub title: Regex,
    pub timeout: Duration,
    pub poll: Duration,
    pub activate: bool,
}
