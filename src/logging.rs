//! Console and file logging setup.
//!
//! Console output goes to stderr so it never mixes with the control prompt. The
//! optional file log is size-capped and truncated when it would grow past the cap.

use crate::config::AppConfig;
use anyhow::{anyhow, Result};
use std::{
    fs,
    io::{self, Write},
    panic,
    path::{Path, PathBuf},
    sync::{Mutex, OnceLock},
};
use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::prelude::*;

const LOG_MAX_BYTES: u64 = 5 * 1024 * 1024;
static PANIC_HOOK_INSTALLED: OnceLock<()> = OnceLock::new();

/// Append-only log file that starts over once it reaches `max_bytes`.
pub(crate) struct RotatingLogFile {
    path: PathBuf,
    file: fs::File,
    max_bytes: u64,
    bytes_written: u64,
}

impl RotatingLogFile {
    pub(crate) fn open(path: &Path, max_bytes: u64) -> io::Result<Self> {
        let mut bytes_written = fs::metadata(path).map(|m| m.len()).unwrap_or(0);
        if bytes_written > max_bytes {
            let _ = fs::remove_file(path);
            bytes_written = 0;
        }
        let file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)?;
        Ok(Self {
            path: path.to_path_buf(),
            file,
            max_bytes,
            bytes_written,
        })
    }

    fn rotate_if_needed(&mut self, next_len: usize) -> io::Result<()> {
        if self.bytes_written.saturating_add(next_len as u64) <= self.max_bytes {
            return Ok(());
        }
        self.file = fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&self.path)?;
        self.bytes_written = 0;
        Ok(())
    }
}

impl Write for RotatingLogFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.rotate_if_needed(buf.len())?;
        let written = self.file.write(buf)?;
        self.bytes_written = self.bytes_written.saturating_add(written as u64);
        Ok(written)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}

/// Install the global subscriber from CLI flags. Call once, before starting a session.
pub fn init_logging(config: &AppConfig) -> Result<()> {
    let level = config.log_level.filter();
    let file_enabled = config.logs && !config.no_logs;

    let file_layer = if file_enabled {
        let path = config.log_file_path();
        let writer = Mutex::new(RotatingLogFile::open(&path, LOG_MAX_BYTES).map_err(|err| {
            anyhow!("failed to open log file '{}': {err}", path.display())
        })?);
        let layer = if config.log_json {
            tracing_subscriber::fmt::layer()
                .json()
                .with_timer(UtcTime::rfc_3339())
                .with_current_span(false)
                .with_span_list(false)
                .with_writer(writer)
                .with_filter(level)
                .boxed()
        } else {
            tracing_subscriber::fmt::layer()
                .with_timer(UtcTime::rfc_3339())
                .with_ansi(false)
                .with_writer(writer)
                .with_filter(level)
                .boxed()
        };
        Some(layer)
    } else {
        None
    };

    let console_layer = tracing_subscriber::fmt::layer()
        .with_writer(io::stderr)
        .with_target(false)
        .with_filter(level);

    tracing_subscriber::registry()
        .with(file_layer)
        .with(console_layer)
        .try_init()
        .map_err(|err| anyhow!("failed to install log subscriber: {err}"))?;

    if file_enabled {
        tracing::debug!(path = %config.log_file_path().display(), "file logging enabled");
    }
    install_panic_hook();
    Ok(())
}

/// Log panics through tracing before the default hook prints them.
pub fn install_panic_hook() {
    PANIC_HOOK_INSTALLED.get_or_init(|| {
        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            let location = info
                .location()
                .map(|loc| format!("{}:{}", loc.file(), loc.line()))
                .unwrap_or_else(|| "unknown".to_string());
            tracing::error!(
                "panic at {location} (v{})",
                env!("CARGO_PKG_VERSION")
            );
            previous(info);
        }));
    });
}
