use super::defaults::{
    MAX_EMULATOR_ARGS, MAX_EMULATOR_ARG_BYTES, MAX_TERMINATE_GRACE_MS, MAX_WINDOW_POLL_MS,
    MAX_WINDOW_TIMEOUT_MS, MAX_XDOTOOL_TIMEOUT_MS, MIN_WINDOW_POLL_MS, MIN_XDOTOOL_TIMEOUT_MS,
    XDOTOOL_BINARY,
};
use super::{
    AppConfig, KeyMap, SessionConfig, WindowConfig, MAX_TICK_INTERVAL_MS, MIN_TICK_INTERVAL_MS,
};
use crate::supervisor::LaunchSpec;
use anyhow::{anyhow, bail, Context, Result};
use clap::Parser;
use regex::Regex;
use std::os::unix::fs::PermissionsExt;
use std::{env, fs, path::PathBuf, time::Duration};

impl AppConfig {
    /// Parse CLI arguments and validate them right away.
    pub fn parse_args() -> Result<Self> {
        let mut config = Self::parse();
        config.validate()?;
        Ok(config)
    }

    /// Check CLI values and normalize paths.
    pub fn validate(&mut self) -> Result<()> {
        if !(MIN_TICK_INTERVAL_MS..=MAX_TICK_INTERVAL_MS).contains(&self.interval_ms) {
            bail!(
                "--interval-ms must be between {MIN_TICK_INTERVAL_MS} and {MAX_TICK_INTERVAL_MS}, got {}",
                self.interval_ms
            );
        }
        if self.window_timeout_ms > MAX_WINDOW_TIMEOUT_MS {
            bail!(
                "--window-timeout-ms must be at most {MAX_WINDOW_TIMEOUT_MS}, got {}",
                self.window_timeout_ms
            );
        }
        if !(MIN_WINDOW_POLL_MS..=MAX_WINDOW_POLL_MS).contains(&self.window_poll_ms) {
            bail!(
                "--window-poll-ms must be between {MIN_WINDOW_POLL_MS} and {MAX_WINDOW_POLL_MS}, got {}",
                self.window_poll_ms
            );
        }
        if self.terminate_grace_ms > MAX_TERMINATE_GRACE_MS {
            bail!(
                "--terminate-grace-ms must be at most {MAX_TERMINATE_GRACE_MS}, got {}",
                self.terminate_grace_ms
            );
        }

        if !(MIN_XDOTOOL_TIMEOUT_MS..=MAX_XDOTOOL_TIMEOUT_MS).contains(&self.xdotool_timeout_ms) {
            bail!(
                "--xdotool-timeout-ms must be between {MIN_XDOTOOL_TIMEOUT_MS} and {MAX_XDOTOOL_TIMEOUT_MS}, got {}",
                self.xdotool_timeout_ms
            );
        }

        if self.window_title.trim().is_empty() {
            bail!("--window-title must not be empty");
        }
        Regex::new(&self.window_title)
            .with_context(|| format!("invalid --window-title regex: {}", self.window_title))?;

        let args = self.emulator_arg_list()?;
        if args.len() > MAX_EMULATOR_ARGS {
            bail!(
                "--emulator-args has too many arguments (max {MAX_EMULATOR_ARGS}, got {})",
                args.len()
            );
        }
        let total_arg_bytes: usize = args.iter().map(|arg| arg.len()).sum();
        if total_arg_bytes > MAX_EMULATOR_ARG_BYTES {
            bail!("combined --emulator-args length exceeds {MAX_EMULATOR_ARG_BYTES} bytes");
        }

        if self.emulator.as_os_str().is_empty() {
            bail!("emulator path must not be empty");
        }
        if self.command_file.as_os_str().is_empty() {
            bail!("command file path must not be empty");
        }

        // The echo desktop never shells out, so xdotool only matters for real runs.
        if !self.dry_run {
            self.xdotool_cmd = resolve_xdotool_cmd(&self.xdotool_cmd)?;
        }

        if let Some(path) = &self.keymap {
            if !path.is_file() {
                bail!("keymap path '{}' does not exist", path.display());
            }
        }

        Ok(())
    }

    /// Split `--emulator-args` with shell quoting rules.
    pub fn emulator_arg_list(&self) -> Result<Vec<String>> {
        let Some(raw) = self.emulator_args.as_deref() else {
            return Ok(Vec::new());
        };
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Ok(Vec::new());
        }
        shell_words::split(trimmed)
            .map_err(|err| anyhow!("failed to parse --emulator-args '{trimmed}': {err}"))
    }

    /// Key map from `--gba-buttons` and `--keymap`, file entries winning.
    pub fn resolve_keymap(&self) -> Result<KeyMap> {
        let mut keymap = if self.gba_buttons {
            KeyMap::gba()
        } else {
            KeyMap::default()
        };
        if let Some(path) = &self.keymap {
            keymap = keymap.merged(KeyMap::load(path)?);
        }
        Ok(keymap)
    }

    /// Log file destination when file logging is on.
    pub fn log_file_path(&self) -> PathBuf {
        self.log_file
            .clone()
            .unwrap_or_else(|| env::temp_dir().join("livegba.log"))
    }

    /// Snapshot validated settings into the runtime session config.
    pub fn session_config(&self) -> Result<SessionConfig> {
        let title = Regex::new(&self.window_title)
            .with_context(|| format!("invalid --window-title regex: {}", self.window_title))?;
        Ok(SessionConfig {
            command_file: self.command_file.clone(),
            launch: LaunchSpec {
                executable: self.emulator.clone(),
                rom: self.rom.clone(),
                args: self.emulator_arg_list()?,
            },
            window: WindowConfig {
                title,
                timeout: Duration::from_millis(self.window_timeout_ms),
                poll: Duration::from_millis(self.window_poll_ms),
                activate: self.activate_window,
            },
            tick_interval: Duration::from_millis(self.interval_ms),
            terminate_grace: Duration::from_millis(self.terminate_grace_ms),
            keymap: self.resolve_keymap()?,
        })
    }
}

/// `--xdotool-cmd` is either the bare `xdotool` name, found on `PATH` when it
/// runs, or a path to an executable file, returned canonicalized.
pub(super) fn resolve_xdotool_cmd(value: &str) -> Result<String> {
    let cmd = value.trim();
    if cmd.is_empty() {
        bail!("--xdotool-cmd must not be empty");
    }
    if cmd.eq_ignore_ascii_case(XDOTOOL_BINARY) {
        return Ok(XDOTOOL_BINARY.to_string());
    }
    if !cmd.contains('/') {
        bail!("--xdotool-cmd must be '{XDOTOOL_BINARY}' or a path to it, got '{cmd}'");
    }

    let resolved =
        fs::canonicalize(cmd).with_context(|| format!("--xdotool-cmd '{cmd}' does not exist"))?;
    let metadata = fs::metadata(&resolved)
        .with_context(|| format!("cannot inspect --xdotool-cmd '{}'", resolved.display()))?;
    if !metadata.is_file() || metadata.permissions().mode() & 0o111 == 0 {
        bail!(
            "--xdotool-cmd '{}' is not an executable file",
            resolved.display()
        );
    }
    resolved
        .into_os_string()
        .into_string()
        .map_err(|_| anyhow!("--xdotool-cmd path must be valid UTF-8"))
}
