use super::{Desktop, DesktopError, InjectionError, WindowId};
use crate::config::DEFAULT_XDOTOOL_TIMEOUT_MS;
use regex::Regex;
use std::io::ErrorKind;
use std::process::{Command, Output, Stdio};
use std::thread;
use std::time::{Duration, Instant};

const EXIT_POLL_INTERVAL: Duration = Duration::from_millis(5);

/// X11 desktop driven through the `xdotool` CLI.
///
/// Every call is bounded by `timeout`; a call that overruns is killed.
#[derive(Debug, Clone)]
pub struct Xdotool {
    command: String,
    timeout: Duration,
}

impl Xdotool {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            timeout: Duration::from_millis(DEFAULT_XDOTOOL_TIMEOUT_MS),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn describe(&self, args: &[&str]) -> String {
        let mut parts = vec![self.command.as_str()];
        parts.extend_from_slice(args);
        parts.join(" ")
    }

    fn run(&self, args: &[&str]) -> Result<Output, DesktopError> {
        let spawn_error = |source: std::io::Error| DesktopError::Spawn {
            command: self.describe(args),
            source,
        };
        let mut child = Command::new(&self.command)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(spawn_error)?;

        let start = Instant::now();
        loop {
            match child.try_wait() {
                Ok(Some(_)) => break,
                Ok(None) => {}
                Err(source) => {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(spawn_error(source));
                }
            }
            let waited = start.elapsed();
            if waited >= self.timeout {
                let _ = child.kill();
                let _ = child.wait();
                return Err(DesktopError::TimedOut {
                    command: self.describe(args),
                    waited,
                });
            }
            thread::sleep(EXIT_POLL_INTERVAL);
        }
        // Output is a few ids or a name, well under the pipe buffer.
        child.wait_with_output().map_err(spawn_error)
    }

    /// `search` exits non-zero when nothing matched; that is an empty result, not an error.
    fn window_ids(&self, args: &[&str]) -> Result<Vec<WindowId>, DesktopError> {
        let output = self.run(args)?;
        let stdout = String::from_utf8_lossy(&output.stdout);
        if !output.status.success() && stdout.trim().is_empty() {
            return Ok(Vec::new());
        }
        parse_window_ids(&stdout).ok_or_else(|| DesktopError::Parse {
            command: self.describe(args),
            output: stdout.to_string(),
        })
    }

    fn window_name(&self, window: WindowId) -> Result<Option<String>, DesktopError> {
        let id = window.0.to_string();
        let output = self.run(&["getwindowname", &id])?;
        if !output.status.success() {
            // The window can vanish between search and lookup.
            return Ok(None);
        }
        Ok(Some(
            String::from_utf8_lossy(&output.stdout).trim().to_string(),
        ))
    }

    fn first_titled(
        &self,
        candidates: &[WindowId],
        title: &Regex,
    ) -> Result<Option<WindowId>, DesktopError> {
        for &window in candidates {
            if let Some(name) = self.window_name(window)? {
                if title.is_match(&name) {
                    return Ok(Some(window));
                }
            }
        }
        Ok(None)
    }
}

impl Desktop for Xdotool {
    fn find_window(&self, pid: u32, title: &Regex) -> Result<Option<WindowId>, DesktopError> {
        let pid = pid.to_string();
        let owned = self.window_ids(&["search", "--pid", &pid])?;
        if let Some(window) = self.first_titled(&owned, title)? {
            return Ok(Some(window));
        }
        // Some emulator builds re-exec, so the window may belong to another pid.
        let named = self.window_ids(&["search", "--name", title.as_str()])?;
        self.first_titled(&named, title)
    }

    fn active_window(&self) -> Result<Option<WindowId>, DesktopError> {
        let args = ["getactivewindow"];
        let output = self.run(&args)?;
        if !output.status.success() {
            return Ok(None);
        }
        let stdout = String::from_utf8_lossy(&output.stdout);
        match parse_window_ids(&stdout) {
            Some(ids) => Ok(ids.first().copied()),
            None => Err(DesktopError::Parse {
                command: self.describe(&args),
                output: stdout.to_string(),
            }),
        }
    }

    fn activate(&self, window: WindowId) -> Result<(), DesktopError> {
        let id = window.0.to_string();
        // No `--sync`: it waits for the window manager, possibly forever.
        let args = ["windowactivate", id.as_str()];
        let output = self.run(&args)?;
        if output.status.success() {
            Ok(())
        } else {
            Err(DesktopError::Failed {
                command: self.describe(&args),
                detail: failure_detail(&output),
            })
        }
    }

    fn press(&self, key: &str) -> Result<(), InjectionError> {
        let keysym = x_keysym(key).ok_or_else(|| InjectionError::Unmapped(key.to_string()))?;
        let output = self
            .run(&["key", "--clearmodifiers", &keysym])
            .map_err(|err| match &err {
                DesktopError::Spawn { source, .. } if source.kind() == ErrorKind::NotFound => {
                    InjectionError::Unavailable(format!("{} not found", self.command))
                }
                DesktopError::TimedOut { .. } => InjectionError::Rejected {
                    key: keysym.clone(),
                    reason: err.to_string(),
                },
                _ => InjectionError::Unavailable(err.to_string()),
            })?;
        if output.status.success() {
            Ok(())
        } else {
            Err(InjectionError::Rejected {
                key: keysym,
                reason: failure_detail(&output),
            })
        }
    }
}

fn failure_detail(output: &Output) -> String {
    let stderr = String::from_utf8_lossy(&output.stderr);
    let stderr = stderr.trim();
    if stderr.is_empty() {
        format!("exited with {}", output.status)
    } else {
        stderr.to_string()
    }
}

/// One decimal window id per line; `None` if any line is not a number.
pub(super) fn parse_window_ids(stdout: &str) -> Option<Vec<WindowId>> {
    stdout
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| line.parse::<u64>().ok().map(WindowId))
        .collect()
}

/// Translate a friendly key name (`up`, `enter`, `z`) into an X keysym.
///
/// Unknown multi-character names pass through so raw keysyms like `KP_Enter` work.
pub fn x_keysym(token: &str) -> Option<String> {
    let token = token.trim();
    if token.is_empty() {
        return None;
    }
    let lower = token.to_ascii_lowercase();
    let named = match lower.as_str() {
        "up" => "Up",
        "down" => "Down",
        "left" => "Left",
        "right" => "Right",
        "enter" | "return" => "Return",
        "esc" | "escape" => "Escape",
        "space" => "space",
        "tab" => "Tab",
        "backspace" => "BackSpace",
        "delete" | "del" => "Delete",
        "insert" => "Insert",
        "home" => "Home",
        "end" => "End",
        "pageup" | "pgup" => "Prior",
        "pagedown" | "pgdn" => "Next",
        "shift" | "shiftleft" => "Shift_L",
        "shiftright" => "Shift_R",
        "ctrl" | "ctrlleft" => "Control_L",
        "ctrlright" => "Control_R",
        "alt" | "altleft" => "Alt_L",
        "altright" => "Alt_R",
        "," => "comma",
        "." => "period",
        "/" => "slash",
        ";" => "semicolon",
        "'" => "apostrophe",
        "-" => "minus",
        "=" => "equal",
        "[" => "bracketleft",
        "]" => "bracketright",
        "\\" => "backslash",
        "`" => "grave",
        _ => {
            if let Some(number) = lower.strip_prefix('f').and_then(|n| n.parse::<u8>().ok()) {
                if (1..=24).contains(&number) {
                    return Some(format!("F{number}"));
                }
            }
            return Some(token.to_string());
        }
    };
    Some(named.to_string())
}
