//! OS automation seam: finding the emulator window, checking focus, and
//! injecting key presses. The scheduler only talks to the `Desktop` trait.

mod echo;
#[cfg(test)]
pub(crate) mod fake;
mod xdotool;

use regex::Regex;
use std::fmt;
use std::io;
use std::time::Duration;

pub use echo::EchoDesktop;
pub use xdotool::{x_keysym, Xdotool};

/// Opaque native window identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WindowId(pub u64);

impl fmt::Display for WindowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:x}", self.0)
    }
}

/// Window lookup, focus, and synthetic input for one desktop session.
pub trait Desktop: Send + Sync {
    /// Find a window owned by `pid` (or, failing that, any window) whose title matches.
    fn find_window(&self, pid: u32, title: &Regex) -> Result<Option<WindowId>, DesktopError>;

    /// The window that currently has input focus, if any.
    fn active_window(&self) -> Result<Option<WindowId>, DesktopError>;

    fn activate(&self, window: WindowId) -> Result<(), DesktopError>;

    /// Press and release one key by name.
    fn press(&self, key: &str) -> Result<(), InjectionError>;
}

/// Failure talking to the desktop automation backend.
#[derive(Debug)]
pub enum DesktopError {
    Spawn { command: String, source: io::Error },
    Failed { command: String, detail: String },
    Parse { command: String, output: String },
    /// The command overran its time budget and was killed.
    TimedOut { command: String, waited: Duration },
}

impl fmt::Display for DesktopError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DesktopError::Spawn { command, source } => {
                write!(f, "failed to run '{command}': {source}")
            }
            DesktopError::Failed { command, detail } => write!(f, "'{command}' failed: {detail}"),
            DesktopError::Parse { command, output } => {
                write!(f, "unexpected output from '{command}': {output:?}")
            }
            DesktopError::TimedOut { command, waited } => write!(
                f,
                "'{command}' did not finish within {}ms",
                waited.as_millis()
            ),
        }
    }
}

impl std::error::Error for DesktopError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DesktopError::Spawn { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Failure pressing a single key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InjectionError {
    /// The token has no key the backend can press (e.g. an empty line).
    Unmapped(String),
    /// The backend ran but refused the key.
    Rejected { key: String, reason: String },
    /// The backend itself is gone; no later key can succeed either.
    Unavailable(String),
}

impl InjectionError {
    /// Whether the rest of the batch (and session) can still proceed.
    pub fn is_fatal(&self) -> bool {
        matches!(self, InjectionError::Unavailable(_))
    }
}

impl fmt::Display for InjectionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InjectionError::Unmapped(token) => write!(f, "no key mapped for {token:?}"),
            InjectionError::Rejected { key, reason } => {
                write!(f, "key {key:?} rejected: {reason}")
            }
            InjectionError::Unavailable(reason) => {
                write!(f, "key injection unavailable: {reason}")
            }
        }
    }
}

impl std::error::Error for InjectionError {}
