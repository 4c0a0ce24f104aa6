//! Emulator process supervision.
//!
//! Spawns the emulator with the ROM, waits for its window to show up, and tears
//! the process down (SIGTERM, then SIGKILL) when the session ends.

mod process;

use crate::config::WindowConfig;
use crate::desktop::{Desktop, WindowId};
use crate::lock_or_recover;
use std::fmt;
use std::io;
use std::path::PathBuf;
use std::process::ExitStatus;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

pub use process::EmulatorProcess;

/// What to launch: `executable rom [args...]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchSpec {
    pub executable: PathBuf,
    pub rom: PathBuf,
    pub args: Vec<String>,
}

#[derive(Debug)]
pub enum SupervisorError {
    /// The emulator could not be spawned.
    Launch { executable: PathBuf, source: io::Error },
    /// No matching window appeared in time. Not fatal to the session.
    WindowNotFound { pid: u32, waited: Duration },
    /// The emulator exited while the session was still running.
    ProcessGone { pid: u32, status: ExitStatus },
}

impl fmt::Display for SupervisorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SupervisorError::Launch { executable, source } => {
                write!(f, "failed to launch '{}': {source}", executable.display())
            }
            SupervisorError::WindowNotFound { pid, waited } => write!(
                f,
                "no emulator window for pid {pid} after {}ms",
                waited.as_millis()
            ),
            SupervisorError::ProcessGone { pid, status } => {
                write!(f, "emulator (pid {pid}) exited unexpectedly: {status}")
            }
        }
    }
}

impl std::error::Error for SupervisorError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SupervisorError::Launch { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Shared handle to the running emulator process.
///
/// The coordinator terminates through it. The dispatch worker probes liveness
/// and records the window once it finds one.
#[derive(Clone)]
pub struct ProcessHandle {
    pid: u32,
    inner: Arc<Mutex<EmulatorProcess>>,
    window: Arc<Mutex<Option<WindowId>>>,
}

impl ProcessHandle {
    pub fn pid(&self) -> u32 {
        self.pid
    }

    /// Emulator window, once resolved at launch or by a later dispatch tick.
    pub fn window(&self) -> Option<WindowId> {
        *lock_or_recover(&self.window, "emulator window")
    }

    pub(crate) fn record_window(&self, window: WindowId) {
        *lock_or_recover(&self.window, "emulator window") = Some(window);
    }

    /// Non-blocking liveness probe; reaps the child if it already exited.
    pub fn check_alive(&self) -> Result<(), SupervisorError> {
        lock_or_recover(&self.inner, "emulator process").check_alive()
    }

    pub fn is_running(&self) -> bool {
        lock_or_recover(&self.inner, "emulator process").is_running()
    }
}

/// One launched emulator and its window, if known.
pub struct EmulatorSession {
    process: ProcessHandle,
}

impl EmulatorSession {
    pub fn pid(&self) -> u32 {
        self.process.pid
    }

    pub fn window(&self) -> Option<WindowId> {
        self.process.window()
    }

    pub fn process(&self) -> ProcessHandle {
        self.process.clone()
    }
}

/// Starts and stops emulator sessions against one desktop.
pub struct Supervisor {
    desktop: Arc<dyn Desktop>,
    window: WindowConfig,
    terminate_grace: Duration,
}

impl Supervisor {
    pub fn new(desktop: Arc<dyn Desktop>, window: WindowConfig, terminate_grace: Duration) -> Self {
        Self {
            desktop,
            window,
            terminate_grace,
        }
    }

    /// Spawn the emulator, then wait (bounded) for its window.
    ///
    /// A missing window is logged and leaves the session with no window; the
    /// dispatch cycle keeps looking for it.
    pub fn launch(&self, spec: &LaunchSpec) -> Result<EmulatorSession, SupervisorError> {
        let process = EmulatorProcess::spawn(spec)?;
        let pid = process.pid();
        tracing::info!("emulator process started, pid: [{pid}]");

        let window = match self.wait_for_window(pid) {
            Ok(window) => {
                tracing::info!("emulator window {window} resolved for pid {pid}");
                Some(window)
            }
            Err(err) => {
                tracing::warn!("{err}; dispatch will wait for the window");
                None
            }
        };

        Ok(EmulatorSession {
            process: ProcessHandle {
                pid,
                inner: Arc::new(Mutex::new(process)),
                window: Arc::new(Mutex::new(window)),
            },
        })
    }

    /// Single lookup attempt; desktop errors count as "not found".
    pub fn resolve_window(&self, pid: u32) -> Option<WindowId> {
        resolve_window(self.desktop.as_ref(), pid, &self.window)
    }

    /// Poll for the emulator window until `window.timeout` elapses.
    pub fn wait_for_window(&self, pid: u32) -> Result<WindowId, SupervisorError> {
        let start = Instant::now();
        loop {
            if let Some(window) = self.resolve_window(pid) {
                return Ok(window);
            }
            let waited = start.elapsed();
            if waited >= self.window.timeout {
                return Err(SupervisorError::WindowNotFound { pid, waited });
            }
            thread::sleep(self.window.poll.min(self.window.timeout - waited));
        }
    }

    /// Stop the emulator if it is still running. Returns whether it had to be killed.
    pub fn terminate(&self, session: &EmulatorSession) -> bool {
        lock_or_recover(&session.process.inner, "emulator process").terminate(self.terminate_grace)
    }
}

pub(crate) fn resolve_window(
    desktop: &dyn Desktop,
    pid: u32,
    window: &WindowConfig,
) -> Option<WindowId> {
    match desktop.find_window(pid, &window.title) {
        Ok(found) => found,
        Err(err) => {
            tracing::debug!("window lookup failed: {err}");
            None
        }
    }
}
