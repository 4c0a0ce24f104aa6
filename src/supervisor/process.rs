use super::{LaunchSpec, SupervisorError};
use std::io;
use std::os::unix::process::ExitStatusExt;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};

const EXIT_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Owned emulator child process. Remembers its exit status once reaped.
pub struct EmulatorProcess {
    child: Child,
    pid: u32,
    status: Option<ExitStatus>,
}

impl EmulatorProcess {
    /// Start `executable rom [args...]` with stdin detached.
    pub fn spawn(spec: &LaunchSpec) -> Result<Self, SupervisorError> {
        let child = Command::new(&spec.executable)
            .arg(&spec.rom)
            .args(&spec.args)
            .stdin(Stdio::null())
            .spawn()
            .map_err(|source| SupervisorError::Launch {
                executable: spec.executable.clone(),
                source,
            })?;
        let pid = child.id();
        Ok(Self {
            child,
            pid,
            status: None,
        })
    }

    pub fn pid(&self) -> u32 {
        self.pid
    }

    pub fn is_running(&self) -> bool {
        self.status.is_none()
    }

    pub fn check_alive(&mut self) -> Result<(), SupervisorError> {
        if let Some(status) = self.status {
            return Err(SupervisorError::ProcessGone {
                pid: self.pid,
                status,
            });
        }
        match self.child.try_wait() {
            Ok(Some(status)) => {
                self.status = Some(status);
                Err(SupervisorError::ProcessGone {
                    pid: self.pid,
                    status,
                })
            }
            Ok(None) => Ok(()),
            Err(err) => {
                tracing::warn!("failed to poll emulator pid {}: {err}", self.pid);
                Ok(())
            }
        }
    }

    /// SIGTERM, wait up to `grace`, then SIGKILL and reap.
    ///
    /// Returns `false` without doing anything if the process already exited.
    pub fn terminate(&mut self, grace: Duration) -> bool {
        if self.status.is_some() {
            return false;
        }
        if let Ok(Some(status)) = self.child.try_wait() {
            self.status = Some(status);
            return false;
        }

        // SAFETY: pid belongs to our un-reaped child, so it cannot have been recycled.
        if unsafe { libc::kill(self.pid as libc::pid_t, libc::SIGTERM) } != 0 {
            tracing::debug!(
                "SIGTERM to emulator pid {} failed: {}",
                self.pid,
                io::Error::last_os_error()
            );
        }
        if let Some(status) = wait_for_exit(&mut self.child, grace) {
            tracing::info!("emulator pid {} exited: {status}", self.pid);
            self.status = Some(status);
            return true;
        }

        if let Err(err) = self.child.kill() {
            tracing::warn!("SIGKILL to emulator pid {} failed: {err}", self.pid);
        }
        let status = match self.child.wait() {
            Ok(status) => status,
            Err(err) => {
                tracing::warn!("waitpid after SIGKILL failed: {err}");
                ExitStatus::from_raw(libc::SIGKILL)
            }
        };
        tracing::info!("emulator pid {} killed: {status}", self.pid);
        self.status = Some(status);
        true
    }
}

impl Drop for EmulatorProcess {
    fn drop(&mut self) {
        if self.status.is_none() {
            self.terminate(Duration::ZERO);
        }
    }
}

fn wait_for_exit(child: &mut Child, timeout: Duration) -> Option<ExitStatus> {
    let start = Instant::now();
    loop {
        match child.try_wait() {
            Ok(Some(status)) => return Some(status),
            Ok(None) => {}
            Err(_) => return None,
        }
        if start.elapsed() >= timeout {
            return None;
        }
        thread::sleep(EXIT_POLL_INTERVAL);
    }
}
