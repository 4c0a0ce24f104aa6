//! Session lifecycle: `Idle -> Starting -> Running -> Closing -> Closed`.
//!
//! The coordinator lives on the foreground thread. Start launches the
//! emulator, opens the command feed, and hands both to the dispatch worker.
//! Shutdown runs once, in order: disarm, terminate, close feed, join.

mod signals;
mod worker;

use crate::config::SessionConfig;
use crate::desktop::{Desktop, WindowId};
use crate::dispatch::DispatchCycle;
use crate::feed::CommandFeed;
use crate::supervisor::{EmulatorSession, Supervisor};
use anyhow::{anyhow, bail, Context, Result};
use crossbeam_channel::{unbounded, Receiver, Sender};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

pub use signals::{install_termination_handlers, signal_name, take_termination_signal};
pub use worker::WorkerStats;

use worker::{spawn_worker, WorkerHandle};

/// Upper bound on each shutdown wait for the dispatch worker.
const WORKER_STOP_TIMEOUT: Duration = Duration::from_secs(3);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Idle,
    Starting,
    Running,
    Closing,
    Closed,
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            LifecycleState::Idle => "idle",
            LifecycleState::Starting => "starting",
            LifecycleState::Running => "running",
            LifecycleState::Closing => "closing",
            LifecycleState::Closed => "closed",
        };
        f.write_str(label)
    }
}

/// Why a shutdown was requested.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShutdownReason {
    User,
    Signal(i32),
    Fatal(String),
}

impl fmt::Display for ShutdownReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShutdownReason::User => write!(f, "requested by user"),
            ShutdownReason::Signal(signal) => write!(f, "received {}", signal_name(*signal)),
            ShutdownReason::Fatal(detail) => write!(f, "fatal error: {detail}"),
        }
    }
}

/// Cloneable trigger for shutdown. Only the first request is forwarded.
#[derive(Clone)]
pub struct ShutdownHandle {
    requested: Arc<AtomicBool>,
    tx: Sender<ShutdownReason>,
}

impl ShutdownHandle {
    pub fn channel() -> (Self, Receiver<ShutdownReason>) {
        let (tx, rx) = unbounded();
        (
            Self {
                requested: Arc::new(AtomicBool::new(false)),
                tx,
            },
            rx,
        )
    }

    /// Returns whether this call was the one forwarded.
    pub fn request(&self, reason: ShutdownReason) -> bool {
        if self.requested.swap(true, Ordering::SeqCst) {
            tracing::debug!("shutdown already requested; ignoring ({reason})");
            return false;
        }
        tracing::info!("shutdown requested: {reason}");
        let _ = self.tx.send(reason);
        true
    }

    pub fn is_requested(&self) -> bool {
        self.requested.load(Ordering::SeqCst)
    }
}

/// What the shutdown sequence actually did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ShutdownSummary {
    pub process_terminated: bool,
    pub feed_closed: bool,
    pub stats: Option<WorkerStats>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusSnapshot {
    pub state: LifecycleState,
    pub pid: Option<u32>,
    /// Emulator window, once launch or a dispatch tick has found it.
    pub window: Option<WindowId>,
    pub uptime: Option<Duration>,
}

pub struct Coordinator {
    config: SessionConfig,
    desktop: Arc<dyn Desktop>,
    supervisor: Supervisor,
    shutdown: ShutdownHandle,
    state: LifecycleState,
    session: Option<EmulatorSession>,
    worker: Option<WorkerHandle>,
    started_at: Option<Instant>,
}

impl Coordinator {
    pub fn new(config: SessionConfig, desktop: Arc<dyn Desktop>, shutdown: ShutdownHandle) -> Self {
        let supervisor = Supervisor::new(
            desktop.clone(),
            config.window.clone(),
            config.terminate_grace,
        );
        Self {
            config,
            desktop,
            supervisor,
            shutdown,
            state: LifecycleState::Idle,
            session: None,
            worker: None,
            started_at: None,
        }
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        self.shutdown.clone()
    }

    pub fn status(&self) -> StatusSnapshot {
        StatusSnapshot {
            state: self.state,
            pid: self.session.as_ref().map(EmulatorSession::pid),
            window: self.session.as_ref().and_then(EmulatorSession::window),
            uptime: self.started_at.map(|started| started.elapsed()),
        }
    }

    /// Launch the emulator and start dispatching. Only valid from `Idle`;
    /// on failure the coordinator is back in `Idle` with nothing left running.
    pub fn start(&mut self) -> Result<()> {
        if self.state != LifecycleState::Idle {
            bail!("cannot start while {}", self.state);
        }
        self.state = LifecycleState::Starting;
        match self.launch() {
            Ok(()) => {
                self.state = LifecycleState::Running;
                self.started_at = Some(Instant::now());
                tracing::info!("session running");
                Ok(())
            }
            Err(err) => {
                self.state = LifecycleState::Idle;
                tracing::warn!("start did not succeed: {err:#}");
                Err(err)
            }
        }
    }

    fn launch(&mut self) -> Result<()> {
        let session = self
            .supervisor
            .launch(&self.config.launch)
            .context("failed to launch emulator")?;

        let feed = match CommandFeed::open(&self.config.command_file) {
            Ok(feed) => feed,
            Err(err) => {
                self.supervisor.terminate(&session);
                return Err(anyhow!(err).context("failed to open command feed"));
            }
        };

        let cycle = DispatchCycle::new(
            feed,
            self.desktop.clone(),
            self.config.keymap.clone(),
            self.config.window.clone(),
        )
        .with_process(session.process());

        let worker = match spawn_worker(cycle, self.config.tick_interval, self.shutdown.clone()) {
            Ok(worker) => worker,
            Err(err) => {
                self.supervisor.terminate(&session);
                return Err(anyhow!(err).context("failed to spawn dispatch worker"));
            }
        };

        self.session = Some(session);
        self.worker = Some(worker);
        Ok(())
    }

    /// Run the shutdown sequence. Returns `None` when already closing or closed.
    pub fn shutdown(&mut self) -> Option<ShutdownSummary> {
        match self.state {
            LifecycleState::Closing | LifecycleState::Closed => return None,
            LifecycleState::Idle | LifecycleState::Starting => {
                self.state = LifecycleState::Closed;
                tracing::info!("closed without a running session");
                return Some(ShutdownSummary::default());
            }
            LifecycleState::Running => {}
        }

        self.state = LifecycleState::Closing;
        let mut summary = ShutdownSummary::default();

        if let Some(worker) = &self.worker {
            worker.disarm(WORKER_STOP_TIMEOUT);
        }
        if let Some(session) = self.session.take() {
            summary.process_terminated = self.supervisor.terminate(&session);
        }
        if let Some(worker) = self.worker.take() {
            summary.stats = worker.close(WORKER_STOP_TIMEOUT);
            summary.feed_closed = summary.stats.is_some_and(|stats| stats.feed_closed);
        }

        self.state = LifecycleState::Closed;
        self.started_at = None;
        tracing::info!(
            "session ended (emulator terminated: {}, feed closed: {})",
            summary.process_terminated,
            summary.feed_closed
        );
        Some(summary)
    }
}

impl Drop for Coordinator {
    fn drop(&mut self) {
        self.shutdown();
    }
}
