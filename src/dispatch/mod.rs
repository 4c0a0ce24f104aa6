//! One dispatch pass: read new commands, check the emulator window, press keys.
//!
//! The cycle owns the command feed and the pending queue. It runs on the
//! worker thread only, so neither needs a lock.


use crate::config::{KeyMap, WindowConfig};
use crate::desktop::{Desktop, InjectionError, WindowId};
use crate::feed::CommandFeed;
use crate::supervisor::{resolve_window, ProcessHandle, SupervisorError};
use std::fmt;
use std::sync::Arc;

/// One trimmed line from the command file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command(String);

impl Command {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Commands read but not yet sent. Drained whole, never partially.
#[derive(Debug, Default)]
pub struct PendingQueue {
    items: Vec<Command>,
}

impl PendingQueue {
    pub fn extend<I: IntoIterator<Item = String>>(&mut self, lines: I) {
        self.items.extend(lines.into_iter().map(Command::new));
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn commands(&self) -> &[Command] {
        &self.items
    }

    fn take(&mut self) -> Vec<Command> {
        std::mem::take(&mut self.items)
    }
}

/// What a single tick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Nothing new and nothing queued.
    Idle,
    Dispatched { sent: usize, failed: usize },
    /// The emulator window is not focused; the queue was kept.
    Unfocused { retained: usize },
    /// No emulator window could be found yet; the queue was kept.
    WindowUnresolved { retained: usize },
}

/// Errors that end the session.
#[derive(Debug)]
pub enum DispatchError {
    ProcessGone(SupervisorError),
    InjectorUnavailable(InjectionError),
}

impl fmt::Display for DispatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DispatchError::ProcessGone(err) => write!(f, "{err}"),
            DispatchError::InjectorUnavailable(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for DispatchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DispatchError::ProcessGone(err) => Some(err),
            DispatchError::InjectorUnavailable(err) => Some(err),
        }
    }
}

pub struct DispatchCycle {
    feed: CommandFeed,
    queue: PendingQueue,
    desktop: Arc<dyn Desktop>,
    keymap: KeyMap,
    window_config: WindowConfig,
    window: Option<WindowId>,
    process: Option<ProcessHandle>,
}

impl DispatchCycle {
    pub fn new(
        feed: CommandFeed,
        desktop: Arc<dyn Desktop>,
        keymap: KeyMap,
        window_config: WindowConfig,
    ) -> Self {
        Self {
            feed,
            queue: PendingQueue::default(),
            desktop,
            keymap,
            window_config,
            window: None,
            process: None,
        }
    }

    /// Bind the cycle to a launched emulator, starting from its known window.
    pub fn with_process(mut self, process: ProcessHandle) -> Self {
        self.window = process.window();
        self.process = Some(process);
        self
    }

    pub fn pending(&self) -> &PendingQueue {
        &self.queue
    }

    pub fn window(&self) -> Option<WindowId> {
        self.window
    }

    pub fn tick(&mut self) -> Result<TickOutcome, DispatchError> {
        if let Some(process) = &self.process {
            process.check_alive().map_err(DispatchError::ProcessGone)?;
        }

        match self.feed.poll_new_lines() {
            Ok(lines) => self.queue.extend(lines),
            Err(err) => tracing::warn!("{err}; treating as no new lines"),
        }
        if self.queue.is_empty() {
            tracing::debug!("no more new lines to read, skipping");
            return Ok(TickOutcome::Idle);
        }

        let Some(window) = self.current_window() else {
            tracing::debug!(
                "emulator window not found yet; holding {} command(s)",
                self.queue.len()
            );
            return Ok(TickOutcome::WindowUnresolved {
                retained: self.queue.len(),
            });
        };

        if !self.is_focused(window) {
            tracing::info!(
                "emulator window {window} is not focused; holding {} command(s)",
                self.queue.len()
            );
            if self.window_config.activate {
                if let Err(err) = self.desktop.activate(window) {
                    tracing::warn!("failed to activate emulator window {window}: {err}");
                }
            }
            return Ok(TickOutcome::Unfocused {
                retained: self.queue.len(),
            });
        }

        self.dispatch_queue()
    }

    /// Release the command file. Returns whether this call closed it.
    pub fn close(&mut self) -> bool {
        self.feed.close()
    }

    fn current_window(&mut self) -> Option<WindowId> {
        if self.window.is_none() {
            let pid = self.process.as_ref().map_or(0, ProcessHandle::pid);
            self.window = resolve_window(self.desktop.as_ref(), pid, &self.window_config);
            if let Some(window) = self.window {
                tracing::info!("emulator window {window} resolved for pid {pid}");
                if let Some(process) = &self.process {
                    process.record_window(window);
                }
            }
        }
        self.window
    }

    fn is_focused(&self, window: WindowId) -> bool {
        match self.desktop.active_window() {
            Ok(active) => active == Some(window),
            Err(err) => {
                tracing::warn!("focus query failed: {err}");
                false
            }
        }
    }

    fn dispatch_queue(&mut self) -> Result<TickOutcome, DispatchError> {
        let commands = self.queue.take();
        let mut sent = 0;
        let mut failed = 0;
        for command in &commands {
            let key = self.keymap.resolve(command.as_str());
            tracing::info!("pressing key {key:?}");
            match self.desktop.press(key) {
                Ok(()) => sent += 1,
                Err(err) if err.is_fatal() => {
                    tracing::error!("{err}");
                    return Err(DispatchError::InjectorUnavailable(err));
                }
                Err(err) => {
                    failed += 1;
                    tracing::warn!("skipping command {command:?}: {err}");
                }
            }
        }
        Ok(TickOutcome::Dispatched { sent, failed })
    }
}
