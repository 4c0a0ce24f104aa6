//! Background dispatch thread.
//!
//! The worker owns the dispatch cycle and its scheduler. It sleeps on its
//! command channel until the next tick is due, so disarm and close requests
//! are seen immediately.

use super::{ShutdownHandle, ShutdownReason};
use crate::dispatch::{DispatchCycle, DispatchError, TickOutcome};
use crate::scheduler::Scheduler;
use crossbeam_channel::{bounded, unbounded, Receiver, RecvTimeoutError, Sender};
use std::io;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

const JOIN_POLL_INTERVAL: Duration = Duration::from_millis(5);

pub(crate) enum WorkerCommand {
    /// Stop scheduling ticks. `ack` fires once any in-flight tick has finished.
    Disarm { ack: Sender<()> },
    /// Close the command feed and exit.
    Close,
}

/// Counters returned by the worker when it exits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkerStats {
    pub ticks: u64,
    pub sent: u64,
    pub failed: u64,
    /// Ticks that held commands back because the window was unfocused or missing.
    pub skipped: u64,
    pub feed_closed: bool,
}

impl WorkerStats {
    fn record(&mut self, outcome: TickOutcome) {
        self.ticks += 1;
        match outcome {
            TickOutcome::Idle => {}
            TickOutcome::Dispatched { sent, failed } => {
                self.sent += sent as u64;
                self.failed += failed as u64;
            }
            TickOutcome::Unfocused { .. } | TickOutcome::WindowUnresolved { .. } => {
                self.skipped += 1;
            }
        }
    }
}

pub(crate) struct WorkerHandle {
    commands: Sender<WorkerCommand>,
    join: JoinHandle<WorkerStats>,
}

impl WorkerHandle {
    /// Disarm the scheduler and wait up to `timeout` for the worker to confirm.
    pub(crate) fn disarm(&self, timeout: Duration) -> bool {
        let (ack_tx, ack_rx) = bounded(1);
        if self.commands.send(WorkerCommand::Disarm { ack: ack_tx }).is_err() {
            tracing::warn!("dispatch worker already gone before disarm");
            return false;
        }
        match ack_rx.recv_timeout(timeout) {
            Ok(()) => true,
            Err(_) => {
                tracing::warn!(
                    "dispatch worker did not confirm disarm within {}ms",
                    timeout.as_millis()
                );
                false
            }
        }
    }

    /// Ask the worker to close the feed and exit, then join it.
    ///
    /// A worker still stuck in a tick after `timeout` is detached and `None`
    /// is returned; it exits on its own once the tick returns.
    pub(crate) fn close(self, timeout: Duration) -> Option<WorkerStats> {
        if self.commands.send(WorkerCommand::Close).is_err() {
            tracing::warn!("dispatch worker already gone before close");
        }
        let deadline = Instant::now() + timeout;
        while !self.join.is_finished() {
            if Instant::now() >= deadline {
                tracing::warn!(
                    "dispatch worker still busy after {}ms; detaching it",
                    timeout.as_millis()
                );
                return None;
            }
            thread::sleep(JOIN_POLL_INTERVAL);
        }
        match self.join.join() {
            Ok(stats) => Some(stats),
            Err(_) => {
                tracing::error!("dispatch worker panicked");
                None
            }
        }
    }
}

pub(crate) fn spawn_worker(
    cycle: DispatchCycle,
    interval: Duration,
    shutdown: ShutdownHandle,
) -> io::Result<WorkerHandle> {
    let (commands, receiver) = unbounded();
    let join = thread::Builder::new()
        .name("livegba-dispatch".to_string())
        .spawn(move || run_worker(cycle, interval, receiver, shutdown))?;
    Ok(WorkerHandle { commands, join })
}

fn run_worker(
    mut cycle: DispatchCycle,
    interval: Duration,
    commands: Receiver<WorkerCommand>,
    shutdown: ShutdownHandle,
) -> WorkerStats {
    let mut stats = WorkerStats::default();
    let mut scheduler: Scheduler<DispatchCycle, Result<TickOutcome, DispatchError>> =
        Scheduler::new();
    if let Err(err) = scheduler.arm(interval, |cycle: &mut DispatchCycle| cycle.tick()) {
        tracing::error!("failed to arm dispatch job: {err}");
    }
    tracing::info!("dispatch worker running every {}ms", interval.as_millis());

    loop {
        let message = match scheduler.time_until_next() {
            Some(wait) => commands.recv_timeout(wait),
            None => commands
                .recv()
                .map_err(|_| RecvTimeoutError::Disconnected),
        };
        match message {
            Ok(WorkerCommand::Disarm { ack }) => {
                if scheduler.disarm() {
                    tracing::debug!("dispatch job disarmed");
                }
                let _ = ack.send(());
            }
            Ok(WorkerCommand::Close) => break,
            Err(RecvTimeoutError::Timeout) => match scheduler.run_pending(&mut cycle) {
                Some(Ok(outcome)) => stats.record(outcome),
                Some(Err(err)) => {
                    stats.ticks += 1;
                    tracing::error!("dispatch stopped: {err}");
                    scheduler.disarm();
                    shutdown.request(ShutdownReason::Fatal(err.to_string()));
                }
                None => {}
            },
            Err(RecvTimeoutError::Disconnected) => {
                tracing::warn!("dispatch worker lost its controller");
                break;
            }
        }
    }

    stats.feed_closed = cycle.close();
    tracing::info!(
        "dispatch worker exiting: {} tick(s), {} sent, {} failed, {} skipped",
        stats.ticks,
        stats.sent,
        stats.failed,
        stats.skipped
    );
    stats
}
