//! Fixed-interval job runner driven by an external loop.
//!
//! The scheduler never spawns threads or sleeps. The owner calls
//! [`Scheduler::run_pending`] and waits [`Scheduler::time_until_next`] in between.

use std::fmt;
use std::time::{Duration, Instant};

type Callback<C, T> = Box<dyn FnMut(&mut C) -> T + Send>;

struct Job<C, T> {
    interval: Duration,
    next_run: Instant,
    callback: Callback<C, T>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerError {
    AlreadyArmed,
}

impl fmt::Display for SchedulerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchedulerError::AlreadyArmed => write!(f, "a job is already scheduled"),
        }
    }
}

impl std::error::Error for SchedulerError {}

/// Holds at most one periodic job. The callback gets `&mut C` on each run.
pub struct Scheduler<C, T = ()> {
    job: Option<Job<C, T>>,
}

impl<C, T> Default for Scheduler<C, T> {
    fn default() -> Self {
        Self { job: None }
    }
}

impl<C, T> Scheduler<C, T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_armed(&self) -> bool {
        self.job.is_some()
    }

    /// Register the job. First run is one interval from now.
    pub fn arm<F>(&mut self, interval: Duration, callback: F) -> Result<(), SchedulerError>
    where
        F: FnMut(&mut C) -> T + Send + 'static,
    {
        if self.job.is_some() {
            return Err(SchedulerError::AlreadyArmed);
        }
        self.job = Some(Job {
            interval,
            next_run: Instant::now() + interval,
            callback: Box::new(callback),
        });
        Ok(())
    }

    pub fn run_pending(&mut self, context: &mut C) -> Option<T> {
        self.run_pending_at(Instant::now(), context)
    }

    /// Run the job if it is due at `now`. Missed intervals are not replayed:
    /// the next deadline is one interval after the run finishes.
    pub fn run_pending_at(&mut self, now: Instant, context: &mut C) -> Option<T> {
        let job = self.job.as_mut()?;
        if now < job.next_run {
            return None;
        }
        let result = (job.callback)(context);
        job.next_run = Instant::now().max(now) + job.interval;
        Some(result)
    }

    /// Drop the job. Returns whether one was registered.
    pub fn disarm(&mut self) -> bool {
        self.job.take().is_some()
    }

    /// `None` when disarmed; zero when a run is already due.
    pub fn time_until_next(&self) -> Option<Duration> {
        self.job
            .as_ref()
            .map(|job| job.next_run.saturating_duration_since(Instant::now()))
    }
}
