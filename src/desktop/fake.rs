//! Scriptable desktop double for scheduler and lifecycle tests.

use super::{Desktop, DesktopError, InjectionError, WindowId};
use crate::lock_or_recover;
use regex::Regex;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::thread;
use std::time::Duration;

pub(crate) const FAKE_WINDOW: WindowId = WindowId(7);
const OTHER_WINDOW: WindowId = WindowId(99);

pub(crate) struct FakeDesktop {
    visible: AtomicBool,
    focused: AtomicBool,
    unavailable: AtomicBool,
    presses: Mutex<Vec<String>>,
    rejected: Mutex<HashSet<String>>,
    press_delay: Mutex<Duration>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    lookups: AtomicUsize,
    activations: AtomicUsize,
}

impl FakeDesktop {
    pub(crate) fn new() -> Self {
        Self {
            visible: AtomicBool::new(true),
            focused: AtomicBool::new(true),
            unavailable: AtomicBool::new(false),
            presses: Mutex::new(Vec::new()),
            rejected: Mutex::new(HashSet::new()),
            press_delay: Mutex::new(Duration::ZERO),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            lookups: AtomicUsize::new(0),
            activations: AtomicUsize::new(0),
        }
    }

    pub(crate) fn set_visible(&self, visible: bool) {
        self.visible.store(visible, Ordering::SeqCst);
    }

    pub(crate) fn set_focused(&self, focused: bool) {
        self.focused.store(focused, Ordering::SeqCst);
    }

    pub(crate) fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub(crate) fn reject(&self, key: &str) {
        lock_or_recover(&self.rejected, "fake rejected").insert(key.to_string());
    }

    pub(crate) fn set_press_delay(&self, delay: Duration) {
        *lock_or_recover(&self.press_delay, "fake delay") = delay;
    }

    pub(crate) fn presses(&self) -> Vec<String> {
        lock_or_recover(&self.presses, "fake presses").clone()
    }

    pub(crate) fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub(crate) fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }

    pub(crate) fn activations(&self) -> usize {
        self.activations.load(Ordering::SeqCst)
    }
}

impl Desktop for FakeDesktop {
    fn find_window(&self, _pid: u32, _title: &Regex) -> Result<Option<WindowId>, DesktopError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        Ok(self.visible.load(Ordering::SeqCst).then_some(FAKE_WINDOW))
    }

    fn active_window(&self) -> Result<Option<WindowId>, DesktopError> {
        if self.focused.load(Ordering::SeqCst) {
            Ok(Some(FAKE_WINDOW))
        } else {
            Ok(Some(OTHER_WINDOW))
        }
    }

    fn activate(&self, _window: WindowId) -> Result<(), DesktopError> {
        self.activations.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn press(&self, key: &str) -> Result<(), InjectionError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(InjectionError::Unavailable("fake backend offline".to_string()));
        }
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        let delay = *lock_or_recover(&self.press_delay, "fake delay");
        if !delay.is_zero() {
            thread::sleep(delay);
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if key.is_empty() {
            return Err(InjectionError::Unmapped(key.to_string()));
        }
        if lock_or_recover(&self.rejected, "fake rejected").contains(key) {
            return Err(InjectionError::Rejected {
                key: key.to_string(),
                reason: "rejected by fake".to_string(),
            });
        }
        lock_or_recover(&self.presses, "fake presses").push(key.to_string());
        Ok(())
    }
}
