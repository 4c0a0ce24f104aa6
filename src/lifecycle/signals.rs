//! SIGINT/SIGTERM capture. The handler only records the signal number;
//! the foreground loop picks it up with [`take_termination_signal`].

use anyhow::{anyhow, Result};
use std::sync::atomic::{AtomicI32, Ordering};

static TERMINATION_SIGNAL: AtomicI32 = AtomicI32::new(0);

extern "C" fn handle_termination(signal: libc::c_int) {
    TERMINATION_SIGNAL.store(signal, Ordering::SeqCst);
}

pub fn install_termination_handlers() -> Result<()> {
    for signal in [libc::SIGINT, libc::SIGTERM] {
        unsafe {
            // SAFETY: handle_termination only stores into an atomic, which is async-signal-safe.
            let handler = handle_termination as *const () as libc::sighandler_t;
            if libc::signal(signal, handler) == libc::SIG_ERR {
                return Err(anyhow!("failed to install handler for signal {signal}"));
            }
        }
    }
    tracing::debug!("termination signal handlers installed");
    Ok(())
}

/// The last termination signal received since the previous call, if any.
pub fn take_termination_signal() -> Option<i32> {
    match TERMINATION_SIGNAL.swap(0, Ordering::SeqCst) {
        0 => None,
        signal => Some(signal),
    }
}

pub fn signal_name(signal: i32) -> &'static str {
    match signal {
        libc::SIGINT => "SIGINT",
        libc::SIGTERM => "SIGTERM",
        _ => "signal",
    }
}
