//! livegba entrypoint: tail a command file and press its keys in an emulator window.
//!
//! - Foreground: event loop, control commands, signal polling, coordinator
//! - Control thread: reads stdin lines (interactive mode only)
//! - Dispatch worker: owned by the coordinator while a session runs

mod control;
mod event_loop;
mod status;

use anyhow::{bail, Result};
use crossbeam_channel::unbounded;
use crossterm::tty::IsTty;
use livegba::desktop::{Desktop, EchoDesktop, Xdotool};
use livegba::lifecycle::install_termination_handlers;
use livegba::logging::init_logging;
use livegba::{AppConfig, Coordinator, ShutdownHandle, ShutdownReason};
use std::io;
use std::sync::Arc;
use std::time::Duration;

use crate::control::{spawn_control_thread, HELP_TEXT};
use crate::event_loop::run_event_loop;

fn main() -> Result<()> {
    let config = AppConfig::parse_args()?;
    init_logging(&config)?;
    tracing::info!("=== livegba started ===");
    if config.logs && !config.no_logs {
        tracing::info!("log file: {}", config.log_file_path().display());
    }

    let session = config.session_config()?;
    install_termination_handlers()?;

    let desktop: Arc<dyn Desktop> = if config.dry_run {
        tracing::info!("dry run: key presses are printed, not sent");
        Arc::new(EchoDesktop)
    } else {
        Arc::new(
            Xdotool::new(config.xdotool_cmd.clone())
                .with_timeout(Duration::from_millis(config.xdotool_timeout_ms)),
        )
    };

    let (shutdown, shutdown_rx) = ShutdownHandle::channel();
    let mut coordinator = Coordinator::new(session, desktop, shutdown);

    let headless = config.headless || !io::stdin().is_tty();
    let control_rx = if headless {
        tracing::info!("headless mode: starting immediately");
        None
    } else {
        let (tx, rx) = unbounded();
        spawn_control_thread(tx);
        println!("{HELP_TEXT}");
        Some(rx)
    };

    match run_event_loop(&mut coordinator, control_rx, &shutdown_rx)? {
        ShutdownReason::Fatal(detail) => bail!("session ended: {detail}"),
        reason => {
            tracing::info!("=== livegba exiting ({reason}) ===");
            Ok(())
        }
    }
}
