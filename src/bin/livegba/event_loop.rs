use anyhow::{Context, Result};
use crossbeam_channel::{never, select, Receiver};
use livegba::lifecycle::take_termination_signal;
use livegba::{Coordinator, ShutdownReason};
use std::time::Duration;

use crate::control::{ControlCommand, HELP_TEXT};
use crate::status::{format_status, format_summary, print_error, print_info, print_warning};

/// How often pending termination signals are checked.
const SIGNAL_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Drive the coordinator until a shutdown request arrives, then shut it down.
///
/// Without a control channel the session starts immediately and a failed
/// start is returned as an error.
pub(crate) fn run_event_loop(
    coordinator: &mut Coordinator,
    control_rx: Option<Receiver<ControlCommand>>,
    shutdown_rx: &Receiver<ShutdownReason>,
) -> Result<ShutdownReason> {
    let shutdown = coordinator.shutdown_handle();
    if control_rx.is_none() {
        coordinator.start().context("start did not succeed")?;
        print_info(&format_status(&coordinator.status()));
    }

    let closed = never::<ControlCommand>();
    let mut control_open = control_rx.is_some();
    let mut requested = None;
    while requested.is_none() {
        let control = match (&control_rx, control_open) {
            (Some(rx), true) => rx,
            _ => &closed,
        };
        select! {
            recv(control) -> command => match command {
                Ok(command) => handle_control(coordinator, command),
                Err(_) => control_open = false,
            },
            recv(shutdown_rx) -> reason => {
                requested = Some(reason.unwrap_or(ShutdownReason::User));
            },
            default(SIGNAL_POLL_INTERVAL) => {
                if let Some(signal) = take_termination_signal() {
                    shutdown.request(ShutdownReason::Signal(signal));
                }
            },
        }
    }
    let reason = requested.unwrap_or(ShutdownReason::User);

    match &reason {
        ShutdownReason::Fatal(detail) => print_error(&format!("stopping: {detail}")),
        other => print_info(&format!("stopping: {other}")),
    }
    if let Some(summary) = coordinator.shutdown() {
        print_info(&format_summary(&summary));
    }
    Ok(reason)
}

fn handle_control(coordinator: &mut Coordinator, command: ControlCommand) {
    match command {
        ControlCommand::Start => match coordinator.start() {
            Ok(()) => print_info(&format_status(&coordinator.status())),
            Err(err) => print_error(&format!("start did not succeed: {err:#}")),
        },
        ControlCommand::Stop => {
            coordinator.shutdown_handle().request(ShutdownReason::User);
        }
        ControlCommand::Status => print_info(&format_status(&coordinator.status())),
        ControlCommand::Help => println!("{HELP_TEXT}"),
        ControlCommand::Empty => {}
        ControlCommand::Unknown(text) => {
            print_warning(&format!("unknown command {text:?}; type 'help' for commands"))
        }
    }
}
