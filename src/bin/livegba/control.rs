//! Line-based control commands read from stdin.

use crossbeam_channel::Sender;
use std::io::{self, BufRead};
use std::thread;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ControlCommand {
    Start,
    Stop,
    Status,
    Help,
    /// Blank input; ignored by the event loop.
    Empty,
    Unknown(String),
}

pub(crate) fn parse_control_line(line: &str) -> ControlCommand {
    let trimmed = line.trim();
    match trimmed.to_ascii_lowercase().as_str() {
        "" => ControlCommand::Empty,
        "start" | "s" => ControlCommand::Start,
        "stop" | "quit" | "q" | "exit" => ControlCommand::Stop,
        "status" => ControlCommand::Status,
        "help" | "?" => ControlCommand::Help,
        _ => ControlCommand::Unknown(trimmed.to_string()),
    }
}

pub(crate) const HELP_TEXT: &str = "\
commands:
  start, s                 launch the emulator and begin dispatching
  stop, quit, q, exit      shut down and exit
  status                   show the session state
  help, ?                  show this help";

/// Forward parsed stdin lines. End of input counts as `stop`.
pub(crate) fn spawn_control_thread(tx: Sender<ControlCommand>) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        let stdin = io::stdin();
        let mut line = String::new();
        loop {
            line.clear();
            match stdin.lock().read_line(&mut line) {
                Ok(0) => {
                    tracing::debug!("stdin closed");
                    let _ = tx.send(ControlCommand::Stop);
                    return;
                }
                Ok(_) => {}
                Err(err) => {
                    tracing::debug!("stdin read error: {err}");
                    return;
                }
            }
            if tx.send(parse_control_line(&line)).is_err() {
                return;
            }
        }
    })
}
