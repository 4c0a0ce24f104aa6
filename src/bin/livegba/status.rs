//! Styled console lines for the interactive control surface.

use crossterm::style::Stylize;
use livegba::lifecycle::StatusSnapshot;
use livegba::{LifecycleState, ShutdownSummary};

pub(crate) fn format_status(status: &StatusSnapshot) -> String {
    let mut line = format!("state: {}", status.state);
    if let Some(pid) = status.pid {
        line.push_str(&format!(", emulator pid {pid}"));
    }
    match status.window {
        Some(window) => line.push_str(&format!(", window {window}")),
        None if status.state == LifecycleState::Running => {
            line.push_str(", window not found yet")
        }
        None => {}
    }
    if let Some(uptime) = status.uptime {
        line.push_str(&format!(", up {}s", uptime.as_secs()));
    }
    line
}

pub(crate) fn format_summary(summary: &ShutdownSummary) -> String {
    let mut line = format!(
        "session ended (emulator terminated: {}, feed closed: {})",
        yes_no(summary.process_terminated),
        yes_no(summary.feed_closed)
    );
    if let Some(stats) = summary.stats {
        line.push_str(&format!(
            ", {} sent, {} failed, {} tick(s) held",
            stats.sent, stats.failed, stats.skipped
        ));
    }
    line
}

fn yes_no(value: bool) -> &'static str {
    if value {
        "yes"
    } else {
        "no"
    }
}

pub(crate) fn print_info(message: &str) {
    println!("{} {message}", "livegba".cyan().bold());
}

pub(crate) fn print_warning(message: &str) {
    println!("{} {}", "livegba".yellow().bold(), message.yellow());
}

pub(crate) fn print_error(message: &str) {
    eprintln!("{} {}", "livegba".red().bold(), message.red());
}
