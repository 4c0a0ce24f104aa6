use std::env;
use std::fs;
use std::io::{BufRead, BufReader};
use std::process::{Command, Stdio};
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

fn combined_output(output: &std::process::Output) -> String {
    let mut combined = String::new();
    combined.push_str(&String::from_utf8_lossy(&output.stdout));
    combined.push_str(&String::from_utf8_lossy(&output.stderr));
    combined
}

fn livegba_bin() -> &'static str {
    option_env!("CARGO_BIN_EXE_livegba").expect("livegba test binary not built")
}

#[test]
fn livegba_help_mentions_name() {
    let output = Command::new(livegba_bin())
        .arg("--help")
        .output()
        .expect("run livegba --help");
    assert!(output.status.success());
    let combined = combined_output(&output);
    assert!(combined.contains("livegba"));
    assert!(combined.contains("--interval-ms"));
}

#[test]
fn livegba_requires_positionals() {
    let output = Command::new(livegba_bin())
        .output()
        .expect("run livegba without args");
    assert!(!output.status.success());
    assert!(combined_output(&output).contains("COMMAND_FILE"));
}

#[test]
fn livegba_rejects_out_of_range_interval() {
    let output = Command::new(livegba_bin())
        .args(["cmds.txt", "sleep", "30", "--interval-ms", "1", "--dry-run"])
        .stdin(Stdio::null())
        .output()
        .expect("run livegba with bad interval");
    assert!(!output.status.success());
    assert!(combined_output(&output).contains("--interval-ms"));
}

#[test]
fn livegba_headless_dry_run_presses_and_stops_on_sigterm() {
    let stamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    let feed = env::temp_dir().join(format!(
        "livegba-cli-{}-{stamp}.txt",
        std::process::id()
    ));
    fs::write(&feed, "up\nstart\n").expect("write command file");

    let mut child = Command::new(livegba_bin())
        .arg(&feed)
        .args(["sleep", "30", "--dry-run", "--headless", "--interval-ms", "20"])
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("spawn livegba");

    let stdout = child.stdout.take().expect("piped stdout");
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        for line in BufReader::new(stdout).lines().map_while(Result::ok) {
            if tx.send(line).is_err() {
                break;
            }
        }
    });

    let mut pressed = Vec::new();
    while pressed.len() < 2 {
        match rx.recv_timeout(Duration::from_secs(5)) {
            Ok(line) if line.starts_with("pressing ") => pressed.push(line),
            Ok(_) => {}
            Err(_) => break,
        }
    }
    assert_eq!(pressed, vec!["pressing up", "pressing start"]);

    // SAFETY: the pid is our own live child.
    unsafe {
        libc::kill(child.id() as libc::pid_t, libc::SIGTERM);
    }
    let status = child.wait().expect("wait for livegba");
    let _ = fs::remove_file(&feed);
    assert!(status.success(), "livegba exited with {status}");
}
