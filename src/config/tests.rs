use super::defaults::{GBA_BUTTON_KEYS, MAX_EMULATOR_ARGS};
use super::validation::resolve_xdotool_cmd;
use super::{AppConfig, KeyMap, LogLevel, DEFAULT_TICK_INTERVAL_MS, DEFAULT_XDOTOOL_TIMEOUT_MS};
use clap::Parser;
use std::fs;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use std::{env, path::PathBuf};
use tracing_subscriber::filter::LevelFilter;

const POSITIONALS: [&str; 4] = ["test-app", "cmds.txt", "mgba-qt", "game.gba"];

fn parse_with(extra: &[&str]) -> AppConfig {
    let args: Vec<&str> = POSITIONALS.iter().copied().chain(extra.iter().copied()).collect();
    AppConfig::parse_from(args)
}

fn temp_path(name: &str) -> PathBuf {
    let stamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    env::temp_dir().join(format!("livegba-config-{name}-{}-{stamp}", std::process::id()))
}

#[test]
fn accepts_valid_defaults() {
    let mut cfg = parse_with(&["--dry-run"]);
    assert!(cfg.validate().is_ok());
    assert_eq!(cfg.interval_ms, DEFAULT_TICK_INTERVAL_MS);
    assert_eq!(cfg.window_title, "^mGBA");
}

#[test]
fn positionals_follow_commands_emulator_rom_order() {
    let cfg = parse_with(&[]);
    assert_eq!(cfg.command_file, PathBuf::from("cmds.txt"));
    assert_eq!(cfg.emulator, PathBuf::from("mgba-qt"));
    assert_eq!(cfg.rom, PathBuf::from("game.gba"));
}

#[test]
fn rejects_missing_positionals() {
    assert!(AppConfig::try_parse_from(["test-app", "cmds.txt"]).is_err());
}

#[test]
fn rejects_interval_out_of_bounds() {
    let mut cfg = parse_with(&["--dry-run", "--interval-ms", "5"]);
    assert!(cfg.validate().is_err());
    let mut cfg = parse_with(&["--dry-run", "--interval-ms", "5001"]);
    assert!(cfg.validate().is_err());
}

#[test]
fn accepts_interval_bounds() {
    let mut cfg = parse_with(&["--dry-run", "--interval-ms", "10"]);
    assert!(cfg.validate().is_ok());
    let mut cfg = parse_with(&["--dry-run", "--interval-ms", "5000"]);
    assert!(cfg.validate().is_ok());
}

#[test]
fn rejects_window_poll_out_of_bounds() {
    let mut cfg = parse_with(&["--dry-run", "--window-poll-ms", "1"]);
    assert!(cfg.validate().is_err());
    let mut cfg = parse_with(&["--dry-run", "--window-poll-ms", "6000"]);
    assert!(cfg.validate().is_err());
}

#[test]
fn rejects_excessive_window_timeout_and_grace() {
    let mut cfg = parse_with(&["--dry-run", "--window-timeout-ms", "60001"]);
    assert!(cfg.validate().is_err());
    let mut cfg = parse_with(&["--dry-run", "--terminate-grace-ms", "10001"]);
    assert!(cfg.validate().is_err());
}

#[test]
fn zero_window_timeout_is_allowed() {
    let mut cfg = parse_with(&["--dry-run", "--window-timeout-ms", "0"]);
    assert!(cfg.validate().is_ok());
}

#[test]
fn rejects_invalid_window_title_regex() {
    let mut cfg = parse_with(&["--dry-run", "--window-title", "mGBA ("]);
    assert!(cfg.validate().is_err());
    let mut cfg = parse_with(&["--dry-run", "--window-title", "  "]);
    assert!(cfg.validate().is_err());
}

#[test]
fn emulator_args_are_split_with_shell_rules() {
    let cfg = parse_with(&["--emulator-args", "-3 --log-level 'a b'"]);
    assert_eq!(
        cfg.emulator_arg_list().expect("args parse"),
        vec!["-3", "--log-level", "a b"]
    );
}

#[test]
fn rejects_unbalanced_emulator_args() {
    let mut cfg = parse_with(&["--dry-run", "--emulator-args", "\"unterminated"]);
    assert!(cfg.validate().is_err());
}

#[test]
fn rejects_too_many_emulator_args() {
    let many = vec!["-x"; MAX_EMULATOR_ARGS + 1].join(" ");
    let mut cfg = parse_with(&["--dry-run", "--emulator-args", &many]);
    assert!(cfg.validate().is_err());
}

#[test]
fn rejects_unknown_xdotool_name() {
    let mut cfg = parse_with(&["--xdotool-cmd", "not-xdotool"]);
    assert!(cfg.validate().is_err());
}

#[test]
fn dry_run_skips_xdotool_check() {
    let mut cfg = parse_with(&["--dry-run", "--xdotool-cmd", "not-xdotool"]);
    assert!(cfg.validate().is_ok());
}

#[test]
fn xdotool_cmd_accepts_bare_name_case_insensitively() {
    assert_eq!(
        resolve_xdotool_cmd(" XDOTOOL ").expect("bare name"),
        "xdotool"
    );
    assert!(resolve_xdotool_cmd("").is_err());
    assert!(resolve_xdotool_cmd("ydotool").is_err());
}

#[test]
fn xdotool_cmd_path_must_be_executable() {
    use std::os::unix::fs::PermissionsExt;

    let path = temp_path("xdotool-bin");
    fs::write(&path, "#!/bin/sh\n").expect("write fake binary");
    fs::set_permissions(&path, fs::Permissions::from_mode(0o644)).expect("chmod 644");
    let raw = path.to_string_lossy().to_string();
    assert!(resolve_xdotool_cmd(&raw).is_err());

    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).expect("chmod 755");
    let resolved = resolve_xdotool_cmd(&raw).expect("executable");
    assert!(resolved.ends_with(path.file_name().unwrap().to_str().unwrap()));
    let _ = fs::remove_file(&path);
}

#[test]
fn xdotool_cmd_rejects_directories_and_missing_paths() {
    let dir = env::temp_dir().to_string_lossy().to_string();
    assert!(resolve_xdotool_cmd(&dir).is_err());
    let missing = temp_path("no-xdotool").to_string_lossy().to_string();
    assert!(resolve_xdotool_cmd(&missing).is_err());
}

#[test]
fn rejects_xdotool_timeout_out_of_bounds() {
    let mut cfg = parse_with(&["--dry-run", "--xdotool-timeout-ms", "10"]);
    assert!(cfg.validate().is_err());
    let mut cfg = parse_with(&["--dry-run", "--xdotool-timeout-ms", "30001"]);
    assert!(cfg.validate().is_err());
    let mut cfg = parse_with(&["--dry-run"]);
    assert!(cfg.validate().is_ok());
    assert_eq!(cfg.xdotool_timeout_ms, DEFAULT_XDOTOOL_TIMEOUT_MS);
}

#[test]
fn rejects_missing_keymap_file() {
    let missing = temp_path("missing-keymap");
    let missing = missing.to_string_lossy().to_string();
    let mut cfg = parse_with(&["--dry-run", "--keymap", &missing]);
    assert!(cfg.validate().is_err());
}

#[test]
fn log_level_maps_to_filter() {
    assert_eq!(LogLevel::Error.filter(), LevelFilter::ERROR);
    assert_eq!(LogLevel::Info.filter(), LevelFilter::INFO);
    assert_eq!(LogLevel::Trace.filter(), LevelFilter::TRACE);
    let cfg = parse_with(&["--log-level", "debug"]);
    assert_eq!(cfg.log_level, LogLevel::Debug);
}

#[test]
fn log_file_defaults_to_temp_dir() {
    let cfg = parse_with(&[]);
    assert_eq!(cfg.log_file_path(), env::temp_dir().join("livegba.log"));
    let cfg = parse_with(&["--log-file", "/tmp/custom.log"]);
    assert_eq!(cfg.log_file_path(), PathBuf::from("/tmp/custom.log"));
}

#[test]
fn session_config_carries_validated_values() {
    let mut cfg = parse_with(&[
        "--dry-run",
        "--interval-ms",
        "250",
        "--window-timeout-ms",
        "1000",
        "--activate-window",
        "--emulator-args",
        "-4",
    ]);
    cfg.validate().expect("valid config");
    let session = cfg.session_config().expect("session config");
    assert_eq!(session.tick_interval, Duration::from_millis(250));
    assert_eq!(session.window.timeout, Duration::from_millis(1000));
    assert!(session.window.activate);
    assert!(session.window.title.is_match("mGBA - 0.10.1"));
    assert_eq!(session.launch.executable, PathBuf::from("mgba-qt"));
    assert_eq!(session.launch.rom, PathBuf::from("game.gba"));
    assert_eq!(session.launch.args, vec!["-4"]);
    assert!(session.keymap.is_empty());
}

#[test]
fn gba_keymap_mirrors_default_bindings() {
    let keymap = KeyMap::gba();
    assert_eq!(keymap.len(), GBA_BUTTON_KEYS.len());
    assert_eq!(keymap.resolve("a"), "z");
    assert_eq!(keymap.resolve("START"), "b");
    assert_eq!(keymap.resolve("up"), "up");
    assert_eq!(keymap.resolve("f5"), "f5");
}

#[test]
fn keymap_passthrough_keeps_tokens() {
    let keymap = KeyMap::default();
    assert_eq!(keymap.resolve("a"), "a");
    assert_eq!(keymap.resolve(""), "");
}

#[test]
fn keymap_yaml_overrides_gba_layout() {
    let path = temp_path("keymap.yaml");
    fs::write(&path, "a: k\nturbo: t\n").expect("write keymap");
    let raw = path.to_string_lossy().to_string();
    let mut cfg = parse_with(&["--dry-run", "--gba-buttons", "--keymap", &raw]);
    cfg.validate().expect("valid config");
    let keymap = cfg.resolve_keymap().expect("keymap loads");
    assert_eq!(keymap.resolve("a"), "k");
    assert_eq!(keymap.resolve("turbo"), "t");
    assert_eq!(keymap.resolve("b"), "x");
    let _ = fs::remove_file(&path);
}

#[test]
fn keymap_yaml_rejects_bad_entries() {
    assert!(KeyMap::from_yaml_str("a: \"\"\n").is_err());
    assert!(KeyMap::from_yaml_str("a: two keys\n").is_err());
    assert!(KeyMap::from_yaml_str("- not\n- a map\n").is_err());
}

#[test]
fn keymap_yaml_normalizes_tokens() {
    let keymap = KeyMap::from_yaml_str(" Jump : space\n").expect("valid keymap");
    assert_eq!(keymap.resolve("jump"), "space");
    assert_eq!(keymap.resolve("JUMP"), "space");
    assert!(KeyMap::from_yaml_str("   ").expect("empty").is_empty());
}
