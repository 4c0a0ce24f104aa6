pub const DEFAULT_TICK_INTERVAL_MS: u64 = 200;
pub const MIN_TICK_INTERVAL_MS: u64 = 10;
pub const MAX_TICK_INTERVAL_MS: u64 = 5_000;
pub const DEFAULT_WINDOW_TITLE: &str = "^mGBA";
pub const DEFAULT_WINDOW_TIMEOUT_MS: u64 = 5_000;
pub const DEFAULT_WINDOW_POLL_MS: u64 = 100;
pub const DEFAULT_TERMINATE_GRACE_MS: u64 = 500;
pub const DEFAULT_XDOTOOL_TIMEOUT_MS: u64 = 2_000;

pub(super) const MAX_WINDOW_TIMEOUT_MS: u64 = 60_000;
pub(super) const MIN_WINDOW_POLL_MS: u64 = 10;
pub(super) const MAX_WINDOW_POLL_MS: u64 = 5_000;
pub(super) const MAX_TERMINATE_GRACE_MS: u64 = 10_000;
pub(super) const MIN_XDOTOOL_TIMEOUT_MS: u64 = 50;
pub(super) const MAX_XDOTOOL_TIMEOUT_MS: u64 = 30_000;
pub(super) const XDOTOOL_BINARY: &str = "xdotool";
pub(super) const MAX_EMULATOR_ARGS: usize = 64;
pub(super) const MAX_EMULATOR_ARG_BYTES: usize = 8 * 1024;

// mGBA's stock keyboard bindings for the GBA buttons.
pub(super) const GBA_BUTTON_KEYS: &[(&str, &str)] = &[
    ("up", "up"),
    ("down", "down"),
    ("left", "left"),
    ("right", "right"),
    ("a", "z"),
    ("b", "x"),
    ("l", "a"),
    ("r", "s"),
    ("select", "v"),
    ("start", "b"),
];
