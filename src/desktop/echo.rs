use super::{Desktop, DesktopError, InjectionError, WindowId};
use regex::Regex;

const ECHO_WINDOW: WindowId = WindowId(0);

/// Dry-run desktop: one always-focused window, and presses are printed instead of sent.
#[derive(Debug, Default, Clone, Copy)]
pub struct EchoDesktop;

impl Desktop for EchoDesktop {
    fn find_window(&self, _pid: u32, _title: &Regex) -> Result<Option<WindowId>, DesktopError> {
        Ok(Some(ECHO_WINDOW))
    }

    fn active_window(&self) -> Result<Option<WindowId>, DesktopError> {
        Ok(Some(ECHO_WINDOW))
    }

    fn activate(&self, _window: WindowId) -> Result<(), DesktopError> {
        Ok(())
    }

    fn press(&self, key: &str) -> Result<(), InjectionError> {
        println!("pressing {key}");
        Ok(())
    }
}
