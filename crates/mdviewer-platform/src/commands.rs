#[cfg(windows)]
use std::os::windows::process::CommandExt;

#[cfg(windows)]
const CREATE_NO_WINDOW: u32 = 0x08000000;

/// Keeps spawned helper processes (the version-control client) from flashing a
/// console window when the viewer runs as a GUI application on Windows.
pub trait HideWindow {
    fn hide_window(&mut self) -> &mut Self;
}

impl HideWindow for tokio::process::Command {
    #[cfg(windows)]
    fn hide_window(&mut self) -> &mut Self {
        self.creation_flags(CREATE_NO_WINDOW)
    }

    #[cfg(not(windows))]
    fn hide_window(&mut self) -> &mut Self {
        self
    }
}

impl HideWindow for std::process::Command {
    #[cfg(windows)]
    fn hide_window(&mut self) -> &mut Self {
        self.creation_flags(CREATE_NO_WINDOW)
    }

    #[cfg(not(windows))]
    fn hide_window(&mut self) -> &mut Self {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::HideWindow;

    #[test]
    fn tokio_command_hide_window_is_chainable() {
        let mut cmd = tokio::process::Command::new("git");
        let before = &mut cmd as *mut tokio::process::Command;
        let after = cmd.hide_window().arg("--version") as *mut tokio::process::Command;
        assert_eq!(before, after);
    }

    #[test]
    fn std_command_hide_window_keeps_arguments() {
        let mut cmd = std::process::Command::new("git");
        cmd.hide_window().args(["fetch", "origin"]);

        let args: Vec<_> = cmd.get_args().collect();
        assert_eq!(args, ["fetch", "origin"]);
    }
}
