use std::ffi::OsString;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

use mdviewer_platform::AppPaths;
use simplelog::{
    ColorChoice, CombinedLogger, ConfigBuilder, LevelFilter, SharedLogger, TermLogger,
    TerminalMode, WriteLogger,
};

/// How much of an update run is recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    /// Warnings and failures only.
    Quiet,
    /// Phase transitions and every command invocation.
    Debug,
    /// Also the output of each external command, echoed to the terminal.
    Trace,
}

impl Verbosity {
    /// The `--debug` flag wins over the persisted `debug_logging` setting.
    pub fn from_flags(debug_setting: bool, debug_flag: bool) -> Self {
        match (debug_setting, debug_flag) {
            (_, true) => Self::Trace,
            (true, false) => Self::Debug,
            (false, false) => Self::Quiet,
        }
    }

    fn level(self) -> LevelFilter {
        match self {
            Self::Quiet => LevelFilter::Warn,
            Self::Debug => LevelFilter::Debug,
            Self::Trace => LevelFilter::Trace,
        }
    }
}

fn rotated_path(log_path: &Path) -> PathBuf {
    let mut name = log_path
        .file_name()
        .map_or_else(|| OsString::from("updater.log"), ToOwned::to_owned);
    name.push(".1");
    log_path.with_file_name(name)
}

/// Move the log aside to `<name>.1` once it exceeds `max_size`, replacing the
/// previous rotation. Returns whether a rotation happened.
fn rotate_if_oversized(log_path: &Path, max_size: u64) -> std::io::Result<bool> {
    match std::fs::metadata(log_path) {
        Ok(metadata) if metadata.len() > max_size => {
            std::fs::rename(log_path, rotated_path(log_path))?;
            Ok(true)
        }
        Ok(_) => Ok(false),
        Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(error) => Err(error),
    }
}

pub fn init_logging(verbosity: Verbosity, max_log_size: u64) {
    let Ok(paths) = AppPaths::new() else {
        return;
    };
    let _ = paths.ensure_dirs();
    let log_path = paths.log_file();
    let rotation = rotate_if_oversized(&log_path, max_log_size);

    let config = ConfigBuilder::new()
        .set_time_format_rfc3339()
        .add_filter_allow_str("mdviewer")
        .build();
    let level = verbosity.level();

    let mut loggers: Vec<Box<dyn SharedLogger>> = Vec::new();
    match OpenOptions::new().create(true).append(true).open(&log_path) {
        Ok(file) => loggers.push(WriteLogger::new(level, config.clone(), file)),
        Err(error) => eprintln!(
            "warning: cannot open log file {}: {error}",
            log_path.display()
        ),
    }
    if verbosity == Verbosity::Trace {
        loggers.push(TermLogger::new(
            level,
            config,
            TerminalMode::Stderr,
            ColorChoice::Auto,
        ));
    }
    if loggers.is_empty() || CombinedLogger::init(loggers).is_err() {
        return;
    }

    match rotation {
        Ok(true) => log::info!(
            "Previous log moved to {}",
            rotated_path(&log_path).display()
        ),
        Ok(false) => {}
        Err(error) => log::warn!("Failed to rotate {}: {error}", log_path.display()),
    }
    log::debug!("Logging at {level} to {}", log_path.display());
}
