#![deny(missing_docs)]
//! Shared logging utilities for the timelapse workspace.
//!
//! This crate provides the `tl_*` logging macros used by every crate, the
//! logger setup used by the terminal front-end, and a minimal test
//! initializer for the global logger.

use std::fs::File;
use std::path::PathBuf;

pub use log::LevelFilter;
use simplelog::{
    ColorChoice, CombinedLogger, Config, ConfigBuilder, SharedLogger, TermLogger, TerminalMode,
    WriteLogger,
};

/// Default log file, relative to the current working directory.
pub const DEFAULT_LOG_FILE: &str = "./timelapse.log";

/// Logs a trace-level message using the global logging facade.
#[macro_export]
macro_rules! tl_trace {
    ($($arg:tt)*) => {{
        log::trace!($($arg)*);
    }};
}

/// Logs a debug-level message using the global logging facade.
#[macro_export]
macro_rules! tl_debug {
    ($($arg:tt)*) => {{
        log::debug!($($arg)*);
    }};
}

/// Logs an info-level message using the global logging facade.
#[macro_export]
macro_rules! tl_info {
    ($($arg:tt)*) => {{
        log::info!($($arg)*);
    }};
}

/// Logs a warn-level message using the global logging facade.
#[macro_export]
macro_rules! tl_warn {
    ($($arg:tt)*) => {{
        log::warn!($($arg)*);
    }};
}

/// Logs an error-level message using the global logging facade.
#[macro_export]
macro_rules! tl_error {
    ($($arg:tt)*) => {{
        log::error!($($arg)*);
    }};
}

/// Destination for log output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogDestination {
    /// Write to the configured log file only.
    File,
    /// Write to the terminal (stderr for warnings and errors).
    Terminal,
    /// Write to both file and terminal.
    Both,
}

/// Logger configuration chosen by the front-end.
#[derive(Debug, Clone)]
pub struct LogOptions {
    /// Where log records go.
    pub destination: LogDestination,
    /// Maximum level that is recorded.
    pub level: LevelFilter,
    /// Path of the log file for `File` and `Both`.
    pub file_path: PathBuf,
}

impl Default for LogOptions {
    fn default() -> Self {
        Self {
            destination: LogDestination::Terminal,
            level: LevelFilter::Warn,
            file_path: PathBuf::from(DEFAULT_LOG_FILE),
        }
    }
}

/// Initializes the global logger.
///
/// Returns `false` when nothing was installed, either because the log file
/// could not be created for `LogDestination::File` or because another logger
/// is already set.
pub fn initialize(options: &LogOptions) -> bool {
    let config = build_config();

    let loggers: Vec<Box<dyn SharedLogger>> = match options.destination {
        LogDestination::File => match create_file_logger(options, config) {
            Some(file_logger) => vec![file_logger],
            None => return false,
        },
        LogDestination::Terminal => vec![terminal_logger(options.level, config)],
        LogDestination::Both => {
            let mut loggers: Vec<Box<dyn SharedLogger>> =
                vec![terminal_logger(options.level, config.clone())];
            if let Some(file_logger) = create_file_logger(options, config) {
                loggers.push(file_logger);
            }
            loggers
        }
    };

    CombinedLogger::init(loggers).is_ok()
}

/// Initializes a simple terminal logger for use in tests.
///
/// This safely no-ops if another logger has already been initialized.
pub fn initialize_for_tests() {
    // Use debug level in debug builds, info in release builds.
    let level = if cfg!(debug_assertions) {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    // Ignore the error if a logger was already set by another test.
    let _ = CombinedLogger::init(vec![TermLogger::new(
        level,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )]);
}

fn build_config() -> Config {
    ConfigBuilder::new()
        .set_time_format_rfc3339()
        .set_target_level(LevelFilter::Error)
        .build()
}

fn terminal_logger(level: LevelFilter, config: Config) -> Box<dyn SharedLogger> {
    TermLogger::new(level, config, TerminalMode::Mixed, ColorChoice::Auto)
}

fn create_file_logger(options: &LogOptions, config: Config) -> Option<Box<dyn SharedLogger>> {
    match File::create(&options.file_path) {
        Ok(file) => Some(WriteLogger::new(options.level, config, file)),
        Err(err) => {
            eprintln!(
                "Warning: Could not create log file at {:?}: {}",
                options.file_path, err
            );
            None
        }
    }
}
