//! Logging for the visibility core
//!
//! Every component reports through the `engine_*!` macros to the logger
//! installed on `Engine` (colored console output until replaced). Error
//! entries carry the file and line of the macro call.
//!
//! Per-pixel and per-scanline code never logs. Buffer setup and tree
//! maintenance log at Debug, per-frame summaries at Trace.

use colored::*;
use std::time::SystemTime;
use chrono::{DateTime, Local};

/// Sink for log entries, installed with `Engine::set_logger`.
///
/// ```no_run
/// use galaxy_3d_visibility::galaxy3d::log::{Logger, LogEntry};
///
/// struct FrameLogger;
///
/// impl Logger for FrameLogger {
///     fn log(&self, entry: &LogEntry) {
///         eprintln!("{}: {}", entry.source, entry.message);
///     }
/// }
/// ```
pub trait Logger: Send + Sync {
    fn log(&self, entry: &LogEntry);
}

/// One message handed to the active logger
#[derive(Debug, Clone)]
pub struct LogEntry {
    pub severity: LogSeverity,
    pub timestamp: SystemTime,
    /// Emitting component, `galaxy3d::<Component>`
    pub source: String,
    pub message: String,
    /// Set by the error macros only
    pub file: Option<&'static str>,
    pub line: Option<u32>,
}

impl LogEntry {
    /// `file:line` when the entry carries a location
    pub fn location(&self) -> Option<String> {
        Some(format!("{}:{}", self.file?, self.line?))
    }

    /// Local time as `YYYY-MM-DD HH:MM:SS.mmm`
    fn local_time(&self) -> String {
        let datetime: DateTime<Local> = self.timestamp.into();
        datetime.format("%Y-%m-%d %H:%M:%S%.3f").to_string()
    }
}

/// Ordered from most to least verbose
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogSeverity {
    /// Per-pass statistics
    Trace,
    /// Buffer setup, tree maintenance
    Debug,
    Info,
    Warn,
    /// Rejected configuration or geometry, broken tree
    Error,
}

impl LogSeverity {
    /// Five-character column label
    pub fn label(self) -> &'static str {
        match self {
            LogSeverity::Trace => "TRACE",
            LogSeverity::Debug => "DEBUG",
            LogSeverity::Info => "INFO ",
            LogSeverity::Warn => "WARN ",
            LogSeverity::Error => "ERROR",
        }
    }

    fn colorize(self) -> ColoredString {
        let label = self.label();
        match self {
            LogSeverity::Trace => label.bright_black(),
            LogSeverity::Debug => label.cyan(),
            LogSeverity::Info => label.green(),
            LogSeverity::Warn => label.yellow(),
            LogSeverity::Error => label.red().bold(),
        }
    }
}

/// Console logger used until `Engine::set_logger` replaces it.
///
/// Prints `[time] [SEVERITY] [source] message`, followed by `(file:line)`
/// for entries coming from the error macros.
pub struct DefaultLogger;

impl DefaultLogger {
    /// The line `log()` prints, without colors
    pub fn format_plain(entry: &LogEntry) -> String {
        compose(&entry.local_time(), entry.severity.label(), &entry.source, entry)
    }
}

impl Logger for DefaultLogger {
    fn log(&self, entry: &LogEntry) {
        let line = compose(
            &entry.local_time(),
            entry.severity.colorize(),
            entry.source.bright_blue(),
            entry,
        );
        println!("{}", line);
    }
}

fn compose(
    time: &str,
    severity: impl std::fmt::Display,
    source: impl std::fmt::Display,
    entry: &LogEntry,
) -> String {
    match entry.location() {
        Some(location) => format!(
            "[{}] [{}] [{}] {} ({})",
            time, severity, source, entry.message, location
        ),
        None => format!("[{}] [{}] [{}] {}", time, severity, source, entry.message),
    }
}

// ===== LOGGING MACROS =====

#[doc(hidden)]
#[macro_export]
macro_rules! __engine_log {
    ($severity:ident, $source:expr, $($arg:tt)*) => {
        $crate::galaxy3d::Engine::log(
            $crate::galaxy3d::log::LogSeverity::$severity,
            $source,
            format!($($arg)*)
        )
    };
}

/// Per-pass chatter, usually filtered out
///
/// ```no_run
/// # use galaxy_3d_visibility::engine_trace;
/// engine_trace!("galaxy3d::DynaVis", "{} objects visible", 12);
/// ```
#[macro_export]
macro_rules! engine_trace {
    ($source:expr, $($arg:tt)*) => { $crate::__engine_log!(Trace, $source, $($arg)*) };
}

/// ```no_run
/// # use galaxy_3d_visibility::engine_debug;
/// engine_debug!("galaxy3d::CoverageBuffer", "Setup {}x{}", 640, 480);
/// ```
#[macro_export]
macro_rules! engine_debug {
    ($source:expr, $($arg:tt)*) => { $crate::__engine_log!(Debug, $source, $($arg)*) };
}

#[macro_export]
macro_rules! engine_info {
    ($source:expr, $($arg:tt)*) => { $crate::__engine_log!(Info, $source, $($arg)*) };
}

#[macro_export]
macro_rules! engine_warn {
    ($source:expr, $($arg:tt)*) => { $crate::__engine_log!(Warn, $source, $($arg)*) };
}

/// Error entry tagged with the calling `file!()` and `line!()`
///
/// ```no_run
/// # use galaxy_3d_visibility::engine_error;
/// engine_error!("galaxy3d::KdTree", "Node {} lost its parent", 3);
/// ```
#[macro_export]
macro_rules! engine_error {
    ($source:expr, $($arg:tt)*) => {
        $crate::galaxy3d::Engine::log_detailed(
            $crate::galaxy3d::log::LogSeverity::Error,
            $source,
            format!($($arg)*),
            file!(),
            line!()
        )
    };
}

/// Like `engine_error!`, then evaluates to `galaxy3d::Error::$variant(message)`.
///
/// ```no_run
/// # use galaxy_3d_visibility::engine_err;
/// let error = engine_err!("galaxy3d::CoverageBuffer", InvalidDimensions, "{}x{}", 0, 480);
/// ```
#[macro_export]
macro_rules! engine_err {
    ($source:expr, $variant:ident, $($arg:tt)*) => {{
        let message = format!($($arg)*);
        $crate::engine_error!($source, "{}", message);
        $crate::galaxy3d::Error::$variant(message)
    }};
}

/// `engine_err!` wrapped in an early `return Err(..)`
#[macro_export]
macro_rules! engine_bail {
    ($source:expr, $variant:ident, $($arg:tt)*) => {
        return Err($crate::engine_err!($source, $variant, $($arg)*))
    };
}

#[cfg(test)]
#[path = "log_tests.rs"]
mod tests;
