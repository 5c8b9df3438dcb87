/// Galaxy3D Engine facade - global logger slot
///
/// The visibility core keeps no other global state: buffers, trees and
/// cullers are owned by the caller. Only the logger is shared, so that
/// every component reports through the same sink.

use std::sync::{OnceLock, RwLock};
use std::time::SystemTime;
use crate::log::{Logger, LogEntry, LogSeverity, DefaultLogger};

// ===== LOGGER SLOT =====

static LOGGER: OnceLock<RwLock<Box<dyn Logger>>> = OnceLock::new();

fn logger_slot() -> &'static RwLock<Box<dyn Logger>> {
    LOGGER.get_or_init(|| RwLock::new(Box::new(DefaultLogger)))
}

fn replace_logger(logger: Box<dyn Logger>) {
    if let Ok(mut slot) = logger_slot().write() {
        *slot = logger;
    }
}

/// A poisoned slot drops the entry.
fn dispatch(entry: LogEntry) {
    if let Ok(slot) = logger_slot().read() {
        slot.log(&entry);
    }
}

// ===== PUBLIC API =====

/// Engine facade owning the global logger
pub struct Engine;

impl Engine {
    /// Route every later entry to `logger`.
    ///
    /// ```no_run
    /// use galaxy_3d_visibility::galaxy3d::{Engine, log::{Logger, LogEntry}};
    ///
    /// struct Silent;
    /// impl Logger for Silent {
    ///     fn log(&self, _entry: &LogEntry) {}
    /// }
    ///
    /// Engine::set_logger(Silent);
    /// ```
    pub fn set_logger<L: Logger + 'static>(logger: L) {
        replace_logger(Box::new(logger));
    }

    /// Go back to the colored console logger.
    pub fn reset_logger() {
        replace_logger(Box::new(DefaultLogger));
    }

    /// Entry without location; target of the severity macros.
    pub fn log(severity: LogSeverity, source: &str, message: String) {
        dispatch(LogEntry {
            severity,
            timestamp: SystemTime::now(),
            source: source.to_owned(),
            message,
            file: None,
            line: None,
        });
    }

    /// Entry tagged with `file:line`; target of the error macros.
    pub fn log_detailed(
        severity: LogSeverity,
        source: &str,
        message: String,
        file: &'static str,
        line: u32,
    ) {
        dispatch(LogEntry {
            severity,
            timestamp: SystemTime::now(),
            source: source.to_owned(),
            message,
            file: Some(file),
            line: Some(line),
        });
    }
}

#[cfg(test)]
#[path = "engine_tests.rs"]
mod tests;
