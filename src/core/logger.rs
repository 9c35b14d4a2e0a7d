//! Logging sink shared by the module host, the resolver, the scanner and the
//! process runner.
//!
//! Components never write to the global subscriber directly; they receive an
//! `Arc<dyn Logger>` so callers can redirect or record what happened.

use std::fmt;

use parking_lot::Mutex;

/// Severity channel of a log record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LogLevel {
    /// Diagnostic detail.
    Debug,
    /// Informational message.
    Info,
    /// Something unexpected that did not stop the operation.
    Warn,
    /// A failure.
    Error,
}

impl LogLevel {
    /// Get the display name for this level.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Destination for log records.
pub trait Logger: Send + Sync {
    /// Record a message at the given level.
    fn log(&self, level: LogLevel, args: fmt::Arguments<'_>);

    /// Record a debug message.
    fn debug(&self, args: fmt::Arguments<'_>) {
        self.log(LogLevel::Debug, args);
    }

    /// Record an informational message.
    fn info(&self, args: fmt::Arguments<'_>) {
        self.log(LogLevel::Info, args);
    }

    /// Record a warning.
    fn warn(&self, args: fmt::Arguments<'_>) {
        self.log(LogLevel::Warn, args);
    }

    /// Record an error.
    fn error(&self, args: fmt::Arguments<'_>) {
        self.log(LogLevel::Error, args);
    }
}

/// Logger that forwards every record to `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogger;

impl Logger for TracingLogger {
    fn log(&self, level: LogLevel, args: fmt::Arguments<'_>) {
        match level {
            LogLevel::Debug => tracing::debug!("{}", args),
            LogLevel::Info => tracing::info!("{}", args),
            LogLevel::Warn => tracing::warn!("{}", args),
            LogLevel::Error => tracing::error!("{}", args),
        }
    }
}

/// A single captured record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRecord {
    /// Severity.
    pub level: LogLevel,
    /// Rendered message.
    pub message: String,
}

/// Logger that keeps every record in memory.
///
/// Records are also forwarded to `tracing` at the same level so a test run
/// with a subscriber installed still shows them.
#[derive(Debug, Default)]
pub struct CapturingLogger {
    records: Mutex<Vec<LogRecord>>,
}

impl CapturingLogger {
    /// Create an empty logger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all records, in arrival order.
    pub fn records(&self) -> Vec<LogRecord> {
        self.records.lock().clone()
    }

    /// Messages recorded at a level, in arrival order.
    pub fn messages(&self, level: LogLevel) -> Vec<String> {
        self.records
            .lock()
            .iter()
            .filter(|r| r.level == level)
            .map(|r| r.message.clone())
            .collect()
    }

    /// Number of records at a level.
    pub fn count(&self, level: LogLevel) -> usize {
        self.records.lock().iter().filter(|r| r.level == level).count()
    }

    /// Whether any record at `level` contains `needle`.
    pub fn contains(&self, level: LogLevel, needle: &str) -> bool {
        self.records.lock().iter().any(|r| r.level == level && r.message.contains(needle))
    }

    /// Drop all records.
    pub fn clear(&self) {
        self.records.lock().clear();
    }
}

impl Logger for CapturingLogger {
    fn log(&self, level: LogLevel, args: fmt::Arguments<'_>) {
        let message = args.to_string();
        TracingLogger.log(level, format_args!("{}", message));
        self.records.lock().push(LogRecord { level, message });
    }
}
