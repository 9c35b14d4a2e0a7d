//! Core services shared by the rest of rulesmith.
//!
//! This module contains the logging sink handed to every component, the
//! configuration file, and the bounded process runner.

mod config;
mod logger;
mod runner;

pub use config::{
    Config, ResolverConfig, RunnerConfig, ScannerConfig, LOCAL_CONFIG_FILE, SEARCH_ROOTS_ENV,
};
pub use logger::{CapturingLogger, LogLevel, LogRecord, Logger, TracingLogger};
pub use runner::{ProcessResult, ProcessRunner, ProcessRunnerArgs, RunState, RUNNER_ERROR_CODE};
