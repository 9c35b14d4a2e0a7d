//! Process Runner Integration Tests
//!
//! Runs small shell scripts through the runner and checks what reaches the
//! logger.

#![cfg(unix)]

mod common;

use std::sync::Arc;
use std::time::{Duration, Instant};

use rulesmith::core::{
    CapturingLogger, LogLevel, ProcessRunner, ProcessRunnerArgs, RunState, RUNNER_ERROR_CODE,
};
use tempfile::TempDir;

use common::capture;

const SHELL: &str = "/bin/sh";

fn script(body: &str, logger: &Arc<CapturingLogger>) -> ProcessRunnerArgs {
    ProcessRunnerArgs::new(SHELL, logger.clone()).args(["-c", body])
}

#[test]
fn test_missing_executable_is_not_started() {
    let logger = capture();
    let args = ProcessRunnerArgs::new("/definitely/not/here/tool", logger.clone());

    let result = ProcessRunner::new().execute(&args);

    assert_eq!(result.state(), RunState::NotStarted);
    assert_eq!(result.exit_code(), RUNNER_ERROR_CODE);
    assert!(logger.contains(LogLevel::Error, "does not exist"));
}

#[test]
fn test_directory_is_not_an_executable() {
    let dir = TempDir::new().unwrap();
    let logger = capture();
    let args = ProcessRunnerArgs::new(dir.path(), logger.clone());

    let result = ProcessRunner::new().execute(&args);

    assert_eq!(result.state(), RunState::NotStarted);
    assert_eq!(logger.count(LogLevel::Error), 1);
}

#[test]
fn test_output_lines_are_logged_by_stream() {
    let logger = capture();
    let args = script("echo one; echo two; echo three; echo bad >&2; echo worse >&2", &logger)
        .timeout(Duration::from_secs(30));

    let result = ProcessRunner::new().execute(&args);

    assert!(result.succeeded());
    assert!(result.errors_logged());
    assert_eq!(logger.messages(LogLevel::Info), vec!["one", "two", "three"]);
    assert_eq!(logger.messages(LogLevel::Error), vec!["bad", "worse"]);
}

#[test]
fn test_quiet_process_logs_no_errors() {
    let logger = capture();
    let result = ProcessRunner::new().execute(&script("echo fine", &logger));

    assert!(result.succeeded());
    assert!(!result.errors_logged());
    assert_eq!(logger.count(LogLevel::Error), 0);
}

#[test]
fn test_nonzero_exit_code_is_reported() {
    let logger = capture();
    let result = ProcessRunner::new().execute(&script("exit 3", &logger));

    assert_eq!(result.state(), RunState::CompletedInTime);
    assert_eq!(result.exit_code(), 3);
    assert!(!result.succeeded());
    assert!(logger.contains(LogLevel::Debug, "exit code 3"));
}

#[test]
fn test_timeout_returns_without_waiting() {
    let logger = capture();
    let args = script("sleep 3", &logger).timeout(Duration::from_millis(200));

    let started = Instant::now();
    let result = ProcessRunner::new().execute(&args);

    assert!(started.elapsed() < Duration::from_secs(3));
    assert!(result.timed_out());
    assert_eq!(result.state(), RunState::TimedOut);
    assert_eq!(result.exit_code(), RUNNER_ERROR_CODE);
    assert!(logger.contains(LogLevel::Warn, "Timed out after 200 ms"));
}

#[test]
fn test_output_after_timeout_is_dropped() {
    let logger = capture();
    let args = script("sleep 1; echo late", &logger).timeout(Duration::from_millis(100));

    let result = ProcessRunner::new().execute(&args);
    assert!(result.timed_out());

    std::thread::sleep(Duration::from_millis(1500));
    assert!(!logger.contains(LogLevel::Info, "late"));
}

#[test]
fn test_environment_overrides() {
    let logger = capture();
    let args = script("echo \"$RULESMITH_RUNNER_TEST:$HOME\"", &logger)
        .env("RULESMITH_RUNNER_TEST", "fresh")
        .env("HOME", "/override/home");

    let result = ProcessRunner::new().execute(&args);

    assert!(result.succeeded());
    assert_eq!(logger.messages(LogLevel::Info), vec!["fresh:/override/home"]);
    assert!(logger.contains(LogLevel::Debug, "Setting environment variable 'RULESMITH_RUNNER_"));
    if std::env::var_os("HOME").is_some() {
        assert!(logger.contains(LogLevel::Debug, "Overwriting the value of environment variable"));
    }
}

#[test]
fn test_working_directory() {
    let dir = TempDir::new().unwrap();
    let logger = capture();
    let args = script("pwd -P", &logger).working_dir(dir.path());

    let result = ProcessRunner::new().execute(&args);

    assert!(result.succeeded());
    let expected = std::fs::canonicalize(dir.path()).unwrap();
    assert_eq!(logger.messages(LogLevel::Info), vec![expected.to_string_lossy().into_owned()]);
}

#[test]
fn test_invalid_utf8_output_is_kept() {
    let logger = capture();
    let result = ProcessRunner::new().execute(&script("printf 'ab\\377cd\\r\\n'", &logger));

    assert!(result.succeeded());
    assert_eq!(logger.messages(LogLevel::Info), vec!["ab\u{FFFD}cd"]);
}

#[test]
fn test_credentials_are_not_logged() {
    let logger = capture();
    let args = ProcessRunnerArgs::new(SHELL, logger.clone())
        .args(["-c", "exit 0", "sh", "/d:sonar.password=hunter2"]);

    let result = ProcessRunner::new().execute(&args);

    assert!(result.succeeded());
    assert!(logger.records().iter().all(|r| !r.message.contains("hunter2")));
    assert!(logger.contains(LogLevel::Debug, "<sensitive data removed>"));
}
