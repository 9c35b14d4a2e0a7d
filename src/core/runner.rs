//! Bounded execution of external processes.
//!
//! The runner launches an executable, streams its stdout and stderr line by
//! line into a [`Logger`] and waits for it to exit, giving up after an
//! optional timeout. A process that outlives its timeout is left running;
//! its later output is no longer forwarded.

use std::collections::BTreeMap;
use std::fmt;
use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use std::process::{Command as ProcessCommand, ExitStatus, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use super::Logger;

/// Exit code reported when the runner itself failed: the executable was
/// missing, could not be started or did not finish in time.
pub const RUNNER_ERROR_CODE: i32 = 1;

/// Argument prefixes whose values must never be logged.
const SENSITIVE_ARGUMENTS: &[&str] = &["sonar.password=", "sonar.login="];

const REDACTED: &str = "<sensitive data removed>";

/// Everything needed to run one process.
#[derive(Clone)]
pub struct ProcessRunnerArgs {
    exe_path: PathBuf,
    args: Vec<String>,
    working_dir: Option<PathBuf>,
    env: BTreeMap<String, String>,
    timeout: Option<Duration>,
    logger: Arc<dyn Logger>,
}

impl fmt::Debug for ProcessRunnerArgs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProcessRunnerArgs")
            .field("exe_path", &self.exe_path)
            .field("args", &self.args_for_logging())
            .field("working_dir", &self.working_dir)
            .field("env", &self.env.keys().collect::<Vec<_>>())
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl ProcessRunnerArgs {
    /// Run `exe_path` with no arguments, no timeout and the inherited
    /// environment.
    pub fn new(exe_path: impl Into<PathBuf>, logger: Arc<dyn Logger>) -> Self {
        Self {
            exe_path: exe_path.into(),
            args: Vec::new(),
            working_dir: None,
            env: BTreeMap::new(),
            timeout: None,
            logger,
        }
    }

    /// Append an argument.
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append several arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Set the working directory.
    pub fn working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Set an environment variable for the child, overriding any inherited
    /// value.
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Give up waiting after `timeout`.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// The arguments joined for logging, with sensitive values removed.
    pub fn args_for_logging(&self) -> String {
        self.args
            .iter()
            .map(|arg| {
                let lower = arg.to_ascii_lowercase();
                if SENSITIVE_ARGUMENTS.iter().any(|key| lower.contains(key)) {
                    REDACTED
                } else {
                    arg.as_str()
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// How far a run got.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    /// The process was never started.
    NotStarted,
    /// The process exited before the timeout.
    CompletedInTime,
    /// The timeout elapsed first.
    TimedOut,
}

/// Outcome of [`ProcessRunner::execute`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessResult {
    exit_code: i32,
    errors_logged: bool,
    state: RunState,
}

impl ProcessResult {
    /// Exit code of the child, or [`RUNNER_ERROR_CODE`] if the runner failed.
    pub fn exit_code(&self) -> i32 {
        self.exit_code
    }

    /// Whether the child wrote anything to stderr.
    pub fn errors_logged(&self) -> bool {
        self.errors_logged
    }

    /// How far the run got.
    pub fn state(&self) -> RunState {
        self.state
    }

    /// Whether the timeout elapsed.
    pub fn timed_out(&self) -> bool {
        self.state == RunState::TimedOut
    }

    /// Completed in time with exit code zero.
    pub fn succeeded(&self) -> bool {
        self.state == RunState::CompletedInTime && self.exit_code == 0
    }
}

/// Forwards child output to the logger until detached.
struct OutputPump {
    logger: Arc<dyn Logger>,
    attached: AtomicBool,
    errors_logged: AtomicBool,
}

impl OutputPump {
    fn new(logger: Arc<dyn Logger>) -> Self {
        Self { logger, attached: AtomicBool::new(true), errors_logged: AtomicBool::new(false) }
    }

    fn stdout_line(&self, line: &str) {
        if self.attached.load(Ordering::Acquire) {
            self.logger.info(format_args!("{}", line));
        }
    }

    fn stderr_line(&self, line: &str) {
        if self.attached.load(Ordering::Acquire) {
            self.errors_logged.store(true, Ordering::Release);
            self.logger.error(format_args!("{}", line));
        }
    }

    fn errors_logged(&self) -> bool {
        self.errors_logged.load(Ordering::Acquire)
    }

    fn detach(&self) {
        self.attached.store(false, Ordering::Release);
    }
}

/// Detaches the pump when the run ends, however it ends.
struct PumpGuard(Arc<OutputPump>);

impl Drop for PumpGuard {
    fn drop(&mut self) {
        self.0.detach();
    }
}

/// Runs external processes with captured output and a timeout.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessRunner;

impl ProcessRunner {
    /// Create a runner.
    pub fn new() -> Self {
        Self
    }

    /// Run the process described by `args` and wait for it.
    pub fn execute(&self, args: &ProcessRunnerArgs) -> ProcessResult {
        let logger = &args.logger;

        if !args.exe_path.is_file() {
            logger.error(format_args!(
                "Execution failed. The specified executable does not exist: {}",
                args.exe_path.display()
            ));
            return not_started();
        }

        let mut cmd = ProcessCommand::new(&args.exe_path);
        cmd.args(&args.args);

        if let Some(ref dir) = args.working_dir {
            cmd.current_dir(dir);
        }

        for (key, value) in &args.env {
            if std::env::var_os(key).is_some() {
                logger.debug(format_args!(
                    "Overwriting the value of environment variable '{}' with '{}'",
                    key, value
                ));
            } else {
                logger.debug(format_args!("Setting environment variable '{}' to '{}'", key, value));
            }
            cmd.env(key, value);
        }

        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());

        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) => {
                logger.error(format_args!(
                    "Failed to start {}: {}",
                    args.exe_path.display(),
                    e
                ));
                return not_started();
            }
        };

        logger.debug(format_args!(
            "Executing file {}\n  Args: {}\n  Working directory: {}\n  Timeout (ms): {}\n  \
             Process id: {}",
            args.exe_path.display(),
            args.args_for_logging(),
            args.working_dir.as_deref().map_or_else(|| ".".into(), Path::to_string_lossy),
            args.timeout.map_or_else(|| "none".to_string(), |t| t.as_millis().to_string()),
            child.id()
        ));

        let pump = Arc::new(OutputPump::new(Arc::clone(logger)));
        let _guard = PumpGuard(Arc::clone(&pump));

        let stdout_handle = child.stdout.take().map(|stdout| {
            let pump = Arc::clone(&pump);
            spawn_reader(stdout, move |line| pump.stdout_line(line))
        });
        let stderr_handle = child.stderr.take().map(|stderr| {
            let pump = Arc::clone(&pump);
            spawn_reader(stderr, move |line| pump.stderr_line(line))
        });

        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            let _ = tx.send(child.wait());
        });

        let waited = match args.timeout {
            Some(timeout) => rx.recv_timeout(timeout).ok(),
            None => rx.recv().ok(),
        };

        let Some(status) = waited else {
            logger.warn(format_args!(
                "Timed out after {} ms waiting for {} to exit. The process has not been stopped.",
                args.timeout.map_or(0, |t| t.as_millis()),
                args.exe_path.display()
            ));
            return ProcessResult {
                exit_code: RUNNER_ERROR_CODE,
                errors_logged: pump.errors_logged(),
                state: RunState::TimedOut,
            };
        };

        // Drain both streams before reporting.
        for handle in [stdout_handle, stderr_handle].into_iter().flatten() {
            let _ = handle.join();
        }

        let exit_code = exit_code_of(status, logger.as_ref(), &args.exe_path);
        logger.debug(format_args!("Process exited with exit code {}", exit_code));

        ProcessResult {
            exit_code,
            errors_logged: pump.errors_logged(),
            state: RunState::CompletedInTime,
        }
    }
}

fn not_started() -> ProcessResult {
    ProcessResult {
        exit_code: RUNNER_ERROR_CODE,
        errors_logged: false,
        state: RunState::NotStarted,
    }
}

fn exit_code_of(status: std::io::Result<ExitStatus>, logger: &dyn Logger, exe: &Path) -> i32 {
    match status {
        Ok(status) => status.code().unwrap_or_else(|| {
            logger.warn(format_args!(
                "{} was terminated without an exit code ({})",
                exe.display(),
                status
            ));
            RUNNER_ERROR_CODE
        }),
        Err(e) => {
            logger.warn(format_args!("Failed to wait for {}: {}", exe.display(), e));
            RUNNER_ERROR_CODE
        }
    }
}

/// Read `stream` line by line on a dedicated thread.
///
/// Invalid UTF-8 is replaced rather than ending the stream early.
fn spawn_reader<R, F>(stream: R, on_line: F) -> JoinHandle<()>
where
    R: Read + Send + 'static,
    F: Fn(&str) + Send + 'static,
{
    thread::spawn(move || {
        let mut reader = BufReader::new(stream);
        let mut buf = Vec::new();
        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf) {
                Ok(0) | Err(_) => break,
                Ok(_) => {
                    let line = String::from_utf8_lossy(&buf);
                    on_line(line.trim_end_matches(['\r', '\n']));
                }
            }
        }
    })
}
