//! Supervised execution of the host server.
//!
//! [`HostProcess`] implements the [`HostExecutor`] trait by spawning the
//! server start script with both output streams appended to the shared log
//! file, polling for exit, and killing the process when the timeout elapses
//! or the hunt is cancelled. On Unix the child leads its own process group so
//! the kill reaches the JVM the script launches as well as the script.

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::{debug, warn};

use crate::error::HuntError;

/// Tracing target for host process operations.
const PROCESS_TARGET: &str = "modhunt::process";

/// Interval between exit polls.
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Default pause after the host exits, letting buffered log writes land.
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_secs(2);

/// Shared flag requesting that the hunt stop as soon as possible.
///
/// Cloning yields a handle to the same flag. The runner observes it while a
/// host is running and kills the host exactly as it would on timeout.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    flag: Arc<AtomicBool>,
}

impl CancellationToken {
    /// Creates an untriggered token.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// Returns `true` once cancellation has been requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Underlying flag, for registration with signal handlers.
    #[must_use]
    pub fn flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.flag)
    }
}

/// How a host run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "code")]
pub enum ExitKind {
    /// The host exited by itself; `None` when killed by a signal.
    Normal(Option<i32>),
    /// The host exceeded its wall-clock budget and was killed.
    TimedOut,
    /// Cancellation was requested and the host was killed.
    Cancelled,
}

/// Outcome of one host run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunResult {
    exit: ExitKind,
    log_path: PathBuf,
    elapsed: Duration,
}

impl RunResult {
    /// Creates a result.
    #[must_use]
    pub const fn new(exit: ExitKind, log_path: PathBuf, elapsed: Duration) -> Self {
        Self {
            exit,
            log_path,
            elapsed,
        }
    }

    /// How the run ended.
    #[must_use]
    pub const fn exit(&self) -> ExitKind {
        self.exit
    }

    /// Log file the host wrote to.
    #[must_use]
    pub fn log_path(&self) -> &Path {
        self.log_path.as_path()
    }

    /// Wall-clock time from spawn to exit, excluding the settle delay.
    #[must_use]
    pub const fn elapsed(&self) -> Duration {
        self.elapsed
    }
}

/// Parameters of one host run.
#[derive(Debug, Clone, Copy)]
pub struct RunRequest<'a> {
    /// Log file receiving the host's combined output. Truncation is the
    /// caller's job; the runner only appends.
    pub log_path: &'a Path,
    /// Wall-clock budget.
    pub timeout: Duration,
    /// Cancellation observed while the host runs.
    pub cancel: &'a CancellationToken,
}

/// Trait abstracting host execution for testability.
///
/// The production implementation is [`HostProcess`]. Test doubles write a
/// scripted log instead of spawning anything.
pub trait HostExecutor {
    /// Runs the host once and reports how it ended.
    ///
    /// # Errors
    ///
    /// Returns [`HuntError::Launch`] when the host cannot be started and
    /// [`HuntError::Supervise`] when its status can no longer be polled.
    fn run(&self, request: &RunRequest<'_>) -> Result<RunResult, HuntError>;
}

impl<T> HostExecutor for &T
where
    T: HostExecutor + ?Sized,
{
    fn run(&self, request: &RunRequest<'_>) -> Result<RunResult, HuntError> {
        (**self).run(request)
    }
}

/// Runs the server start script as a supervised child process.
///
/// # Example
///
/// ```rust,no_run
/// use std::path::Path;
/// use std::time::Duration;
/// use modhunt_core::process::{CancellationToken, HostExecutor, HostProcess, RunRequest};
///
/// let host = HostProcess::new("/srv/forge", "start.sh");
/// let cancel = CancellationToken::new();
/// let request = RunRequest {
///     log_path: Path::new("/srv/forge/server_log.txt"),
///     timeout: Duration::from_secs(20),
///     cancel: &cancel,
/// };
/// let result = host.run(&request)?;
/// println!("{:?}", result.exit());
/// # Ok::<(), modhunt_core::HuntError>(())
/// ```
#[derive(Debug, Clone)]
pub struct HostProcess {
    executable: PathBuf,
    working_dir: PathBuf,
    settle_delay: Duration,
    poll_interval: Duration,
}

impl HostProcess {
    /// Creates a runner for `program`, resolved against `dir`
    /// when relative.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>, program: impl AsRef<Path>) -> Self {
        let working_dir = dir.into();
        let executable = working_dir.join(program);
        Self {
            executable,
            working_dir,
            settle_delay: DEFAULT_SETTLE_DELAY,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    /// Overrides the pause applied after each run.
    #[must_use]
    pub const fn with_settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = delay;
        self
    }

    /// Overrides the exit polling interval.
    #[must_use]
    pub const fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Resolved executable path.
    #[must_use]
    pub fn executable(&self) -> &Path {
        self.executable.as_path()
    }

    /// Directory the host runs in.
    #[must_use]
    pub fn working_dir(&self) -> &Path {
        self.working_dir.as_path()
    }

    fn launch_error(&self, message: String, source: Option<std::io::Error>) -> HuntError {
        HuntError::Launch {
            executable: self.executable.clone(),
            message,
            source: source.map(Arc::new),
        }
    }

    fn spawn(&self, log_path: &Path) -> Result<Child, HuntError> {
        let log = OpenOptions::new()
            .create(true)
            .append(true)
            .open(log_path)
            .map_err(|err| {
                self.launch_error(format!("cannot open log {}", log_path.display()), Some(err))
            })?;
        let stderr_log = log.try_clone().map_err(|err| {
            self.launch_error(String::from("cannot share log handle"), Some(err))
        })?;

        let mut command = Command::new(&self.executable);
        command
            .current_dir(&self.working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::from(log))
            .stderr(Stdio::from(stderr_log));
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            command.process_group(0);
        }

        debug!(
            target: PROCESS_TARGET,
            executable = %self.executable.display(),
            working_dir = %self.working_dir.display(),
            log = %log_path.display(),
            "spawning host process"
        );

        command
            .spawn()
            .map_err(|err| self.launch_error(err.to_string(), Some(err)))
    }

    /// Polls the child until it exits, the budget elapses, or the hunt is
    /// cancelled.
    fn supervise(
        &self,
        child: &mut Child,
        request: &RunRequest<'_>,
        started: Instant,
    ) -> Result<ExitKind, HuntError> {
        loop {
            match child.try_wait() {
                Ok(Some(status)) => {
                    debug!(
                        target: PROCESS_TARGET,
                        ?status,
                        elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
                        "host process exited"
                    );
                    return Ok(ExitKind::Normal(status.code()));
                }
                Ok(None) => {
                    if request.cancel.is_cancelled() {
                        warn!(
                            target: PROCESS_TARGET,
                            "cancellation requested, killing host process"
                        );
                        terminate(child);
                        return Ok(ExitKind::Cancelled);
                    }
                    if started.elapsed() >= request.timeout {
                        warn!(
                            target: PROCESS_TARGET,
                            timeout_secs = request.timeout.as_secs(),
                            "host timed out, killing process"
                        );
                        terminate(child);
                        return Ok(ExitKind::TimedOut);
                    }
                    thread::sleep(self.poll_interval);
                }
                Err(err) => {
                    terminate(child);
                    return Err(HuntError::Supervise {
                        executable: self.executable.clone(),
                        source: Arc::new(err),
                    });
                }
            }
        }
    }
}

impl HostExecutor for HostProcess {
    fn run(&self, request: &RunRequest<'_>) -> Result<RunResult, HuntError> {
        let started = Instant::now();
        let mut child = self.spawn(request.log_path)?;
        let exit = self.supervise(&mut child, request, started)?;
        let elapsed = started.elapsed();
        if !self.settle_delay.is_zero() {
            thread::sleep(self.settle_delay);
        }
        Ok(RunResult::new(exit, request.log_path.to_path_buf(), elapsed))
    }
}

/// Kills the child and its process group, then reaps it.
fn terminate(child: &mut Child) {
    #[cfg(unix)]
    kill_group(child.id());
    drop(child.kill());
    drop(child.wait());
}

#[cfg(unix)]
fn kill_group(pid: u32) {
    use nix::sys::signal::{Signal, killpg};
    use nix::unistd::Pid;

    let Ok(raw) = i32::try_from(pid) else {
        return;
    };
    if let Err(errno) = killpg(Pid::from_raw(raw), Signal::SIGKILL) {
        debug!(
            target: PROCESS_TARGET,
            pid,
            %errno,
            "process group already gone"
        );
    }
}
