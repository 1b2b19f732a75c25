use std::{ffi::OsString, io, path::Path, process::Stdio, time::Duration};

use anyhow::Context as _;
use async_trait::async_trait;
use tokio::{
    io::{AsyncRead, AsyncReadExt, AsyncWriteExt},
    process::Command,
    time::Instant,
};

use super::{compare::compare, testcase::Testcase, verdict::TestVerdict};
use crate::compiler::Artifact;

const PASSTHROUGH_ENV_VARS: &[&str] = &["PATH"];

/// Environment for processes spawned by the judge: everything is cleared except these.
pub(crate) fn passthrough_env() -> impl Iterator<Item = (&'static str, OsString)> {
    PASSTHROUGH_ENV_VARS
        .iter()
        .filter_map(|&key| std::env::var_os(key).map(|value| (key, value)))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    /// Wall-clock budget, measured from just before launch.
    pub time: Duration,
    pub stdout_capture_max_bytes: usize,
    pub stderr_capture_max_bytes: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            time: Duration::from_secs(2),
            stdout_capture_max_bytes: 64 * 1024 * 1024,
            stderr_capture_max_bytes: 64 * 1024,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Termination {
    Completed,
    TimedOut,
    /// Exited within the limit but wrote to stderr.
    Crashed,
    SystemError(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionOutcome {
    pub termination: Termination,
    pub status: Option<i32>,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    pub elapsed: Duration,
}

impl ExecutionOutcome {
    pub fn system_error(message: impl Into<String>, elapsed: Duration) -> Self {
        Self {
            termination: Termination::SystemError(message.into()),
            status: None,
            stdout: Vec::new(),
            stderr: Vec::new(),
            elapsed,
        }
    }
}

/// Runs an artifact once with the given stdin under a wall-clock limit.
///
/// Never fails: judge-side faults come back as [`Termination::SystemError`].
#[async_trait]
pub trait Executor: Send + Sync {
    async fn execute(&self, artifact: &Path, input: &[u8], limits: &Limits) -> ExecutionOutcome;
}

/// [`Executor`] backed by a child process.
///
/// The child runs in the artifact's directory with a cleared environment and is
/// killed once the time limit expires.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessExecutor;

#[async_trait]
impl Executor for ProcessExecutor {
    async fn execute(&self, artifact: &Path, input: &[u8], limits: &Limits) -> ExecutionOutcome {
        let start_at = Instant::now();
        match spawn_and_wait(artifact, input, limits, start_at).await {
            Ok(outcome) => outcome,
            Err(e) => {
                log::warn!("System error while running {:?}: {:#}", artifact.file_name(), e);
                ExecutionOutcome::system_error(format!("{:#}", e), start_at.elapsed())
            }
        }
    }
}

async fn spawn_and_wait(
    artifact: &Path,
    input: &[u8],
    limits: &Limits,
    start_at: Instant,
) -> anyhow::Result<ExecutionOutcome> {
    let program_name = artifact
        .file_name()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();

    let mut cmd = Command::new(artifact);
    if let Some(dir) = artifact.parent() {
        cmd.current_dir(dir);
    }
    let mut proc = cmd
        .env_clear()
        .envs(passthrough_env())
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .with_context(|| format!("Failed to spawn '{}'", program_name))?;
    let mut stdin = proc.stdin.take().context("Failed to open stdin")?;
    let mut stdout = proc.stdout.take().context("Failed to open stdout")?;
    let mut stderr = proc.stderr.take().context("Failed to open stderr")?;

    let res = {
        let fut_stdin = async move {
            let res = match stdin.write_all(input).await {
                // The program may exit without consuming its input.
                Err(e) if e.kind() == io::ErrorKind::BrokenPipe => Ok(()),
                res => res,
            };
            drop(stdin); // EOF
            res
        };
        let fut_stdout = read_capped(&mut stdout, limits.stdout_capture_max_bytes);
        let fut_stderr = read_capped(&mut stderr, limits.stderr_capture_max_bytes);
        let fut_exit_status = proc.wait();

        tokio::time::timeout_at(start_at + limits.time, async {
            tokio::try_join!(fut_stdin, fut_stdout, fut_stderr, fut_exit_status)
        })
        .await
    };
    let elapsed = start_at.elapsed();

    match res {
        Err(_) => {
            proc.kill()
                .await
                .unwrap_or_else(|e| log::warn!("Failed to kill TLE process: {:#}", e));
            Ok(ExecutionOutcome {
                termination: Termination::TimedOut,
                status: None,
                stdout: Vec::new(),
                stderr: Vec::new(),
                elapsed,
            })
        }

        Ok(Err(e)) => {
            proc.kill()
                .await
                .unwrap_or_else(|e| log::warn!("Failed to kill process: {:#}", e));
            Err(e).context("Failed to communicate with subprocess")
        }

        Ok(Ok(((), stdout_buf, stderr_buf, exit_status))) => {
            log::debug!(
                "{} exited with {} in {}ms",
                program_name,
                exit_status,
                elapsed.as_millis()
            );
            // stderr output, not the exit code, is what marks a runtime error.
            let termination = if stderr_buf.is_empty() {
                Termination::Completed
            } else {
                Termination::Crashed
            };
            Ok(ExecutionOutcome {
                termination,
                status: exit_status.code(),
                stdout: stdout_buf,
                stderr: stderr_buf,
                elapsed,
            })
        }
    }
}

/// Read to EOF, keeping at most `max_bytes`. The rest is drained and discarded.
async fn read_capped<R>(reader: &mut R, max_bytes: usize) -> io::Result<Vec<u8>>
where
    R: AsyncRead + Unpin,
{
    let mut buf = Vec::new();
    let mut chunk = [0u8; 8192];
    let mut truncated = false;
    loop {
        let n = reader.read(&mut chunk).await?;
        if n == 0 {
            if truncated {
                log::debug!("Output truncated to {} bytes", max_bytes);
            }
            return Ok(buf);
        }
        let room = max_bytes.saturating_sub(buf.len());
        truncated |= n > room;
        buf.extend_from_slice(&chunk[..n.min(room)]);
    }
}

/// Runs testcases one at a time against a compiled artifact.
pub struct TestRunner<'e, E: Executor + ?Sized> {
    executor: &'e E,
    limits: Limits,
}

impl<'e, E: Executor + ?Sized> TestRunner<'e, E> {
    pub fn new(executor: &'e E, limits: Limits) -> Self {
        Self { executor, limits }
    }

    pub fn get_limits(&self) -> &Limits {
        &self.limits
    }

    /// Produce exactly one verdict for `testcase`. Never aborts.
    pub async fn run<T>(&self, artifact: &Artifact, testcase: &T) -> TestVerdict
    where
        T: Testcase + ?Sized,
    {
        let name = testcase.name();

        let input = match testcase.input().await {
            Ok(input) => input,
            Err(e) => {
                let outcome = ExecutionOutcome::system_error(format!("{:#}", e), Duration::ZERO);
                return TestVerdict::new(name, outcome, None, Vec::new());
            }
        };

        let mut outcome = self
            .executor
            .execute(artifact.path(), &input, &self.limits)
            .await;
        if outcome.termination != Termination::Completed {
            return TestVerdict::new(name, outcome, None, Vec::new());
        }

        match testcase.expected_output().await {
            Ok(expected) => {
                let comparison = compare(&outcome.stdout, &expected);
                TestVerdict::new(name, outcome, Some(comparison), expected)
            }
            Err(e) => {
                outcome.termination = Termination::SystemError(format!("{:#}", e));
                TestVerdict::new(name, outcome, None, Vec::new())
            }
        }
    }
}
