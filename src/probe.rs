//! Invocation of the external size-reporting command.
//!
//! [`GitCountObjects`] runs `git count-objects -v` inside a repository and
//! captures what it prints. The child process is owned by a guard that kills
//! and reaps it on every early return, so no process handle or pipe outlives
//! the call.

use std::{
    io::{self, BufRead, BufReader, Read},
    path::{Path, PathBuf},
    process::{Child, ChildStderr, ChildStdout, Command, ExitStatus, Stdio},
    sync::mpsc::{self, Receiver, RecvTimeoutError},
    thread::{self, JoinHandle},
    time::Duration,
};

use serde::Serialize;

use crate::{cancel::CancellationToken, error::AnalysisError};

/// Maximum number of stderr bytes kept for error reports.
const MAX_STDERR_SNIPPET: u64 = 512;

/// How often the output loop checks for cancellation while waiting on git.
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Output captured from one run of the counting command.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RawProbeOutput {
    /// Process exit code (`0` on success).
    pub exit_code: i32,

    /// Standard output, one entry per line, without line terminators.
    pub lines: Vec<String>,

    /// Leading part of standard error, trimmed.
    pub stderr: String,
}

impl RawProbeOutput {
    /// Build an output record with empty stderr.
    #[must_use]
    pub fn new<S: Into<String>>(exit_code: i32, lines: impl IntoIterator<Item = S>) -> Self {
        Self {
            exit_code,
            lines: lines.into_iter().map(Into::into).collect(),
            stderr: String::new(),
        }
    }

    /// Attach a stderr snippet.
    #[must_use]
    pub fn with_stderr(mut self, stderr: impl Into<String>) -> Self {
        self.stderr = stderr.into();
        self
    }
}

/// Something that can measure a repository by running an external command.
pub trait SizeProbe: Send + Sync {
    /// Run the command against `repository_path` and capture its output.
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError::ProbeFailed`] when the command cannot be run or
    /// exits unsuccessfully, and [`AnalysisError::Cancelled`] when `cancel`
    /// fires before the command finishes.
    fn probe(
        &self,
        repository_path: &Path,
        cancel: &CancellationToken,
    ) -> Result<RawProbeOutput, AnalysisError>;
}

/// Runs `git count-objects -v` with the repository as working directory.
#[derive(Clone, Debug)]
pub struct GitCountObjects {
    /// Git executable to invoke
    git: PathBuf,
}

impl Default for GitCountObjects {
    fn default() -> Self {
        Self::new("git")
    }
}

impl GitCountObjects {
    /// Create a probe that invokes the given git executable.
    #[must_use]
    pub fn new(git: impl Into<PathBuf>) -> Self {
        Self { git: git.into() }
    }

    /// The git executable this probe invokes.
    #[must_use]
    pub fn git(&self) -> &Path {
        &self.git
    }

    fn spawn(&self, repository_path: &Path) -> Result<Child, AnalysisError> {
        Command::new(&self.git)
            .args(["count-objects", "-v"])
            .current_dir(repository_path)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| AnalysisError::ProbeFailed {
                exit_code: None,
                stderr_snippet: format!(
                    "failed to run {} in {}: {e}",
                    self.git.display(),
                    repository_path.display()
                ),
            })
    }
}

impl SizeProbe for GitCountObjects {
    fn probe(
        &self,
        repository_path: &Path,
        cancel: &CancellationToken,
    ) -> Result<RawProbeOutput, AnalysisError> {
        if cancel.is_cancelled() {
            return Err(AnalysisError::Cancelled);
        }

        tracing::debug!(
            git = %self.git.display(),
            repository = %repository_path.display(),
            "running git count-objects -v"
        );

        let mut guard = ChildGuard::new(self.spawn(repository_path)?);

        let stderr = guard.child.stderr.take().map(drain_stderr);
        let stdout = guard
            .child
            .stdout
            .take()
            .ok_or_else(|| read_failure("stdout was not captured"))?;
        let lines_rx = stream_lines(stdout)?;

        let lines = collect_lines(&lines_rx, cancel)?;
        let status = guard
            .wait()
            .map_err(|e| read_failure(&format!("failed to wait for git: {e}")))?;

        let stderr = stderr
            .and_then(|handle| handle.join().ok())
            .unwrap_or_default();

        tracing::debug!(
            exit_code = ?status.code(),
            lines = lines.len(),
            "git count-objects finished"
        );

        if !status.success() {
            return Err(AnalysisError::ProbeFailed {
                exit_code: status.code(),
                stderr_snippet: stderr,
            });
        }

        Ok(RawProbeOutput {
            exit_code: status.code().unwrap_or(0),
            lines,
            stderr,
        })
    }
}

impl<F> SizeProbe for F
where
    F: Fn(&Path) -> Result<RawProbeOutput, AnalysisError> + Send + Sync,
{
    fn probe(
        &self,
        repository_path: &Path,
        cancel: &CancellationToken,
    ) -> Result<RawProbeOutput, AnalysisError> {
        if cancel.is_cancelled() {
            return Err(AnalysisError::Cancelled);
        }
        self(repository_path)
    }
}

/// Owns a child process and kills it unless it was waited on.
struct ChildGuard {
    child: Child,
    reaped: bool,
}

impl ChildGuard {
    const fn new(child: Child) -> Self {
        Self {
            child,
            reaped: false,
        }
    }

    fn wait(&mut self) -> io::Result<ExitStatus> {
        let status = self.child.wait()?;
        self.reaped = true;
        Ok(status)
    }
}

impl Drop for ChildGuard {
    fn drop(&mut self) {
        if !self.reaped {
            let _ = self.child.kill();
            let _ = self.child.wait();
        }
    }
}

/// Read stdout on a helper thread, forwarding decoded lines over a channel.
///
/// The channel disconnects once stdout reaches EOF or fails.
fn stream_lines(stdout: ChildStdout) -> Result<Receiver<io::Result<String>>, AnalysisError> {
    let (tx, rx) = mpsc::channel();

    thread::Builder::new()
        .name("git-stdout".to_string())
        .spawn(move || {
            let mut reader = BufReader::new(stdout);
            let mut buf = Vec::new();

            loop {
                buf.clear();
                match reader.read_until(b'\n', &mut buf) {
                    Ok(0) => break,
                    Ok(_) => {
                        if tx.send(Ok(decode_line(&buf))).is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        let _ = tx.send(Err(e));
                        break;
                    }
                }
            }
        })
        .map_err(|e| read_failure(&format!("failed to start output reader: {e}")))?;

    Ok(rx)
}

/// Collect every line until EOF, bailing out as soon as `cancel` fires.
fn collect_lines(
    lines_rx: &Receiver<io::Result<String>>,
    cancel: &CancellationToken,
) -> Result<Vec<String>, AnalysisError> {
    let mut lines = Vec::new();

    loop {
        if cancel.is_cancelled() {
            tracing::debug!("cancellation requested, terminating git");
            return Err(AnalysisError::Cancelled);
        }

        match lines_rx.recv_timeout(POLL_INTERVAL) {
            Ok(Ok(line)) => lines.push(line),
            Ok(Err(e)) => return Err(read_failure(&format!("failed to read git output: {e}"))),
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => return Ok(lines),
        }
    }
}

/// Drain stderr on a helper thread, keeping only its leading part.
///
/// The rest is still consumed so git never blocks on a full pipe.
fn drain_stderr(mut stderr: ChildStderr) -> JoinHandle<String> {
    thread::spawn(move || {
        let mut head = Vec::new();
        let _ = stderr.by_ref().take(MAX_STDERR_SNIPPET).read_to_end(&mut head);
        let _ = io::copy(&mut stderr, &mut io::sink());
        String::from_utf8_lossy(&head).trim().to_string()
    })
}

fn decode_line(raw: &[u8]) -> String {
    String::from_utf8_lossy(raw)
        .trim_end_matches(['\n', '\r'])
        .to_string()
}

fn read_failure(message: &str) -> AnalysisError {
    AnalysisError::ProbeFailed {
        exit_code: None,
        stderr_snippet: message.to_string(),
    }
}
