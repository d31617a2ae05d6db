//! The analysis pipeline.
//!
//! A [`Pipeline`] walks a fixed sequence of states:
//!
//! ```text
//! Idle -> Locating -> Probing -> Parsing -> Aggregating -> Formatting -> Done
//! ```
//!
//! Any step can fail, which ends the run in [`PipelineState::Failed`] carrying
//! the [`AnalysisError`] that stopped it. Nothing is retried and no state
//! survives between runs.
//!
//! Only the probe step blocks. [`spawn_analysis`] moves a whole run onto a
//! worker thread and hands back an [`AnalysisHandle`] the caller can poll,
//! wait on, or cancel from its own thread.

use std::{
    fmt,
    path::{Path, PathBuf},
    sync::{
        Arc,
        mpsc::{self, Receiver, RecvTimeoutError, TryRecvError},
    },
    thread,
    time::Duration,
};

use serde::Serialize;

use crate::{
    aggregator::aggregate,
    cancel::CancellationToken,
    error::AnalysisError,
    parser::{ParseMode, ParsedFields, parse_with_mode},
    probe::SizeProbe,
    repository::{RepositoryHandle, RepositoryProvider, locate},
    utils::format_bytes,
};

/// Outcome of a successful analysis.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct AnalysisResult {
    /// Root of the repository that was measured.
    pub repository_path: PathBuf,

    /// Loose-object plus pack size, in bytes.
    pub total_bytes: u64,

    /// Lines printed by the counting command, unmodified.
    pub raw_lines: Vec<String>,

    /// Every field recognized in the raw output.
    pub fields: ParsedFields,
}

/// Where a pipeline run currently is.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PipelineState {
    /// Not started.
    Idle,

    /// Asking the repository provider for the project's repositories.
    Locating,

    /// Running the counting command in the selected repository.
    Probing(RepositoryHandle),

    /// Turning raw output into fields.
    Parsing,

    /// Summing the size fields.
    Aggregating,

    /// Rendering the total for display.
    Formatting {
        /// Total that is being formatted.
        total_bytes: u64,

        /// Human-readable form of `total_bytes`.
        formatted: String,
    },

    /// Finished successfully.
    Done(AnalysisResult),

    /// Stopped by an error.
    Failed(AnalysisError),
}

impl PipelineState {
    /// Short lowercase name, used in logs.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Locating => "locating",
            Self::Probing(_) => "probing",
            Self::Parsing => "parsing",
            Self::Aggregating => "aggregating",
            Self::Formatting { .. } => "formatting",
            Self::Done(_) => "done",
            Self::Failed(_) => "failed",
        }
    }

    /// Whether no further transition can happen from this state.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Done(_) | Self::Failed(_))
    }

    /// Convert a terminal state into the result it carries.
    ///
    /// Returns `None` for states that are still in progress.
    #[must_use]
    pub fn into_result(self) -> Option<Result<AnalysisResult, AnalysisError>> {
        match self {
            Self::Done(result) => Some(Ok(result)),
            Self::Failed(err) => Some(Err(err)),
            _ => None,
        }
    }
}

/// Callback invoked on every state transition.
pub type StateObserver = Arc<dyn Fn(&PipelineState) + Send + Sync>;

/// Orchestrates locate, probe, parse, aggregate and format for one project.
///
/// The repository provider and the probe are injected, so the pipeline holds
/// no hidden per-project state.
pub struct Pipeline<R, P> {
    provider: R,
    probe: P,
    parse_mode: ParseMode,
    cancel: CancellationToken,
    observer: Option<StateObserver>,
}

impl<R, P> fmt::Debug for Pipeline<R, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("parse_mode", &self.parse_mode)
            .field("cancelled", &self.cancel.is_cancelled())
            .field("observed", &self.observer.is_some())
            .finish_non_exhaustive()
    }
}

impl<R: RepositoryProvider, P: SizeProbe> Pipeline<R, P> {
    /// Create a pipeline with lenient parsing and a fresh cancellation token.
    #[must_use]
    pub fn new(provider: R, probe: P) -> Self {
        Self {
            provider,
            probe,
            parse_mode: ParseMode::default(),
            cancel: CancellationToken::new(),
            observer: None,
        }
    }

    /// Set how strictly the command output is parsed.
    #[must_use]
    pub const fn with_parse_mode(mut self, parse_mode: ParseMode) -> Self {
        self.parse_mode = parse_mode;
        self
    }

    /// Use `cancel` to stop the run early.
    #[must_use]
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Get notified of every state the run enters, terminal states included.
    #[must_use]
    pub fn with_observer(mut self, observer: impl Fn(&PipelineState) + Send + Sync + 'static) -> Self {
        self.observer = Some(Arc::new(observer));
        self
    }

    /// The token that cancels this pipeline.
    #[must_use]
    pub const fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Analyze the first repository of `project_root`.
    ///
    /// # Errors
    ///
    /// Returns the [`AnalysisError`] of whichever step failed.
    pub fn run(&self, project_root: &Path) -> Result<AnalysisResult, AnalysisError> {
        let outcome = self.execute(project_root);

        if let Err(err) = &outcome {
            tracing::debug!(
                project_root = %project_root.display(),
                error = %err,
                "analysis failed"
            );
        }

        if let Some(observer) = &self.observer {
            let state = match &outcome {
                Ok(result) => PipelineState::Done(result.clone()),
                Err(err) => PipelineState::Failed(err.clone()),
            };
            observer(&state);
        }

        outcome
    }

    /// Analyze `project_root` and return the terminal state reached.
    ///
    /// The result is always [`PipelineState::Done`] or [`PipelineState::Failed`].
    #[must_use]
    pub fn run_to_state(&self, project_root: &Path) -> PipelineState {
        match self.run(project_root) {
            Ok(result) => PipelineState::Done(result),
            Err(err) => PipelineState::Failed(err),
        }
    }

    fn execute(&self, project_root: &Path) -> Result<AnalysisResult, AnalysisError> {
        self.enter(&PipelineState::Locating)?;
        let repository = locate(&self.provider, project_root)?;

        self.enter(&PipelineState::Probing(repository.clone()))?;
        let raw = self.probe.probe(&repository.root_path, &self.cancel)?;
        if raw.exit_code != 0 {
            return Err(AnalysisError::ProbeFailed {
                exit_code: Some(raw.exit_code),
                stderr_snippet: raw.stderr,
            });
        }

        self.enter(&PipelineState::Parsing)?;
        let fields = parse_with_mode(&raw.lines, self.parse_mode)?;
        tracing::debug!(
            fields = fields.len(),
            lines = raw.lines.len(),
            "parsed count-objects output"
        );

        self.enter(&PipelineState::Aggregating)?;
        let total_bytes = aggregate(&fields);

        let formatted = format_bytes(total_bytes);
        tracing::debug!(
            repository = %repository.root_path.display(),
            total_bytes,
            formatted = %formatted,
            "repository size computed"
        );
        self.enter(&PipelineState::Formatting {
            total_bytes,
            formatted,
        })?;

        Ok(AnalysisResult {
            repository_path: repository.root_path,
            total_bytes,
            raw_lines: raw.lines,
            fields,
        })
    }

    /// Move into `state` unless cancellation was requested.
    fn enter(&self, state: &PipelineState) -> Result<(), AnalysisError> {
        if self.cancel.is_cancelled() {
            return Err(AnalysisError::Cancelled);
        }

        tracing::trace!(state = state.name(), "pipeline transition");
        self.notify(state);
        Ok(())
    }

    fn notify(&self, state: &PipelineState) {
        if let Some(observer) = &self.observer {
            observer(state);
        }
    }
}

/// Run a one-off analysis with default settings.
///
/// # Errors
///
/// Returns the [`AnalysisError`] of whichever step failed.
pub fn analyze<R: RepositoryProvider, P: SizeProbe>(
    provider: R,
    probe: P,
    project_root: &Path,
) -> Result<AnalysisResult, AnalysisError> {
    Pipeline::new(provider, probe).run(project_root)
}

/// Handle to an analysis running on a worker thread.
///
/// The worker sends exactly one result. Receiving it is up to the caller,
/// from whichever thread it wants the result delivered on.
#[derive(Debug)]
pub struct AnalysisHandle {
    project_root: PathBuf,
    cancel: CancellationToken,
    receiver: Option<Receiver<Result<AnalysisResult, AnalysisError>>>,
}

impl AnalysisHandle {
    /// The project root being analyzed.
    #[must_use]
    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    /// Ask the worker to stop. The result will be [`AnalysisError::Cancelled`]
    /// unless the run had already finished.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Result of the run if it has finished, without blocking.
    ///
    /// Yields `Some` at most once; later calls return `None`.
    pub fn try_result(&mut self) -> Option<Result<AnalysisResult, AnalysisError>> {
        let outcome = match self.receiver.as_ref()?.try_recv() {
            Ok(result) => result,
            Err(TryRecvError::Empty) => return None,
            Err(TryRecvError::Disconnected) => Err(worker_lost()),
        };

        self.receiver = None;
        Some(outcome)
    }

    /// Wait up to `timeout` for the result.
    ///
    /// Yields `Some` at most once; later calls return `None`.
    pub fn wait_timeout(
        &mut self,
        timeout: Duration,
    ) -> Option<Result<AnalysisResult, AnalysisError>> {
        let outcome = match self.receiver.as_ref()?.recv_timeout(timeout) {
            Ok(result) => result,
            Err(RecvTimeoutError::Timeout) => return None,
            Err(RecvTimeoutError::Disconnected) => Err(worker_lost()),
        };

        self.receiver = None;
        Some(outcome)
    }

    /// Block until the run finishes.
    ///
    /// # Errors
    ///
    /// Returns the run's [`AnalysisError`], or [`AnalysisError::ProbeFailed`]
    /// if the worker went away without reporting (or the result was already
    /// taken).
    pub fn wait(self) -> Result<AnalysisResult, AnalysisError> {
        self.receiver
            .ok_or_else(worker_lost)?
            .recv()
            .unwrap_or_else(|_| Err(worker_lost()))
    }
}

/// Start `pipeline` on a dedicated worker thread.
///
/// The returned handle shares the pipeline's cancellation token.
pub fn spawn_analysis<R, P>(pipeline: Pipeline<R, P>, project_root: impl Into<PathBuf>) -> AnalysisHandle
where
    R: RepositoryProvider + 'static,
    P: SizeProbe + 'static,
{
    let project_root = project_root.into();
    let cancel = pipeline.cancellation_token().clone();
    let (tx, rx) = mpsc::channel();

    let worker_root = project_root.clone();
    let worker_tx = tx.clone();
    let spawned = thread::Builder::new()
        .name("git-space-analysis".to_string())
        .spawn(move || {
            let _ = worker_tx.send(pipeline.run(&worker_root));
        });

    if let Err(e) = spawned {
        let _ = tx.send(Err(AnalysisError::ProbeFailed {
            exit_code: None,
            stderr_snippet: format!("failed to start analysis worker: {e}"),
        }));
    }

    AnalysisHandle {
        project_root,
        cancel,
        receiver: Some(rx),
    }
}

fn worker_lost() -> AnalysisError {
    AnalysisError::ProbeFailed {
        exit_code: None,
        stderr_snippet: "analysis worker stopped without reporting a result".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        Mutex,
        atomic::{AtomicUsize, Ordering},
    };

    use super::*;
    use crate::{
        probe::RawProbeOutput,
        repository::{RepositoryHandle, StaticRepositories},
    };

    fn one_repo() -> StaticRepositories {
        StaticRepositories::new(vec![RepositoryHandle::new("/repo")])
    }

    fn lines_probe(
        exit_code: i32,
        lines: &'static [&'static str],
    ) -> impl Fn(&Path) -> Result<RawProbeOutput, AnalysisError> + Send + Sync {
        move |_: &Path| Ok::<_, AnalysisError>(RawProbeOutput::new(exit_code, lines.iter().copied()))
    }

    #[test]
    fn test_end_to_end_total() {
        let probe = lines_probe(
            0,
            &["count 10", "size 50", "in-pack 5", "packs 1", "size-pack 75"],
        );

        let result = Pipeline::new(one_repo(), probe)
            .run(Path::new("/project"))
            .unwrap();

        assert_eq!(result.total_bytes, (50 + 75) * 1024);
        assert_eq!(result.total_bytes, 128_000);
        assert_eq!(result.repository_path, PathBuf::from("/repo"));
        assert_eq!(result.raw_lines.len(), 5);
        assert_eq!(result.fields.get("count"), Some(10));
    }

    #[test]
    fn test_nonzero_exit_is_probe_failed() {
        let probe = |_: &Path| {
            Ok::<_, AnalysisError>(
                RawProbeOutput::new(128, Vec::<String>::new()).with_stderr("fatal: bad"),
            )
        };

        let state = Pipeline::new(one_repo(), probe).run_to_state(Path::new("/project"));

        assert_eq!(
            state,
            PipelineState::Failed(AnalysisError::ProbeFailed {
                exit_code: Some(128),
                stderr_snippet: "fatal: bad".to_string(),
            })
        );
    }

    #[test]
    fn test_no_repository_skips_probe() {
        let calls = Arc::new(AtomicUsize::new(0));
        let probe = {
            let calls = Arc::clone(&calls);
            move |_: &Path| {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok::<_, AnalysisError>(RawProbeOutput::new(0, ["size 1"]))
            }
        };

        let err = Pipeline::new(StaticRepositories::default(), probe)
            .run(Path::new("/empty"))
            .unwrap_err();

        assert_eq!(
            err,
            AnalysisError::NoRepositoryFound {
                project_root: PathBuf::from("/empty")
            }
        );
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_probe_is_given_repository_root() {
        let seen = Arc::new(Mutex::new(None));
        let probe = {
            let seen = Arc::clone(&seen);
            move |path: &Path| {
                *seen.lock().unwrap() = Some(path.to_path_buf());
                Ok::<_, AnalysisError>(RawProbeOutput::new(0, ["size 1"]))
            }
        };

        Pipeline::new(one_repo(), probe)
            .run(Path::new("/project"))
            .unwrap();

        assert_eq!(*seen.lock().unwrap(), Some(PathBuf::from("/repo")));
    }

    #[test]
    fn test_strict_mode_surfaces_parse_failed() {
        let probe = lines_probe(0, &["warning: unexpected"]);

        let lenient = Pipeline::new(one_repo(), &probe).run(Path::new("/p")).unwrap();
        assert_eq!(lenient.total_bytes, 0);

        let err = Pipeline::new(one_repo(), &probe)
            .with_parse_mode(ParseMode::Strict)
            .run(Path::new("/p"))
            .unwrap_err();
        assert_eq!(err.kind(), "parse_failed");
    }

    #[test]
    fn test_observer_sees_states_in_order() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let recorder = {
            let seen = Arc::clone(&seen);
            move |state: &PipelineState| seen.lock().unwrap().push(state.name())
        };

        let probe = lines_probe(0, &["size 1", "size-pack 1"]);
        let state = Pipeline::new(one_repo(), probe)
            .with_observer(recorder)
            .run_to_state(Path::new("/p"));

        assert!(state.is_terminal());
        assert_eq!(
            *seen.lock().unwrap(),
            vec![
                "locating",
                "probing",
                "parsing",
                "aggregating",
                "formatting",
                "done"
            ]
        );
    }

    #[test]
    fn test_observer_sees_formatted_total() {
        let formatted = Arc::new(Mutex::new(None));
        let recorder = {
            let formatted = Arc::clone(&formatted);
            move |state: &PipelineState| {
                if let PipelineState::Formatting { formatted: text, .. } = state {
                    *formatted.lock().unwrap() = Some(text.clone());
                }
            }
        };

        let probe = lines_probe(0, &["size 1024", "size-pack 512"]);
        Pipeline::new(one_repo(), probe)
            .with_observer(recorder)
            .run(Path::new("/p"))
            .unwrap();

        assert_eq!(formatted.lock().unwrap().as_deref(), Some("1.50 MB"));
    }

    #[test]
    fn test_failure_stops_before_later_states() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let recorder = {
            let seen = Arc::clone(&seen);
            move |state: &PipelineState| seen.lock().unwrap().push(state.name())
        };

        let probe = lines_probe(1, &[]);
        let state = Pipeline::new(one_repo(), probe)
            .with_observer(recorder)
            .run_to_state(Path::new("/p"));

        assert!(matches!(
            state,
            PipelineState::Failed(AnalysisError::ProbeFailed {
                exit_code: Some(1),
                ..
            })
        ));
        assert_eq!(*seen.lock().unwrap(), vec!["locating", "probing", "failed"]);
    }

    #[test]
    fn test_cancelled_before_run() {
        let token = CancellationToken::new();
        token.cancel();

        let err = Pipeline::new(one_repo(), lines_probe(0, &["size 1"]))
            .with_cancellation(token)
            .run(Path::new("/p"))
            .unwrap_err();

        assert_eq!(err, AnalysisError::Cancelled);
    }

    #[test]
    fn test_into_result_of_non_terminal_state() {
        assert!(PipelineState::Idle.into_result().is_none());
        assert!(PipelineState::Parsing.into_result().is_none());
        assert!(!PipelineState::Parsing.is_terminal());
    }

    #[test]
    fn test_into_result_of_terminal_states() {
        assert_eq!(
            PipelineState::Failed(AnalysisError::Cancelled).into_result(),
            Some(Err(AnalysisError::Cancelled))
        );
        let done =
            Pipeline::new(one_repo(), lines_probe(0, &["size 1"])).run_to_state(Path::new("/p"));
        assert_eq!(
            done.into_result().map(|r| r.map(|res| res.total_bytes)),
            Some(Ok(1024))
        );
    }

    #[test]
    fn test_analyze_convenience() {
        let result = analyze(one_repo(), lines_probe(0, &["size 2"]), Path::new("/p")).unwrap();
        assert_eq!(result.total_bytes, 2048);
    }

    #[test]
    fn test_spawned_analysis_delivers_one_result() {
        let pipeline = Pipeline::new(one_repo(), lines_probe(0, &["size-pack 3"]));
        let handle = spawn_analysis(pipeline, "/p");

        assert_eq!(handle.project_root(), Path::new("/p"));
        assert_eq!(handle.wait().unwrap().total_bytes, 3072);
    }

    #[test]
    fn test_wait_timeout_yields_once() {
        let pipeline = Pipeline::new(one_repo(), lines_probe(0, &["size 1"]));
        let mut handle = spawn_analysis(pipeline, "/p");

        let first = handle.wait_timeout(Duration::from_secs(10));
        assert!(matches!(first, Some(Ok(_))));
        assert!(handle.try_result().is_none());
        assert!(handle.wait_timeout(Duration::from_millis(1)).is_none());
    }

    #[test]
    fn test_spawned_analysis_can_be_cancelled() {
        let (release_tx, release_rx) = mpsc::channel::<()>();
        let release_rx = Mutex::new(release_rx);
        let probe = move |_: &Path| {
            let _ = release_rx.lock().unwrap().recv();
            Ok::<_, AnalysisError>(RawProbeOutput::new(0, ["size 1"]))
        };

        let handle = spawn_analysis(Pipeline::new(one_repo(), probe), "/p");
        handle.cancel();
        release_tx.send(()).unwrap();

        assert_eq!(handle.wait(), Err(AnalysisError::Cancelled));
    }
}
