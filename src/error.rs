//! Error types for the analysis pipeline.
//!
//! Every failure the pipeline can hit is represented as an [`AnalysisError`]
//! variant, so callers always receive a typed value they can render without
//! re-running the probe.

use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

/// Everything that can stop an analysis before it reaches a result.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AnalysisError {
    /// The repository provider returned no repository for the project root.
    #[error("No Git repository found in {}", project_root.display())]
    NoRepositoryFound {
        /// The project root that was searched.
        project_root: PathBuf,
    },

    /// The counting command could not be spawned or exited unsuccessfully.
    ///
    /// `exit_code` is `None` when the process never started or was terminated
    /// by a signal.
    #[error("{}", describe_probe_failure(*exit_code, stderr_snippet))]
    ProbeFailed {
        /// Exit status of the external command, when it produced one.
        exit_code: Option<i32>,

        /// Leading part of the command's stderr, or the spawn error message.
        stderr_snippet: String,
    },

    /// The counting command's output could not be interpreted.
    #[error("Failed to parse git output: {reason}")]
    ParseFailed {
        /// Why the output was rejected.
        reason: String,
    },

    /// The analysis was cancelled before it completed.
    #[error("Analysis cancelled")]
    Cancelled,
}

impl AnalysisError {
    /// Stable, machine-readable tag for this error.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::NoRepositoryFound { .. } => "no_repository_found",
            Self::ProbeFailed { .. } => "probe_failed",
            Self::ParseFailed { .. } => "parse_failed",
            Self::Cancelled => "cancelled",
        }
    }

    /// Exit code carried by a [`AnalysisError::ProbeFailed`], if any.
    #[must_use]
    pub const fn exit_code(&self) -> Option<i32> {
        match self {
            Self::ProbeFailed { exit_code, .. } => *exit_code,
            _ => None,
        }
    }
}

fn describe_probe_failure(exit_code: Option<i32>, stderr_snippet: &str) -> String {
    let head = exit_code.map_or_else(
        || "Git command failed to run".to_string(),
        |code| format!("Git command failed with exit code: {code}"),
    );

    if stderr_snippet.is_empty() {
        head
    } else {
        format!("{head} ({stderr_snippet})")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_tags() {
        let no_repo = AnalysisError::NoRepositoryFound {
            project_root: PathBuf::from("/tmp/x"),
        };
        assert_eq!(no_repo.kind(), "no_repository_found");
        assert_eq!(AnalysisError::Cancelled.kind(), "cancelled");
        assert_eq!(
            AnalysisError::ParseFailed {
                reason: "nope".to_string()
            }
            .kind(),
            "parse_failed"
        );
    }

    #[test]
    fn test_probe_failed_message_includes_exit_code() {
        let err = AnalysisError::ProbeFailed {
            exit_code: Some(128),
            stderr_snippet: String::new(),
        };
        assert_eq!(err.to_string(), "Git command failed with exit code: 128");
        assert_eq!(err.exit_code(), Some(128));
    }

    #[test]
    fn test_probe_failed_message_includes_stderr() {
        let err = AnalysisError::ProbeFailed {
            exit_code: Some(128),
            stderr_snippet: "fatal: not a git repository".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Git command failed with exit code: 128 (fatal: not a git repository)"
        );
    }

    #[test]
    fn test_probe_failed_without_exit_code() {
        let err = AnalysisError::ProbeFailed {
            exit_code: None,
            stderr_snippet: "No such file or directory".to_string(),
        };
        assert!(err.to_string().starts_with("Git command failed to run"));
        assert_eq!(err.exit_code(), None);
    }

    #[test]
    fn test_serializes_with_kind_tag() {
        let err = AnalysisError::ProbeFailed {
            exit_code: Some(1),
            stderr_snippet: "boom".to_string(),
        };
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["kind"], "probe_failed");
        assert_eq!(json["exit_code"], 1);
        assert_eq!(json["stderr_snippet"], "boom");
    }
}
