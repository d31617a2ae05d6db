//! Repository selection for a project root.

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::error::AnalysisError;

/// Root directory of a Git repository.
///
/// Providers are responsible for only handing out paths that exist and are
/// under version control; the pipeline takes them at face value.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct RepositoryHandle {
    /// Absolute path of the repository's working tree root.
    pub root_path: PathBuf,
}

impl RepositoryHandle {
    /// Wrap a repository root path.
    #[must_use]
    pub fn new(root_path: impl Into<PathBuf>) -> Self {
        Self {
            root_path: root_path.into(),
        }
    }
}

/// Host capability that lists the repositories belonging to a project.
///
/// Implementations must return repositories in a stable order; [`locate`]
/// always picks the first one.
pub trait RepositoryProvider: Send + Sync {
    /// Repositories known for `project_root`, in the host's preferred order.
    fn list_repositories(&self, project_root: &Path) -> Vec<RepositoryHandle>;
}

impl<P: RepositoryProvider + ?Sized> RepositoryProvider for &P {
    fn list_repositories(&self, project_root: &Path) -> Vec<RepositoryHandle> {
        (**self).list_repositories(project_root)
    }
}

/// Provider over a fixed list, for hosts that already track their repositories.
///
/// The project root is ignored: the same list is returned for every call.
#[derive(Clone, Debug, Default)]
pub struct StaticRepositories(Vec<RepositoryHandle>);

impl StaticRepositories {
    /// Create a provider that always returns `repositories`.
    #[must_use]
    pub const fn new(repositories: Vec<RepositoryHandle>) -> Self {
        Self(repositories)
    }
}

impl From<Vec<RepositoryHandle>> for StaticRepositories {
    fn from(repositories: Vec<RepositoryHandle>) -> Self {
        Self(repositories)
    }
}

impl RepositoryProvider for StaticRepositories {
    fn list_repositories(&self, _project_root: &Path) -> Vec<RepositoryHandle> {
        self.0.clone()
    }
}

/// Pick the repository to analyze for `project_root`.
///
/// This is the first entry the provider returns. Projects holding several
/// repositories only get their first one analyzed.
///
/// # Errors
///
/// Returns [`AnalysisError::NoRepositoryFound`] when the provider lists nothing.
pub fn locate(
    provider: &dyn RepositoryProvider,
    project_root: &Path,
) -> Result<RepositoryHandle, AnalysisError> {
    let repositories = provider.list_repositories(project_root);

    if repositories.len() > 1 {
        tracing::debug!(
            count = repositories.len(),
            project_root = %project_root.display(),
            "multiple repositories found, analyzing the first one"
        );
    }

    repositories
        .into_iter()
        .next()
        .ok_or_else(|| AnalysisError::NoRepositoryFound {
            project_root: project_root.to_path_buf(),
        })
}
