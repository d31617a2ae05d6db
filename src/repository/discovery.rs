//! Filesystem-backed repository discovery.
//!
//! [`WorkspaceDiscovery`] plays the part an IDE's repository manager would:
//! it reports the repository enclosing a project root, followed by any
//! repositories nested below it.

use std::path::Path;

use walkdir::WalkDir;

use super::{RepositoryHandle, RepositoryProvider};

/// Default depth for the nested-repository walk.
pub const DEFAULT_MAX_DEPTH: usize = 3;

/// Discovers repositories for a project root on the local filesystem.
///
/// The enclosing repository (the project root itself or its nearest ancestor
/// holding a `.git` entry) comes first. Nested repositories follow in
/// file-name order, found with a walk limited to `max_depth` levels. The walk
/// never enters `.git` directories or the inside of a nested repository.
#[derive(Clone, Copy, Debug)]
pub struct WorkspaceDiscovery {
    /// Maximum depth below the project root to look for nested repositories
    max_depth: usize,
}

impl Default for WorkspaceDiscovery {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_DEPTH)
    }
}

impl WorkspaceDiscovery {
    /// Create a discovery provider walking at most `max_depth` levels.
    ///
    /// A depth of `0` disables the nested walk, leaving only the enclosing
    /// repository.
    #[must_use]
    pub const fn new(max_depth: usize) -> Self {
        Self { max_depth }
    }

    /// Whether `path` is the root of a working tree (holds a `.git` dir or gitfile).
    fn is_repository_root(path: &Path) -> bool {
        path.join(".git").exists()
    }

    /// Nearest directory at or above `root` that is a repository root.
    fn find_enclosing(root: &Path) -> Option<RepositoryHandle> {
        root.ancestors()
            .find(|dir| Self::is_repository_root(dir))
            .map(RepositoryHandle::new)
    }

    /// Repositories strictly below `root`, in deterministic order.
    fn find_nested(self, root: &Path) -> Vec<RepositoryHandle> {
        let mut nested = Vec::new();

        if self.max_depth == 0 {
            return nested;
        }

        let mut walker = WalkDir::new(root)
            .min_depth(1)
            .max_depth(self.max_depth)
            .sort_by_file_name()
            .into_iter();

        while let Some(entry) = walker.next() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    tracing::debug!(error = %err, "skipping unreadable entry during discovery");
                    continue;
                }
            };

            if !entry.file_type().is_dir() {
                continue;
            }

            if entry.file_name() == ".git" {
                walker.skip_current_dir();
                continue;
            }

            if Self::is_repository_root(entry.path()) {
                nested.push(RepositoryHandle::new(entry.path()));
                walker.skip_current_dir();
            }
        }

        nested
    }
}

impl RepositoryProvider for WorkspaceDiscovery {
    fn list_repositories(&self, project_root: &Path) -> Vec<RepositoryHandle> {
        let Ok(root) = project_root.canonicalize() else {
            tracing::debug!(
                project_root = %project_root.display(),
                "project root does not exist"
            );
            return Vec::new();
        };

        let mut repositories: Vec<RepositoryHandle> = Self::find_enclosing(&root)
            .into_iter()
            .collect();

        for handle in self.find_nested(&root) {
            if !repositories.contains(&handle) {
                repositories.push(handle);
            }
        }

        tracing::debug!(
            count = repositories.len(),
            root = %root.display(),
            "repository discovery finished"
        );

        repositories
    }
}
