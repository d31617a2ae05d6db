//! Repository discovery and selection.
//!
//! The pipeline never scans the filesystem on its own. A host hands it a
//! [`RepositoryProvider`] that knows which repositories belong to a project,
//! and [`locate`] picks the one to analyze.
//!
//! ## Main Parts
//!
//! - [`RepositoryHandle`] - Root path of a version-controlled tree
//! - [`RepositoryProvider`] - Host capability listing a project's repositories
//! - [`StaticRepositories`] - A provider over a fixed, host-supplied list
//! - [`WorkspaceDiscovery`] - Filesystem-backed provider used by the CLI

pub mod discovery;
pub mod locator;

pub use discovery::WorkspaceDiscovery;
pub use locator::{RepositoryHandle, RepositoryProvider, StaticRepositories, locate};
