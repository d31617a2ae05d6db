//! Resolved runtime options.
//!
//! These structs hold the final values after CLI arguments and the config
//! file have been merged. The library side only consumes them; layering is
//! done by the command-line front-end.

use std::path::PathBuf;

use crate::{
    parser::ParseMode,
    probe::GitCountObjects,
    repository::{WorkspaceDiscovery, discovery::DEFAULT_MAX_DEPTH},
    utils::SizeUnits,
};

/// How each repository is located and measured.
#[derive(Clone, Debug)]
pub struct AnalysisOptions {
    /// Git executable used for `count-objects`
    pub git: PathBuf,

    /// Lenient or strict parsing of the command output
    pub parse_mode: ParseMode,

    /// Depth of the nested-repository walk below each project root
    pub max_depth: usize,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            git: PathBuf::from("git"),
            parse_mode: ParseMode::Lenient,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl AnalysisOptions {
    /// Repository provider configured by these options.
    #[must_use]
    pub const fn discovery(&self) -> WorkspaceDiscovery {
        WorkspaceDiscovery::new(self.max_depth)
    }

    /// Size probe configured by these options.
    #[must_use]
    pub fn probe(&self) -> GitCountObjects {
        GitCountObjects::new(self.git.clone())
    }
}

/// How results are presented.
#[derive(Clone, Copy, Debug, Default)]
pub struct OutputOptions {
    /// Print a single JSON document instead of human-readable text
    pub json: bool,

    /// Unit system for human-readable sizes
    pub units: SizeUnits,

    /// Print the raw command output under each result
    pub raw: bool,
}
