//! # git-space-analyzer
//!
//! Measures how much space a Git repository's object database uses.
//!
//! The heavy lifting is done by `git count-objects -v`; this crate finds the
//! repository, runs the command, parses its `key value` output, sums loose and
//! packed object sizes, and formats the total for display.
//!
//! ## Main Parts
//!
//! - [`repository`] - Repository providers and selection ([`repository::locate`])
//! - [`probe`] - Running the counting command ([`probe::GitCountObjects`])
//! - [`parser`] - Turning output lines into [`parser::ParsedFields`]
//! - [`aggregator`] - Computing the total size
//! - [`utils`] - Byte formatting
//! - [`pipeline`] - Orchestration, state machine and background runs
//! - [`output`] - Human-readable and JSON rendering
//! - [`config`] - Config file and resolved options
//!
//! ## Example
//!
//! ```no_run
//! use std::path::Path;
//! use git_space_analyzer::{
//!     pipeline::Pipeline, probe::GitCountObjects, repository::WorkspaceDiscovery,
//!     utils::format_bytes,
//! };
//!
//! let pipeline = Pipeline::new(WorkspaceDiscovery::default(), GitCountObjects::default());
//! match pipeline.run(Path::new(".")) {
//!     Ok(result) => println!("{}", format_bytes(result.total_bytes)),
//!     Err(err) => eprintln!("{err}"),
//! }
//! ```

pub mod aggregator;
pub mod cancel;
pub mod config;
pub mod error;
pub mod output;
pub mod parser;
pub mod pipeline;
pub mod probe;
pub mod repository;
pub mod utils;

pub use cancel::CancellationToken;
pub use config::{AnalysisOptions, OutputOptions};
pub use error::AnalysisError;
pub use pipeline::{AnalysisHandle, AnalysisResult, Pipeline, PipelineState, spawn_analysis};
