//! Configuration for analysis and output.
//!
//! [`file`] loads the optional TOML config file; [`options`] holds the
//! resolved values the rest of the crate works with.

pub mod file;
pub mod options;

pub use file::FileConfig;
pub use options::{AnalysisOptions, OutputOptions};
