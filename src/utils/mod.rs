//! Utility functions and helpers.
//!
//! This module contains utility functions used throughout the application,
//! such as size formatting helpers.

pub mod size;

pub use size::{SizeUnits, format_bytes};
