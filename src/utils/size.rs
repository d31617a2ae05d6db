//! Size formatting utilities.
//!
//! This module turns raw byte counts into human-readable strings. The default
//! style scales by 1024 and labels units `KB`, `MB`, ... the way Git GUIs and
//! IDE dialogs usually do; an SI (1000-based) style is also available.

use clap::ValueEnum;
use humansize::{DECIMAL, format_size};

/// Ordered unit suffixes used by [`format_bytes`]. Scaling stops at the last one.
const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];

/// One kibibyte, the scaling step used by [`format_bytes`].
const STEP: f64 = 1024.0;

/// Which unit system to use when displaying sizes.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default, ValueEnum)]
pub enum SizeUnits {
    /// 1024-based scaling with `B`, `KB`, `MB`, `GB`, `TB` labels
    #[default]
    Binary,

    /// 1000-based SI scaling (`kB`, `MB`, `GB`, ...)
    Decimal,
}

impl SizeUnits {
    /// Format `bytes` in this unit system.
    #[must_use]
    pub fn format(self, bytes: u64) -> String {
        match self {
            Self::Binary => format_bytes(bytes),
            Self::Decimal => format_size(bytes, DECIMAL),
        }
    }
}

/// Format a byte count as a human-readable string using 1024-based units.
///
/// The value is divided by 1024 until it drops below 1024 or the largest unit
/// (`TB`) is reached, then rendered with exactly two decimal places.
///
/// # Examples
///
/// ```
/// # use git_space_analyzer::utils::format_bytes;
/// assert_eq!(format_bytes(0), "0 B");
/// assert_eq!(format_bytes(1024), "1.00 KB");
/// assert_eq!(format_bytes(1_572_864), "1.50 MB");
/// ```
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn format_bytes(bytes: u64) -> String {
    if bytes == 0 {
        return "0 B".to_string();
    }

    let mut size = bytes as f64;
    let mut unit_index = 0;

    while size >= STEP && unit_index < UNITS.len() - 1 {
        size /= STEP;
        unit_index += 1;
    }

    format!("{size:.2} {}", UNITS[unit_index])
}
