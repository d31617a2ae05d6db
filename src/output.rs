//! Rendering of analysis results.
//!
//! Results can be shown as human-readable text or, when the `--json` flag is
//! passed, serialized to stdout as a single JSON object for scripting.

use std::{fmt::Write as _, path::PathBuf};

use colored::Colorize;
use serde::Serialize;

use crate::{
    error::AnalysisError,
    parser::ParsedFields,
    pipeline::AnalysisResult,
    utils::SizeUnits,
};

/// Outcome of analyzing one project root.
#[derive(Clone, Debug)]
pub struct RepositoryReport {
    /// Project root as given by the user.
    pub project_root: PathBuf,

    /// What the pipeline produced for it.
    pub outcome: Result<AnalysisResult, AnalysisError>,
}

impl RepositoryReport {
    /// Pair a project root with its pipeline outcome.
    #[must_use]
    pub const fn new(
        project_root: PathBuf,
        outcome: Result<AnalysisResult, AnalysisError>,
    ) -> Self {
        Self {
            project_root,
            outcome,
        }
    }
}

/// Whether every report in `reports` succeeded.
#[must_use]
pub fn all_succeeded(reports: &[RepositoryReport]) -> bool {
    reports.iter().all(|report| report.outcome.is_ok())
}

/// Top-level JSON output emitted when `--json` is active.
#[derive(Serialize, Debug)]
pub struct JsonOutput {
    /// One entry per project root, in command-line order.
    pub results: Vec<JsonRepositoryEntry>,

    /// Aggregated summary statistics.
    pub summary: JsonSummary,
}

/// A single project root in the JSON output.
#[derive(Serialize, Debug)]
pub struct JsonRepositoryEntry {
    /// Project root as given on the command line.
    pub project_root: String,

    /// `"ok"` or `"error"`.
    pub status: &'static str,

    /// Root of the measured repository.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repository_path: Option<String>,

    /// Loose-object plus pack size in bytes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_bytes: Option<u64>,

    /// Human-readable formatted size (e.g. `"1.50 MB"`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_size_formatted: Option<String>,

    /// Every field parsed from `git count-objects -v`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields: Option<ParsedFields>,

    /// Raw command output lines.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_lines: Option<Vec<String>>,

    /// The failure, tagged by `kind`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<AnalysisError>,
}

/// Aggregated summary across all project roots.
#[derive(Serialize, Debug)]
pub struct JsonSummary {
    /// Number of successful analyses.
    pub analyzed: usize,

    /// Number of failed analyses.
    pub failed: usize,

    /// Sum of all successful totals, in bytes.
    pub total_bytes: u64,

    /// Human-readable formatted sum.
    pub total_size_formatted: String,
}

impl JsonOutput {
    /// Build a `JsonOutput` from a slice of reports.
    #[must_use]
    pub fn from_reports(reports: &[RepositoryReport], units: SizeUnits) -> Self {
        Self {
            results: reports
                .iter()
                .map(|report| JsonRepositoryEntry::from_report(report, units))
                .collect(),
            summary: JsonSummary::from_reports(reports, units),
        }
    }
}

impl JsonRepositoryEntry {
    /// Convert a [`RepositoryReport`] into a `JsonRepositoryEntry`.
    #[must_use]
    pub fn from_report(report: &RepositoryReport, units: SizeUnits) -> Self {
        let project_root = report.project_root.display().to_string();

        match &report.outcome {
            Ok(result) => Self {
                project_root,
                status: "ok",
                repository_path: Some(result.repository_path.display().to_string()),
                total_bytes: Some(result.total_bytes),
                total_size_formatted: Some(units.format(result.total_bytes)),
                fields: Some(result.fields.clone()),
                raw_lines: Some(result.raw_lines.clone()),
                error: None,
            },
            Err(err) => Self {
                project_root,
                status: "error",
                repository_path: None,
                total_bytes: None,
                total_size_formatted: None,
                fields: None,
                raw_lines: None,
                error: Some(err.clone()),
            },
        }
    }
}

impl JsonSummary {
    /// Compute summary statistics from a slice of reports.
    #[must_use]
    pub fn from_reports(reports: &[RepositoryReport], units: SizeUnits) -> Self {
        let total_bytes = total_bytes(reports);
        let analyzed = reports.iter().filter(|r| r.outcome.is_ok()).count();

        Self {
            analyzed,
            failed: reports.len() - analyzed,
            total_bytes,
            total_size_formatted: units.format(total_bytes),
        }
    }
}

fn total_bytes(reports: &[RepositoryReport]) -> u64 {
    reports
        .iter()
        .filter_map(|r| r.outcome.as_ref().ok())
        .fold(0u64, |acc, result| acc.saturating_add(result.total_bytes))
}

/// Render reports as human-readable, colored text.
///
/// With `raw`, the unmodified `git count-objects -v` lines are listed under
/// each successful result.
#[must_use]
pub fn render_human(reports: &[RepositoryReport], units: SizeUnits, raw: bool) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "{}", "🔍 Git repository space analysis".bold().blue());

    for report in reports {
        out.push('\n');

        match &report.outcome {
            Ok(result) => {
                let _ = writeln!(
                    out,
                    "{} {}",
                    "Repository:".bold(),
                    result.repository_path.display()
                );
                let _ = writeln!(
                    out,
                    "{} {}",
                    "Total size:".bold(),
                    units.format(result.total_bytes).yellow()
                );

                if raw {
                    let _ = writeln!(out, "{}", "Raw git output:".dimmed());
                    for line in &result.raw_lines {
                        let _ = writeln!(out, "  {line}");
                    }
                }
            }
            Err(err) => {
                let _ = writeln!(
                    out,
                    "{} {}",
                    format!("❌ {}:", report.project_root.display()).red(),
                    err
                );
            }
        }
    }

    let analyzed = reports.iter().filter(|r| r.outcome.is_ok()).count();
    if analyzed > 1 {
        let _ = writeln!(
            out,
            "\n{} {}",
            format!("📊 Total across {analyzed} repositories:").bold(),
            units.format(total_bytes(reports)).green()
        );
    }

    out
}
