//! # git-space-analyzer
//!
//! A small CLI tool that reports how much disk space Git repositories use,
//! counting both loose objects and packfiles.
//!
//! Each path given on the command line is resolved to a repository, measured
//! with `git count-objects -v` on a background worker, and reported as a
//! human-readable size or as JSON.
//!
//! ## Usage
//!
//! ```bash
//! # Analyze the repository containing the current directory
//! git-space-analyzer
//!
//! # Several projects, SI units
//! git-space-analyzer ~/src/a ~/src/b --units decimal
//!
//! # Machine-readable output
//! git-space-analyzer --json
//! ```

mod cli;

use std::{path::PathBuf, process::exit, time::Duration};

use anyhow::{Result, bail};
use clap::Parser;
use colored::Colorize;
use git_space_analyzer::{
    AnalysisOptions, Pipeline, PipelineState,
    config::file::FileConfig,
    output::{JsonOutput, RepositoryReport, all_succeeded, render_human},
    repository::discovery::DEFAULT_MAX_DEPTH,
    spawn_analysis,
};
use indicatif::{ProgressBar, ProgressStyle};
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands, ConfigCommand};

/// Entry point for the git-space-analyzer application.
///
/// This function handles all errors gracefully by calling [`inner_main`] and printing
/// any errors to stderr before exiting with a non-zero status code.
fn main() {
    match inner_main() {
        Ok(true) => {}
        Ok(false) => exit(1),
        Err(err) => {
            eprintln!("Error: {err}");

            exit(1);
        }
    }
}

/// Main application logic that can return errors.
///
/// Returns whether every requested project root was analyzed successfully.
///
/// # Errors
///
/// Returns errors from the `config` subcommands and from JSON serialization.
/// Per-repository failures are reported in the output, not returned.
fn inner_main() -> Result<bool> {
    let args = Cli::parse();
    init_logging(args.verbose());

    if let Some(Commands::Config { command }) = &args.subcommand {
        handle_config_command(command)?;
        return Ok(true);
    }

    let file_config = load_config(args.json());

    let paths = args.paths(&file_config);
    let analysis_options = args.analysis_options(&file_config);
    let output_options = args.output_options(&file_config);

    let reports = analyze_all(paths, &analysis_options, output_options.json);

    if output_options.json {
        let output = JsonOutput::from_reports(&reports, output_options.units);
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        print!(
            "{}",
            render_human(&reports, output_options.units, output_options.raw)
        );
    }

    Ok(all_succeeded(&reports))
}

/// Install the stderr log subscriber.
///
/// `RUST_LOG` wins when set; otherwise `--verbose` selects debug output for
/// this crate and warnings are shown by default.
fn init_logging(verbose: bool) {
    let default_filter = if verbose {
        "git_space_analyzer=debug"
    } else {
        "warn"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into()),
        )
        .with_writer(std::io::stderr)
        .init();
}

/// Run one pipeline per project root on background workers and collect the
/// outcomes in command-line order.
fn analyze_all(
    paths: Vec<PathBuf>,
    options: &AnalysisOptions,
    quiet: bool,
) -> Vec<RepositoryReport> {
    let spinner = new_spinner(quiet);

    let handles: Vec<_> = paths
        .into_iter()
        .map(|root| {
            let progress = spinner.clone();
            let label = root.display().to_string();
            let pipeline = Pipeline::new(options.discovery(), options.probe())
                .with_parse_mode(options.parse_mode)
                .with_observer(move |state: &PipelineState| {
                    if !state.is_terminal() {
                        progress.set_message(format!("{label}: {}...", state.name()));
                    }
                });

            spawn_analysis(pipeline, root)
        })
        .collect();

    let reports = handles
        .into_iter()
        .map(|handle| {
            let root = handle.project_root().to_path_buf();
            RepositoryReport::new(root, handle.wait())
        })
        .collect();

    spinner.finish_and_clear();
    reports
}

/// Spinner shown while workers run; hidden in JSON mode.
fn new_spinner(quiet: bool) -> ProgressBar {
    if quiet {
        return ProgressBar::hidden();
    }

    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
        pb.set_style(style);
    }
    pb.set_message("Analyzing...");
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

// ── Config subcommand ────────────────────────────────────────────────

/// Default config file template written by `config init`.
const CONFIG_TEMPLATE: &str = r#"# git-space-analyzer configuration
# All values shown are their defaults. Uncomment and change as needed.

# Default project root (defaults to the current directory when not set)
# path = "."

# Several default project roots (takes priority over `path`)
# paths = ["~/src/a", "~/src/b"]

[analysis]
# Git executable used to run `count-objects -v`
# git = "git"

# Fail when git prints neither `size` nor `size-pack`
# strict = false

# How deep below a project root to look for nested repositories
# max_depth = 3

[output]
# Unit system for sizes: binary (1024-based) or decimal (1000-based)
# units = "binary"

# Print a single JSON document instead of text
# json = false

# Print the raw git output under each result
# raw = false
"#;

/// Dispatch a `config` subcommand.
fn handle_config_command(cmd: &ConfigCommand) -> Result<()> {
    match cmd {
        ConfigCommand::Path => match FileConfig::config_path() {
            Some(path) => println!("{}", path.display()),
            None => bail!("Could not determine the config directory on this platform"),
        },
        ConfigCommand::Show => show_config()?,
        ConfigCommand::Init => init_config()?,
    }
    Ok(())
}

/// Print the effective configuration (file values merged with defaults).
fn show_config() -> Result<()> {
    let path = FileConfig::config_path();

    let (file_exists, config) = match &path {
        Some(p) if p.exists() => (true, FileConfig::load()?),
        _ => (false, FileConfig::default()),
    };

    match &path {
        Some(p) if file_exists => println!("Config file: {} (found)", p.display()),
        Some(p) => println!(
            "Config file: {} (not found - showing defaults)",
            p.display()
        ),
        None => println!("Config file: (cannot determine path on this platform)"),
    }

    println!();
    println!("{}", format_config(&config));
    Ok(())
}

/// Format a [`FileConfig`] as a human-readable table, showing defaults for `None` fields.
fn format_config(config: &FileConfig) -> String {
    fn show_str(val: Option<&str>, default: &str) -> String {
        val.map_or_else(
            || format!("\"{default}\"  (default)"),
            |v| format!("\"{v}\""),
        )
    }
    fn show_bool(val: Option<bool>, default: bool) -> String {
        val.map_or_else(|| format!("{default}  (default)"), |v| v.to_string())
    }
    fn show_path(val: Option<&std::path::Path>, default: &str) -> String {
        val.map_or_else(
            || format!("\"{default}\"  (default)"),
            |p| format!("\"{}\"", p.display()),
        )
    }
    fn show_paths(val: Option<&[PathBuf]>) -> String {
        match val {
            Some(v) if !v.is_empty() => {
                let items: Vec<String> = v.iter().map(|p| format!("\"{}\"", p.display())).collect();
                format!("[{}]", items.join(", "))
            }
            _ => "[]  (default)".to_string(),
        }
    }

    format!(
        "\
path      = {path}
paths     = {paths}

[analysis]
git       = {git}
strict    = {strict}
max_depth = {max_depth}

[output]
units     = {units}
json      = {json}
raw       = {raw}",
        path = show_path(config.path.as_deref(), "."),
        paths = show_paths(config.paths.as_deref()),
        git = show_path(config.analysis.git.as_deref(), "git"),
        strict = show_bool(config.analysis.strict, false),
        max_depth = config.analysis.max_depth.map_or_else(
            || format!("{DEFAULT_MAX_DEPTH}  (default)"),
            |v| v.to_string()
        ),
        units = show_str(config.output.units.as_deref(), "binary"),
        json = show_bool(config.output.json, false),
        raw = show_bool(config.output.raw, false),
    )
}

/// Write a default config template to the config file path if it does not exist yet.
fn init_config() -> Result<()> {
    let Some(path) = FileConfig::config_path() else {
        bail!("Could not determine the config directory on this platform");
    };

    if path.exists() {
        println!("Config file already exists at: {}", path.display());
        println!("Remove it first if you want to regenerate it.");
        return Ok(());
    }

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| {
            anyhow::anyhow!(
                "Failed to create config directory {}: {e}",
                parent.display()
            )
        })?;
    }

    std::fs::write(&path, CONFIG_TEMPLATE)
        .map_err(|e| anyhow::anyhow!("Failed to write config file {}: {e}", path.display()))?;

    println!("Config file written to: {}", path.display());
    Ok(())
}

/// Load the configuration file, falling back to defaults on failure.
fn load_config(json_mode: bool) -> FileConfig {
    match FileConfig::load() {
        Ok(config) => config,
        Err(e) => {
            if json_mode {
                tracing::warn!("failed to load config file: {e}");
            } else {
                eprintln!("{} {e}", "Warning: Failed to load config file:".yellow());
            }
            FileConfig::default()
        }
    }
}
