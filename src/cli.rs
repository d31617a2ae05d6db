//! Command-line interface definition and argument parsing.
//!
//! This module defines all command-line arguments, options, and their validation
//! using the [clap](https://docs.rs/clap/) library.
//!
//! Helper methods on [`Cli`] accept a [`FileConfig`] reference so that config-file
//! values act as defaults that CLI arguments can override (layered config).

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use git_space_analyzer::{
    config::{
        AnalysisOptions, OutputOptions,
        file::{FileConfig, expand_tilde},
    },
    parser::ParseMode,
    repository::discovery::DEFAULT_MAX_DEPTH,
    utils::SizeUnits,
};

/// Command-line arguments controlling how repositories are found and measured.
#[derive(Parser)]
struct AnalysisArgs {
    /// Git executable to run
    ///
    /// Defaults to `git` from `PATH`.
    #[arg(long, value_name = "PATH")]
    git: Option<PathBuf>,

    /// Fail when git's output contains no size information
    ///
    /// By default, unrecognized output is tolerated and reported as 0 B.
    /// With this flag, output lacking both `size` and `size-pack` is an error,
    /// which usually means the git version prints something unexpected.
    #[arg(long)]
    strict: bool,

    /// How deep below each path to look for nested repositories
    ///
    /// The repository enclosing the path always comes first; nested
    /// repositories are only used when the path itself is not inside one.
    #[arg(long)]
    max_depth: Option<usize>,
}

/// Command-line arguments controlling how results are shown.
#[derive(Parser)]
struct OutputArgs {
    /// Output results as a single JSON object for scripting/piping
    ///
    /// When enabled, all human-readable output (colors, spinners, emojis)
    /// is suppressed and a single JSON document is printed to stdout.
    #[arg(long)]
    json: bool,

    /// Unit system for human-readable sizes
    ///
    /// binary: 1024-based (1.50 MB = 1,572,864 bytes)
    /// decimal: 1000-based SI units
    #[arg(short = 'u', long, value_enum)]
    units: Option<SizeUnits>,

    /// Print the raw `git count-objects -v` output under each result
    #[arg(long)]
    raw: bool,

    /// Print debug logs to stderr
    ///
    /// `RUST_LOG` takes precedence when set.
    #[arg(short = 'v', long)]
    verbose: bool,
}

/// Top-level subcommands.
#[derive(Subcommand)]
pub enum Commands {
    /// Inspect or initialise the configuration file
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

/// Subcommands for `config`.
#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Print the effective configuration (file values + defaults for unset keys)
    Show,
    /// Write a default config.toml if none exists yet
    Init,
    /// Print the path to the config file
    Path,
}

/// Main command-line interface structure.
///
/// Helper methods accept a [`FileConfig`] reference so that config-file values act as
/// defaults when the corresponding CLI argument is not provided.
#[derive(Parser)]
#[command(name = "git-space-analyzer")]
#[command(about = "Report how much space Git repositories use (loose objects + packs)")]
#[command(version)]
#[command(author)]
pub struct Cli {
    /// Subcommand (e.g. `config`)
    #[command(subcommand)]
    pub subcommand: Option<Commands>,

    /// One or more project directories to analyze
    ///
    /// Each path is resolved to the repository enclosing it (or, failing that,
    /// the first repository nested below it). Defaults to the current directory.
    #[arg(num_args = 0..)]
    paths: Vec<PathBuf>,

    /// Analysis options
    #[command(flatten)]
    analysis: AnalysisArgs,

    /// Output options
    #[command(flatten)]
    output: OutputArgs,
}

impl Cli {
    /// Whether `--json` was passed.
    #[must_use]
    pub const fn json(&self) -> bool {
        self.output.json
    }

    /// Whether `--verbose` was passed.
    #[must_use]
    pub const fn verbose(&self) -> bool {
        self.output.verbose
    }

    /// Resolve the project roots from CLI args, config file, or default.
    ///
    /// Priority: CLI arguments > config file `paths` > config file `path` > current directory (`.`).
    /// Tilde expansion is applied to paths originating from the config file.
    #[must_use]
    pub fn paths(&self, config: &FileConfig) -> Vec<PathBuf> {
        if !self.paths.is_empty() {
            return self.paths.clone();
        }

        if let Some(ref paths) = config.paths
            && !paths.is_empty()
        {
            return paths.iter().map(|p| expand_tilde(p)).collect();
        }

        if let Some(ref path) = config.path {
            return vec![expand_tilde(path)];
        }

        vec![PathBuf::from(".")]
    }

    /// Extract analysis options from CLI args and config file.
    ///
    /// - **git**: CLI > config > `git`
    /// - **strict**: CLI flag `||` config value `||` `false`
    /// - **`max_depth`**: CLI > config > default depth
    #[must_use]
    pub fn analysis_options(&self, config: &FileConfig) -> AnalysisOptions {
        let strict = self.analysis.strict || config.analysis.strict.unwrap_or(false);

        AnalysisOptions {
            git: self
                .analysis
                .git
                .clone()
                .or_else(|| config.analysis.git.as_deref().map(expand_tilde))
                .unwrap_or_else(|| PathBuf::from("git")),
            parse_mode: if strict {
                ParseMode::Strict
            } else {
                ParseMode::Lenient
            },
            max_depth: self
                .analysis
                .max_depth
                .or(config.analysis.max_depth)
                .unwrap_or(DEFAULT_MAX_DEPTH),
        }
    }

    /// Extract output options from CLI args and config file.
    ///
    /// Priority: CLI argument > config file > default. An unknown `units`
    /// value in the config file falls back to the default.
    #[must_use]
    pub fn output_options(&self, config: &FileConfig) -> OutputOptions {
        OutputOptions {
            json: self.output.json || config.output.json.unwrap_or(false),
            units: self
                .output
                .units
                .or_else(|| {
                    config
                        .output
                        .units
                        .as_ref()
                        .and_then(|s| SizeUnits::from_str(s, true).ok())
                })
                .unwrap_or_default(),
            raw: self.output.raw || config.output.raw.unwrap_or(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use git_space_analyzer::config::file::{FileAnalysisConfig, FileOutputConfig};

    #[test]
    fn test_default_values() {
        let args = Cli::parse_from(["git-space-analyzer"]);
        let config = FileConfig::default();

        assert!(args.subcommand.is_none());
        assert_eq!(args.paths(&config), vec![PathBuf::from(".")]);

        let analysis = args.analysis_options(&config);
        assert_eq!(analysis.git, PathBuf::from("git"));
        assert_eq!(analysis.parse_mode, ParseMode::Lenient);
        assert_eq!(analysis.max_depth, DEFAULT_MAX_DEPTH);

        let output = args.output_options(&config);
        assert!(!output.json);
        assert!(!output.raw);
        assert_eq!(output.units, SizeUnits::Binary);
    }

    #[test]
    fn test_multiple_paths() {
        let args = Cli::parse_from(["git-space-analyzer", "/a", "/b"]);
        assert_eq!(
            args.paths(&FileConfig::default()),
            vec![PathBuf::from("/a"), PathBuf::from("/b")]
        );
    }

    #[test]
    fn test_analysis_flags() {
        let args = Cli::parse_from([
            "git-space-analyzer",
            "--git",
            "/opt/git",
            "--strict",
            "--max-depth",
            "1",
        ]);
        let analysis = args.analysis_options(&FileConfig::default());

        assert_eq!(analysis.git, PathBuf::from("/opt/git"));
        assert_eq!(analysis.parse_mode, ParseMode::Strict);
        assert_eq!(analysis.max_depth, 1);
    }

    #[test]
    fn test_output_flags() {
        let args = Cli::parse_from([
            "git-space-analyzer",
            "--json",
            "--raw",
            "--units",
            "decimal",
            "-v",
        ]);
        let output = args.output_options(&FileConfig::default());

        assert!(output.json);
        assert!(output.raw);
        assert!(args.verbose());
        assert_eq!(output.units, SizeUnits::Decimal);
    }

    #[test]
    fn test_units_short_flag() {
        let args = Cli::parse_from(["git-space-analyzer", "-u", "decimal"]);
        assert_eq!(
            args.output_options(&FileConfig::default()).units,
            SizeUnits::Decimal
        );
    }

    #[test]
    fn test_invalid_units_rejected() {
        assert!(Cli::try_parse_from(["git-space-analyzer", "--units", "furlongs"]).is_err());
    }

    #[test]
    fn test_config_values_used_when_cli_absent() {
        let args = Cli::parse_from(["git-space-analyzer"]);
        let config = FileConfig {
            paths: None,
            path: Some(PathBuf::from("/srv/repo")),
            analysis: FileAnalysisConfig {
                git: Some(PathBuf::from("/usr/bin/git")),
                strict: Some(true),
                max_depth: Some(7),
            },
            output: FileOutputConfig {
                units: Some("decimal".to_string()),
                json: Some(true),
                raw: Some(true),
            },
        };

        assert_eq!(args.paths(&config), vec![PathBuf::from("/srv/repo")]);

        let analysis = args.analysis_options(&config);
        assert_eq!(analysis.git, PathBuf::from("/usr/bin/git"));
        assert_eq!(analysis.parse_mode, ParseMode::Strict);
        assert_eq!(analysis.max_depth, 7);

        let output = args.output_options(&config);
        assert!(output.json);
        assert!(output.raw);
        assert_eq!(output.units, SizeUnits::Decimal);
    }

    #[test]
    fn test_cli_overrides_config_values() {
        let args = Cli::parse_from([
            "git-space-analyzer",
            "/cli/path",
            "--git",
            "/cli/git",
            "--max-depth",
            "2",
            "--units",
            "binary",
        ]);
        let config = FileConfig {
            paths: Some(vec![PathBuf::from("/config/path")]),
            path: None,
            analysis: FileAnalysisConfig {
                git: Some(PathBuf::from("/config/git")),
                strict: None,
                max_depth: Some(9),
            },
            output: FileOutputConfig {
                units: Some("decimal".to_string()),
                json: None,
                raw: None,
            },
        };

        assert_eq!(args.paths(&config), vec![PathBuf::from("/cli/path")]);
        assert_eq!(args.analysis_options(&config).git, PathBuf::from("/cli/git"));
        assert_eq!(args.analysis_options(&config).max_depth, 2);
        assert_eq!(args.output_options(&config).units, SizeUnits::Binary);
    }

    #[test]
    fn test_config_paths_take_priority_over_path() {
        let args = Cli::parse_from(["git-space-analyzer"]);
        let config = FileConfig {
            paths: Some(vec![PathBuf::from("/x"), PathBuf::from("/y")]),
            path: Some(PathBuf::from("/z")),
            ..FileConfig::default()
        };

        assert_eq!(
            args.paths(&config),
            vec![PathBuf::from("/x"), PathBuf::from("/y")]
        );
    }

    #[test]
    fn test_config_path_with_tilde_expansion() {
        let args = Cli::parse_from(["git-space-analyzer"]);
        let config = FileConfig {
            path: Some(PathBuf::from("~/src")),
            ..FileConfig::default()
        };

        let paths = args.paths(&config);
        if let Some(home) = dirs::home_dir() {
            assert_eq!(paths, vec![home.join("src")]);
        }
    }

    #[test]
    fn test_config_units_case_insensitive() {
        let args = Cli::parse_from(["git-space-analyzer"]);
        let config = FileConfig {
            output: FileOutputConfig {
                units: Some("DECIMAL".to_string()),
                ..FileOutputConfig::default()
            },
            ..FileConfig::default()
        };

        assert_eq!(args.output_options(&config).units, SizeUnits::Decimal);
    }

    #[test]
    fn test_invalid_config_units_falls_back_to_default() {
        let args = Cli::parse_from(["git-space-analyzer"]);
        let config = FileConfig {
            output: FileOutputConfig {
                units: Some("parsecs".to_string()),
                ..FileOutputConfig::default()
            },
            ..FileConfig::default()
        };

        assert_eq!(args.output_options(&config).units, SizeUnits::Binary);
    }

    #[test]
    fn test_bool_flags_override_config_false() {
        let args = Cli::parse_from(["git-space-analyzer", "--strict", "--json", "--raw"]);
        let config = FileConfig {
            analysis: FileAnalysisConfig {
                strict: Some(false),
                ..FileAnalysisConfig::default()
            },
            output: FileOutputConfig {
                json: Some(false),
                raw: Some(false),
                ..FileOutputConfig::default()
            },
            ..FileConfig::default()
        };

        assert_eq!(args.analysis_options(&config).parse_mode, ParseMode::Strict);
        assert!(args.output_options(&config).json);
        assert!(args.output_options(&config).raw);
    }

    #[test]
    fn test_config_subcommands() {
        let args = Cli::parse_from(["git-space-analyzer", "config", "path"]);
        assert!(matches!(
            args.subcommand,
            Some(Commands::Config {
                command: ConfigCommand::Path
            })
        ));

        let args = Cli::parse_from(["git-space-analyzer", "config", "show"]);
        assert!(matches!(
            args.subcommand,
            Some(Commands::Config {
                command: ConfigCommand::Show
            })
        ));
    }
}
