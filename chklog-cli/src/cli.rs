//! CLI argument parsing using clap derive API
//!
//! This module defines the command-line interface structure using clap's derive macros.
//! It is purely declarative with no side effects or I/O.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

/// Default configuration file, used only when it exists.
pub const DEFAULT_CONFIG_PATH: &str = "chklog.toml";

/// chklog -- canonicalize nightly build logs and extract build status.
///
/// Use `chklog <COMMAND> --help` for subcommand details.
#[derive(Parser, Debug)]
#[command(name = "chklog", version, about, long_about = None)]
pub struct Cli {
    /// Path to the chklog.toml configuration file (default: ./chklog.toml if present).
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Override log level (trace, debug, info, warn, error).
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Output format.
    #[arg(long, global = true, default_value = "text")]
    pub output: OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Supported output formats.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output.
    Text,
    /// Machine-readable JSON.
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print the canonical text of a build log.
    Canon(CanonArgs),

    /// Extract the build title and per-section failure markers.
    Status(StatusArgs),

    /// Manage canonicalization rules.
    Rules(RulesArgs),

    /// Manage configuration.
    Config(ConfigArgs),
}

// ---- canon ----

/// Canonicalize a whole log or one section of it.
#[derive(Args, Debug)]
pub struct CanonArgs {
    /// Build log file.
    pub log: PathBuf,

    /// Canonicalize only this section (every occurrence, in log order).
    #[arg(short, long)]
    pub section: Option<String>,

    /// Override the project whose rules apply.
    #[arg(short, long)]
    pub project: Option<String>,
}

// ---- status ----

/// Extract the title and failure markers of a build log.
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Build log file.
    pub log: PathBuf,

    /// Override the project whose rules apply.
    #[arg(short, long)]
    pub project: Option<String>,

    /// Display name used in the title (e.g. ruby-trunk-m32).
    #[arg(short, long)]
    pub name: Option<String>,
}

// ---- rules ----

/// Manage canonicalization rules.
#[derive(Args, Debug)]
pub struct RulesArgs {
    #[command(subcommand)]
    pub action: RulesAction,
}

#[derive(Subcommand, Debug)]
pub enum RulesAction {
    /// List registered rules (builtin packs + configured rule directory).
    List {
        /// Show only rules applying to this project (global rules included).
        #[arg(long)]
        project: Option<String>,
        /// Filter by kind (gsub, gsub_stateful, sort, title_hook, failure_hook).
        #[arg(long)]
        kind: Option<String>,
    },
    /// Validate YAML rule files without registering them.
    Validate {
        /// Directory containing YAML rule files.
        path: PathBuf,
    },
}

// ---- config ----

/// Manage chklog configuration.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Validate the configuration file and report errors.
    Validate,
    /// Show the effective configuration (file + env overrides + defaults).
    Show {
        /// Show only a specific section (general, canon, mark).
        #[arg(long)]
        section: Option<String>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_parse_canon() {
        let cli = Cli::try_parse_from(["chklog", "canon", "build.log"]).expect("parse succeeded");
        match cli.command {
            Commands::Canon(args) => {
                assert_eq!(args.log, PathBuf::from("build.log"));
                assert!(args.section.is_none());
                assert!(args.project.is_none());
            }
            _ => panic!("expected Canon command"),
        }
    }

    #[test]
    fn test_cli_parse_canon_section_and_project() {
        let cli = Cli::try_parse_from([
            "chklog", "canon", "build.log", "--section", "test-all", "-p", "perl",
        ])
        .expect("parse succeeded");
        match cli.command {
            Commands::Canon(args) => {
                assert_eq!(args.section.as_deref(), Some("test-all"));
                assert_eq!(args.project.as_deref(), Some("perl"));
            }
            _ => panic!("expected Canon command"),
        }
    }

    #[test]
    fn test_cli_parse_canon_requires_log() {
        assert!(Cli::try_parse_from(["chklog", "canon"]).is_err());
    }

    #[test]
    fn test_cli_parse_status_name() {
        let cli = Cli::try_parse_from(["chklog", "status", "build.log", "--name", "ruby-trunk"])
            .expect("parse succeeded");
        match cli.command {
            Commands::Status(args) => {
                assert_eq!(args.name.as_deref(), Some("ruby-trunk"));
            }
            _ => panic!("expected Status command"),
        }
    }

    #[test]
    fn test_cli_parse_rules_list_filters() {
        let cli = Cli::try_parse_from([
            "chklog", "rules", "list", "--project", "ruby", "--kind", "sort",
        ])
        .expect("parse succeeded");
        match cli.command {
            Commands::Rules(rules_args) => match rules_args.action {
                RulesAction::List { project, kind } => {
                    assert_eq!(project.as_deref(), Some("ruby"));
                    assert_eq!(kind.as_deref(), Some("sort"));
                }
                _ => panic!("expected List action"),
            },
            _ => panic!("expected Rules command"),
        }
    }

    #[test]
    fn test_cli_parse_rules_validate_requires_path() {
        assert!(Cli::try_parse_from(["chklog", "rules", "validate"]).is_err());
        let cli = Cli::try_parse_from(["chklog", "rules", "validate", "/srv/rules"])
            .expect("parse succeeded");
        match cli.command {
            Commands::Rules(rules_args) => match rules_args.action {
                RulesAction::Validate { path } => {
                    assert_eq!(path, PathBuf::from("/srv/rules"));
                }
                _ => panic!("expected Validate action"),
            },
            _ => panic!("expected Rules command"),
        }
    }

    #[test]
    fn test_cli_parse_config_show_section() {
        let cli = Cli::try_parse_from(["chklog", "config", "show", "--section", "mark"])
            .expect("parse succeeded");
        match cli.command {
            Commands::Config(config_args) => match config_args.action {
                ConfigAction::Show { section } => {
                    assert_eq!(section.as_deref(), Some("mark"));
                }
                _ => panic!("expected Show action"),
            },
            _ => panic!("expected Config command"),
        }
    }

    #[test]
    fn test_cli_parse_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "chklog", "status", "build.log", "-c", "/etc/chklog.toml", "--output", "json",
            "--log-level", "debug",
        ])
        .expect("parse succeeded");
        assert_eq!(cli.config, Some(PathBuf::from("/etc/chklog.toml")));
        assert_eq!(cli.log_level.as_deref(), Some("debug"));
        assert!(matches!(cli.output, OutputFormat::Json));
    }

    #[test]
    fn test_cli_parse_config_defaults_to_none() {
        let cli = Cli::try_parse_from(["chklog", "config", "validate"]).expect("parse succeeded");
        assert!(cli.config.is_none());
        assert!(matches!(cli.output, OutputFormat::Text));
    }

    #[test]
    fn test_cli_parse_invalid_output_fails() {
        assert!(Cli::try_parse_from(["chklog", "--output", "yaml", "config", "show"]).is_err());
    }

    #[test]
    fn test_cli_parse_missing_command_fails() {
        assert!(Cli::try_parse_from(["chklog"]).is_err());
    }

    #[test]
    fn test_cli_verify_command_structure() {
        let cmd = Cli::command();
        assert_eq!(cmd.get_name(), "chklog");

        let subcommands: Vec<_> = cmd.get_subcommands().map(|s| s.get_name()).collect();
        for name in ["canon", "status", "rules", "config"] {
            assert!(subcommands.contains(&name), "should have '{name}' subcommand");
        }
    }
}
