//! CLI command definitions

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Output format for the review report
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Full report with every specialist's findings
    Full,
    /// One-line outcome plus finding counts
    Summary,
    /// JSON report
    Json,
}

/// CLI arguments for panel-review
#[derive(Parser, Debug)]
#[command(name = "panel-review")]
#[command(author, version, about = "Multi-specialist automated change review")]
#[command(long_about = r#"
panel-review runs a panel of bounded review specialists over a unit of
change. Each specialist plans the context it needs, gathers it through
the tool registry, analyzes the change iteratively, and emits a verdict;
the verdicts aggregate into one overall outcome.

Configuration files are loaded from (in priority order):
1. --config <path>   Explicit config file
2. ./panel.toml      Project-level config
3. ~/.config/panel-review/config.toml   Global config

Example:
  panel-review --diff change.patch --title "Add login throttle" \
      --file src/auth.rs --file src/limiter.rs
  panel-review --diff change.patch --specialty security --specialty testing
"#)]
pub struct Cli {
    /// Path to the unified diff to review ("-" reads stdin)
    #[arg(short, long, value_name = "PATH")]
    pub diff: PathBuf,

    /// Task identifier (e.g. change-request number)
    #[arg(long, default_value_t = 1)]
    pub task_id: u64,

    /// URL of the change request
    #[arg(long, default_value = "https://example.invalid/change/1")]
    pub url: String,

    /// Title of the change
    #[arg(short, long, default_value = "Untitled change")]
    pub title: String,

    /// Source branch of the change
    #[arg(long, default_value = "")]
    pub branch: String,

    /// Base branch the change merges into
    #[arg(long, default_value = "main")]
    pub base_branch: String,

    /// Complexity hint: simple, medium or complex
    #[arg(long, default_value = "medium")]
    pub complexity: String,

    /// Changed file (can be repeated); derived from the diff if omitted
    #[arg(short, long = "file", value_name = "PATH")]
    pub files: Vec<String>,

    /// Specialty to run (can be repeated); overrides the planned roster
    #[arg(short, long = "specialty", value_name = "TAG")]
    pub specialties: Vec<String>,

    /// Trigger a CI run through the workflow queue after the review
    #[arg(long)]
    pub run_ci: bool,

    /// Explicit config file path
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Skip config files and use built-in defaults
    #[arg(long)]
    pub no_config: bool,

    /// Output format
    #[arg(short, long, value_enum, default_value = "full")]
    pub output: OutputFormat,

    /// Suppress progress output
    #[arg(short, long)]
    pub quiet: bool,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_invocation() {
        let cli = Cli::parse_from(["panel-review", "--diff", "change.patch"]);
        assert_eq!(cli.diff, PathBuf::from("change.patch"));
        assert_eq!(cli.base_branch, "main");
        assert!(!cli.run_ci);
        assert!(cli.files.is_empty());
    }

    #[test]
    fn test_repeated_flags() {
        let cli = Cli::parse_from([
            "panel-review",
            "--diff",
            "-",
            "--file",
            "src/a.rs",
            "--file",
            "src/b.rs",
            "--specialty",
            "security",
            "-vv",
        ]);
        assert_eq!(cli.files.len(), 2);
        assert_eq!(cli.specialties, vec!["security"]);
        assert_eq!(cli.verbose, 2);
    }
}
