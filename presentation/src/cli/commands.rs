//! CLI command definitions

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// CLI arguments for kanon
#[derive(Parser, Debug)]
#[command(name = "kanon")]
#[command(author, version, about = "Implement/review correction loops for CLI coding agents")]
#[command(long_about = r#"
kanon runs coding agents in disposable git worktrees and only merges their
work once independent reviewer agents approve it.

Each task goes through a correction loop:
1. Implement: the developer agent edits the sandbox
2. Review: every reviewer agent inspects the attempt in parallel
3. Gatekeeper: optional commands (tests, linters) must pass
4. Aggregate: verdicts are merged under the ALL or ANY consensus rule
Rejected attempts are retried with the reviewers' issues appended to the
instruction. Approved work is committed and merged into the base branch;
exhausted tasks are discarded without a trace.

Configuration files are loaded from (in priority order):
1. KANON_* environment variables
2. --config <path>     Explicit config file
3. ./kanon.toml        Project-level config
4. ~/.config/kanon/config.toml   Global config

Example:
  kanon run --task login --objective "Add a login form" --task-step "Validate email"
  kanon batch tasks.toml --json
  kanon config
"#)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Verbosity level (-v = info, -vv = debug, -vvv = trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress progress indicators
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to configuration file
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Also write logs to this file
    #[arg(long, value_name = "PATH", global = true)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run one task through the implement/review correction loop
    Run(RunArgs),

    /// Run a dependency-ordered batch of commands
    Batch(BatchArgs),

    /// Show configuration sources and the effective configuration
    Config,
}

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Task identifier (names the sandbox branch)
    #[arg(long = "task", value_name = "ID")]
    pub task_id: String,

    /// What the developer agent should achieve
    #[arg(long, value_name = "TEXT")]
    pub objective: String,

    /// A concrete step of the task (can be specified multiple times)
    #[arg(long = "task-step", value_name = "TEXT")]
    pub steps: Vec<String>,

    /// File with one task step per line, appended after --task-step
    #[arg(long, value_name = "FILE")]
    pub plan: Option<PathBuf>,

    /// Branch to fork the sandbox from and merge into
    #[arg(long, value_name = "BRANCH")]
    pub base_branch: Option<String>,

    /// Maximum implementation attempts
    #[arg(long, value_name = "N")]
    pub max_retries: Option<usize>,

    /// Consensus rule override ("all" or "any")
    #[arg(long, value_name = "RULE")]
    pub consensus: Option<String>,

    /// Reviewer agents (can be specified multiple times; replaces the configured list)
    #[arg(long = "reviewer", value_name = "AGENT")]
    pub reviewers: Vec<String>,
}

#[derive(Args, Debug)]
pub struct BatchArgs {
    /// TOML file with `[[tasks]]` entries
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    /// Session key grouping the batch's processes
    #[arg(long, value_name = "ID")]
    pub session: Option<String>,

    /// Print results as JSON
    #[arg(long)]
    pub json: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_run() {
        let cli = Cli::parse_from([
            "kanon",
            "-vv",
            "run",
            "--task",
            "login",
            "--objective",
            "Add login",
            "--task-step",
            "form",
            "--task-step",
            "validation",
            "--reviewer",
            "r1",
        ]);

        assert_eq!(cli.verbose, 2);
        let Command::Run(args) = cli.command else {
            panic!("expected run");
        };
        assert_eq!(args.task_id, "login");
        assert_eq!(args.steps, vec!["form", "validation"]);
        assert_eq!(args.reviewers, vec!["r1"]);
        assert!(args.max_retries.is_none());
    }

    #[test]
    fn test_parse_batch_with_global_flags_after_subcommand() {
        let cli = Cli::parse_from(["kanon", "batch", "tasks.toml", "--json", "-q"]);

        assert!(cli.quiet);
        let Command::Batch(args) = cli.command else {
            panic!("expected batch");
        };
        assert_eq!(args.file, PathBuf::from("tasks.toml"));
        assert!(args.json);
        assert!(args.session.is_none());
    }

    #[test]
    fn test_cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
