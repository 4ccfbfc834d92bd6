//! CLI entrypoint for kanon
//!
//! This is the main binary that wires together all layers using
//! dependency injection.
//!
//! Exit codes: `0` success, `1` error, `2` task not approved or batch
//! task failed.

use anyhow::{Context, Result, bail};
use clap::Parser;
use kanon_application::{
    BatchProgressNotifier, ExecuteTaskError, ExecuteTaskInput, ExecuteTaskUseCase, Gatekeeper, NoProgress,
    WorktreeManager,
};
use kanon_domain::{BatchTask, ConsensusCondition, ConsensusType, Instruction};
use kanon_infrastructure::{
    CliAgentRunner, CommandGatekeeper, ConfigLoader, FileConfig, LocalGitSandbox,
    ProcessScheduler,
};
use kanon_presentation::{
    BatchArgs, BatchReporter, Cli, Command, ConsoleFormatter, CorrectionReporter, RunArgs,
};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};
use uuid::Uuid;

const NOT_APPROVED: u8 = 2;

/// Batch file layout: a list of `[[tasks]]` tables
#[derive(Debug, Deserialize)]
struct TaskFile {
    tasks: Vec<BatchTask>,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let _log_guard = init_logging(cli.verbose, cli.log_file.as_deref())?;

    info!("Starting kanon");

    if let Command::Config = cli.command {
        return show_config(cli.config.as_ref());
    }

    let (config, warnings) =
        ConfigLoader::load_validated(cli.config.as_ref()).context("Failed to load configuration")?;
    if !warnings.is_empty() {
        eprintln!("{}", ConsoleFormatter::format_config_issues(&warnings));
    }

    match cli.command {
        Command::Run(args) => run_task(args, &config, cli.quiet).await,
        Command::Batch(args) => run_batch(args, &config, cli.quiet).await,
        Command::Config => Ok(ExitCode::SUCCESS),
    }
}

/// Initialize logging based on verbosity level; `RUST_LOG` takes precedence
fn init_logging(verbose: u8, log_file: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace", // -vvv or more
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let stderr_layer = fmt::layer().with_target(false).with_writer(std::io::stderr);

    let Some(path) = log_file else {
        tracing_subscriber::registry()
            .with(filter)
            .with(stderr_layer)
            .init();
        return Ok(None);
    };

    let file_name = path
        .file_name()
        .with_context(|| format!("Invalid log file path: {}", path.display()))?;
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let (writer, guard) = tracing_appender::non_blocking(tracing_appender::rolling::never(
        dir, file_name,
    ));

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(fmt::layer().with_ansi(false).with_writer(writer))
        .init();

    Ok(Some(guard))
}

fn show_config(config_path: Option<&PathBuf>) -> Result<ExitCode> {
    ConfigLoader::print_config_sources(config_path);

    let config = ConfigLoader::load(config_path).context("Failed to load configuration")?;
    let issues = config.validate();

    println!();
    println!("{}", toml::to_string_pretty(&config).context("Failed to render configuration")?);
    if !issues.is_empty() {
        println!("{}", ConsoleFormatter::format_config_issues(&issues));
    }

    Ok(ExitCode::SUCCESS)
}

fn build_instruction(args: &RunArgs) -> Result<Instruction> {
    let mut instruction = Instruction::new(args.objective.clone()).with_tasks(args.steps.clone());

    if let Some(plan) = &args.plan {
        let text = std::fs::read_to_string(plan)
            .with_context(|| format!("Failed to read plan file: {}", plan.display()))?;
        instruction = instruction.with_tasks(
            text.lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(|line| line.trim_start_matches("- ").to_string()),
        );
    }

    Ok(instruction)
}

fn build_condition(args: &RunArgs, config: &FileConfig) -> Result<ConsensusCondition> {
    let consensus = match &args.consensus {
        Some(rule) => rule.parse::<ConsensusType>()?,
        None => config.review.consensus,
    };
    let reviewers = if args.reviewers.is_empty() {
        config.review.reviewers.clone()
    } else {
        args.reviewers.clone()
    };

    if reviewers.is_empty() && consensus == ConsensusType::Any {
        bail!("ANY consensus needs at least one reviewer");
    }

    Ok(ConsensusCondition::new(consensus, reviewers))
}

async fn run_task(args: RunArgs, config: &FileConfig, quiet: bool) -> Result<ExitCode> {
    let instruction = build_instruction(&args)?;
    let condition = build_condition(&args, config)?;
    let repo_root = std::env::current_dir().context("Failed to resolve working directory")?;

    // === Dependency Injection ===
    let scheduler = ProcessScheduler::default();

    let mut sandbox = LocalGitSandbox::new(repo_root);
    if let Some(dir) = &config.sandbox.worktree_dir {
        sandbox = sandbox.with_worktree_dir(dir.clone());
    }
    let worktrees = WorktreeManager::new(Arc::new(sandbox))
        .with_name_prefix(config.sandbox.name_prefix.clone());

    let runner = CliAgentRunner::new(scheduler.clone(), config.agent_catalog())
        .with_developer(config.review.developer.clone())
        .with_timeout(Duration::from_millis(config.agents.timeout_ms));

    let mut input = ExecuteTaskInput::new(args.task_id.clone(), instruction, condition)
        .with_base_branch(
            args.base_branch
                .clone()
                .unwrap_or_else(|| config.sandbox.base_branch.clone()),
        )
        .with_developer(config.review.developer.clone())
        .with_max_retries(args.max_retries.unwrap_or(config.review.max_retries));

    if config.gatekeeper.is_enabled() {
        let gatekeeper: Arc<dyn Gatekeeper> = Arc::new(
            CommandGatekeeper::new(scheduler.clone(), config.gatekeeper.commands.clone())
                .with_timeout(Duration::from_millis(config.gatekeeper.timeout_ms)),
        );
        input = input.with_gatekeeper(gatekeeper);
    }

    if !quiet {
        println!(
            "Task {} ({} consensus, reviewers: {})",
            input.task_id,
            input.condition.consensus_type,
            input.condition.reviewers.join(", ")
        );
    }

    let use_case = ExecuteTaskUseCase::new(Arc::new(runner), worktrees);
    let result = if quiet {
        use_case.execute(input).await
    } else {
        use_case.execute_with_progress(input, &CorrectionReporter).await
    };

    match result {
        Ok(output) => {
            print!("{}", ConsoleFormatter::format_task(&output));
            Ok(ExitCode::SUCCESS)
        }
        Err(ExecuteTaskError::Exhausted { attempts }) => {
            warn!(attempts, "Task not approved");
            eprintln!("Task {} was not approved after {} attempts", args.task_id, attempts);
            Ok(ExitCode::from(NOT_APPROVED))
        }
        Err(e) => Err(e).context(format!("Task {} failed", args.task_id)),
    }
}

async fn run_batch(args: BatchArgs, config: &FileConfig, quiet: bool) -> Result<ExitCode> {
    let text = std::fs::read_to_string(&args.file)
        .with_context(|| format!("Failed to read batch file: {}", args.file.display()))?;
    let file: TaskFile = toml::from_str(&text)
        .with_context(|| format!("Invalid batch file: {}", args.file.display()))?;

    let session = args
        .session
        .clone()
        .unwrap_or_else(|| format!("batch-{}", Uuid::new_v4()));
    let working_dir = args.file.parent().filter(|p| !p.as_os_str().is_empty());
    let scheduler_config = config.scheduler.to_scheduler_config();
    let scheduler = ProcessScheduler::default();

    info!(session = %session, tasks = file.tasks.len(), "Running batch");

    let reporter = (!quiet && !args.json).then(|| BatchReporter::new(file.tasks.len()));
    let progress: &dyn BatchProgressNotifier = match &reporter {
        Some(reporter) => reporter,
        None => &NoProgress,
    };
    let batch = scheduler.execute_batch_with_progress(
        &file.tasks,
        &session,
        &scheduler_config,
        working_dir,
        progress,
    );

    let results = tokio::select! {
        results = batch => results,
        _ = tokio::signal::ctrl_c() => {
            let killed = scheduler.cleanup_session(&session);
            bail!("Interrupted; terminated {} running processes", killed);
        }
    };

    if let Some(reporter) = &reporter {
        reporter.finish();
    }

    if args.json {
        println!("{}", ConsoleFormatter::format_batch_json(&session, &results));
    } else {
        print!("{}", ConsoleFormatter::format_batch(&session, &results));
    }

    if results.iter().all(|r| r.success) {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::from(NOT_APPROVED))
    }
}
