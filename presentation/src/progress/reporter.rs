//! Progress reporting for correction loops and batches

use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use kanon_application::{BatchProgressNotifier, CorrectionProgressNotifier, CorrectionStatus};
use kanon_domain::{AgentProcess, BatchResult, CorrectionPhase};
use std::time::Duration;

/// Prints one colored line per correction loop status update
pub struct CorrectionReporter;

impl CorrectionReporter {
    fn phase_label(phase: &CorrectionPhase) -> String {
        let label = format!("{:<9}", phase.as_str());
        match phase {
            CorrectionPhase::Implement => label.cyan().to_string(),
            CorrectionPhase::Review | CorrectionPhase::Aggregate => label.blue().to_string(),
            CorrectionPhase::Retry => label.yellow().to_string(),
            CorrectionPhase::Done => label.green().bold().to_string(),
            CorrectionPhase::Failed => label.red().bold().to_string(),
        }
    }

    /// Render a status as a single line (without trailing newline)
    pub fn format_status(status: &CorrectionStatus) -> String {
        let attempt = format!("[{}/{}]", status.attempt, status.max_retries).dimmed();
        let mut line = format!(
            "{} {} {}",
            attempt,
            Self::phase_label(&status.phase),
            status.message
        );

        if let (Some(approved), Some(issues)) = (status.approved, status.issue_count) {
            let verdict = if approved {
                "v approved".green()
            } else {
                "x rejected".red()
            };
            line.push_str(&format!(" ({}, {} issues)", verdict, issues));
        }

        line
    }
}

impl CorrectionProgressNotifier for CorrectionReporter {
    fn on_status(&self, status: &CorrectionStatus) {
        println!("{}", Self::format_status(status));
    }
}

/// Reports batch execution with a progress bar
pub struct BatchReporter {
    bar: ProgressBar,
}

impl BatchReporter {
    pub fn new(total_tasks: usize) -> Self {
        let bar = ProgressBar::new(total_tasks as u64);
        bar.set_style(Self::style());
        bar.set_prefix("batch");
        bar.set_message("Starting...");
        bar.enable_steady_tick(Duration::from_millis(120));
        Self { bar }
    }

    fn style() -> ProgressStyle {
        ProgressStyle::default_bar()
            .template("{spinner:.green} {prefix:.bold.cyan} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=>-")
    }

    pub fn finish(&self) {
        self.bar.finish_with_message("done".green().to_string());
    }
}

impl BatchProgressNotifier for BatchReporter {
    fn on_spawn(&self, process: &AgentProcess) {
        if process.retry_count > 0 {
            self.bar.println(format!(
                "  {} {} (retry {})",
                "~".yellow(),
                process.skill,
                process.retry_count
            ));
        }
        self.bar.set_message(format!("running {}", process.skill));
    }

    fn on_result(&self, result: &BatchResult) {
        let line = if result.success {
            format!("  {} {} ({} ms)", "v".green(), result.skill, result.duration_ms)
        } else {
            let reason = result
                .failure
                .as_ref()
                .map(ToString::to_string)
                .unwrap_or_else(|| "failed".to_string());
            format!("  {} {}: {}", "x".red(), result.skill, reason)
        };
        self.bar.println(line);
        self.bar.inc(1);
    }
}

/// Simple text-based batch progress (no progress bar)
pub struct SimpleProgress;

impl BatchProgressNotifier for SimpleProgress {
    fn on_spawn(&self, process: &AgentProcess) {
        println!("{} {} (pid {:?})", "->".cyan(), process.skill.bold(), process.pid);
    }

    fn on_result(&self, result: &BatchResult) {
        if result.success {
            println!("  {} {}", "v".green(), result.skill);
        } else {
            println!("  {} {} (failed)", "x".red(), result.skill);
        }
    }
}
