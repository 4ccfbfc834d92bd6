//! Console output formatter

use colored::Colorize;
use kanon_application::ExecuteTaskOutput;
use kanon_domain::{BatchResult, ConfigIssue, Severity};
use serde::Serialize;

/// Lines of captured output shown per failed task
const OUTPUT_TAIL_LINES: usize = 10;

/// JSON shape of a finished batch
#[derive(Debug, Serialize)]
pub struct BatchSummary<'a> {
    pub session: &'a str,
    pub succeeded: usize,
    pub failed: usize,
    pub results: &'a [BatchResult],
}

impl<'a> BatchSummary<'a> {
    pub fn new(session: &'a str, results: &'a [BatchResult]) -> Self {
        let succeeded = results.iter().filter(|r| r.success).count();
        Self {
            session,
            succeeded,
            failed: results.len() - succeeded,
            results,
        }
    }
}

/// Formats kanon results for console display
pub struct ConsoleFormatter;

impl ConsoleFormatter {
    /// Format batch results as a per-skill report
    pub fn format_batch(session: &str, results: &[BatchResult]) -> String {
        let summary = BatchSummary::new(session, results);
        let mut output = String::new();

        output.push_str(&Self::header("Batch Results"));
        output.push('\n');
        output.push_str(&format!("{} {}\n", "Session:".cyan().bold(), session));

        output.push_str(&Self::section_header("Tasks"));
        for result in results {
            let mark = if result.success {
                "v".green()
            } else {
                "x".red()
            };
            let exit = result
                .exit_code
                .map(|code| code.to_string())
                .unwrap_or_else(|| "-".to_string());
            output.push_str(&format!(
                "{} {:<24} exit {:>3}  retries {}  {} ms\n",
                mark, result.skill, exit, result.retry_count, result.duration_ms
            ));

            if !result.success {
                if let Some(failure) = &result.failure {
                    output.push_str(&format!("    {}\n", failure.to_string().yellow()));
                }
                for (label, text) in [("stdout", &result.stdout), ("stderr", &result.stderr)] {
                    let tail = Self::tail_lines(text, OUTPUT_TAIL_LINES);
                    if !tail.is_empty() {
                        output.push_str(&format!("    {}\n", label.dimmed()));
                        output.push_str(&Self::indent(&tail, "      "));
                        output.push('\n');
                    }
                }
            }
        }

        output.push_str(&format!(
            "\n{} {} succeeded, {} failed\n",
            "Summary:".cyan().bold(),
            summary.succeeded.to_string().green(),
            summary.failed.to_string().red()
        ));
        output.push_str(&Self::footer());

        output
    }

    /// Format batch results as JSON
    pub fn format_batch_json(session: &str, results: &[BatchResult]) -> String {
        serde_json::to_string_pretty(&BatchSummary::new(session, results))
            .unwrap_or_else(|_| "{}".to_string())
    }

    /// Format the outcome of a single correction-loop task
    pub fn format_task(output: &ExecuteTaskOutput) -> String {
        let verdict = if output.committed {
            "approved and merged".green().bold()
        } else {
            "approved, nothing to commit".yellow().bold()
        };
        format!(
            "{} {}: {}\n",
            "Task".cyan().bold(),
            output.task_id,
            verdict
        )
    }

    /// Format validation issues, one per line
    pub fn format_config_issues(issues: &[ConfigIssue]) -> String {
        issues
            .iter()
            .map(|issue| match issue.severity {
                Severity::Error => format!("{} {}", "error:".red().bold(), issue.message),
                Severity::Warning => format!("{} {}", "warning:".yellow().bold(), issue.message),
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn header(title: &str) -> String {
        let line = "=".repeat(60);
        format!("{}\n{:^60}\n{}", line.cyan(), title.bold(), line.cyan())
    }

    fn section_header(title: &str) -> String {
        format!("\n{}\n{}\n", title.cyan().bold(), "-".repeat(40))
    }

    fn footer() -> String {
        format!("{}\n", "=".repeat(60).cyan())
    }

    fn tail_lines(text: &str, count: usize) -> String {
        let lines: Vec<&str> = text.lines().collect();
        lines[lines.len().saturating_sub(count)..].join("\n")
    }

    /// Indent a multi-line string
    pub fn indent(text: &str, prefix: &str) -> String {
        text.lines()
            .map(|line| format!("{}{}", prefix, line))
            .collect::<Vec<_>>()
            .join("\n")
    }
}
