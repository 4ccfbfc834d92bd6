//! Dependency-ordered, bounded-parallel batch execution.
//!
//! A polling coordinator: each round starts what is ready (up to the
//! parallelism limit), sleeps one poll interval, then harvests finished
//! processes, schedules retries from the backoff schedule and cascades
//! permanent failures to dependents.

use super::scheduler::{ProcessScheduler, SpawnRequest};
use kanon_application::ports::progress::{BatchProgressNotifier, NoProgress};
use kanon_domain::{
    AgentProcess, BatchFailure, BatchResult, BatchTask, ProcessStatus, SchedulerConfig,
    check_timeout,
};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info, warn};

impl ProcessScheduler {
    /// Run `tasks` in `session` with default (no-op) progress
    pub async fn execute_batch(
        &self,
        tasks: &[BatchTask],
        session: &str,
        config: &SchedulerConfig,
        working_dir: Option<&Path>,
    ) -> Vec<BatchResult> {
        self.execute_batch_with_progress(tasks, session, config, working_dir, &NoProgress)
            .await
    }

    /// Run `tasks` to completion and return one result per task, in the
    /// order the tasks resolved.
    ///
    /// A task starts only after all of its dependencies completed. A task
    /// whose dependency permanently failed is never started.
    pub async fn execute_batch_with_progress(
        &self,
        tasks: &[BatchTask],
        session: &str,
        config: &SchedulerConfig,
        working_dir: Option<&Path>,
        progress: &dyn BatchProgressNotifier,
    ) -> Vec<BatchResult> {
        let max_parallel = config.max_parallel.max(1);
        let mut pending: HashSet<&str> = tasks.iter().map(|t| t.skill.as_str()).collect();
        let mut completed: HashSet<&str> = HashSet::new();
        let mut failed: HashSet<&str> = HashSet::new();
        let mut retries: HashMap<&str, u32> = HashMap::new();
        let mut results = Vec::with_capacity(tasks.len());

        info!(session, tasks = tasks.len(), max_parallel, "Starting batch");

        while !pending.is_empty() {
            // Start whatever is ready, up to the parallelism limit
            let ready: Vec<&BatchTask> = tasks
                .iter()
                .filter(|t| {
                    pending.contains(t.skill.as_str())
                        && !self.registry().contains(session, &t.skill)
                        && t.depends_on.iter().all(|d| completed.contains(d.as_str()))
                })
                .collect();

            let can_start = max_parallel.saturating_sub(self.count_running(session));
            for task in ready.iter().take(can_start) {
                let mut request = SpawnRequest::new(&task.skill, session, task.command.clone())
                    .with_tool(&task.tool)
                    .with_retry_count(retries.get(task.skill.as_str()).copied().unwrap_or(0));
                if let Some(dir) = working_dir {
                    request = request.with_working_dir(dir);
                }
                match self.spawn(request) {
                    Ok(handle) => {
                        if let Some(process) = handle.snapshot() {
                            progress.on_spawn(&process);
                        }
                    }
                    Err(e) => warn!(session, skill = %task.skill, "Could not start task: {}", e),
                }
            }

            // Nothing running, nothing startable: the rest can never run
            let active = tasks.iter().any(|t| {
                pending.contains(t.skill.as_str()) && self.registry().contains(session, &t.skill)
            });
            if ready.is_empty() && !active {
                for task in tasks.iter().filter(|t| pending.contains(t.skill.as_str())) {
                    let missing: Vec<String> = task
                        .depends_on
                        .iter()
                        .filter(|d| !completed.contains(d.as_str()))
                        .cloned()
                        .collect();
                    warn!(session, skill = %task.skill, ?missing, "Unsatisfiable dependencies");
                    let result = BatchResult::skipped(
                        &task.skill,
                        BatchFailure::UnsatisfiableDependencies {
                            dependencies: missing,
                        },
                    );
                    progress.on_result(&result);
                    results.push(result);
                }
                break;
            }

            tokio::time::sleep(config.poll_interval).await;

            // Harvest finished processes
            for task in tasks {
                let skill = task.skill.as_str();
                if !pending.contains(skill) {
                    continue;
                }
                let Some(process) = self.get_status(session, skill) else {
                    continue;
                };
                let process = self.enforce_timeout(session, process, config.timeout);
                if process.is_running() {
                    continue;
                }

                if process.status.is_success() {
                    debug!(session, skill, "Task completed");
                    pending.remove(skill);
                    completed.insert(skill);
                    let result = BatchResult::from_process(&process);
                    progress.on_result(&result);
                    results.push(result);
                    continue;
                }

                let attempt = retries.get(skill).copied().unwrap_or(0);
                match config.retry_delay(attempt as usize) {
                    Some(delay) => {
                        info!(
                            session,
                            skill,
                            status = %process.status,
                            retry = attempt + 1,
                            "Task failed; retrying in {:?}",
                            delay
                        );
                        retries.insert(skill, attempt + 1);
                        let _ = self.deregister(session, skill);
                        tokio::time::sleep(delay).await;
                    }
                    None => {
                        warn!(session, skill, status = %process.status, "Task failed permanently");
                        pending.remove(skill);
                        failed.insert(skill);
                        let result = BatchResult::from_process(&process);
                        progress.on_result(&result);
                        results.push(result);
                    }
                }
            }

            // Cascade permanent failures through dependency chains
            loop {
                let mut cascaded = false;
                for task in tasks {
                    let skill = task.skill.as_str();
                    if !pending.contains(skill) {
                        continue;
                    }
                    let failed_deps: Vec<String> = task
                        .depends_on
                        .iter()
                        .filter(|d| failed.contains(d.as_str()))
                        .cloned()
                        .collect();
                    if failed_deps.is_empty() {
                        continue;
                    }
                    warn!(session, skill, ?failed_deps, "Skipping task");
                    pending.remove(skill);
                    failed.insert(skill);
                    cascaded = true;
                    let result = BatchResult::skipped(
                        skill,
                        BatchFailure::DependencyFailed {
                            dependencies: failed_deps,
                        },
                    );
                    progress.on_result(&result);
                    results.push(result);
                }
                if !cascaded {
                    break;
                }
            }
        }

        info!(
            session,
            completed = completed.len(),
            failed = results.iter().filter(|r| !r.success).count(),
            "Batch finished"
        );
        results
    }
}

impl ProcessScheduler {
    /// Terminate `process` if it has outlived `timeout`.
    ///
    /// Returns the snapshot to act on: marked `timeout` when this call
    /// stopped it, else the registry's latest state (it may have exited
    /// on its own in the meantime).
    fn enforce_timeout(
        &self,
        session: &str,
        mut process: AgentProcess,
        timeout: Duration,
    ) -> AgentProcess {
        if !check_timeout(&process, timeout) {
            return process;
        }
        if self.kill_timed_out(session, &process.skill) {
            process.status = ProcessStatus::Timeout;
            process
        } else {
            self.get_status(session, &process.skill).unwrap_or(process)
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use kanon_domain::CommandSpec;
    use std::sync::Mutex;

    fn fast_config() -> SchedulerConfig {
        SchedulerConfig::default()
            .with_poll_interval(Duration::from_millis(10))
            .with_retry_delays(Vec::new())
            .with_timeout(Duration::from_secs(30))
    }

    fn task(skill: &str, line: &str) -> BatchTask {
        BatchTask::new(skill, CommandSpec::shell(line))
    }

    fn result<'a>(results: &'a [BatchResult], skill: &str) -> &'a BatchResult {
        results.iter().find(|r| r.skill == skill).unwrap()
    }

    #[derive(Default)]
    struct RecordingProgress {
        spawned: Mutex<Vec<String>>,
        finished: Mutex<Vec<String>>,
    }

    impl BatchProgressNotifier for RecordingProgress {
        fn on_spawn(&self, process: &AgentProcess) {
            self.spawned.lock().unwrap().push(process.skill.clone());
        }

        fn on_result(&self, result: &BatchResult) {
            self.finished.lock().unwrap().push(result.skill.clone());
        }
    }

    #[tokio::test]
    async fn test_dependent_starts_after_dependency_completes() {
        let scheduler = ProcessScheduler::default();
        let tasks = vec![task("a", "echo a"), task("b", "echo b").depends_on(["a"])];

        let results = scheduler
            .execute_batch(&tasks, "s1", &fast_config(), None)
            .await;

        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| r.success));
        let a = result(&results, "a");
        let b = result(&results, "b");
        assert!(b.started_at.unwrap() >= a.finished_at.unwrap());
        assert_eq!(a.stdout, "a\n");
    }

    #[tokio::test]
    async fn test_parallelism_limit() {
        let scheduler = ProcessScheduler::default();
        let tasks = vec![task("a", "sleep 0.1"), task("b", "sleep 0.1")];

        let results = scheduler
            .execute_batch(&tasks, "s1", &fast_config().with_max_parallel(1), None)
            .await;

        let a = result(&results, "a");
        let b = result(&results, "b");
        let (first, second) = if a.started_at < b.started_at { (a, b) } else { (b, a) };
        assert!(second.started_at.unwrap() >= first.finished_at.unwrap());
    }

    #[tokio::test]
    async fn test_failed_dependency_cascades_without_spawning() {
        let scheduler = ProcessScheduler::default();
        let progress = RecordingProgress::default();
        let tasks = vec![
            task("c", "echo c").depends_on(["b"]),
            task("a", "exit 1"),
            task("b", "echo b").depends_on(["a"]),
        ];

        let results = scheduler
            .execute_batch_with_progress(&tasks, "s1", &fast_config(), None, &progress)
            .await;

        assert_eq!(results.len(), 3);
        let a = result(&results, "a");
        assert!(!a.success);
        assert_eq!(a.exit_code, Some(1));

        let b = result(&results, "b");
        assert!(!b.success);
        assert_eq!(b.retry_count, 0);
        assert_eq!(
            b.failure,
            Some(BatchFailure::DependencyFailed {
                dependencies: vec!["a".to_string()]
            })
        );
        assert!(b.stderr.contains("a"));

        let c = result(&results, "c");
        assert!(matches!(c.failure, Some(BatchFailure::DependencyFailed { .. })));

        assert_eq!(*progress.spawned.lock().unwrap(), vec!["a".to_string()]);
        assert_eq!(progress.finished.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_retry_then_success() {
        let dir = tempfile::tempdir().unwrap();
        let scheduler = ProcessScheduler::default();
        let tasks = vec![task(
            "flaky",
            "if [ -f attempted ]; then echo ok; else touch attempted; exit 1; fi",
        )];
        let config = fast_config().with_retry_delays(vec![Duration::from_millis(5)]);

        let results = scheduler
            .execute_batch(&tasks, "s1", &config, Some(dir.path()))
            .await;

        let flaky = result(&results, "flaky");
        assert!(flaky.success);
        assert_eq!(flaky.retry_count, 1);
        assert_eq!(flaky.stdout, "ok\n");
    }

    #[tokio::test]
    async fn test_retries_exhausted() {
        let scheduler = ProcessScheduler::default();
        let progress = RecordingProgress::default();
        let config = fast_config()
            .with_retry_delays(vec![Duration::from_millis(1), Duration::from_millis(1)]);

        let results = scheduler
            .execute_batch_with_progress(&[task("bad", "exit 2")], "s1", &config, None, &progress)
            .await;

        let bad = result(&results, "bad");
        assert!(!bad.success);
        assert_eq!(bad.retry_count, 2);
        assert_eq!(
            bad.failure,
            Some(BatchFailure::RetryExhausted {
                status: ProcessStatus::Failed
            })
        );
        assert_eq!(progress.spawned.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_timeout_kills_process() {
        let scheduler = ProcessScheduler::default();
        let config = fast_config().with_timeout(Duration::from_millis(50));

        let results = scheduler
            .execute_batch(&[task("slow", "sleep 30")], "s1", &config, None)
            .await;

        let slow = result(&results, "slow");
        assert!(!slow.success);
        assert_eq!(
            slow.failure,
            Some(BatchFailure::RetryExhausted {
                status: ProcessStatus::Timeout
            })
        );
        assert!(slow.duration_ms < 30_000);
    }

    #[tokio::test]
    async fn test_timeout_check_defers_to_exit_that_already_happened() {
        let scheduler = ProcessScheduler::default();
        let mut handle = scheduler
            .spawn(SpawnRequest::new("quick", "s1", CommandSpec::shell("true")))
            .unwrap();
        let finished = handle.wait().await.unwrap();
        assert_eq!(finished.status, ProcessStatus::Completed);

        // A snapshot read just before the process exited
        let mut stale = finished.clone();
        stale.status = ProcessStatus::Running;
        stale.finished_at = None;
        stale.started_at -= chrono::Duration::seconds(5);

        let settled = scheduler.enforce_timeout("s1", stale, Duration::from_millis(1));

        assert_eq!(settled.status, ProcessStatus::Completed);
        assert_eq!(settled.exit_code, Some(0));
    }

    #[tokio::test]
    async fn test_timeout_check_marks_running_process() {
        let scheduler = ProcessScheduler::default();
        let handle = scheduler
            .spawn(SpawnRequest::new("slow", "s1", CommandSpec::shell("sleep 30")))
            .unwrap();
        let mut running = handle.snapshot().unwrap();
        running.started_at -= chrono::Duration::seconds(5);

        let settled = scheduler.enforce_timeout("s1", running, Duration::from_millis(1));

        assert_eq!(settled.status, ProcessStatus::Timeout);
        assert_eq!(
            scheduler.get_status("s1", "slow").unwrap().status,
            ProcessStatus::Timeout
        );
    }

    #[tokio::test]
    async fn test_unknown_dependency_does_not_hang() {
        let scheduler = ProcessScheduler::default();
        let tasks = vec![
            task("a", "echo a"),
            task("b", "echo b").depends_on(["ghost"]),
            task("x", "echo x").depends_on(["y"]),
            task("y", "echo y").depends_on(["x"]),
        ];

        let results = tokio::time::timeout(
            Duration::from_secs(10),
            scheduler.execute_batch(&tasks, "s1", &fast_config(), None),
        )
        .await
        .unwrap();

        assert!(result(&results, "a").success);
        assert_eq!(
            result(&results, "b").failure,
            Some(BatchFailure::UnsatisfiableDependencies {
                dependencies: vec!["ghost".to_string()]
            })
        );
        assert!(matches!(
            result(&results, "x").failure,
            Some(BatchFailure::UnsatisfiableDependencies { .. })
        ));
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let scheduler = ProcessScheduler::default();
        let results = scheduler.execute_batch(&[], "s1", &fast_config(), None).await;
        assert!(results.is_empty());
    }
}
