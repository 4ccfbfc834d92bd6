//! Process scheduler: spawn, observe and stop external agent processes.
//!
//! ```text
//!   spawn ──► ProcessRegistry (running)
//!     │
//!     ├── stdout reader ──► OutputBuffer + OutputLine channel
//!     ├── stderr reader ──► OutputBuffer + OutputLine channel
//!     └── watcher ── exit / terminate signal ──► record_exit ──► ProcessHandle::wait
//! ```

use super::registry::{ProcessKey, ProcessRegistry};
use kanon_domain::{AgentProcess, CommandSpec, ProcessStatus};
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::{Notify, mpsc, watch};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Environment variable carrying the skill name into the child
pub const SKILL_ENV: &str = "AGENT_SKILL";
/// Environment variable carrying the session id into the child
pub const SESSION_ENV: &str = "AGENT_SESSION";

/// How long to keep reading output after the child has exited
const OUTPUT_DRAIN_TIMEOUT: Duration = Duration::from_secs(2);

/// Errors from scheduler operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchedulerError {
    #[error("Skill {skill} is already running in session {session} (pid {pid:?})")]
    DuplicateSpawn {
        session: String,
        skill: String,
        pid: Option<u32>,
    },

    #[error("No process for skill {skill} in session {session}")]
    UnknownProcess { session: String, skill: String },
}

/// One line of process output, forwarded as it arrives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputLine {
    pub skill: String,
    pub line: String,
    pub is_stderr: bool,
}

/// What to spawn, where, and under which identity
#[derive(Debug, Clone)]
pub struct SpawnRequest {
    pub skill: String,
    pub session: String,
    pub tool: String,
    pub command: CommandSpec,
    pub working_dir: Option<PathBuf>,
    pub retry_count: u32,
    /// Side channel for output lines; full channels drop lines
    pub output: Option<mpsc::Sender<OutputLine>>,
}

impl SpawnRequest {
    pub fn new(
        skill: impl Into<String>,
        session: impl Into<String>,
        command: CommandSpec,
    ) -> Self {
        Self {
            skill: skill.into(),
            session: session.into(),
            tool: "shell".to_string(),
            command,
            working_dir: None,
            retry_count: 0,
            output: None,
        }
    }

    pub fn with_tool(mut self, tool: impl Into<String>) -> Self {
        self.tool = tool.into();
        self
    }

    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    pub fn with_retry_count(mut self, retry_count: u32) -> Self {
        self.retry_count = retry_count;
        self
    }

    pub fn with_output(mut self, output: mpsc::Sender<OutputLine>) -> Self {
        self.output = Some(output);
        self
    }
}

/// Handle to a spawned process.
///
/// Dropping the handle does not stop the process.
#[derive(Debug, Clone)]
pub struct ProcessHandle {
    key: ProcessKey,
    pid: Option<u32>,
    registry: ProcessRegistry,
    exited: watch::Receiver<Option<AgentProcess>>,
}

impl ProcessHandle {
    pub fn skill(&self) -> &str {
        &self.key.skill
    }

    pub fn session(&self) -> &str {
        &self.key.session
    }

    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    /// Current registry snapshot (`None` once deregistered).
    pub fn snapshot(&self) -> Option<AgentProcess> {
        self.registry.get(&self.key.session, &self.key.skill)
    }

    /// Wait for the process to exit and return its final state.
    pub async fn wait(&mut self) -> Option<AgentProcess> {
        let done = self
            .exited
            .wait_for(Option::is_some)
            .await
            .map(|done| (*done).clone())
            .ok();
        match done {
            Some(process) => process,
            None => self.snapshot(),
        }
    }
}

/// Runs external commands and tracks them in a [`ProcessRegistry`]
#[derive(Debug, Clone, Default)]
pub struct ProcessScheduler {
    registry: ProcessRegistry,
}

impl ProcessScheduler {
    pub fn new(registry: ProcessRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &ProcessRegistry {
        &self.registry
    }

    /// Start `request.command` and register it as running.
    ///
    /// Rejected without side effects if the same `(session, skill)` is still
    /// running. A process the OS refuses to start is recorded as `failed`
    /// with no exit code; the handle resolves immediately.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn spawn(&self, request: SpawnRequest) -> Result<ProcessHandle, SchedulerError> {
        let key = ProcessKey::new(&request.session, &request.skill);
        let mut process = AgentProcess::new(
            &request.skill,
            &request.session,
            &request.tool,
            request.command.display(),
        );
        process.retry_count = request.retry_count;
        let fallback = process.clone();

        let (instance, terminate) = self
            .registry
            .try_register(key.clone(), process)
            .map_err(|existing| SchedulerError::DuplicateSpawn {
                session: request.session.clone(),
                skill: request.skill.clone(),
                pid: existing.pid,
            })?;

        let (exited_tx, exited_rx) = watch::channel(None);
        let mut handle = ProcessHandle {
            key: key.clone(),
            pid: None,
            registry: self.registry.clone(),
            exited: exited_rx,
        };

        let mut child = match build_command(&request).spawn() {
            Ok(child) => child,
            Err(e) => {
                warn!(skill = %request.skill, session = %request.session, "Failed to spawn: {}", e);
                let failed = self
                    .registry
                    .update_instance(&key, instance, |p| {
                        p.record_spawn_failure(&e.to_string());
                        p.clone()
                    })
                    .unwrap_or(fallback);
                let _ = exited_tx.send(Some(failed));
                return Ok(handle);
            }
        };

        let pid = child.id();
        handle.pid = pid;
        self.registry.update_instance(&key, instance, |p| p.pid = pid);
        info!(
            skill = %request.skill,
            session = %request.session,
            pid = ?pid,
            "Spawned {}",
            request.command
        );

        let readers = [
            child.stdout.take().map(|out| {
                self.spawn_reader(out, key.clone(), instance, false, request.output.clone())
            }),
            child.stderr.take().map(|err| {
                self.spawn_reader(err, key.clone(), instance, true, request.output.clone())
            }),
        ];

        let registry = self.registry.clone();
        tokio::spawn(async move {
            let code = watch_child(&mut child, pid, &terminate).await;
            for mut reader in readers.into_iter().flatten() {
                // A grandchild may keep the pipe open after the child is gone.
                if tokio::time::timeout(OUTPUT_DRAIN_TIMEOUT, &mut reader)
                    .await
                    .is_err()
                {
                    reader.abort();
                }
            }
            let snapshot = registry
                .update_instance(&key, instance, |p| {
                    p.record_exit(code);
                    p.clone()
                })
                .unwrap_or_else(|| {
                    // Deregistered while running (session cleanup)
                    let mut p = fallback;
                    p.pid = pid;
                    p.status = ProcessStatus::Killed;
                    p.record_exit(code);
                    p
                });
            debug!(
                skill = %key.skill,
                session = %key.session,
                status = %snapshot.status,
                exit_code = ?snapshot.exit_code,
                "Process exited"
            );
            let _ = exited_tx.send(Some(snapshot));
        });

        Ok(handle)
    }

    fn spawn_reader<R>(
        &self,
        stream: R,
        key: ProcessKey,
        instance: Uuid,
        is_stderr: bool,
        output: Option<mpsc::Sender<OutputLine>>,
    ) -> tokio::task::JoinHandle<()>
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        let registry = self.registry.clone();
        tokio::spawn(async move {
            let mut reader = BufReader::new(stream);
            let mut raw = Vec::new();
            loop {
                raw.clear();
                match reader.read_until(b'\n', &mut raw).await {
                    Ok(0) => break,
                    Ok(_) => {}
                    Err(e) => {
                        debug!(skill = %key.skill, "Output stream error: {}", e);
                        break;
                    }
                }
                // Output is not guaranteed to be UTF-8; keep draining regardless
                let line = String::from_utf8_lossy(&raw)
                    .trim_end_matches(['\n', '\r'])
                    .to_string();
                registry.update_instance(&key, instance, |p| {
                    let buffer = if is_stderr { &mut p.stderr } else { &mut p.stdout };
                    buffer.push(&line);
                    buffer.push("\n");
                });
                if let Some(tx) = &output {
                    let _ = tx.try_send(OutputLine {
                        skill: key.skill.clone(),
                        line,
                        is_stderr,
                    });
                }
            }
        })
    }

    pub fn get_status(&self, session: &str, skill: &str) -> Option<AgentProcess> {
        self.registry.get(session, skill)
    }

    pub fn list_all(&self) -> Vec<AgentProcess> {
        self.registry.list_all()
    }

    pub fn list_session(&self, session: &str) -> Vec<AgentProcess> {
        self.registry.list_session(session)
    }

    pub fn count_running(&self, session: &str) -> usize {
        self.registry.count_running(session)
    }

    /// Send a termination signal; the process is recorded as `killed`.
    ///
    /// Returns `false` (and does nothing) if it is not running.
    pub fn kill(&self, session: &str, skill: &str) -> bool {
        let killed = self
            .registry
            .terminate(&ProcessKey::new(session, skill), ProcessStatus::Killed);
        if killed {
            info!(skill, session, "Killed process");
        }
        killed
    }

    /// Terminate a process that exceeded its budget; recorded as `timeout`.
    pub fn kill_timed_out(&self, session: &str, skill: &str) -> bool {
        let killed = self
            .registry
            .terminate(&ProcessKey::new(session, skill), ProcessStatus::Timeout);
        if killed {
            warn!(skill, session, "Process timed out");
        }
        killed
    }

    /// Deregister a finished process so it can be spawned again.
    pub fn deregister(&self, session: &str, skill: &str) -> Result<AgentProcess, SchedulerError> {
        self.registry
            .remove(session, skill)
            .ok_or_else(|| SchedulerError::UnknownProcess {
                session: session.to_string(),
                skill: skill.to_string(),
            })
    }

    /// Terminate everything still running in `session` and forget the session.
    pub fn cleanup_session(&self, session: &str) -> usize {
        let signalled = self.registry.drain_session(session);
        info!(session, signalled, "Cleaned up session");
        signalled
    }
}

fn build_command(request: &SpawnRequest) -> Command {
    let mut cmd = match &request.command {
        CommandSpec::Shell(line) => shell_command(line),
        CommandSpec::Exec { program, args } => {
            let mut c = Command::new(program);
            c.args(args);
            c
        }
    };

    cmd.env(SKILL_ENV, &request.skill)
        .env(SESSION_ENV, &request.session)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    if let Some(dir) = &request.working_dir {
        cmd.current_dir(dir);
    }

    // Own process group so termination reaches the whole tree (sh -c, wrappers).
    #[cfg(unix)]
    cmd.process_group(0);

    // Linux: request kernel to send SIGTERM to child when parent dies.
    #[cfg(target_os = "linux")]
    unsafe {
        cmd.pre_exec(|| {
            libc::prctl(libc::PR_SET_PDEATHSIG, libc::SIGTERM);
            Ok(())
        });
    }

    cmd
}

fn shell_command(line: &str) -> Command {
    if cfg!(target_os = "windows") {
        let mut c = Command::new("cmd");
        c.args(["/C", line]);
        c
    } else {
        let mut c = Command::new("sh");
        c.args(["-c", line]);
        c
    }
}

/// Wait for exit, delivering a termination signal if asked to first.
async fn watch_child(child: &mut Child, pid: Option<u32>, terminate: &Arc<Notify>) -> Option<i32> {
    let exited = tokio::select! {
        status = child.wait() => Some(status),
        _ = terminate.notified() => None,
    };

    let status = match exited {
        Some(status) => status,
        None => {
            send_terminate(child, pid);
            child.wait().await
        }
    };

    match status {
        Ok(status) => status.code(),
        Err(e) => {
            warn!(pid = ?pid, "Failed to wait for process: {}", e);
            None
        }
    }
}

#[cfg(unix)]
fn send_terminate(child: &mut Child, pid: Option<u32>) {
    match pid {
        Some(pid) => unsafe {
            libc::kill(-(pid as libc::pid_t), libc::SIGTERM);
        },
        None => {
            let _ = child.start_kill();
        }
    }
}

#[cfg(not(unix))]
fn send_terminate(child: &mut Child, _pid: Option<u32>) {
    let _ = child.start_kill();
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn shell(skill: &str, session: &str, line: &str) -> SpawnRequest {
        SpawnRequest::new(skill, session, CommandSpec::shell(line))
    }

    #[tokio::test]
    async fn test_successful_process_completes() {
        let scheduler = ProcessScheduler::default();
        let mut handle = scheduler
            .spawn(shell("dev", "s1", "echo hello; echo oops >&2"))
            .unwrap();

        let done = handle.wait().await.unwrap();

        assert_eq!(done.status, ProcessStatus::Completed);
        assert_eq!(done.exit_code, Some(0));
        assert_eq!(done.stdout.as_str(), "hello\n");
        assert_eq!(done.stderr.as_str(), "oops\n");
        assert!(done.finished_at.is_some());
        assert_eq!(
            scheduler.get_status("s1", "dev").unwrap().status,
            ProcessStatus::Completed
        );
    }

    #[tokio::test]
    async fn test_nonzero_exit_fails() {
        let scheduler = ProcessScheduler::default();
        let mut handle = scheduler.spawn(shell("dev", "s1", "exit 3")).unwrap();

        let done = handle.wait().await.unwrap();

        assert_eq!(done.status, ProcessStatus::Failed);
        assert_eq!(done.exit_code, Some(3));
    }

    #[tokio::test]
    async fn test_exec_passes_arguments_verbatim() {
        let scheduler = ProcessScheduler::default();
        let mut handle = scheduler
            .spawn(SpawnRequest::new(
                "dev",
                "s1",
                CommandSpec::exec("echo", ["$HOME; rm -rf /"]),
            ))
            .unwrap();

        let done = handle.wait().await.unwrap();

        assert_eq!(done.stdout.as_str(), "$HOME; rm -rf /\n");
    }

    #[tokio::test]
    async fn test_environment_identifies_agent() {
        let scheduler = ProcessScheduler::default();
        let mut handle = scheduler
            .spawn(shell("reviewer-1", "s9", "echo $AGENT_SKILL@$AGENT_SESSION"))
            .unwrap();

        let done = handle.wait().await.unwrap();

        assert_eq!(done.stdout.as_str(), "reviewer-1@s9\n");
    }

    #[tokio::test]
    async fn test_working_dir() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("marker.txt"), "x").unwrap();
        let scheduler = ProcessScheduler::default();
        let mut handle = scheduler
            .spawn(shell("dev", "s1", "ls").with_working_dir(dir.path()))
            .unwrap();

        let done = handle.wait().await.unwrap();

        assert!(done.stdout.as_str().contains("marker.txt"));
    }

    #[tokio::test]
    async fn test_spawn_failure_is_recorded() {
        let scheduler = ProcessScheduler::default();
        let mut handle = scheduler
            .spawn(SpawnRequest::new(
                "dev",
                "s1",
                CommandSpec::exec("/definitely/not/a/program", Vec::<String>::new()),
            ))
            .unwrap();

        let done = handle.wait().await.unwrap();

        assert_eq!(done.status, ProcessStatus::Failed);
        assert_eq!(done.exit_code, None);
        assert!(done.stderr.as_str().contains("spawn error:"));
    }

    #[tokio::test]
    async fn test_duplicate_spawn_rejected_while_running() {
        let scheduler = ProcessScheduler::default();
        let mut first = scheduler.spawn(shell("dev", "s1", "sleep 5")).unwrap();

        let err = scheduler.spawn(shell("dev", "s1", "echo second")).unwrap_err();

        assert!(matches!(err, SchedulerError::DuplicateSpawn { pid: Some(_), .. }));
        let current = scheduler.get_status("s1", "dev").unwrap();
        assert_eq!(current.command, "sleep 5");
        assert!(current.is_running());

        // Same skill in another session is independent
        let mut other = scheduler.spawn(shell("dev", "s2", "true")).unwrap();
        other.wait().await.unwrap();

        assert!(scheduler.kill("s1", "dev"));
        first.wait().await.unwrap();
    }

    #[tokio::test]
    async fn test_kill_records_killed() {
        let scheduler = ProcessScheduler::default();
        let mut handle = scheduler.spawn(shell("dev", "s1", "sleep 30")).unwrap();

        assert!(scheduler.kill("s1", "dev"));
        let done = tokio::time::timeout(Duration::from_secs(5), handle.wait())
            .await
            .unwrap()
            .unwrap();

        assert_eq!(done.status, ProcessStatus::Killed);
        assert!(!scheduler.kill("s1", "dev"));
        assert!(!scheduler.kill("s1", "unknown"));
    }

    #[tokio::test]
    async fn test_output_lines_are_streamed() {
        let scheduler = ProcessScheduler::default();
        let (tx, mut rx) = mpsc::channel(16);
        let mut handle = scheduler
            .spawn(shell("dev", "s1", "echo one; echo two >&2").with_output(tx))
            .unwrap();
        handle.wait().await.unwrap();

        let mut lines = Vec::new();
        while let Ok(line) = rx.try_recv() {
            lines.push((line.line, line.is_stderr));
        }
        lines.sort();

        assert_eq!(
            lines,
            vec![("one".to_string(), false), ("two".to_string(), true)]
        );
    }

    #[tokio::test]
    async fn test_invalid_utf8_output_is_kept_and_drained() {
        let scheduler = ProcessScheduler::default();
        let mut handle = scheduler
            .spawn(shell(
                "dev",
                "s1",
                "printf 'bad \\377\\n'; echo after; \
                 i=0; while [ $i -lt 20000 ]; do echo line-$i; i=$((i+1)); done; echo end",
            ))
            .unwrap();

        let done = handle.wait().await.unwrap();

        assert_eq!(done.status, ProcessStatus::Completed);
        assert_eq!(done.exit_code, Some(0));
        assert!(done.stdout.as_str().ends_with("line-19999\nend\n"));
    }

    #[tokio::test]
    async fn test_invalid_utf8_is_decoded_lossily() {
        let scheduler = ProcessScheduler::default();
        let mut handle = scheduler
            .spawn(shell("dev", "s1", "printf 'bad \\377\\n'; echo after"))
            .unwrap();

        let done = handle.wait().await.unwrap();

        assert_eq!(done.status, ProcessStatus::Completed);
        assert_eq!(done.stdout.as_str(), "bad \u{FFFD}\nafter\n");
    }

    #[tokio::test]
    async fn test_output_keeps_only_tail() {
        let scheduler = ProcessScheduler::default();
        let mut handle = scheduler
            .spawn(shell(
                "dev",
                "s1",
                "i=0; while [ $i -lt 3000 ]; do echo line-$i; i=$((i+1)); done",
            ))
            .unwrap();

        let done = handle.wait().await.unwrap();

        assert!(done.stdout.len() <= kanon_domain::process::OUTPUT_CAPACITY);
        assert!(done.stdout.is_truncated());
        assert!(done.stdout.as_str().ends_with("line-2999\n"));
    }

    #[tokio::test]
    async fn test_cleanup_session_stops_and_forgets() {
        let scheduler = ProcessScheduler::default();
        let mut a = scheduler.spawn(shell("a", "s1", "sleep 30")).unwrap();
        let mut b = scheduler.spawn(shell("b", "s1", "sleep 30")).unwrap();
        let mut keep = scheduler.spawn(shell("a", "s2", "true")).unwrap();
        keep.wait().await.unwrap();

        assert_eq!(scheduler.count_running("s1"), 2);
        assert_eq!(scheduler.cleanup_session("s1"), 2);

        assert!(scheduler.list_session("s1").is_empty());
        assert_eq!(scheduler.list_session("s2").len(), 1);
        let a = tokio::time::timeout(Duration::from_secs(5), a.wait())
            .await
            .unwrap()
            .unwrap();
        let b = tokio::time::timeout(Duration::from_secs(5), b.wait())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(a.status, ProcessStatus::Killed);
        assert_eq!(b.status, ProcessStatus::Killed);
    }

    #[tokio::test]
    async fn test_deregister_allows_respawn() {
        let scheduler = ProcessScheduler::default();
        let mut first = scheduler.spawn(shell("dev", "s1", "exit 1")).unwrap();
        first.wait().await.unwrap();

        let removed = scheduler.deregister("s1", "dev").unwrap();
        assert_eq!(removed.status, ProcessStatus::Failed);
        assert!(scheduler.deregister("s1", "dev").is_err());

        let mut second = scheduler
            .spawn(shell("dev", "s1", "true").with_retry_count(1))
            .unwrap();
        let done = second.wait().await.unwrap();
        assert_eq!(done.retry_count, 1);
        assert!(done.status.is_success());
    }
}
