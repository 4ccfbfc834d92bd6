//! Injectable process registry keyed by `(session, skill)`.
//!
//! Each scheduler owns (a clone of) one registry; nothing is process-global,
//! so several independent orchestrators can live in one binary.

use kanon_domain::{AgentProcess, ProcessStatus};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::Notify;
use uuid::Uuid;

/// Registry key: one running process per `(session, skill)` at a time.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProcessKey {
    pub session: String,
    pub skill: String,
}

impl ProcessKey {
    pub fn new(session: impl Into<String>, skill: impl Into<String>) -> Self {
        Self {
            session: session.into(),
            skill: skill.into(),
        }
    }
}

impl std::fmt::Display for ProcessKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}::{}", self.session, self.skill)
    }
}

/// A registered process plus the plumbing to stop it.
#[derive(Debug)]
pub(crate) struct ProcessEntry {
    /// Distinguishes a respawn from the process it replaced
    pub(crate) instance: Uuid,
    pub(crate) process: AgentProcess,
    pub(crate) terminate: Arc<Notify>,
}

/// Shared, cloneable store of [`AgentProcess`] records.
///
/// The lock is never held across an `.await`.
#[derive(Debug, Clone, Default)]
pub struct ProcessRegistry {
    entries: Arc<Mutex<HashMap<ProcessKey, ProcessEntry>>>,
}

impl ProcessRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<ProcessKey, ProcessEntry>> {
        // A panic while holding the lock leaves plain data behind; keep going.
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Register `process` unless a running process already holds `key`.
    ///
    /// On conflict the existing process is returned untouched.
    pub(crate) fn try_register(
        &self,
        key: ProcessKey,
        process: AgentProcess,
    ) -> Result<(Uuid, Arc<Notify>), AgentProcess> {
        let mut entries = self.lock();
        if let Some(existing) = entries.get(&key)
            && existing.process.is_running()
        {
            return Err(existing.process.clone());
        }
        let instance = Uuid::new_v4();
        let terminate = Arc::new(Notify::new());
        entries.insert(
            key,
            ProcessEntry {
                instance,
                process,
                terminate: Arc::clone(&terminate),
            },
        );
        Ok((instance, terminate))
    }

    /// Mutate the entry for `key` if it is still the same `instance`.
    pub(crate) fn update_instance<T>(
        &self,
        key: &ProcessKey,
        instance: Uuid,
        f: impl FnOnce(&mut AgentProcess) -> T,
    ) -> Option<T> {
        let mut entries = self.lock();
        entries
            .get_mut(key)
            .filter(|entry| entry.instance == instance)
            .map(|entry| f(&mut entry.process))
    }

    /// Set a terminal status on a running process and signal it to stop.
    ///
    /// Returns `false` when there is no such process or it is not running.
    pub(crate) fn terminate(&self, key: &ProcessKey, status: ProcessStatus) -> bool {
        let mut entries = self.lock();
        match entries.get_mut(key) {
            Some(entry) if entry.process.is_running() => {
                entry.process.status = status;
                entry.terminate.notify_one();
                true
            }
            _ => false,
        }
    }

    /// Snapshot of one process.
    pub fn get(&self, session: &str, skill: &str) -> Option<AgentProcess> {
        self.lock()
            .get(&ProcessKey::new(session, skill))
            .map(|entry| entry.process.clone())
    }

    pub fn contains(&self, session: &str, skill: &str) -> bool {
        self.lock().contains_key(&ProcessKey::new(session, skill))
    }

    /// Deregister a process so the same `(session, skill)` can be spawned again.
    pub fn remove(&self, session: &str, skill: &str) -> Option<AgentProcess> {
        self.lock()
            .remove(&ProcessKey::new(session, skill))
            .map(|entry| entry.process)
    }

    /// Snapshots of every registered process, ordered by start time.
    pub fn list_all(&self) -> Vec<AgentProcess> {
        let mut processes: Vec<AgentProcess> =
            self.lock().values().map(|e| e.process.clone()).collect();
        processes.sort_by_key(|p| p.started_at);
        processes
    }

    pub fn list_session(&self, session: &str) -> Vec<AgentProcess> {
        let mut processes: Vec<AgentProcess> = self
            .lock()
            .iter()
            .filter(|(key, _)| key.session == session)
            .map(|(_, e)| e.process.clone())
            .collect();
        processes.sort_by_key(|p| p.started_at);
        processes
    }

    pub fn count_running(&self, session: &str) -> usize {
        self.lock()
            .iter()
            .filter(|(key, e)| key.session == session && e.process.is_running())
            .count()
    }

    /// Stop every running process of `session` and drop its entries.
    ///
    /// Returns how many processes were signalled.
    pub(crate) fn drain_session(&self, session: &str) -> usize {
        let mut entries = self.lock();
        let mut signalled = 0;
        entries.retain(|key, entry| {
            if key.session != session {
                return true;
            }
            if entry.process.is_running() {
                entry.process.status = ProcessStatus::Killed;
                entry.terminate.notify_one();
                signalled += 1;
            }
            false
        });
        signalled
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn process(session: &str, skill: &str) -> AgentProcess {
        AgentProcess::new(skill, session, "shell", "true")
    }

    #[test]
    fn test_rejects_second_running_registration() {
        let registry = ProcessRegistry::new();
        let key = ProcessKey::new("s1", "dev");
        registry
            .try_register(key.clone(), process("s1", "dev"))
            .unwrap();

        let mut other = process("s1", "dev");
        other.command = "false".to_string();
        let existing = registry.try_register(key, other).unwrap_err();

        assert_eq!(existing.command, "true");
        assert_eq!(registry.get("s1", "dev").unwrap().command, "true");
    }

    #[test]
    fn test_finished_process_can_be_replaced() {
        let registry = ProcessRegistry::new();
        let key = ProcessKey::new("s1", "dev");
        let (instance, _) = registry
            .try_register(key.clone(), process("s1", "dev"))
            .unwrap();
        registry.update_instance(&key, instance, |p| p.record_exit(Some(1)));

        assert!(registry.try_register(key, process("s1", "dev")).is_ok());
    }

    #[test]
    fn test_stale_instance_cannot_update() {
        let registry = ProcessRegistry::new();
        let key = ProcessKey::new("s1", "dev");
        let (old, _) = registry
            .try_register(key.clone(), process("s1", "dev"))
            .unwrap();
        registry.remove("s1", "dev");
        registry
            .try_register(key.clone(), process("s1", "dev"))
            .unwrap();

        assert!(registry.update_instance(&key, old, |p| p.record_exit(Some(0))).is_none());
        assert!(registry.get("s1", "dev").unwrap().is_running());
    }

    #[test]
    fn test_terminate_only_running() {
        let registry = ProcessRegistry::new();
        let key = ProcessKey::new("s1", "dev");
        let (instance, _) = registry
            .try_register(key.clone(), process("s1", "dev"))
            .unwrap();

        assert!(registry.terminate(&key, ProcessStatus::Killed));
        assert_eq!(registry.get("s1", "dev").unwrap().status, ProcessStatus::Killed);
        assert!(!registry.terminate(&key, ProcessStatus::Killed));

        registry.update_instance(&key, instance, |p| p.record_exit(None));
        assert_eq!(registry.get("s1", "dev").unwrap().status, ProcessStatus::Killed);
        assert!(!registry.terminate(&ProcessKey::new("s1", "missing"), ProcessStatus::Killed));
    }

    #[test]
    fn test_session_scoping() {
        let registry = ProcessRegistry::new();
        registry
            .try_register(ProcessKey::new("a", "x"), process("a", "x"))
            .unwrap();
        registry
            .try_register(ProcessKey::new("a", "y"), process("a", "y"))
            .unwrap();
        registry
            .try_register(ProcessKey::new("b", "x"), process("b", "x"))
            .unwrap();

        assert_eq!(registry.list_all().len(), 3);
        assert_eq!(registry.list_session("a").len(), 2);
        assert_eq!(registry.count_running("a"), 2);

        assert_eq!(registry.drain_session("a"), 2);
        assert!(registry.list_session("a").is_empty());
        assert_eq!(registry.count_running("b"), 1);
    }
}
