//! Process scheduling: registry, spawning and batch execution

mod batch;
pub mod registry;
pub mod scheduler;

pub use registry::{ProcessKey, ProcessRegistry};
pub use scheduler::{
    OutputLine, ProcessHandle, ProcessScheduler, SESSION_ENV, SKILL_ENV, SchedulerError,
    SpawnRequest,
};
