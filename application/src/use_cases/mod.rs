//! Use cases (application services)

pub mod execute_task;
pub mod review_orchestrator;
pub mod worktree_manager;
