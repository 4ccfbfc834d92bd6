//! Git-backed sandbox adapter

pub mod local_sandbox;

pub use local_sandbox::LocalGitSandbox;
