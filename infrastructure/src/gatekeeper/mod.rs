//! Mechanical validation adapters

pub mod command;

pub use command::CommandGatekeeper;
