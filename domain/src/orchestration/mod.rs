//! Orchestration domain
//!
//! The finite state machine that drives the implement → review →
//! aggregate → retry correction loop.

pub mod correction;

pub use correction::{CorrectionEvent, CorrectionPhase, CorrectionState};
