//! Output formatting for task and batch results

pub mod console;
