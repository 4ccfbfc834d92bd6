//! Progress reporters for the application's notifier ports

pub mod reporter;
