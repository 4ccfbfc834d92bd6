//! Configuration file loading for kanon
//!
//! Sources are merged in this order, later ones winning:
//!
//! 1. Built-in defaults
//! 2. Global: `$XDG_CONFIG_HOME/kanon/config.toml`
//! 3. Project root: `./kanon.toml` or `./.kanon.toml`
//! 4. `--config <path>`
//! 5. `KANON_` environment variables (`KANON_REVIEW__MAX_RETRIES=5`)

mod file_config;
mod loader;

pub use file_config::{
    FileAgentsConfig, FileConfig, FileGatekeeperConfig, FileReviewConfig, FileSandboxConfig,
    FileSchedulerConfig,
};
pub use loader::{ConfigError, ConfigLoader};
