//! Logging utilities.
//!
//! Everything logs through the `log` facade; [`init_logging`] installs `env_logger` for
//! binaries and demos. Library code never installs a logger itself.

mod init;

pub use init::{LoggingConfig, init_logging};
