//! Logger bootstrap.
//!
//! Library code logs through the `log` facade only. The demo binary and tests
//! install `env_logger` with [`init_logging`].

mod init;

pub use init::{init_logging, LoggingConfig};
