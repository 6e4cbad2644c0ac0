//! Logging utilities.
//!
//! The core only talks to the `log` facade; this module wires up
//! `env_logger` for applications and tests that want output.

mod init;

pub use init::{init_logging, init_test_logging, LoggingConfig};
