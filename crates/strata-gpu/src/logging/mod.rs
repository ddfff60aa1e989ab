//! Logging setup.
//!
//! Library code only talks to the `log` facade; this module installs the
//! `env_logger` backend for binaries and tests that want output.

mod init;

pub use init::{LoggingConfig, init_logging};
