//! Top-level error type.
//!
//! Per spec this is the only error that ever leaves the scheduler boundary:
//! a startup configuration failure (exit 1) or a `/reload` parse failure
//! (surfaced to the caller, previous live config retained). Every other
//! subsystem error is caught and logged where it occurs.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("config error: {0}")]
    Config(#[from] crate::config::ConfigError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("startup failed: {0}")]
    Startup(String),
}
