//! Error types for mqstats.

use std::io;

use thiserror::Error;

/// Main error type for mqstats.
///
/// The statistics hot path never fails; errors only surface from
/// configuration loading and background thread setup.
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),
}

pub type Result<T> = std::result::Result<T, Error>;
