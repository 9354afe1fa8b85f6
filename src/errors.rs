// src/errors.rs

//! Crate-wide error type and `Result` alias.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum FfdriveError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// First error captured from a helper or reader worker.
    #[error("worker failed: {0}")]
    Worker(#[source] Box<FfdriveError>),

    #[error("interrupted while waiting for process to exit")]
    Interrupted,

    #[error("process exited with non-zero status: {0}")]
    NonZeroExit(i32),

    #[error("process exited without producing a result")]
    NoResult,

    #[error("illegal state: {0}")]
    IllegalState(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, FfdriveError>;
