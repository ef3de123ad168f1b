// src/errors.rs

//! Crate-wide error aliases and helpers.
//!
//! Per-subtask failures never show up here: they are recorded as
//! [`FailureReason`](crate::engine::FailureReason)s in the result set. A
//! `SwarmError` means the caller broke a precondition (bad options, duplicate
//! ids) or that a plan file could not be loaded.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SwarmError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Duplicate subtask id: {0}")]
    DuplicateSubtask(String),

    #[error("Invalid scheduler options: {0}")]
    InvalidOptions(String),

    #[error("Cycle detected in task graph: {0}")]
    DagCycle(String),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, SwarmError>;
