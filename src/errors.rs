// src/errors.rs

//! Crate-wide error aliases and helpers.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SiteError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Task not found: {0}")]
    TaskNotFound(String),

    #[error("Task '{task}' depends on unknown task '{dependency}'")]
    UnknownTask { task: String, dependency: String },

    #[error("Cycle detected in task graph: {0}")]
    DagCycle(String),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Dev server error: {0}")]
    Server(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, SiteError>;
