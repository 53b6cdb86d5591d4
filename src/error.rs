//! Error types for configuration, dataset loading and record decoding.
//!
//! Scoring itself never fails; only the edges that touch files or untrusted
//! JSON return these errors.

use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SpamlensError {
    /// Invalid or inconsistent configuration values.
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The input could not be turned into an email record (e.g. `null` in a batch).
    #[error("Invalid email record: {0}")]
    InvalidRecord(String),

    /// No dataset is registered for the requested language code.
    #[error("No dataset for language '{0}'")]
    DatasetNotFound(String),
}

pub type Result<T> = std::result::Result<T, SpamlensError>;
