//! Typed error hierarchy for the publishing pipeline.
//!
//! `PublishError` covers everything that can abort a run. `StageError` wraps it
//! with the pipeline stage that was executing, which is what `main` reports.
//! Per-folder prune failures are collected into `PruneReport` instead and
//! never abort a run.

use std::path::PathBuf;

use thiserror::Error;

use crate::pipeline::Stage;

/// Errors that abort a publishing run.
#[derive(Debug, Error)]
pub enum PublishError {
    #[error("Parameter `{field}` is invalid: {message}")]
    Configuration { field: &'static str, message: String },

    #[error("No test results found in `{}`", path.display())]
    EmptyResults { path: PathBuf },

    #[error("Failed to spawn report renderer `{program}`: {source}")]
    RenderSpawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Report renderer exited with non-zero code {exit_code}")]
    RenderFailed { exit_code: i32 },

    #[error("Rendered report has no history fragment at {}", path.display())]
    MissingHistory { path: PathBuf },

    #[error("Failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Filesystem error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl PublishError {
    pub fn config(field: &'static str, message: impl Into<String>) -> Self {
        PublishError::Configuration {
            field,
            message: message.into(),
        }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        PublishError::Io {
            path: path.into(),
            source,
        }
    }

    pub fn write(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        PublishError::Write {
            path: path.into(),
            source,
        }
    }

    /// Name of the offending parameter, for configuration failures.
    pub fn field(&self) -> Option<&'static str> {
        match self {
            PublishError::Configuration { field, .. } => Some(field),
            _ => None,
        }
    }
}

/// A `PublishError` tagged with the stage that was running when it happened.
#[derive(Debug, Error)]
#[error("Publishing failed during {stage}: {source}")]
pub struct StageError {
    pub stage: Stage,
    #[source]
    pub source: PublishError,
}

pub type PublishResult<T> = std::result::Result<T, PublishError>;
