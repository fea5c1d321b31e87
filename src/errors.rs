// src/errors.rs

//! Crate-wide error types.
//!
//! Most modules use `anyhow::Result` with context; the enum below names
//! the error kinds that callers (and the CLI exit paths) distinguish.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum LitaniError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("no active run at {0}; run `litani init` first")]
    NoActiveRun(PathBuf),

    #[error("unreadable job descriptor at {0}")]
    DescriptorRead(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, LitaniError>;
