//! Errors surfaced to the operator by the export pipeline

use std::path::PathBuf;

use smpbank::{BankError, CartError};
use thiserror::Error;

use crate::resample::ResampleError;

#[derive(Debug, Error)]
pub enum ExportError {
    /// Reading an input or writing an output failed
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse manifest {}: {source}", .path.display())]
    Manifest {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("no input samples found in {}", .dir.display())]
    EmptyInput { dir: PathBuf },

    #[error(transparent)]
    Resample(#[from] ResampleError),

    /// Sample count or cumulative size does not fit the bank format
    #[error("cannot pack sample bank: {0}")]
    Bank(#[from] BankError),

    #[error(transparent)]
    Cart(#[from] CartError),
}

impl ExportError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ExportError::Io {
            path: path.into(),
            source,
        }
    }
}
