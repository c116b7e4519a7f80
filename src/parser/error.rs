// ABOUTME: Error types for manifest parsing
// ABOUTME: Defines specific error types for parser module operations

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ParserError {
    #[error("Failed to read manifest file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to read manifest {path}: {source}")]
    FileError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse YAML: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("Invalid manifest format: {0}")]
    InvalidFormat(String),
}

pub type Result<T> = std::result::Result<T, ParserError>;
