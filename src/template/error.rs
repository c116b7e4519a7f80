// ABOUTME: Error types for template engine operations
// ABOUTME: Defines specific error types for token rendering and utility helpers

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TemplateError {
    #[error("Template syntax error: {0}")]
    SyntaxError(String),

    #[error("Parser format not supported: {0}")]
    UnsupportedParser(String),

    #[error("Unknown utility function: {0}")]
    UnknownUtility(String),

    #[error("Failed to read template file {path}: {source}")]
    FileError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Handlebars error: {0}")]
    HandlebarsError(#[from] handlebars::RenderError),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    YamlError(#[from] serde_yaml::Error),
}

pub type Result<T> = std::result::Result<T, TemplateError>;
