// ABOUTME: Error types for the scaffold engine and step execution
// ABOUTME: Separates fatal configuration and conversion errors from recoverable prompt errors

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScaffoldError {
    #[error("Unknown step '{name}': no loaded plugin registers it")]
    UnknownStep { name: String },

    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    #[error("Invalid options for step '{step}': {message}")]
    InvalidStepOptions { step: String, message: String },

    #[error("Step '{step}' failed: {message}")]
    StepFailed { step: String, message: String },

    #[error("Step '{step}' timed out after {seconds}s")]
    StepTimeout { step: String, seconds: u64 },

    #[error("Cannot convert '{value}' to {target} for parameter '{name}'")]
    Conversion {
        name: String,
        value: String,
        target: String,
    },

    #[error("Failed to load '{path}' for parameter '{name}': {message}")]
    ParameterLoad {
        name: String,
        path: PathBuf,
        message: String,
    },

    #[error("Unknown environment variable '{0}' referenced in parameter default")]
    UnknownEnvironmentVariable(String),

    #[error("Invalid validation pattern '{pattern}': {message}")]
    InvalidPattern { pattern: String, message: String },

    #[error("Failed to acquire package '{package}': {message}")]
    Acquisition { package: String, message: String },

    #[error("Input closed while reading parameter '{0}'")]
    InputClosed(String),

    #[error("Template error: {0}")]
    TemplateError(#[from] crate::template::TemplateError),

    #[error("Manifest error: {0}")]
    ParserError(#[from] crate::parser::ParserError),

    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl ScaffoldError {
    pub fn step_failed(step: &str, message: impl Into<String>) -> Self {
        Self::StepFailed {
            step: step.to_string(),
            message: message.into(),
        }
    }

    pub fn invalid_options(step: &str, message: impl Into<String>) -> Self {
        Self::InvalidStepOptions {
            step: step.to_string(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ScaffoldError>;
