// ABOUTME: Main library module for the xscaffold scaffolding engine
// ABOUTME: Exports all core modules and provides the public API

pub mod cli;
pub mod engine;
pub mod parser;
pub mod steps;
pub mod template;

// Re-export commonly used types
pub use cli::{App, Args, Config};
pub use engine::{
    ScaffoldContext, ScaffoldEngine, ScaffoldError, ScaffoldOptions, ScaffoldPlugin,
    ScaffoldRuntime, ScaffoldStep, StepRegistry,
};
pub use parser::Manifest;
pub use template::TemplateEngine;

// Error handling
pub type Result<T> = anyhow::Result<T>;

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
