// ABOUTME: Template engine module for the scaffold renderer
// ABOUTME: Provides token rendering, deep option rendering and file rendering over a shared engine

pub mod context;
pub mod engine;
pub mod error;
pub mod helpers;

use once_cell::sync::Lazy;
use serde_json::Value;
use std::path::Path;

use crate::engine::ScaffoldContext;

pub use context::RenderScope;
pub use engine::TemplateEngine;
pub use error::{Result, TemplateError};

static ENGINE: Lazy<TemplateEngine> = Lazy::new(TemplateEngine::new);

/// Shared engine used by the free rendering functions
pub fn engine() -> &'static TemplateEngine {
    &ENGINE
}

pub fn render_tokens(text: &str, context: &ScaffoldContext) -> Result<String> {
    ENGINE.render_tokens(text, context)
}

pub fn render_options(options: &Value, context: &ScaffoldContext) -> Result<Value> {
    ENGINE.render_options(options, context)
}

pub fn render_file(path: &Path, context: &ScaffoldContext) -> Result<String> {
    ENGINE.render_file(path, context)
}
