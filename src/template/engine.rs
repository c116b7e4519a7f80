// ABOUTME: Main template engine implementation using Handlebars
// ABOUTME: Provides token rendering, deep option rendering and file rendering with sibling partials

use handlebars::Handlebars;
use serde_json::Value as JsonValue;
use std::fs;
use std::path::Path;
use tracing::debug;

use super::context::RenderScope;
use super::error::{Result, TemplateError};
use super::helpers;
use crate::engine::ScaffoldContext;

/// Partials larger than this are not registered when rendering a file
const MAX_PARTIAL_BYTES: u64 = 1024 * 1024;

#[derive(Clone)]
pub struct TemplateEngine {
    handlebars: Handlebars<'static>,
}

impl TemplateEngine {
    /// Create a new template engine with all built-in helpers
    pub fn new() -> Self {
        let mut handlebars = Handlebars::new();

        // Missing values render as empty text
        handlebars.set_strict_mode(false);
        handlebars.set_dev_mode(false);

        // Output is source code and config files, not HTML
        handlebars.register_escape_fn(handlebars::no_escape);

        helpers::register_helpers(&mut handlebars);

        Self { handlebars }
    }

    /// Expand every template expression in `text` against the context
    pub fn render_tokens(&self, text: &str, context: &ScaffoldContext) -> Result<String> {
        if !self.has_templates(text) {
            return Ok(text.to_string());
        }
        let scope = RenderScope::new(context).to_json()?;
        self.render_with_json(text, &scope)
    }

    /// Render a template string with a prepared JSON scope
    pub fn render_with_json(&self, template: &str, scope: &JsonValue) -> Result<String> {
        self.handlebars
            .render_template(template, scope)
            .map_err(TemplateError::HandlebarsError)
    }

    /// Deep copy of `options` with every string value rendered
    pub fn render_options(&self, options: &JsonValue, context: &ScaffoldContext) -> Result<JsonValue> {
        let scope = RenderScope::new(context).to_json()?;
        self.resolve_json_templates(options, &scope)
    }

    /// Recursively resolve templates in JSON values
    pub fn resolve_json_templates(&self, value: &JsonValue, scope: &JsonValue) -> Result<JsonValue> {
        match value {
            JsonValue::String(s) if self.has_templates(s) => {
                Ok(JsonValue::String(self.render_with_json(s, scope)?))
            }
            JsonValue::Array(arr) => {
                let resolved_array: Result<Vec<JsonValue>> = arr
                    .iter()
                    .map(|v| self.resolve_json_templates(v, scope))
                    .collect();
                Ok(JsonValue::Array(resolved_array?))
            }
            JsonValue::Object(obj) => {
                let mut resolved_obj = serde_json::Map::new();
                for (key, val) in obj {
                    resolved_obj.insert(key.clone(), self.resolve_json_templates(val, scope)?);
                }
                Ok(JsonValue::Object(resolved_obj))
            }
            // Numbers, booleans, null and plain strings don't need template resolution
            other => Ok(other.clone()),
        }
    }

    /// Render a file on disk; sibling files are available as partials by file name
    pub fn render_file(&self, path: &Path, context: &ScaffoldContext) -> Result<String> {
        let source = fs::read_to_string(path).map_err(|source| TemplateError::FileError {
            path: path.to_path_buf(),
            source,
        })?;

        let mut registry = self.handlebars.clone();
        if let Some(dir) = path.parent() {
            register_sibling_partials(&mut registry, dir, path)?;
        }

        let scope = RenderScope::new(context).to_json()?;
        registry
            .render_template(&source, &scope)
            .map_err(TemplateError::HandlebarsError)
    }

    /// Validate template syntax without rendering
    pub fn validate_template(&self, template: &str) -> Result<()> {
        match handlebars::Template::compile(template) {
            Ok(_) => Ok(()),
            Err(e) => Err(TemplateError::SyntaxError(e.to_string())),
        }
    }

    /// Check if a string contains template expressions
    pub fn has_templates(&self, text: &str) -> bool {
        text.contains("{{") && text.contains("}}")
    }
}

impl Default for TemplateEngine {
    fn default() -> Self {
        Self::new()
    }
}

fn register_sibling_partials(
    registry: &mut Handlebars<'static>,
    dir: &Path,
    template: &Path,
) -> Result<()> {
    let dir = if dir.as_os_str().is_empty() {
        Path::new(".")
    } else {
        dir
    };

    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if path == template {
            continue;
        }

        let metadata = entry.metadata()?;
        if !metadata.is_file() || metadata.len() > MAX_PARTIAL_BYTES {
            continue;
        }

        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        let Ok(content) = fs::read_to_string(&path) else {
            continue;
        };

        if let Err(e) = registry.register_partial(name, content) {
            debug!("Skipping partial {}: {}", path.display(), e);
        }
    }

    Ok(())
}
