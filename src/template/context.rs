// ABOUTME: Render scope exposing the scaffold context and environment to templates
// ABOUTME: Builds the data object templates see under the context, env and utils bindings

use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

use super::error::{Result, TemplateError};
use crate::engine::ScaffoldContext;

/// Data handed to handlebars for one render.
///
/// `utils` is also registered as a helper; the data entry lists the
/// available function names so `{{#each utils}}` style introspection works.
#[derive(Debug, Clone, Serialize)]
pub struct RenderScope<'a> {
    pub context: Value,
    pub env: &'a BTreeMap<String, String>,
    pub utils: &'static [&'static str],
}

impl<'a> RenderScope<'a> {
    pub fn new(context: &'a ScaffoldContext) -> Self {
        Self {
            context: context.to_json(),
            env: context.environ(),
            utils: super::helpers::UTILITY_NAMES,
        }
    }

    /// Convert scope to JSON for handlebars rendering
    pub fn to_json(&self) -> Result<Value> {
        serde_json::to_value(self).map_err(TemplateError::JsonError)
    }
}
