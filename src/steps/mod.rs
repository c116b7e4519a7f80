// ABOUTME: Built-in step plugins dispatched from scaffold manifests
// ABOUTME: Contains fetch, shell, nested scaffold, GitHub, journal and context steps

pub mod context;
pub mod fetch;
pub mod github;
pub mod journal;
pub mod scaffold;
pub mod shell;

use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

use crate::engine::{is_enabled, Result, ScaffoldContext, ScaffoldError, ScaffoldPlugin};
use crate::template;

pub use context::ContextPlugin;
pub use fetch::FetchPlugin;
pub use github::GithubPlugin;
pub use journal::JournalPlugin;
pub use scaffold::NestedScaffoldPlugin;
pub use shell::ShellPlugin;

/// Plugins loaded by every engine, in initialisation order
pub fn builtin_plugins() -> Vec<Arc<dyn ScaffoldPlugin>> {
    vec![
        Arc::new(FetchPlugin),
        Arc::new(ShellPlugin),
        Arc::new(NestedScaffoldPlugin),
        Arc::new(GithubPlugin),
        Arc::new(JournalPlugin),
        Arc::new(ContextPlugin),
    ]
}

/// Render raw step options; `None` when the rendered block is disabled
pub(crate) fn prepare_options(
    step: &str,
    options: &Value,
    context: &ScaffoldContext,
) -> Result<Option<Value>> {
    let rendered = template::render_options(options, context)?;
    if !is_enabled(&rendered) {
        debug!("Step '{}' disabled, skipping", step);
        return Ok(None);
    }
    Ok(Some(rendered))
}

/// Deserialize rendered options into a step's typed configuration
pub(crate) fn parse_options<T: DeserializeOwned>(step: &str, options: &Value) -> Result<T> {
    serde_json::from_value(options.clone())
        .map_err(|e| ScaffoldError::invalid_options(step, e.to_string()))
}
