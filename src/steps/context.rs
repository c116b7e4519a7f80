// ABOUTME: Context step merging rendered values into the scaffold context
// ABOUTME: Lets manifests derive new context keys from parameters bound earlier

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

use super::prepare_options;
use crate::engine::{
    Result, ScaffoldContext, ScaffoldError, ScaffoldPlugin, ScaffoldRuntime, ScaffoldStep,
    StepRegistry,
};

const ENABLE_KEYS: [&str; 3] = ["enabled", "disabled", "enabledif"];

pub struct ContextStep;

#[async_trait]
impl ScaffoldStep for ContextStep {
    async fn run(
        &self,
        context: &mut ScaffoldContext,
        options: &Value,
        _runtime: &dyn ScaffoldRuntime,
    ) -> Result<()> {
        let Some(rendered) = prepare_options("context", options, context)? else {
            return Ok(());
        };

        let Value::Object(mut values) = rendered else {
            return Err(ScaffoldError::invalid_options(
                "context",
                "expected a mapping of context values",
            ));
        };
        for key in ENABLE_KEYS {
            values.remove(key);
        }

        debug!("Merging {} context values", values.len());
        context.update(values);
        Ok(())
    }
}

pub struct ContextPlugin;

impl ScaffoldPlugin for ContextPlugin {
    fn name(&self) -> &'static str {
        "context"
    }

    fn init(&self, registry: &mut StepRegistry) {
        registry.add_step("context", Arc::new(ContextStep));
    }
}
