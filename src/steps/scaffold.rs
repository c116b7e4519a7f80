// ABOUTME: Nested scaffold step re-entering the engine for another package
// ABOUTME: Runs in the shared context or an isolated child context and restores __package afterwards

use async_trait::async_trait;
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::debug;

use super::prepare_options;
use crate::engine::{
    truthy, Result, ScaffoldContext, ScaffoldEngine, ScaffoldError, ScaffoldOptions,
    ScaffoldPlugin, ScaffoldRuntime, ScaffoldStep, StepRegistry,
};

const STEP: &str = "scaffold";

/// Keys a nested invocation takes from the parent's options when it does not set them
const INHERITED_OPTIONS: [&str; 2] = ["url", "temp"];

pub struct NestedScaffoldStep {
    engine: ScaffoldEngine,
    propagate_notes: bool,
}

impl NestedScaffoldStep {
    pub fn new(engine: ScaffoldEngine, propagate_notes: bool) -> Self {
        Self {
            engine,
            propagate_notes,
        }
    }
}

#[async_trait]
impl ScaffoldStep for NestedScaffoldStep {
    async fn run(
        &self,
        context: &mut ScaffoldContext,
        options: &Value,
        runtime: &dyn ScaffoldRuntime,
    ) -> Result<()> {
        let Some(rendered) = prepare_options(STEP, options, context)? else {
            return Ok(());
        };
        let Value::Object(mut map) = rendered else {
            return Err(ScaffoldError::invalid_options(
                STEP,
                "expected a mapping with 'package'",
            ));
        };

        let private_context = map.remove("context");
        let propagate = map
            .remove("propagate_notes")
            .map(|v| truthy(&v))
            .unwrap_or(self.propagate_notes);

        if let Some(parent) = context.package() {
            for key in INHERITED_OPTIONS {
                if let Some(value) = parent.options.get(key) {
                    map.entry(key).or_insert_with(|| value.clone());
                }
            }
        }

        let nested = ScaffoldOptions::from_value(&Value::Object(map))
            .map_err(|e| ScaffoldError::invalid_options(STEP, e.to_string()))?;

        let snapshot = context.package_snapshot();
        match private_context {
            Some(seed) => {
                let seed = match seed {
                    Value::Object(values) => values,
                    Value::Null => Map::new(),
                    _ => {
                        return Err(ScaffoldError::invalid_options(
                            STEP,
                            "'context' must be a mapping",
                        ))
                    }
                };
                debug!("Running nested scaffold {} in a private context", nested.package);
                let mut child = context.child(seed);
                self.engine
                    .execute_scaffold(&mut child, nested, runtime)
                    .await?;
                if propagate {
                    context.absorb_journal(&child);
                }
            }
            None => {
                debug!("Running nested scaffold {} in the shared context", nested.package);
                self.engine.execute_scaffold(context, nested, runtime).await?;
            }
        }
        context.restore_package(snapshot);

        Ok(())
    }
}

/// Registers `scaffold`; `plugins.scaffold.propagate_notes` sets the default for isolated runs
pub struct NestedScaffoldPlugin;

impl ScaffoldPlugin for NestedScaffoldPlugin {
    fn name(&self) -> &'static str {
        "scaffold"
    }

    fn init(&self, registry: &mut StepRegistry) {
        let engine = registry.engine().clone();
        let propagate_notes = registry
            .plugin_config("scaffold")
            .get("propagate_notes")
            .map(truthy)
            .unwrap_or(engine.settings().propagate_child_notes);

        registry.add_step(STEP, Arc::new(NestedScaffoldStep::new(engine, propagate_notes)));
    }
}
