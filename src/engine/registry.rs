// ABOUTME: Step registry populated by plugins and consulted when dispatching manifest steps
// ABOUTME: Defines the step and plugin traits and the name-to-step mapping

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

use super::context::ScaffoldContext;
use super::error::{Result, ScaffoldError};
use super::executor::ScaffoldEngine;
use super::runtime::ScaffoldRuntime;

/// A unit of work dispatched by name from a manifest's `steps` list.
///
/// Options arrive raw; implementations render them with
/// `template::render_options` when they need expanded values.
#[async_trait]
pub trait ScaffoldStep: Send + Sync {
    async fn run(
        &self,
        context: &mut ScaffoldContext,
        options: &Value,
        runtime: &dyn ScaffoldRuntime,
    ) -> Result<()>;
}

/// A loadable set of steps.
pub trait ScaffoldPlugin: Send + Sync {
    fn name(&self) -> &'static str;

    /// Register this plugin's steps; called once per registry before any lookup
    fn init(&self, registry: &mut StepRegistry);
}

pub struct StepRegistry {
    config: Value,
    engine: ScaffoldEngine,
    steps: HashMap<String, Arc<dyn ScaffoldStep>>,
}

impl StepRegistry {
    /// Empty registry carrying the manifest's `plugins` section
    pub fn new(engine: ScaffoldEngine, config: Value) -> Self {
        Self {
            config,
            engine,
            steps: HashMap::new(),
        }
    }

    /// Registry with every plugin initialised in order
    pub fn with_plugins(
        engine: ScaffoldEngine,
        config: Value,
        plugins: &[Arc<dyn ScaffoldPlugin>],
    ) -> Self {
        let mut registry = Self::new(engine, config);
        for plugin in plugins {
            debug!("Initialising plugin: {}", plugin.name());
            plugin.init(&mut registry);
        }
        registry
    }

    /// Register a step; a later registration for the same name replaces the earlier one
    pub fn add_step(&mut self, name: impl Into<String>, step: Arc<dyn ScaffoldStep>) {
        let name = name.into();
        if self.steps.insert(name.clone(), step).is_some() {
            debug!("Step '{}' re-registered, replacing previous implementation", name);
        }
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn ScaffoldStep>> {
        self.steps.get(name).cloned()
    }

    /// Look up a step for dispatch; unknown names are fatal
    pub fn resolve(&self, name: &str) -> Result<Arc<dyn ScaffoldStep>> {
        self.get(name).ok_or_else(|| ScaffoldError::UnknownStep {
            name: name.to_string(),
        })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.steps.contains_key(name)
    }

    pub fn step_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.steps.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// The whole `plugins` section of the manifest
    pub fn config(&self) -> &Value {
        &self.config
    }

    /// Configuration for one plugin, `Null` when absent
    pub fn plugin_config(&self, plugin: &str) -> &Value {
        self.config.get(plugin).unwrap_or(&Value::Null)
    }

    /// Engine handle for steps that run nested scaffolds
    pub fn engine(&self) -> &ScaffoldEngine {
        &self.engine
    }
}
