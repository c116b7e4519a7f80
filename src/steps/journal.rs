// ABOUTME: Journal steps writing status lines, notes and follow-up todos
// ABOUTME: Implements the log, note and todo steps over the scaffold context journal

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

use super::prepare_options;
use crate::engine::{
    Result, ScaffoldContext, ScaffoldError, ScaffoldPlugin, ScaffoldRuntime, ScaffoldStep,
    StepRegistry,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JournalKind {
    Log,
    Note,
    Todo,
}

impl JournalKind {
    pub fn step_name(&self) -> &'static str {
        match self {
            Self::Log => "log",
            Self::Note => "note",
            Self::Todo => "todo",
        }
    }
}

pub struct JournalStep {
    kind: JournalKind,
}

impl JournalStep {
    pub fn new(kind: JournalKind) -> Self {
        Self { kind }
    }
}

#[async_trait]
impl ScaffoldStep for JournalStep {
    async fn run(
        &self,
        context: &mut ScaffoldContext,
        options: &Value,
        runtime: &dyn ScaffoldRuntime,
    ) -> Result<()> {
        let step = self.kind.step_name();
        let Some(rendered) = prepare_options(step, options, context)? else {
            return Ok(());
        };

        for message in messages(step, &rendered)? {
            match self.kind {
                JournalKind::Log => runtime.log(&message),
                JournalKind::Note => context.add_note(message),
                JournalKind::Todo => context.add_todo(message),
            }
        }
        Ok(())
    }
}

/// Accepts a string, a list of strings, or `{message: ...}` carrying enable flags
fn messages(step: &str, options: &Value) -> Result<Vec<String>> {
    match options {
        Value::Null => Ok(Vec::new()),
        Value::String(s) => Ok(vec![s.clone()]),
        Value::Array(items) => items.iter().map(|item| scalar(step, item)).collect(),
        Value::Object(map) => match map.get("message") {
            Some(message) => messages(step, message),
            None => Err(ScaffoldError::invalid_options(
                step,
                "expected a string, a list or a mapping with 'message'",
            )),
        },
        other => Ok(vec![other.to_string()]),
    }
}

fn scalar(step: &str, value: &Value) -> Result<String> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Array(_) | Value::Object(_) => Err(ScaffoldError::invalid_options(
            step,
            "list entries must be plain values",
        )),
        other => Ok(other.to_string()),
    }
}

pub struct JournalPlugin;

impl ScaffoldPlugin for JournalPlugin {
    fn name(&self) -> &'static str {
        "journal"
    }

    fn init(&self, registry: &mut StepRegistry) {
        for kind in [JournalKind::Log, JournalKind::Note, JournalKind::Todo] {
            registry.add_step(kind.step_name(), Arc::new(JournalStep::new(kind)));
        }
    }
}
