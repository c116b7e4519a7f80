// ABOUTME: Parameter declarations and the resolver binding them into the scaffold context
// ABOUTME: Applies enable, required, validate, choice, load and type-conversion rules per parameter

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};
use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing::debug;

use super::context::ScaffoldContext;
use super::enablement::{EnableFlags, EnabledIf};
use super::error::{Result, ScaffoldError};
use super::runtime::ScaffoldRuntime;
use crate::template;

static ENV_REFERENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{env\[([^\]]+)\]\}").expect("static pattern"));

const TRUTHY_TOKENS: [&str; 5] = ["yes", "true", "t", "1", "y"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterDeclaration {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub default: Option<Value>,
    #[serde(default)]
    pub required: bool,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub validate: Option<String>,
    #[serde(default)]
    pub load: Option<String>,
    #[serde(default)]
    pub choices: Option<Vec<Choice>>,
    #[serde(default)]
    pub secure: bool,
    #[serde(flatten)]
    pub enable: EnableFlags,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Choice {
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub value: Option<Value>,
    #[serde(default)]
    pub default: Option<Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParameterType {
    Str,
    Int,
    Float,
    Bool,
}

impl ParameterType {
    /// Unknown type names are treated as plain strings
    pub fn from_name(name: &str) -> Self {
        match name {
            "int" => Self::Int,
            "float" => Self::Float,
            "bool" => Self::Bool,
            _ => Self::Str,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Str => "str",
            Self::Int => "int",
            Self::Float => "float",
            Self::Bool => "bool",
        }
    }

    /// Convert raw input text; numeric parse failures are fatal
    pub fn convert(&self, name: &str, raw: &str) -> Result<Value> {
        let conversion_error = || ScaffoldError::Conversion {
            name: name.to_string(),
            value: raw.to_string(),
            target: self.as_str().to_string(),
        };

        match self {
            Self::Str => Ok(Value::String(raw.to_string())),
            Self::Int => raw
                .trim()
                .parse::<i64>()
                .map(Value::from)
                .map_err(|_| conversion_error()),
            // context values are JSON numbers, so nan and inf do not convert
            Self::Float => raw
                .trim()
                .parse::<f64>()
                .ok()
                .and_then(Number::from_f64)
                .map(Value::Number)
                .ok_or_else(conversion_error),
            Self::Bool => Ok(Value::Bool(
                TRUTHY_TOKENS.contains(&raw.to_lowercase().as_str()),
            )),
        }
    }
}

impl Choice {
    /// Value bound when this choice's keyword is selected
    pub fn resolve(&self, keyword: &str) -> Value {
        let value = self
            .value
            .clone()
            .unwrap_or_else(|| Value::String(keyword.to_string()));

        match (value, &self.default) {
            (Value::Object(selected), Some(Value::Object(defaults))) => {
                let mut merged = defaults.clone();
                merged.extend(selected);
                Value::Object(merged)
            }
            (value, _) => value,
        }
    }

    pub fn matches(&self, input: &str) -> bool {
        self.keywords.iter().any(|keyword| keyword == input)
    }
}

impl ParameterDeclaration {
    pub fn kind(&self) -> ParameterType {
        self.kind
            .as_deref()
            .map(ParameterType::from_name)
            .unwrap_or(ParameterType::Str)
    }

    pub fn label(&self) -> &str {
        self.description.as_deref().unwrap_or(&self.name)
    }

    pub fn loads_yaml(&self) -> bool {
        self.load.as_deref() == Some("yaml")
    }

    /// Default value with `{env[NAME]}` references substituted
    pub fn resolved_default(&self, environ: &BTreeMap<String, String>) -> Result<Value> {
        match &self.default {
            Some(Value::String(text)) => substitute_env(text, environ).map(Value::String),
            Some(other) => Ok(other.clone()),
            None => Ok(Value::Null),
        }
    }

    /// Prompt text with `{default}` and `{env[NAME]}` filled in where known
    pub fn prompt_text(&self, environ: &BTreeMap<String, String>) -> String {
        let default = self
            .resolved_default(environ)
            .ok()
            .map(|value| display_value(&value))
            .unwrap_or_default();

        let label = self.label().replace("{default}", &default);
        ENV_REFERENCE
            .replace_all(&label, |caps: &regex::Captures| {
                environ
                    .get(&caps[1])
                    .cloned()
                    .unwrap_or_else(|| caps[0].to_string())
            })
            .into_owned()
    }

    /// Evaluate the enable flags; `enabledif` is rendered against the context first
    pub fn is_enabled(&self, context: &ScaffoldContext) -> Result<bool> {
        let Some(condition) = &self.enable.enabledif else {
            return Ok(self.enable.is_enabled());
        };
        if self.enable.enabled.is_some() || self.enable.disabled.is_some() {
            return Ok(self.enable.is_enabled());
        }

        let raw = serde_json::to_value(condition)?;
        let rendered: EnabledIf =
            serde_json::from_value(template::render_options(&raw, context)?)?;
        Ok(rendered.evaluate())
    }
}

/// Bind every declared parameter that the context does not already hold.
pub fn resolve_parameters(
    parameters: &[ParameterDeclaration],
    context: &mut ScaffoldContext,
    runtime: &dyn ScaffoldRuntime,
) -> Result<()> {
    for parameter in parameters {
        if context.contains_key(&parameter.name) {
            debug!("Parameter '{}' already bound, skipping", parameter.name);
            continue;
        }

        let value = read_parameter(parameter, context, runtime)?;
        debug!("Bound parameter '{}'", parameter.name);
        context.set(parameter.name.clone(), value);
    }

    Ok(())
}

/// Decide the value of a single parameter, prompting through the runtime when needed.
pub fn read_parameter(
    parameter: &ParameterDeclaration,
    context: &ScaffoldContext,
    runtime: &dyn ScaffoldRuntime,
) -> Result<Value> {
    let default = parameter.resolved_default(context.environ())?;

    if !parameter.is_enabled(context)? {
        return Ok(default);
    }

    if let Some(choices) = &parameter.choices {
        return select_choice(parameter, choices, context.environ(), runtime);
    }

    let pattern = parameter
        .validate
        .as_deref()
        .map(compile_pattern)
        .transpose()?;

    loop {
        let input = runtime.ask(parameter)?;

        if input.is_empty() {
            if !parameter.required {
                return Ok(default);
            }
            runtime.log(&format!("[required] {} needs a value", parameter.label()));
            continue;
        }

        if let Some(regex) = &pattern {
            if !regex.is_match(&input) {
                let declared = parameter.validate.as_deref().unwrap_or_default();
                runtime.log(&format!("[invalid, {}]", declared));
                continue;
            }
        }

        if parameter.loads_yaml() {
            return load_yaml(&parameter.name, &input);
        }

        return parameter.kind().convert(&parameter.name, &input);
    }
}

fn select_choice(
    parameter: &ParameterDeclaration,
    choices: &[Choice],
    environ: &BTreeMap<String, String>,
    runtime: &dyn ScaffoldRuntime,
) -> Result<Value> {
    runtime.log(&format!("{}:\n", parameter.prompt_text(environ)));

    let keyword_columns: Vec<String> = choices
        .iter()
        .map(|choice| choice.keywords.join(", "))
        .collect();
    let width = keyword_columns
        .iter()
        .map(|column| column.chars().count())
        .max()
        .unwrap_or(0);

    loop {
        for (column, choice) in keyword_columns.iter().zip(choices) {
            runtime.log(&format!("[{:<width$}] {}", column, choice.text, width = width));
        }

        let input = runtime.ask(parameter)?;
        if let Some(choice) = choices.iter().find(|choice| choice.matches(&input)) {
            return Ok(choice.resolve(&input));
        }

        runtime.log("[invalid choice] please select a keyword on the left");
    }
}

/// Validation patterns match from the start of the input
fn compile_pattern(pattern: &str) -> Result<Regex> {
    Regex::new(&format!("^(?:{})", pattern)).map_err(|e| ScaffoldError::InvalidPattern {
        pattern: pattern.to_string(),
        message: e.to_string(),
    })
}

fn load_yaml(name: &str, raw_path: &str) -> Result<Value> {
    let path = expand_home(raw_path);
    let load_error = |message: String| ScaffoldError::ParameterLoad {
        name: name.to_string(),
        path: path.clone(),
        message,
    };

    let content = std::fs::read_to_string(&path).map_err(|e| load_error(e.to_string()))?;
    serde_yaml::from_str(&content).map_err(|e| load_error(e.to_string()))
}

fn expand_home(raw_path: &str) -> PathBuf {
    match (raw_path.strip_prefix("~/"), dirs::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(raw_path),
    }
}

fn substitute_env(text: &str, environ: &BTreeMap<String, String>) -> Result<String> {
    let mut missing = None;
    let substituted = ENV_REFERENCE.replace_all(text, |caps: &regex::Captures| {
        match environ.get(&caps[1]) {
            Some(value) => value.clone(),
            None => {
                missing.get_or_insert_with(|| caps[1].to_string());
                String::new()
            }
        }
    });

    match missing {
        Some(name) => Err(ScaffoldError::UnknownEnvironmentVariable(name)),
        None => Ok(substituted.into_owned()),
    }
}

fn display_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
