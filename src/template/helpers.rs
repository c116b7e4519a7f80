// ABOUTME: Handlebars helper functions for template rendering
// ABOUTME: Implements the utils functions (file readers, list formatting, YAML/JSON output) and string helpers

use chrono::Utc;
use handlebars::{
    Context, Handlebars, Helper, HelperDef, Output, RenderContext, RenderError, ScopedJson,
};
use serde_json::Value;
use std::path::Path;
use uuid::Uuid;

use super::error::{Result, TemplateError};

/// Names accepted by the `utils` helper, in documentation order.
pub const UTILITY_NAMES: &[&str] = &[
    "read_file",
    "read_json",
    "read_yaml",
    "formatlist",
    "yaml",
    "json",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Utility {
    ReadFile,
    ReadJson,
    ReadYaml,
    FormatList,
    Yaml,
    Json,
}

impl Utility {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "read_file" => Some(Self::ReadFile),
            "read_json" => Some(Self::ReadJson),
            "read_yaml" => Some(Self::ReadYaml),
            "formatlist" => Some(Self::FormatList),
            "yaml" => Some(Self::Yaml),
            "json" => Some(Self::Json),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::ReadFile => "read_file",
            Self::ReadJson => "read_json",
            Self::ReadYaml => "read_yaml",
            Self::FormatList => "formatlist",
            Self::Yaml => "yaml",
            Self::Json => "json",
        }
    }

    /// Apply the utility to already-evaluated helper arguments
    pub fn apply(&self, args: &[&Value]) -> Result<Value> {
        let arg = |index: usize| args.get(index).copied().unwrap_or(&Value::Null);
        let path_arg = |index: usize| {
            arg(index).as_str().map(str::to_string).ok_or_else(|| {
                TemplateError::SyntaxError(format!("{} requires a path argument", self.name()))
            })
        };

        match self {
            Self::ReadFile => read_file(path_arg(0)?, is_truthy(arg(1))),
            Self::ReadJson => read_json(path_arg(0)?),
            Self::ReadYaml => read_yaml(path_arg(0)?),
            Self::FormatList => {
                let items = match arg(0) {
                    Value::Array(items) => items.as_slice(),
                    Value::Null => &[],
                    _ => {
                        return Err(TemplateError::SyntaxError(
                            "formatlist requires a list argument".to_string(),
                        ))
                    }
                };
                let format = arg(1).as_str().unwrap_or("{value}");
                Ok(Value::Array(format_list(items, format)))
            }
            Self::Yaml => yaml_format(arg(0)).map(Value::String),
            Self::Json => json_format(arg(0)).map(Value::String),
        }
    }
}

/// Read a file as text, or parse it by extension when `parse` is set
pub fn read_file(path: impl AsRef<Path>, parse: bool) -> Result<Value> {
    let path = path.as_ref();
    if !parse {
        return std::fs::read_to_string(path)
            .map(Value::String)
            .map_err(|source| TemplateError::FileError {
                path: path.to_path_buf(),
                source,
            });
    }

    match path.extension().and_then(|ext| ext.to_str()) {
        Some("yaml") | Some("yml") => read_yaml(path),
        Some("json") => read_json(path),
        other => Err(TemplateError::UnsupportedParser(format!(
            ".{}",
            other.unwrap_or_default()
        ))),
    }
}

pub fn read_json(path: impl AsRef<Path>) -> Result<Value> {
    let content = read_text(path.as_ref())?;
    serde_json::from_str(&content).map_err(TemplateError::JsonError)
}

pub fn read_yaml(path: impl AsRef<Path>) -> Result<Value> {
    let content = read_text(path.as_ref())?;
    serde_yaml::from_str(&content).map_err(TemplateError::YamlError)
}

fn read_text(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|source| TemplateError::FileError {
        path: path.to_path_buf(),
        source,
    })
}

/// Format each item with `{value}` and `{index}` placeholders
pub fn format_list(items: &[Value], format: &str) -> Vec<Value> {
    items
        .iter()
        .enumerate()
        .map(|(index, item)| {
            let formatted = format
                .replace("{value}", &display(item))
                .replace("{index}", &index.to_string());
            Value::String(formatted)
        })
        .collect()
}

/// Serialize as single-line flow-style YAML
pub fn yaml_format(value: &Value) -> Result<String> {
    match value {
        Value::Null => Ok("null".to_string()),
        Value::Array(items) => {
            let parts = items.iter().map(yaml_format).collect::<Result<Vec<_>>>()?;
            Ok(format!("[{}]", parts.join(", ")))
        }
        Value::Object(map) => {
            let parts = map
                .iter()
                .map(|(key, item)| {
                    Ok(format!(
                        "{}: {}",
                        yaml_scalar(&Value::String(key.clone()))?,
                        yaml_format(item)?
                    ))
                })
                .collect::<Result<Vec<_>>>()?;
            Ok(format!("{{{}}}", parts.join(", ")))
        }
        scalar => yaml_scalar(scalar),
    }
}

fn yaml_scalar(value: &Value) -> Result<String> {
    if let Value::String(text) = value {
        // flow indicators and line breaks must be quoted inside [..] and {..}
        let needs_quotes =
            |c: char| matches!(c, ',' | '[' | ']' | '{' | '}') || c.is_control();
        if text.contains(needs_quotes) {
            return serde_json::to_string(text).map_err(TemplateError::JsonError);
        }
    }
    let rendered = serde_yaml::to_string(value).map_err(TemplateError::YamlError)?;
    Ok(rendered.trim_end().to_string())
}

pub fn json_format(value: &Value) -> Result<String> {
    serde_json::to_string(value).map_err(TemplateError::JsonError)
}

fn display(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::String(s) => matches!(s.to_lowercase().as_str(), "true" | "yes" | "1"),
        Value::Number(n) => n.as_i64().map(|n| n != 0).unwrap_or(false),
        _ => false,
    }
}

fn to_render_error(error: TemplateError) -> RenderError {
    RenderError::new(error.to_string())
}

/// `{{utils "name" args...}}` dispatching to a named utility
pub struct UtilsHelper;

impl HelperDef for UtilsHelper {
    fn call_inner<'reg: 'rc, 'rc>(
        &self,
        h: &Helper<'reg, 'rc>,
        _: &'reg Handlebars<'reg>,
        _: &'rc Context,
        _: &mut RenderContext<'reg, 'rc>,
    ) -> std::result::Result<ScopedJson<'reg, 'rc>, RenderError> {
        let name = h
            .param(0)
            .and_then(|v| v.value().as_str())
            .ok_or_else(|| RenderError::new("utils helper requires a function name"))?;

        let utility = Utility::from_name(name)
            .ok_or_else(|| to_render_error(TemplateError::UnknownUtility(name.to_string())))?;

        let args: Vec<&Value> = h.params().iter().skip(1).map(|p| p.value()).collect();
        utility
            .apply(&args)
            .map(ScopedJson::Derived)
            .map_err(to_render_error)
    }
}

/// A single utility registered under its own name, e.g. `{{json value}}`
pub struct UtilityHelper(pub Utility);

impl HelperDef for UtilityHelper {
    fn call_inner<'reg: 'rc, 'rc>(
        &self,
        h: &Helper<'reg, 'rc>,
        _: &'reg Handlebars<'reg>,
        _: &'rc Context,
        _: &mut RenderContext<'reg, 'rc>,
    ) -> std::result::Result<ScopedJson<'reg, 'rc>, RenderError> {
        let args: Vec<&Value> = h.params().iter().map(|p| p.value()).collect();
        self.0
            .apply(&args)
            .map(ScopedJson::Derived)
            .map_err(to_render_error)
    }
}

/// Timestamp helper - formats current time with optional format string
pub fn timestamp_helper(
    h: &Helper,
    _: &Handlebars,
    _: &Context,
    _rc: &mut RenderContext,
    out: &mut dyn Output,
) -> std::result::Result<(), RenderError> {
    let format = h
        .param(0)
        .and_then(|v| v.value().as_str())
        .unwrap_or("%Y-%m-%d %H:%M:%S");

    out.write(&Utc::now().format(format).to_string())?;
    Ok(())
}

/// UUID helper - generates a new UUID v4
pub fn uuid_helper(
    _h: &Helper,
    _: &Handlebars,
    _: &Context,
    _rc: &mut RenderContext,
    out: &mut dyn Output,
) -> std::result::Result<(), RenderError> {
    out.write(&Uuid::new_v4().to_string())?;
    Ok(())
}

/// Uppercase helper
pub fn upper_helper(
    h: &Helper,
    _: &Handlebars,
    _: &Context,
    _rc: &mut RenderContext,
    out: &mut dyn Output,
) -> std::result::Result<(), RenderError> {
    let input = h
        .param(0)
        .and_then(|v| v.value().as_str())
        .ok_or_else(|| RenderError::new("upper helper requires input parameter"))?;

    out.write(&input.to_uppercase())?;
    Ok(())
}

/// Lowercase helper
pub fn lower_helper(
    h: &Helper,
    _: &Handlebars,
    _: &Context,
    _rc: &mut RenderContext,
    out: &mut dyn Output,
) -> std::result::Result<(), RenderError> {
    let input = h
        .param(0)
        .and_then(|v| v.value().as_str())
        .ok_or_else(|| RenderError::new("lower helper requires input parameter"))?;

    out.write(&input.to_lowercase())?;
    Ok(())
}

/// Default helper - provides default value if variable is empty
pub fn default_helper(
    h: &Helper,
    _: &Handlebars,
    _: &Context,
    _rc: &mut RenderContext,
    out: &mut dyn Output,
) -> std::result::Result<(), RenderError> {
    let value = h.param(0).map(|v| display(v.value())).unwrap_or_default();

    let default_value = h
        .param(1)
        .and_then(|v| v.value().as_str())
        .ok_or_else(|| RenderError::new("default helper requires default value parameter"))?;

    let result = if value.is_empty() || value == "null" {
        default_value
    } else {
        value.as_str()
    };

    out.write(result)?;
    Ok(())
}

/// Register all built-in helpers with a Handlebars instance
pub fn register_helpers(handlebars: &mut Handlebars) {
    handlebars.register_helper("utils", Box::new(UtilsHelper));
    for name in UTILITY_NAMES {
        if let Some(utility) = Utility::from_name(name) {
            handlebars.register_helper(name, Box::new(UtilityHelper(utility)));
        }
    }

    handlebars.register_helper("timestamp", Box::new(timestamp_helper));
    handlebars.register_helper("uuid", Box::new(uuid_helper));
    handlebars.register_helper("upper", Box::new(upper_helper));
    handlebars.register_helper("lower", Box::new(lower_helper));
    handlebars.register_helper("default", Box::new(default_helper));
}

#[cfg(test)]
mod tests {
    use super::*;
    use handlebars::Handlebars;
    use serde_json::json;

    fn create_test_handlebars() -> Handlebars<'static> {
        let mut handlebars = Handlebars::new();
        handlebars.register_escape_fn(handlebars::no_escape);
        register_helpers(&mut handlebars);
        handlebars
    }

    #[test]
    fn test_read_file_raw_and_parsed() {
        let dir = tempfile::tempdir().unwrap();
        let yaml = dir.path().join("values.yml");
        std::fs::write(&yaml, "name: demo\n").unwrap();

        assert_eq!(read_file(&yaml, false).unwrap(), json!("name: demo\n"));
        assert_eq!(read_file(&yaml, true).unwrap(), json!({"name": "demo"}));
    }

    #[test]
    fn test_read_file_unsupported_parser() {
        let dir = tempfile::tempdir().unwrap();
        let toml = dir.path().join("values.toml");
        std::fs::write(&toml, "name = 'demo'\n").unwrap();

        let err = read_file(&toml, true).unwrap_err();
        assert!(matches!(err, TemplateError::UnsupportedParser(ext) if ext == ".toml"));
    }

    #[test]
    fn test_format_list() {
        let items = vec![json!("a"), json!(2)];
        assert_eq!(
            format_list(&items, "{index}: {value}"),
            vec![json!("0: a"), json!("1: 2")]
        );
    }

    #[test]
    fn test_yaml_format_is_flow_style() {
        assert_eq!(yaml_format(&Value::Null).unwrap(), "null");
        assert_eq!(yaml_format(&json!("plain")).unwrap(), "plain");
        assert_eq!(
            yaml_format(&json!({"a": 1, "b": ["x", "y, z"]})).unwrap(),
            r#"{a: 1, b: [x, "y, z"]}"#
        );
    }

    #[test]
    fn test_yaml_format_parses_back() {
        let value = json!({
            "k": ["line one\nline two", "x"],
            "tabbed": "a\tb",
            "crlf": "end\r\n",
            "n": null
        });

        let rendered = yaml_format(&value).unwrap();
        assert!(!rendered.contains('\n'));

        let parsed: Value = serde_yaml::from_str(&rendered).unwrap();
        assert_eq!(parsed, value);
    }

    #[test]
    fn test_json_format() {
        assert_eq!(json_format(&Value::Null).unwrap(), "null");
        assert_eq!(json_format(&json!({"a": [1, 2]})).unwrap(), r#"{"a":[1,2]}"#);
    }

    #[test]
    fn test_utils_helper_dispatch() {
        let handlebars = create_test_handlebars();
        let data = json!({"items": ["a", "b"], "value": {"k": "v"}});

        let result = handlebars
            .render_template(r#"{{utils "json" value}}"#, &data)
            .unwrap();
        assert_eq!(result, r#"{"k":"v"}"#);

        let result = handlebars
            .render_template(
                r#"{{#each (utils "formatlist" items "- {value}")}}{{this}};{{/each}}"#,
                &data,
            )
            .unwrap();
        assert_eq!(result, "- a;- b;");

        assert!(handlebars
            .render_template(r#"{{utils "explode" value}}"#, &data)
            .is_err());
    }

    #[test]
    fn test_standalone_utility_helpers() {
        let handlebars = create_test_handlebars();
        let result = handlebars
            .render_template("{{yaml value}}", &json!({"value": [1, 2]}))
            .unwrap();
        assert_eq!(result, "[1, 2]");
    }

    #[test]
    fn test_case_helpers() {
        let handlebars = create_test_handlebars();
        let upper = handlebars
            .render_template("{{upper \"hello world\"}}", &json!({}))
            .unwrap();
        assert_eq!(upper, "HELLO WORLD");

        let lower = handlebars
            .render_template("{{lower \"HELLO WORLD\"}}", &json!({}))
            .unwrap();
        assert_eq!(lower, "hello world");
    }

    #[test]
    fn test_default_helper() {
        let handlebars = create_test_handlebars();
        let result = handlebars
            .render_template("{{default missing \"fallback\"}}", &json!({}))
            .unwrap();
        assert_eq!(result, "fallback");

        let result = handlebars
            .render_template("{{default name \"fallback\"}}", &json!({"name": "set"}))
            .unwrap();
        assert_eq!(result, "set");
    }

    #[test]
    fn test_timestamp_and_uuid_helpers() {
        let handlebars = create_test_handlebars();
        let year = handlebars
            .render_template("{{timestamp \"%Y\"}}", &json!({}))
            .unwrap();
        assert_eq!(year.len(), 4);

        let uuid = handlebars.render_template("{{uuid}}", &json!({})).unwrap();
        assert_eq!(uuid.len(), 36);
    }
}
