// ABOUTME: Enable predicate evaluation shared by parameters and step options
// ABOUTME: Interprets the enabled / disabled / enabledif flags on an options block

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// `enabledif` comparison block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnabledIf {
    #[serde(default)]
    pub value: Value,
    pub equals: Option<Value>,
    pub notequals: Option<Value>,
}

/// Typed view of the three enable flags, flattened into declarations.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EnableFlags {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabledif: Option<EnabledIf>,
}

impl EnabledIf {
    pub fn evaluate(&self) -> bool {
        compare(&self.value, self.equals.as_ref(), self.notequals.as_ref())
    }
}

impl EnableFlags {
    pub fn is_enabled(&self) -> bool {
        if let Some(enabled) = self.enabled {
            return enabled;
        }
        if let Some(disabled) = self.disabled {
            return !disabled;
        }
        match &self.enabledif {
            Some(condition) => condition.evaluate(),
            None => true,
        }
    }
}

/// Evaluate the enable flags embedded in an arbitrary options block.
///
/// Non-mapping options are always enabled. Flags that are present but not
/// booleans follow the usual truthiness of their value.
pub fn is_enabled(options: &Value) -> bool {
    let Some(map) = options.as_object() else {
        return true;
    };

    if let Some(enabled) = map.get("enabled") {
        return truthy(enabled);
    }
    if let Some(disabled) = map.get("disabled") {
        return !truthy(disabled);
    }
    if let Some(Value::Object(condition)) = map.get("enabledif") {
        return compare(
            condition.get("value").unwrap_or(&Value::Null),
            condition.get("equals"),
            condition.get("notequals"),
        );
    }
    true
}

fn compare(value: &Value, equals: Option<&Value>, notequals: Option<&Value>) -> bool {
    let value = scalar(value);
    if let Some(expected) = equals {
        return value == scalar(expected);
    }
    if let Some(unexpected) = notequals {
        return value != scalar(unexpected);
    }
    true
}

/// Rendered operands arrive as text; read them back as YAML scalars so `"true"` equals `true`
fn scalar(value: &Value) -> Value {
    let Value::String(text) = value else {
        return value.clone();
    };
    match serde_yaml::from_str::<Value>(text) {
        Ok(parsed @ (Value::Bool(_) | Value::Number(_) | Value::Null)) => parsed,
        _ => value.clone(),
    }
}

/// Truthiness of a flag value; rendered options carry booleans as text
pub fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Value::String(s) => !matches!(s.trim().to_lowercase().as_str(), "" | "false" | "no" | "0"),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_default_is_enabled() {
        assert!(is_enabled(&json!({})));
        assert!(is_enabled(&json!("plain string options")));
        assert!(EnableFlags::default().is_enabled());
    }

    #[test]
    fn test_enabled_takes_precedence() {
        assert!(!is_enabled(&json!({"enabled": false, "disabled": false})));
        assert!(is_enabled(&json!({"enabled": true, "disabled": true})));
    }

    #[test]
    fn test_disabled_is_inverted() {
        assert!(!is_enabled(&json!({"disabled": true})));
        assert!(is_enabled(&json!({"disabled": false})));
    }

    #[test]
    fn test_enabledif_comparisons() {
        assert!(is_enabled(&json!({"enabledif": {"value": "a", "equals": "a"}})));
        assert!(!is_enabled(&json!({"enabledif": {"value": "a", "equals": "b"}})));
        assert!(is_enabled(&json!({"enabledif": {"value": "a", "notequals": "b"}})));
        assert!(!is_enabled(&json!({"enabledif": {"value": "a", "notequals": "a"}})));
        assert!(is_enabled(&json!({"enabledif": {"value": "a"}})));
    }

    #[test]
    fn test_enabledif_reads_rendered_text_as_scalars() {
        assert!(is_enabled(&json!({"enabledif": {"value": "true", "equals": true}})));
        assert!(!is_enabled(&json!({"enabledif": {"value": "false", "equals": true}})));
        assert!(is_enabled(&json!({"enabledif": {"value": "3", "equals": 3}})));
        assert!(is_enabled(&json!({"enabledif": {"value": "3", "notequals": "4"}})));
        assert!(!is_enabled(&json!({"enabledif": {"value": "on", "equals": true}})));

        let condition = EnabledIf {
            value: json!("true"),
            equals: Some(json!(true)),
            notequals: None,
        };
        assert!(condition.evaluate());
    }

    #[test]
    fn test_rendered_string_flags() {
        assert!(!is_enabled(&json!({"enabled": "false"})));
        assert!(is_enabled(&json!({"enabled": "true"})));
        assert!(!is_enabled(&json!({"enabled": ""})));
    }

    #[test]
    fn test_typed_flags_match_raw_evaluation() {
        let flags: EnableFlags = serde_json::from_value(json!({
            "enabledif": {"value": 3, "notequals": 4}
        }))
        .unwrap();
        assert!(flags.is_enabled());

        let flags: EnableFlags = serde_json::from_value(json!({"disabled": true})).unwrap();
        assert!(!flags.is_enabled());
    }
}
