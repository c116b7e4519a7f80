// ABOUTME: Mutable scaffold context threaded through one invocation and its nested scaffolds
// ABOUTME: Ordered key/value store plus notes, todos and an environment snapshot

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::env;
use std::path::PathBuf;

/// Reserved key holding the active package description.
pub const PACKAGE_KEY: &str = "__package";

/// Reserved key naming the directory relative targets are written to.
pub const TARGET_KEY: &str = "__target";

#[derive(Debug, Clone, Default)]
pub struct ScaffoldContext {
    values: IndexMap<String, Value>,
    pub notes: Vec<String>,
    pub todos: Vec<String>,
    environ: BTreeMap<String, String>,
}

/// Value stored under `__package`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackageInfo {
    pub path: String,
    pub options: Value,
}

impl ScaffoldContext {
    /// Empty context with an empty environment snapshot
    pub fn new() -> Self {
        Self::default()
    }

    /// Context seeded from existing values
    pub fn from_values<I>(values: I) -> Self
    where
        I: IntoIterator<Item = (String, Value)>,
    {
        Self {
            values: values.into_iter().collect(),
            ..Self::default()
        }
    }

    /// Context with a snapshot of the current process environment
    pub fn from_env() -> Self {
        Self::new().with_environ(env::vars())
    }

    pub fn with_environ<I>(mut self, environ: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        self.environ = environ.into_iter().collect();
        self
    }

    /// Fresh context for an isolated nested scaffold; shares only the environment
    pub fn child<I>(&self, values: I) -> Self
    where
        I: IntoIterator<Item = (String, Value)>,
    {
        Self {
            values: values.into_iter().collect(),
            notes: Vec::new(),
            todos: Vec::new(),
            environ: self.environ.clone(),
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.values.get(key).and_then(Value::as_str)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.values.insert(key.into(), value.into());
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Shallow merge, overwriting existing keys
    pub fn update<I>(&mut self, values: I)
    where
        I: IntoIterator<Item = (String, Value)>,
    {
        self.values.extend(values);
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.values.keys()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn values(&self) -> &IndexMap<String, Value> {
        &self.values
    }

    pub fn environ(&self) -> &BTreeMap<String, String> {
        &self.environ
    }

    pub fn env_var(&self, name: &str) -> Option<&str> {
        self.environ.get(name).map(String::as_str)
    }

    pub fn add_note(&mut self, note: impl Into<String>) {
        self.notes.push(note.into());
    }

    pub fn add_todo(&mut self, todo: impl Into<String>) {
        self.todos.push(todo.into());
    }

    /// Append another context's notes and todos, preserving their order
    pub fn absorb_journal(&mut self, other: &ScaffoldContext) {
        self.notes.extend(other.notes.iter().cloned());
        self.todos.extend(other.todos.iter().cloned());
    }

    pub fn package(&self) -> Option<PackageInfo> {
        self.values
            .get(PACKAGE_KEY)
            .and_then(|value| serde_json::from_value(value.clone()).ok())
    }

    pub fn set_package(&mut self, package: &PackageInfo) {
        let value = serde_json::json!({
            "path": package.path,
            "options": package.options,
        });
        self.values.insert(PACKAGE_KEY.to_string(), value);
    }

    /// Raw `__package` value, captured before a nested invocation
    pub fn package_snapshot(&self) -> Option<Value> {
        self.values.get(PACKAGE_KEY).cloned()
    }

    /// Put back a value captured with `package_snapshot`
    pub fn restore_package(&mut self, snapshot: Option<Value>) {
        match snapshot {
            Some(value) => {
                self.values.insert(PACKAGE_KEY.to_string(), value);
            }
            None => {
                self.values.shift_remove(PACKAGE_KEY);
            }
        }
    }

    pub fn package_dir(&self) -> Option<PathBuf> {
        self.values
            .get(PACKAGE_KEY)
            .and_then(|package| package.get("path"))
            .and_then(Value::as_str)
            .map(PathBuf::from)
    }

    pub fn target_dir(&self) -> Option<PathBuf> {
        self.get_str(TARGET_KEY).map(PathBuf::from)
    }

    /// Key/value pairs as a JSON object for rendering and serialization
    pub fn to_json(&self) -> Value {
        let map: Map<String, Value> = self
            .values
            .iter()
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();
        Value::Object(map)
    }
}

impl PartialEq for ScaffoldContext {
    fn eq(&self, other: &Self) -> bool {
        self.values == other.values
    }
}

impl std::ops::Index<&str> for ScaffoldContext {
    type Output = Value;

    fn index(&self, key: &str) -> &Value {
        self.values.get(key).unwrap_or(&Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_equality_ignores_journal_and_environ() {
        let mut left = ScaffoldContext::from_values([("a".to_string(), json!(1))]);
        let right = ScaffoldContext::from_values([("a".to_string(), json!(1))])
            .with_environ([("HOME".to_string(), "/root".to_string())]);

        left.add_note("a note");
        left.add_todo("a todo");

        assert_eq!(left, right);
    }

    #[test]
    fn test_update_overwrites_and_preserves_order() {
        let mut context = ScaffoldContext::new();
        context.set("first", "1");
        context.set("second", "2");
        context.update([
            ("first".to_string(), json!("one")),
            ("third".to_string(), json!(3)),
        ]);

        let keys: Vec<&String> = context.keys().collect();
        assert_eq!(keys, vec!["first", "second", "third"]);
        assert_eq!(context["first"], json!("one"));
        assert_eq!(context["missing"], Value::Null);
    }

    #[test]
    fn test_package_snapshot_and_restore() {
        let mut context = ScaffoldContext::new();
        assert!(context.package_snapshot().is_none());

        let outer = PackageInfo {
            path: "/tmp/outer".to_string(),
            options: json!({"package": "/tmp/outer"}),
        };
        context.set_package(&outer);
        let snapshot = context.package_snapshot();

        context.set_package(&PackageInfo {
            path: "/tmp/inner".to_string(),
            options: json!({"package": "/tmp/inner"}),
        });
        assert_eq!(context.package_dir(), Some(PathBuf::from("/tmp/inner")));

        context.restore_package(snapshot);
        assert_eq!(context.package(), Some(outer));

        context.restore_package(None);
        assert!(!context.contains_key(PACKAGE_KEY));
    }

    #[test]
    fn test_child_shares_environment_only() {
        let mut parent = ScaffoldContext::from_values([("a".to_string(), json!(1))])
            .with_environ([("USER".to_string(), "john".to_string())]);
        parent.add_note("parent note");

        let child = parent.child([("b".to_string(), json!(2))]);

        assert!(!child.contains_key("a"));
        assert_eq!(child["b"], json!(2));
        assert!(child.notes.is_empty());
        assert_eq!(child.env_var("USER"), Some("john"));
    }
}
