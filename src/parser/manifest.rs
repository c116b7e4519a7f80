// ABOUTME: Scaffold manifest data structures and YAML loading
// ABOUTME: Defines the Manifest, its step invocations and the built-in default manifest

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{json, Value};
use std::path::{Path, PathBuf};

use super::error::{ParserError, Result};
use crate::engine::ParameterDeclaration;

/// Manifest file stem looked up inside a package
pub const DEFAULT_MANIFEST_NAME: &str = "xscaffold";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Manifest {
    /// Configuration handed to plugins when the step registry is built
    pub plugins: Value,
    #[serde(deserialize_with = "nullable")]
    pub context: IndexMap<String, Value>,
    #[serde(deserialize_with = "nullable")]
    pub parameters: Vec<ParameterDeclaration>,
    #[serde(deserialize_with = "nullable")]
    pub steps: Vec<StepInvocation>,
}

/// One `{step_name: options}` entry of the `steps` list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "IndexMap<String, Value>", into = "IndexMap<String, Value>")]
pub struct StepInvocation {
    pub name: String,
    pub options: Value,
}

impl StepInvocation {
    pub fn new(name: impl Into<String>, options: Value) -> Self {
        Self {
            name: name.into(),
            options,
        }
    }
}

impl TryFrom<IndexMap<String, Value>> for StepInvocation {
    type Error = ParserError;

    fn try_from(map: IndexMap<String, Value>) -> Result<Self> {
        if map.len() != 1 {
            let keys: Vec<&String> = map.keys().collect();
            return Err(ParserError::InvalidFormat(format!(
                "step entries must have exactly one key, found {:?}",
                keys
            )));
        }
        let (name, options) = map
            .into_iter()
            .next()
            .ok_or_else(|| ParserError::InvalidFormat("empty step entry".to_string()))?;
        Ok(Self { name, options })
    }
}

impl From<StepInvocation> for IndexMap<String, Value> {
    fn from(step: StepInvocation) -> Self {
        let mut map = IndexMap::new();
        map.insert(step.name, step.options);
        map
    }
}

impl Manifest {
    /// Path of the manifest named `name` inside `package_dir`
    pub fn path_in(package_dir: &Path, name: &str) -> PathBuf {
        package_dir.join(format!("{}.yaml", name))
    }

    /// Load the manifest from a package directory; `None` when the file is absent
    pub fn load(package_dir: &Path, name: &str) -> Result<Option<Self>> {
        let path = Self::path_in(package_dir, name);
        if !path.is_file() {
            return Ok(None);
        }
        Self::from_file(&path).map(Some)
    }

    /// Parse manifest from YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ParserError::FileError {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&content)
    }

    /// Parse manifest from YAML string
    pub fn from_yaml(content: &str) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        let manifest: Manifest = serde_yaml::from_str(content).map_err(ParserError::YamlError)?;
        if !(manifest.plugins.is_null() || manifest.plugins.is_object()) {
            return Err(ParserError::InvalidFormat(
                "plugins must be a mapping".to_string(),
            ));
        }
        Ok(manifest)
    }

    /// Manifest used when a package has none: copy the whole package into the target
    pub fn default_manifest() -> Self {
        Self {
            steps: vec![StepInvocation::new(
                "fetch",
                json!({"source": ".", "target": "."}),
            )],
            ..Self::default()
        }
    }

    /// Configuration section for one plugin, `Null` when absent
    pub fn plugin_config(&self, plugin: &str) -> &Value {
        self.plugins.get(plugin).unwrap_or(&Value::Null)
    }
}

fn nullable<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
