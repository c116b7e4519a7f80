// ABOUTME: Fetch step copying and rendering package files into the scaffold target
// ABOUTME: Walks package directories with glob filters, rendering template matches and copying the rest

use async_trait::async_trait;
use glob::{MatchOptions, Pattern};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};
use walkdir::WalkDir;

use super::{parse_options, prepare_options};
use crate::engine::{
    is_enabled, EnableFlags, Result, ScaffoldContext, ScaffoldError, ScaffoldPlugin,
    ScaffoldRuntime, ScaffoldStep, StepRegistry,
};
use crate::template;

const STEP: &str = "fetch";

// `*` crosses directory separators, like shell-style fnmatch
const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: false,
    require_literal_leading_dot: false,
};

/// One fetch entry
///
/// ```yaml
/// steps:
///   - fetch:
///       source: template
///       target: "{{context.name}}"
///       templates: ["*.md", "*.toml"]
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchSpec {
    /// File or directory inside the package
    pub source: String,
    pub target: String,
    /// Glob selecting files under a directory source
    #[serde(default = "default_name")]
    pub name: String,
    /// Globs of files rendered instead of copied
    #[serde(default)]
    pub templates: Vec<String>,
    #[serde(default = "default_exclude")]
    pub exclude: Vec<String>,
    #[serde(flatten)]
    pub enable: EnableFlags,
}

fn default_name() -> String {
    "**/*".to_string()
}

fn default_exclude() -> Vec<String> {
    vec![".git".to_string(), ".git/*".to_string()]
}

/// Counts reported after a fetch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FetchSummary {
    pub rendered: usize,
    pub copied: usize,
}

struct GlobSet(Vec<Pattern>);

impl GlobSet {
    fn new(patterns: &[String]) -> Result<Self> {
        patterns
            .iter()
            .map(|p| {
                Pattern::new(p).map_err(|e| ScaffoldError::InvalidPattern {
                    pattern: p.clone(),
                    message: e.to_string(),
                })
            })
            .collect::<Result<Vec<_>>>()
            .map(Self)
    }

    fn matches(&self, path: &str) -> bool {
        self.0.iter().any(|p| p.matches_with(path, MATCH_OPTIONS))
    }
}

impl FetchSpec {
    /// Copy or render this entry; paths are resolved against the package and target
    pub fn apply(&self, context: &ScaffoldContext) -> Result<FetchSummary> {
        let package_dir = context.package_dir().unwrap_or_else(|| PathBuf::from("."));
        let source = package_dir.join(&self.source);
        let target = resolve_target(context, &self.target);

        if source.is_file() {
            let content = template::render_file(&source, context)?;
            write_file(&target, content.as_bytes())?;
            return Ok(FetchSummary {
                rendered: 1,
                copied: 0,
            });
        }

        if !source.is_dir() {
            return Err(ScaffoldError::step_failed(
                STEP,
                format!("source '{}' does not exist", source.display()),
            ));
        }

        self.copy_tree(&source, &target, context)
    }

    fn copy_tree(
        &self,
        source: &Path,
        target: &Path,
        context: &ScaffoldContext,
    ) -> Result<FetchSummary> {
        let name = GlobSet::new(std::slice::from_ref(&self.name))?;
        let templates = GlobSet::new(&self.templates)?;
        let exclude = GlobSet::new(&self.exclude)?;
        let mut summary = FetchSummary::default();

        let walker = WalkDir::new(source)
            .min_depth(1)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| {
                relative(source, entry.path())
                    .map(|rel| !exclude.matches(&rel))
                    .unwrap_or(true)
            });

        for entry in walker {
            let entry = entry.map_err(|e| ScaffoldError::step_failed(STEP, e.to_string()))?;
            if !entry.file_type().is_file() {
                continue;
            }
            let Some(rel) = relative(source, entry.path()) else {
                continue;
            };
            if !name.matches(&rel) {
                continue;
            }

            let destination = target.join(&rel);
            if templates.matches(&rel) {
                debug!("Rendering {}", rel);
                let content = template::render_file(entry.path(), context)?;
                write_file(&destination, content.as_bytes())?;
                summary.rendered += 1;
            } else {
                if let Some(parent) = destination.parent() {
                    fs::create_dir_all(parent)?;
                }
                fs::copy(entry.path(), &destination)?;
                summary.copied += 1;
            }
        }

        Ok(summary)
    }
}

/// Relative targets land under `__target` when set
fn resolve_target(context: &ScaffoldContext, target: &str) -> PathBuf {
    let target = Path::new(target);
    match context.target_dir() {
        Some(base) if target.is_relative() => base.join(target),
        _ => target.to_path_buf(),
    }
}

fn relative(root: &Path, path: &Path) -> Option<String> {
    let rel = path.strip_prefix(root).ok()?;
    let parts: Vec<String> = rel
        .components()
        .map(|c| c.as_os_str().to_string_lossy().to_string())
        .collect();
    Some(parts.join("/"))
}

fn write_file(path: &Path, content: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    fs::write(path, content)?;
    Ok(())
}

fn parse_specs(options: &Value) -> Result<Vec<FetchSpec>> {
    match options {
        Value::Object(_) => Ok(vec![parse_options(STEP, options)?]),
        Value::Array(items) => items
            .iter()
            .filter(|item| is_enabled(item))
            .map(|item| parse_options(STEP, item))
            .collect(),
        _ => Err(ScaffoldError::invalid_options(
            STEP,
            "expected a mapping or a list of mappings",
        )),
    }
}

pub struct FetchStep;

#[async_trait]
impl ScaffoldStep for FetchStep {
    async fn run(
        &self,
        context: &mut ScaffoldContext,
        options: &Value,
        _runtime: &dyn ScaffoldRuntime,
    ) -> Result<()> {
        let Some(rendered) = prepare_options(STEP, options, context)? else {
            return Ok(());
        };

        for spec in parse_specs(&rendered)? {
            let summary = spec.apply(context)?;
            info!(
                "Fetched {} -> {} ({} rendered, {} copied)",
                spec.source, spec.target, summary.rendered, summary.copied
            );
        }
        Ok(())
    }
}

pub struct FetchPlugin;

impl ScaffoldPlugin for FetchPlugin {
    fn name(&self) -> &'static str {
        "fetch"
    }

    fn init(&self, registry: &mut StepRegistry) {
        registry.add_step(STEP, Arc::new(FetchStep));
    }
}
