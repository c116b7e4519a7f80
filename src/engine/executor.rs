// ABOUTME: Scaffold engine orchestrating one scaffold invocation
// ABOUTME: Resolves the package, loads its manifest, binds parameters and dispatches steps in order

use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, info_span, warn, Instrument};

use super::context::{PackageInfo, ScaffoldContext};
use super::error::{Result, ScaffoldError};
use super::package::{GitPackageFetcher, PackageFetcher, PackageRequest};
use super::parameters::resolve_parameters;
use super::registry::{ScaffoldPlugin, StepRegistry};
use super::runtime::ScaffoldRuntime;
use crate::parser::{Manifest, DEFAULT_MANIFEST_NAME};

pub const DEFAULT_URL_BASE: &str = "https://github.com";
pub const DEFAULT_VERSION: &str = "main";

/// Options for one scaffold invocation; recorded verbatim under `__package.options`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScaffoldOptions {
    pub package: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temp: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ScaffoldOptions {
    pub fn new(package: impl Into<String>) -> Self {
        Self {
            package: package.into(),
            ..Self::default()
        }
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_temp(mut self, temp: impl Into<String>) -> Self {
        self.temp = Some(temp.into());
        self
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Parse options from an untyped mapping, e.g. a nested scaffold step
    pub fn from_value(value: &Value) -> Result<Self> {
        Ok(serde_json::from_value(value.clone())?)
    }
}

/// Process-wide defaults for package resolution.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineSettings {
    pub url_base: String,
    pub temp_dir: PathBuf,
    pub default_version: String,
    pub manifest_name: String,
    /// Turn logged acquisition failures into errors
    pub strict_acquisition: bool,
    /// Default for copying an isolated nested scaffold's notes and todos back to its parent
    pub propagate_child_notes: bool,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            url_base: DEFAULT_URL_BASE.to_string(),
            temp_dir: std::env::temp_dir(),
            default_version: DEFAULT_VERSION.to_string(),
            manifest_name: DEFAULT_MANIFEST_NAME.to_string(),
            strict_acquisition: false,
            propagate_child_notes: false,
        }
    }
}

/// Runs scaffold invocations. Cheap to clone; steps hold a clone to recurse.
#[derive(Clone)]
pub struct ScaffoldEngine {
    plugins: Arc<Vec<Arc<dyn ScaffoldPlugin>>>,
    fetcher: Arc<dyn PackageFetcher>,
    settings: EngineSettings,
}

impl ScaffoldEngine {
    /// Engine with the built-in plugins, git acquisition and default settings
    pub fn new() -> Self {
        Self::with_settings(EngineSettings::default())
    }

    pub fn with_settings(settings: EngineSettings) -> Self {
        Self {
            plugins: Arc::new(crate::steps::builtin_plugins()),
            fetcher: Arc::new(GitPackageFetcher::new()),
            settings,
        }
    }

    /// Replace the plugin set
    pub fn with_plugins(mut self, plugins: Vec<Arc<dyn ScaffoldPlugin>>) -> Self {
        self.plugins = Arc::new(plugins);
        self
    }

    /// Append a plugin; it initialises after, and can override, the existing ones
    pub fn add_plugin(mut self, plugin: Arc<dyn ScaffoldPlugin>) -> Self {
        Arc::make_mut(&mut self.plugins).push(plugin);
        self
    }

    pub fn with_fetcher(mut self, fetcher: Arc<dyn PackageFetcher>) -> Self {
        self.fetcher = fetcher;
        self
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    pub fn plugins(&self) -> &[Arc<dyn ScaffoldPlugin>] {
        &self.plugins
    }

    /// Run one scaffold invocation against `context`, mutating it in place.
    ///
    /// Boxed so steps can re-enter the engine for nested scaffolds.
    pub fn execute_scaffold<'a>(
        &'a self,
        context: &'a mut ScaffoldContext,
        options: ScaffoldOptions,
        runtime: &'a dyn ScaffoldRuntime,
    ) -> BoxFuture<'a, Result<()>> {
        let span = info_span!("execute_scaffold", package = %options.package);
        Box::pin(
            async move {
                let package_dir = self.resolve_package(&options, runtime).await?;
                let name = options
                    .name
                    .clone()
                    .unwrap_or_else(|| self.settings.manifest_name.clone());
                let manifest = self.load_manifest(&package_dir, &name)?;

                let registry = StepRegistry::with_plugins(
                    self.clone(),
                    manifest.plugins.clone(),
                    &self.plugins,
                );

                context.update(manifest.context.clone());
                resolve_parameters(&manifest.parameters, context, runtime)?;

                context.set_package(&PackageInfo {
                    path: package_dir.to_string_lossy().to_string(),
                    options: serde_json::to_value(&options)?,
                });

                info!("Running {} steps", manifest.steps.len());
                for step in &manifest.steps {
                    let implementation = registry.resolve(&step.name)?;
                    debug!("Dispatching step: {}", step.name);
                    implementation.run(context, &step.options, runtime).await?;
                }

                Ok(())
            }
            .instrument(span),
        )
    }

    async fn resolve_package(
        &self,
        options: &ScaffoldOptions,
        runtime: &dyn ScaffoldRuntime,
    ) -> Result<PathBuf> {
        let local = Path::new(&options.package);
        if local.exists() {
            runtime.log(&format!("[info] using local package '{}'...", options.package));
            return Ok(local.to_path_buf());
        }

        let request = PackageRequest {
            url_base: options
                .url
                .clone()
                .unwrap_or_else(|| self.settings.url_base.clone()),
            package: options.package.clone(),
            version: options
                .version
                .clone()
                .unwrap_or_else(|| self.settings.default_version.clone()),
            cache_root: options
                .temp
                .as_ref()
                .map(PathBuf::from)
                .unwrap_or_else(|| self.settings.temp_dir.clone()),
        };

        let report = self.fetcher.fetch(&request, runtime).await;
        if !report.is_clean() {
            if self.settings.strict_acquisition {
                return Err(ScaffoldError::Acquisition {
                    package: options.package.clone(),
                    message: report.failures.join("; "),
                });
            }
            warn!(
                "Continuing with {} after acquisition failures",
                report.path.display()
            );
        }

        Ok(report.path)
    }

    fn load_manifest(&self, package_dir: &Path, name: &str) -> Result<Manifest> {
        match Manifest::load(package_dir, name)? {
            Some(manifest) => Ok(manifest),
            None => {
                warn!(
                    "scaffold file {} not found",
                    Manifest::path_in(package_dir, name).display()
                );
                Ok(Manifest::default_manifest())
            }
        }
    }
}

impl Default for ScaffoldEngine {
    fn default() -> Self {
        Self::new()
    }
}
