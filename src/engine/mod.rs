// ABOUTME: Scaffold execution engine module
// ABOUTME: Context, parameter resolution, step registry, package acquisition and the scaffold engine

pub mod context;
pub mod enablement;
pub mod error;
pub mod executor;
pub mod package;
pub mod parameters;
pub mod registry;
pub mod runtime;

pub use context::{PackageInfo, ScaffoldContext, PACKAGE_KEY, TARGET_KEY};
pub use enablement::{is_enabled, truthy, EnableFlags, EnabledIf};
pub use error::{Result, ScaffoldError};
pub use executor::{EngineSettings, ScaffoldEngine, ScaffoldOptions};
pub use package::{AcquisitionReport, GitPackageFetcher, PackageFetcher, PackageRequest};
pub use parameters::{
    read_parameter, resolve_parameters, Choice, ParameterDeclaration, ParameterType,
};
pub use registry::{ScaffoldPlugin, ScaffoldStep, StepRegistry};
pub use runtime::{ConsoleRuntime, ScaffoldRuntime};
