// ABOUTME: Parser module for YAML scaffold manifests
// ABOUTME: Exports the manifest model, step invocations and parse errors

pub mod error;
pub mod manifest;

pub use error::{ParserError, Result};
pub use manifest::{Manifest, StepInvocation, DEFAULT_MANIFEST_NAME};
