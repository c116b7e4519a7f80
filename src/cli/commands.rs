// ABOUTME: Command implementations for the xscaffold CLI
// ABOUTME: Handles the apply and config commands and the follow-up summary printed after apply

use anyhow::{anyhow, Result};
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::info;

use super::args::{Args, ConfigAction};
use super::config::Config;
use crate::engine::{ConsoleRuntime, ScaffoldContext, ScaffoldEngine, ScaffoldOptions};

/// Apply a scaffold package to the current directory
pub async fn apply_package(
    package: String,
    version: Option<String>,
    name: String,
    vars: Vec<String>,
    config: &Config,
) -> Result<()> {
    info!("Applying scaffold package: {}", package);

    let variables = Args::parse_variables(&vars)?;
    let mut context = ScaffoldContext::from_env();
    context.update(
        variables
            .into_iter()
            .map(|(key, value)| (key, Value::String(value))),
    );

    let mut options = ScaffoldOptions::new(&package).with_name(&name);
    if let Some(version) = version {
        options = options.with_version(version);
    }

    let engine = ScaffoldEngine::with_settings(config.engine_settings());
    let runtime = ConsoleRuntime::new();
    engine
        .execute_scaffold(&mut context, options, &runtime)
        .await
        .map_err(|e| anyhow!("Scaffold failed: {}", e))?;

    print!("{}", format_summary(&context, &package, &name));
    Ok(())
}

/// Completion line followed by the todo checklist and the notes, each section only when non-empty
pub fn format_summary(context: &ScaffoldContext, package: &str, name: &str) -> String {
    let mut out = format!("[done] scaffolding {}::{} complete!\n", package, name);

    if !context.todos.is_empty() {
        out.push_str("\n=== Follow-up Checklist ===\n\n");
        for todo in &context.todos {
            out.push_str(&format!("[ ] {}\n", todo));
        }
        out.push('\n');
    }

    if !context.notes.is_empty() {
        out.push_str("\n=== Notes ===\n\n");
        for note in &context.notes {
            out.push_str(note);
            out.push('\n');
        }
        out.push('\n');
    }

    out
}

fn config_file(path: Option<PathBuf>) -> Result<PathBuf> {
    path.or_else(Config::default_path)
        .ok_or_else(|| anyhow!("Could not determine the home directory for the config file"))
}

/// Save the effective url and temp directory, or view the stored url
pub fn config_command(
    action: ConfigAction,
    config: &Config,
    config_path: Option<PathBuf>,
) -> Result<()> {
    let path = config_file(config_path)?;
    match action {
        ConfigAction::Save => {
            save_config(config, &path)?;
            println!("Configuration saved to {}", path.display());
        }
        ConfigAction::View => println!("{}", view_config(&path)?),
    }
    Ok(())
}

pub fn save_config(config: &Config, path: &Path) -> Result<()> {
    let mut stored = Config::read_file(path)?.unwrap_or_default();
    stored.url = Some(config.effective_url());
    stored.temp_dir = Some(config.effective_temp_dir());
    stored.save(path)
}

pub fn view_config(path: &Path) -> Result<String> {
    let stored = Config::read_file(path)?.unwrap_or_default();
    Ok(match stored.url {
        Some(url) => format!("url: {}", url),
        None => "url: not defined".to_string(),
    })
}
