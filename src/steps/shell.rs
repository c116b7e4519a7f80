// ABOUTME: Shell step running rendered scripts with a shell interpreter
// ABOUTME: Writes the script to a temporary file, runs it with set -e and fails the step on non-zero exit

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::NamedTempFile;
use tokio::process::Command;
use tokio::time::{timeout, Duration};
use tracing::{debug, error, info};

use super::{parse_options, prepare_options};
use crate::engine::{
    EnableFlags, Result, ScaffoldContext, ScaffoldError, ScaffoldPlugin, ScaffoldRuntime,
    ScaffoldStep, StepRegistry,
};

const STEP: &str = "shell";

/// Terminal colour codes exported to scripts as `TERM_<NAME>`
const TERM_COLORS: [(&str, &str); 10] = [
    ("PURPLE", "\x1b[35m"),
    ("CYAN", "\x1b[36m"),
    ("BLUE", "\x1b[34m"),
    ("GREEN", "\x1b[32m"),
    ("YELLOW", "\x1b[33m"),
    ("RED", "\x1b[31m"),
    ("BOLD", "\x1b[1m"),
    ("UNDERLINE", "\x1b[4m"),
    ("ITALIC", "\x1b[3m"),
    ("END", "\x1b[0m"),
];

/// Configuration for the shell step
///
/// ```yaml
/// steps:
///   - shell: |
///       git init {{context.name}}
///   - shell:
///       script: make build
///       working_dir: "{{context.name}}"
///       env:
///         CI: "true"
///       timeout_seconds: 300
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShellConfig {
    pub script: String,

    /// Interpreter used to run the script file (default: /bin/sh)
    #[serde(default = "default_shell")]
    pub shell: String,

    /// Relative directories resolve against the scaffold target
    #[serde(default)]
    pub working_dir: Option<String>,

    #[serde(default)]
    pub env: HashMap<String, String>,

    /// No timeout means wait indefinitely
    #[serde(default)]
    pub timeout_seconds: Option<u64>,

    #[serde(flatten)]
    pub enable: EnableFlags,
}

fn default_shell() -> String {
    "/bin/sh".to_string()
}

impl ShellConfig {
    pub fn from_options(options: &Value) -> Result<Self> {
        match options {
            Value::String(script) => Ok(Self {
                script: script.clone(),
                shell: default_shell(),
                working_dir: None,
                env: HashMap::new(),
                timeout_seconds: None,
                enable: EnableFlags::default(),
            }),
            Value::Object(_) => {
                let config: ShellConfig = parse_options(STEP, options)?;
                if config.shell.trim().is_empty() {
                    return Err(ScaffoldError::invalid_options(
                        STEP,
                        "shell interpreter cannot be empty",
                    ));
                }
                if config.timeout_seconds == Some(0) {
                    return Err(ScaffoldError::invalid_options(
                        STEP,
                        "timeout must be greater than 0",
                    ));
                }
                Ok(config)
            }
            _ => Err(ScaffoldError::invalid_options(
                STEP,
                "expected a script string or a mapping with 'script'",
            )),
        }
    }

    fn working_dir(&self, context: &ScaffoldContext) -> Option<PathBuf> {
        let target = context.target_dir();
        match (&self.working_dir, target) {
            (Some(dir), Some(target)) => Some(target.join(dir)),
            (Some(dir), None) => Some(PathBuf::from(dir)),
            (None, target) => target,
        }
    }
}

pub struct ShellStep;

#[async_trait]
impl ScaffoldStep for ShellStep {
    async fn run(
        &self,
        context: &mut ScaffoldContext,
        options: &Value,
        _runtime: &dyn ScaffoldRuntime,
    ) -> Result<()> {
        let Some(rendered) = prepare_options(STEP, options, context)? else {
            return Ok(());
        };
        let config = ShellConfig::from_options(&rendered)?;

        let script = format!("set -e\n{}\n", config.script);
        debug!(
            "Processed script ({} chars) for {}",
            script.len(),
            config.shell
        );

        // The file must outlive the child process
        let mut script_file = NamedTempFile::new()?;
        script_file.write_all(script.as_bytes())?;
        script_file.flush()?;

        let mut cmd = Command::new(&config.shell);
        cmd.arg(script_file.path()).kill_on_drop(true);
        for (name, code) in TERM_COLORS {
            cmd.env(format!("TERM_{}", name), code);
        }
        for (key, value) in &config.env {
            cmd.env(key, value);
        }
        if let Some(dir) = config.working_dir(context) {
            cmd.current_dir(dir);
        }

        let mut child = cmd
            .spawn()
            .map_err(|e| ScaffoldError::step_failed(STEP, format!("failed to start {}: {}", config.shell, e)))?;

        let status = match config.timeout_seconds {
            Some(seconds) => match timeout(Duration::from_secs(seconds), child.wait()).await {
                Ok(status) => status?,
                Err(_) => {
                    error!("Shell script timed out after {} seconds", seconds);
                    if let Err(e) = child.kill().await {
                        debug!("Failed to kill timed out script: {}", e);
                    }
                    return Err(ScaffoldError::StepTimeout {
                        step: STEP.to_string(),
                        seconds,
                    });
                }
            },
            None => child.wait().await?,
        };

        if !status.success() {
            let code = status
                .code()
                .map(|c| c.to_string())
                .unwrap_or_else(|| "signal".to_string());
            return Err(ScaffoldError::step_failed(
                STEP,
                format!("Failed to execute command (exit status {})", code),
            ));
        }

        info!("Shell script completed");
        Ok(())
    }
}

pub struct ShellPlugin;

impl ScaffoldPlugin for ShellPlugin {
    fn name(&self) -> &'static str {
        "shell"
    }

    fn init(&self, registry: &mut StepRegistry) {
        registry.add_step(STEP, Arc::new(ShellStep));
    }
}
