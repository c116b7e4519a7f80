// ABOUTME: Main application orchestration for the xscaffold CLI
// ABOUTME: Coordinates between CLI arguments, configuration, and command execution

use anyhow::Result;
use std::path::PathBuf;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use super::commands;
use super::{Args, Commands, Config};

/// Log line layout selected by `log_format`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Compact,
    Full,
}

impl LogFormat {
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_lowercase().as_str() {
            "pretty" => Self::Pretty,
            "compact" => Self::Compact,
            _ => Self::Full,
        }
    }
}

pub struct App {
    config: Config,
    config_path: Option<PathBuf>,
}

impl App {
    /// Create a new application instance
    pub fn new(config: Config) -> Self {
        Self {
            config,
            config_path: None,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Initialize logging based on configuration
    pub fn init_logging(&self, verbose: bool, no_color: bool) -> Result<()> {
        let log_level = if verbose {
            "debug"
        } else {
            &self.config.log_level
        };

        let env_filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

        // stdout carries prompts and the runtime's status lines
        let builder = tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_ansi(!no_color)
            .with_target(false)
            .with_writer(std::io::stderr);

        match LogFormat::from_name(&self.config.log_format) {
            LogFormat::Compact => builder.compact().init(),
            LogFormat::Pretty => builder.pretty().init(),
            LogFormat::Full => builder.init(),
        }

        debug!("Logging initialized with level: {}", log_level);
        Ok(())
    }

    /// Run the application with parsed arguments
    pub async fn run(&mut self, args: Args) -> Result<()> {
        self.init_logging(args.verbose, args.no_color)?;

        info!("Starting xscaffold v{}", crate::VERSION);
        debug!("Configuration loaded from: {:?}", self.config_path);

        match args.command {
            Commands::Apply {
                package,
                version,
                name,
                set,
            } => commands::apply_package(package, version, name, set, &self.config).await,

            Commands::Config { action } => {
                commands::config_command(action, &self.config, self.config_path.clone())
            }
        }
    }

    /// Create application from parsed arguments; command line values override config and environment
    pub fn from_args(args: &Args) -> Result<Self> {
        let mut config = Config::load(args.config.clone())?;
        config.apply_overrides(args.url.clone(), args.temp.clone(), args.log_level.clone());
        Ok(Self {
            config,
            config_path: args.config.clone(),
        })
    }
}
