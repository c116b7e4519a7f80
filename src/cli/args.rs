// ABOUTME: Command line argument definitions and parsing using Clap
// ABOUTME: Defines the main CLI structure and the apply and config subcommands

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::parser::DEFAULT_MANIFEST_NAME;

#[derive(Parser, Debug)]
#[command(name = "xscaffold")]
#[command(about = "Scaffold a directory of files from a template package")]
pub struct Args {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(long, global = true, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, global = true, help = "Disable colored output")]
    pub no_color: bool,

    #[arg(short, long, global = true, help = "Log level (error, warn, info, debug, trace)")]
    pub log_level: Option<String>,

    #[arg(short, long, global = true, help = "Base URL packages are cloned from")]
    pub url: Option<String>,

    #[arg(short, long, global = true, help = "Directory packages are cached in")]
    pub temp: Option<PathBuf>,

    #[arg(short, long, global = true, help = "Path to configuration file")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Apply a scaffold package to the current directory
    Apply {
        #[arg(help = "Local path or <owner>/<repo> of the package")]
        package: String,

        #[arg(short, long, help = "Package version to check out (default: main)")]
        version: Option<String>,

        #[arg(
            short,
            long,
            default_value = DEFAULT_MANIFEST_NAME,
            help = "Name of the scaffold file (<name>.yaml)"
        )]
        name: String,

        #[arg(short = 's', long = "set", help = "Preset context values (key=value)")]
        set: Vec<String>,
    },

    /// Save or view the persisted configuration
    Config {
        #[arg(value_enum, default_value_t = ConfigAction::View)]
        action: ConfigAction,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ConfigAction {
    Save,
    View,
}

impl Args {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Parse variables from key=value format, keeping their order
    pub fn parse_variables(vars: &[String]) -> anyhow::Result<Vec<(String, String)>> {
        vars.iter()
            .map(|var| match var.split_once('=') {
                Some((key, value)) if !key.trim().is_empty() => {
                    Ok((key.trim().to_string(), value.to_string()))
                }
                _ => Err(anyhow::anyhow!(
                    "Invalid variable format '{}'. Expected 'key=value'",
                    var
                )),
            })
            .collect()
    }
}
