//! Command-line argument parsing for cellcmd.

use cellcmd::value::Value;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Output format for command results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Plain text.
    #[default]
    Text,
    /// One JSON document.
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            _ => Err(format!(
                "Invalid output format: {s}. Expected: text or json"
            )),
        }
    }
}

/// Classify, bind and run script commands.
#[derive(Parser, Debug)]
#[command(name = "cellcmd")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Config file path
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Write logs to the state directory instead of stderr
    #[arg(long, global = true)]
    pub log_file: bool,

    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Subcommand, Debug, PartialEq)]
pub enum CliCommand {
    /// Show how a command would be routed
    Classify {
        /// Command text
        text: String,

        /// Treat the text as already unescaped
        #[arg(long)]
        no_escape: bool,

        /// Output format (text or json)
        #[arg(long, value_name = "FORMAT", default_value = "text")]
        format: OutputFormat,
    },

    /// Bind positional arguments into a `$(name)` script command
    Bind {
        /// Statement text
        sql: String,

        /// Arguments
        args: Vec<String>,
    },

    /// Execute a command
    Run {
        /// Command text
        text: String,

        /// Positional arguments (?1, ?2, ...)
        args: Vec<String>,

        /// Active data source
        #[arg(short = 'd', long, value_name = "NAME")]
        data_source: Option<String>,

        /// Treat the text as already unescaped
        #[arg(long)]
        no_escape: bool,

        /// Output format (text or json)
        #[arg(long, value_name = "FORMAT", default_value = "text")]
        format: OutputFormat,
    },

    /// Print the command text for a grid program file (`-` for stdin)
    Serialize {
        /// Grid text file
        file: PathBuf,
    },

    /// Run a host-document call: script pieces followed by arguments
    Call {
        /// Parameters
        #[arg(required = true)]
        params: Vec<String>,
    },
}

impl Cli {
    /// Parses command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Returns the config file path, using the default if not specified.
    pub fn config_path(&self) -> PathBuf {
        self.config
            .clone()
            .unwrap_or_else(cellcmd::config::Config::default_path)
    }
}

/// Parses literal command-line arguments into values.
pub fn parse_values(args: &[String]) -> Vec<Value> {
    args.iter().map(|arg| Value::parse_literal(arg)).collect()
}
