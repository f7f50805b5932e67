//! CLI command definitions and subcommands

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::debug;

use crate::domain::Method;

/// reqpool - bounded-concurrency HTTP request runner
#[derive(Parser)]
#[command(
    name = "rp",
    about = "Run HTTP requests through a bounded-concurrency scheduler",
    version = env!("CARGO_PKG_VERSION"),
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to config file")]
    pub config: Option<PathBuf>,

    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[arg(
        short = 'l',
        long = "log-level",
        global = true,
        help = "Log level (TRACE, DEBUG, INFO, WARN, ERROR)"
    )]
    pub log_level: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run every request in a YAML manifest
    Run {
        /// Manifest file
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Override the configured concurrency ceiling
        #[arg(short, long)]
        max_concurrency: Option<usize>,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Fetch one or more URLs with a shared method, payload and headers
    Fetch {
        /// URLs to request
        #[arg(value_name = "URL", required = true)]
        urls: Vec<String>,

        /// HTTP method
        #[arg(short = 'X', long, default_value = "GET")]
        method: Method,

        /// Payload: JSON, or a raw string appended to the URL for GET/DELETE
        #[arg(short, long, value_parser = parse_payload)]
        data: Option<serde_json::Value>,

        /// Extra header, as 'Name: value' (repeatable)
        #[arg(short = 'H', long = "header", value_parser = parse_header)]
        headers: Vec<(String, String)>,

        /// Override the configured concurrency ceiling
        #[arg(short, long)]
        max_concurrency: Option<usize>,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Show reqpool logs
    Logs {
        /// Follow log output (like tail -f)
        #[arg(short = 'F', long)]
        follow: bool,

        /// Number of lines to show
        #[arg(short = 'n', long, default_value = "50")]
        lines: usize,
    },
}

/// Parse a `-d` value; anything that is not JSON is kept as a string
fn parse_payload(s: &str) -> Result<serde_json::Value, String> {
    Ok(serde_json::from_str(s).unwrap_or_else(|_| serde_json::Value::String(s.to_string())))
}

/// Parse a `Name: value` header argument
fn parse_header(s: &str) -> Result<(String, String), String> {
    let (name, value) = s
        .split_once(':')
        .ok_or_else(|| format!("invalid header '{}': expected 'Name: value'", s))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("invalid header '{}': empty name", s));
    }
    Ok((name.to_string(), value.trim().to_string()))
}

/// Get the log file path
pub fn get_log_path() -> PathBuf {
    debug!("get_log_path: called");
    let path = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("reqpool")
        .join("logs")
        .join("reqpool.log");
    debug!(?path, "get_log_path: returning path");
    path
}

/// Output format for run/fetch results
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        debug!(%s, "OutputFormat::from_str: called");
        match s.to_lowercase().as_str() {
            "text" | "plain" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            _ => {
                debug!(%s, "OutputFormat::from_str: unknown format");
                Err(format!("Unknown format: {}. Use: text or json", s))
            }
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text => write!(f, "text"),
            Self::Json => write!(f, "json"),
        }
    }
}
