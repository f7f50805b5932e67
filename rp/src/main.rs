//! rp - reqpool command-line runner
//!
//! CLI entry point for running batches of HTTP requests through the scheduler.

use std::fs;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use clap::Parser;
use colored::Colorize;
use eyre::{Context, Result};
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{debug, info};

use reqpool::cli::{Cli, Command, OutputFormat, get_log_path};
use reqpool::config::Config;
use reqpool::manifest::Manifest;
use reqpool::{ErrorInfo, HttpTransport, Method, RequestSpec, Response, Scheduler};

fn setup_logging(cli_log_level: Option<&str>, config_log_level: Option<&str>) -> Result<()> {
    // Logging is not up yet; nothing below can be traced
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("reqpool")
        .join("logs");

    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    // Priority: CLI --log-level > config file > INFO
    let level = match cli_log_level.or(config_log_level) {
        Some(s) => match s.to_uppercase().as_str() {
            "TRACE" => tracing::Level::TRACE,
            "DEBUG" => tracing::Level::DEBUG,
            "INFO" => tracing::Level::INFO,
            "WARN" | "WARNING" => tracing::Level::WARN,
            "ERROR" => tracing::Level::ERROR,
            _ => {
                eprintln!("Warning: Unknown log-level '{}', defaulting to INFO", s);
                tracing::Level::INFO
            }
        },
        None => tracing::Level::INFO,
    };

    let log_file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_dir.join("reqpool.log"))
        .context("Failed to open log file")?;

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_ansi(false)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    info!("Logging initialized (level: {:?})", level);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Reading the log must not write to it
    if let Command::Logs { follow, lines } = cli.command {
        return cmd_logs(follow, lines).await;
    }

    // Load log level from config file early (before full config load)
    let config_log_level = Config::load_log_level(cli.config.as_ref());

    setup_logging(cli.log_level.as_deref(), config_log_level.as_deref()).context("Failed to setup logging")?;

    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;
    info!(
        max_concurrency = config.scheduler.max_concurrency,
        default_timeout_ms = config.scheduler.default_timeout_ms,
        "reqpool loaded config"
    );

    debug!(command = ?cli.command, "main: dispatching command");
    match cli.command {
        Command::Run {
            file,
            max_concurrency,
            format,
        } => cmd_run(&config, &file, max_concurrency, format).await,
        Command::Fetch {
            urls,
            method,
            data,
            headers,
            max_concurrency,
            format,
        } => {
            let batch = urls
                .into_iter()
                .map(|url| {
                    let mut spec = RequestSpec::new(method, url.clone());
                    spec.data = data.clone();
                    spec.headers = headers.iter().cloned().collect();
                    (url, spec)
                })
                .collect();
            run_batch(&config, batch, max_concurrency, format).await
        }
        Command::Logs { follow, lines } => cmd_logs(follow, lines).await,
    }
}

/// Run every request in a manifest
async fn cmd_run(config: &Config, file: &Path, max_concurrency: Option<usize>, format: OutputFormat) -> Result<()> {
    debug!(file = %file.display(), ?max_concurrency, %format, "cmd_run: called");
    let manifest = Manifest::load(file)?;

    let mut batch = Vec::with_capacity(manifest.requests.len());
    for entry in &manifest.requests {
        batch.push((entry.label().to_string(), entry.to_spec()?));
    }
    run_batch(config, batch, max_concurrency, format).await
}

/// One terminal outcome as printed by `run` and `fetch`
#[derive(Debug, Serialize)]
struct OutcomeLine {
    name: String,
    method: Method,
    url: String,
    ok: bool,
    status: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    bytes: Option<usize>,
    finished_at: DateTime<Utc>,
}

impl OutcomeLine {
    fn succeeded(name: String, method: Method, url: String, response: &Response) -> Self {
        Self {
            name,
            method,
            url,
            ok: true,
            status: i32::from(response.status),
            message: None,
            bytes: Some(response.body.len()),
            finished_at: Utc::now(),
        }
    }

    fn failed(name: String, method: Method, url: String, error: ErrorInfo) -> Self {
        Self {
            name,
            method,
            url,
            ok: false,
            status: error.status,
            message: error.message,
            bytes: None,
            finished_at: Utc::now(),
        }
    }

    fn print_text(&self) {
        let mark = if self.ok { "ok".green() } else { "FAIL".red() };
        let detail = match (&self.message, self.bytes) {
            (Some(message), _) => message.clone(),
            (None, Some(bytes)) => format!("{} bytes", bytes),
            (None, None) => String::new(),
        };
        println!(
            "{} {} {} {} {}",
            mark,
            self.status.to_string().bold(),
            self.name,
            format!("{} {}", self.method, self.url).dimmed(),
            detail
        );
    }
}

/// Submit a batch and print each outcome as it arrives
async fn run_batch(
    config: &Config,
    batch: Vec<(String, RequestSpec)>,
    max_concurrency: Option<usize>,
    format: OutputFormat,
) -> Result<()> {
    debug!(count = batch.len(), ?max_concurrency, "run_batch: called");
    let transport = HttpTransport::from_config(&config.http).context("Failed to build HTTP client")?;
    let scheduler = Scheduler::new(config.scheduler.clone(), Arc::new(transport));
    if let Some(n) = max_concurrency {
        scheduler.set_max_concurrency(n).await;
    }

    let total = batch.len();
    let (tx, mut rx) = mpsc::unbounded_channel::<OutcomeLine>();
    for (name, spec) in batch {
        let method = spec.method;
        let url = spec.url.clone();
        let ok_tx = tx.clone();
        let fail_tx = tx.clone();
        let (ok_name, ok_url) = (name.clone(), url.clone());
        let spec = spec
            .on_success(move |response| {
                let _ = ok_tx.send(OutcomeLine::succeeded(ok_name, method, ok_url, &response));
            })
            .on_fail(move |error| {
                let _ = fail_tx.send(OutcomeLine::failed(name, method, url, error));
            });
        let task_id = scheduler.submit(spec).await;
        debug!(%task_id, "run_batch: submitted");
    }
    // Channel closes once every task has dropped its callbacks
    drop(tx);

    let mut failed = 0usize;
    while let Some(line) = rx.recv().await {
        if !line.ok {
            failed += 1;
        }
        match format {
            OutputFormat::Json => println!("{}", serde_json::to_string(&line)?),
            OutputFormat::Text => line.print_text(),
        }
    }

    // Slots are released just after the callbacks run
    let mut state = scheduler.queue_state().await;
    while !state.is_idle() {
        tokio::time::sleep(Duration::from_millis(5)).await;
        state = scheduler.queue_state().await;
    }
    let stats = state.stats;
    info!(?stats, "run_batch: finished");
    if format == OutputFormat::Text {
        println!();
        println!(
            "{} of {} requests completed, {} succeeded, {} failed, peak concurrency {}",
            stats.total_completed(),
            total,
            stats.total_succeeded,
            stats.total_failed,
            stats.peak_in_flight
        );
    }

    if failed > 0 {
        return Err(eyre::eyre!("{} of {} requests failed", failed, total));
    }
    Ok(())
}

/// Show or follow the log file
async fn cmd_logs(follow: bool, lines: usize) -> Result<()> {
    debug!(follow, lines, "cmd_logs: called");
    let log_path = get_log_path();

    if !log_path.exists() {
        debug!(?log_path, "cmd_logs: log file does not exist");
        println!("No log file found at: {}", log_path.display());
        return Ok(());
    }

    if follow {
        debug!(?log_path, "cmd_logs: following log file");
        println!("Following log file: {} (Ctrl+C to stop)", log_path.display());
        println!();

        let mut child = std::process::Command::new("tail")
            .args(["-f", "-n", &lines.to_string()])
            .arg(&log_path)
            .spawn()
            .context("Failed to run tail -f")?;

        child.wait()?;
    } else {
        debug!(?log_path, lines, "cmd_logs: reading last N lines");
        let file = fs::File::open(&log_path).context("Failed to open log file")?;
        let reader = BufReader::new(file);
        let all_lines: Vec<String> = reader.lines().map_while(Result::ok).collect();

        let start = all_lines.len().saturating_sub(lines);
        for line in &all_lines[start..] {
            println!("{}", line);
        }
    }

    Ok(())
}
