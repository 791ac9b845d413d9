//! GMod Scan CLI

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use gmscan_core::ingest::parse_scan_payload;
use gmscan_core::report::{self, ReportFormat};
use gmscan_core::scanner::{self, PublicEndpoint};
use gmscan_core::{aggregate, ReportStore, ScanPayload};
use std::path::{Path, PathBuf};
use tracing::{debug, info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(name = "gmscan")]
#[command(about = "Offline tooling for GMod server scan payloads")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Check a scan payload file without storing it
    Validate {
        /// Path to payload JSON
        file: PathBuf,
    },

    /// Build a report from a payload file and render it
    Summarize {
        /// Path to payload JSON
        file: PathBuf,

        /// Output format (text, markdown, json)
        #[arg(short, long, default_value = "text")]
        format: String,

        /// Output file (defaults to stdout)
        #[arg(short = 'O', long)]
        output_file: Option<PathBuf>,
    },

    /// Print a console command that runs the scanner against a server
    Command {
        /// Public host[:port] of the report service
        #[arg(long)]
        base_url: String,

        /// URL scheme (http or https)
        #[arg(long, default_value = "https")]
        scheme: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")?;

    match cli.command {
        Commands::Validate { file } => cmd_validate(&file),
        Commands::Summarize {
            file,
            format,
            output_file,
        } => cmd_summarize(&file, &format, output_file.as_deref()),
        Commands::Command { base_url, scheme } => cmd_command(&base_url, &scheme),
    }
}

fn load_payload(file: &Path) -> Result<ScanPayload> {
    let raw = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let value: serde_json::Value = serde_json::from_str(&raw)
        .with_context(|| format!("{} is not valid JSON", file.display()))?;
    debug!("Loaded {} bytes from {}", raw.len(), file.display());

    parse_scan_payload(&value)
        .with_context(|| format!("Invalid scan data in {}", file.display()))
}

fn cmd_validate(file: &Path) -> Result<()> {
    let payload = load_payload(file)?;
    println!(
        "OK: {} issues, {} exploits, {} files, {} addons",
        payload.issues.len(),
        payload.exploits.len(),
        payload.files.len(),
        payload.addons.len()
    );
    Ok(())
}

fn cmd_summarize(file: &Path, format: &str, output_file: Option<&Path>) -> Result<()> {
    let format: ReportFormat = match format.parse() {
        Ok(format) => format,
        Err(err) => bail!(err),
    };
    let payload = load_payload(file)?;

    let store = ReportStore::new();
    let report = aggregate(&store, payload)?;
    info!(
        "Report {}: {} critical, {} performance",
        report.report_id, report.summary.critical, report.summary.performance
    );

    let rendered = report::generate_report(&report, format)?;
    match output_file {
        Some(path) => {
            std::fs::write(path, rendered)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            info!("Report written to: {}", path.display());
        }
        None => println!("{}", rendered),
    }
    Ok(())
}

fn cmd_command(base_url: &str, scheme: &str) -> Result<()> {
    let endpoint = PublicEndpoint::new(scheme, base_url)?;
    let scan_id = scanner::new_scan_id();
    let command = scanner::console_command(&endpoint, &scan_id)?;
    info!("Scan id: {}", scan_id);
    println!("{}", command);
    Ok(())
}
