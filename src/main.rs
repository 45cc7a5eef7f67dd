//! warc-harvest main entry point
//!
//! Command-line driver: crawls one host with the fetch agent and leaves a
//! filtered `.warc.gz` archive behind.

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;
use warc_harvest::config::{load_settings_with_hash, CrawlRequest, Settings};
use warc_harvest::crawler::{CrawlReport, Pipeline};

/// warc-harvest: crawl a host into a corpus-ready web archive
///
/// Runs the fetch agent (wget) in mirror mode against one host, then
/// repairs and filters the raw archive it writes into a gzip-compressed
/// WARC. Unreachable hosts still get an (empty) archive.
#[derive(Parser, Debug)]
#[command(name = "warc-harvest")]
#[command(version)]
#[command(about = "Crawl a host into a corpus-ready web archive", long_about = None)]
struct Cli {
    /// Domain to crawl
    #[arg(long)]
    url: String,

    /// Directory to write the mirror to
    #[arg(long = "output-path", value_name = "DIR")]
    output_path: PathBuf,

    /// Archive to write; must end in .warc.gz
    #[arg(long = "warc", value_name = "FILE")]
    warc: PathBuf,

    /// Maximum time to crawl, e.g. 30m or 2h
    #[arg(short = 't', value_name = "LIMIT")]
    time_limit: Option<String>,

    /// User agent to be included in the crawler requests
    #[arg(short = 'a', value_name = "AGENT")]
    agent: Option<String>,

    /// File types to be downloaded, comma separated, e.g. "html,pdf"
    #[arg(short = 'f', value_name = "TYPES")]
    filetypes: Option<String>,

    /// Wait N seconds between queries
    #[arg(long, value_name = "SECONDS")]
    wait: Option<u64>,

    /// Optional TOML settings file (fetch agent, network timeouts)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    match run(cli).await {
        Ok(report) => {
            tracing::debug!("Finished in state {}", report.final_state);
            println!("Finished!");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
///
/// Diagnostics go to stderr so stdout stays reserved for progress lines.
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("warc_harvest=info,warn"),
            1 => EnvFilter::new("warc_harvest=debug,info"),
            2 => EnvFilter::new("warc_harvest=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

async fn run(cli: Cli) -> anyhow::Result<CrawlReport> {
    let settings = match &cli.config {
        Some(path) => {
            tracing::info!("Loading settings from: {}", path.display());
            let (settings, hash) = load_settings_with_hash(path)
                .with_context(|| format!("failed to load settings from {}", path.display()))?;
            tracing::info!("Settings loaded successfully (hash: {})", hash);
            settings
        }
        None => Settings::default(),
    };

    let request = build_request(&cli)?;

    println!("Starting...");

    let pipeline = Pipeline::new(settings).context("failed to initialize pipeline")?;
    let report = pipeline
        .run(&request)
        .await
        .with_context(|| format!("crawl of {} aborted", request.origin()))?;

    if let Some(stats) = &report.rewrite {
        tracing::info!(
            "{}: {} records archived to {}",
            report.origin,
            stats.records_written,
            request.final_archive_path().display()
        );
    }

    Ok(report)
}

fn build_request(cli: &Cli) -> anyhow::Result<CrawlRequest> {
    let mut builder = CrawlRequest::builder(&cli.url, &cli.output_path, &cli.warc);

    if let Some(limit) = &cli.time_limit {
        builder = builder.time_limit(limit);
    }
    if let Some(agent) = &cli.agent {
        builder = builder.user_agent(agent);
    }
    if let Some(types) = &cli.filetypes {
        builder = builder.file_types(types);
    }
    if let Some(wait) = cli.wait {
        builder = builder.wait_seconds(wait);
    }

    builder.build().context("invalid crawl request")
}
