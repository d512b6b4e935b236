//! Command line front end for the harvester.
//!
//! Harvests one or more URLs into validated JSON bundles on disk:
//!
//! ```bash
//! harvest https://www.example.com/council/meetings
//! harvest --input urls.txt --output ./bundles --batch-size 3
//! ```
//!
//! Each bundle lands in the output directory under a deterministic,
//! Windows-safe filename. A `run_manifest.json` summarizing the run is
//! written alongside the bundles.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Context;
use chrono::Utc;
use clap::Parser;
use log::LevelFilter;

use harvest_core::HarvestOptions;
use harvest_engine::{
    ensure_output_dir, AtomicFileWriter, HarvestEvent, Harvester, LogSink, ProgressSink,
};
use harvest_logging::{harvest_info, harvest_warn, LogDestination};

/// Harvest web pages into verbatim content bundles.
#[derive(Parser)]
#[command(
    name = "harvest",
    about = "Harvest web pages into verbatim, validated content bundles",
    version
)]
struct Cli {
    /// URLs to harvest.
    #[arg(value_name = "URL", required_unless_present = "input")]
    urls: Vec<String>,

    /// Read additional URLs from a file, one per line.
    ///
    /// Blank lines and lines starting with `#` are skipped.
    #[arg(long)]
    input: Option<PathBuf>,

    /// Directory for bundle files and the run manifest.
    #[arg(long, default_value = "harvest_out")]
    output: PathBuf,

    /// URLs harvested concurrently within one chunk.
    #[arg(long)]
    batch_size: Option<usize>,

    /// Pause between chunks, in milliseconds.
    #[arg(long)]
    delay_ms: Option<u64>,

    /// Per-request timeout, in seconds.
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// Retries after a failed fetch attempt, for transient failures only.
    #[arg(long)]
    max_retries: Option<u32>,

    /// Ignore cached results and re-fetch every URL.
    #[arg(long)]
    force_refresh: bool,

    /// Skip linked document discovery and download.
    #[arg(long)]
    no_documents: bool,

    /// Skip table extraction.
    #[arg(long)]
    no_tables: bool,

    /// User agent header sent with every request.
    #[arg(long)]
    user_agent: Option<String>,

    /// Accept-Language header sent with every request.
    #[arg(long)]
    accept_language: Option<String>,

    /// Log at debug level instead of info.
    #[arg(long, short)]
    verbose: bool,
}

/// Logs events like the default sink and records failures for the
/// run manifest.
#[derive(Default)]
struct RecordingSink {
    failures: Mutex<Vec<(String, String)>>,
}

impl RecordingSink {
    fn take_failures(&self) -> Vec<(String, String)> {
        self.failures
            .lock()
            .map(|mut failures| std::mem::take(&mut *failures))
            .unwrap_or_default()
    }
}

impl ProgressSink for RecordingSink {
    fn emit(&self, event: HarvestEvent) {
        if let HarvestEvent::UrlFailed { url, error } = &event {
            if let Ok(mut failures) = self.failures.lock() {
                failures.push((url.clone(), error.clone()));
            }
        }
        LogSink.emit(event);
    }
}

fn build_options(cli: &Cli) -> HarvestOptions {
    let mut options = HarvestOptions::default();
    if let Some(batch_size) = cli.batch_size {
        options.batch_size = batch_size;
    }
    if let Some(delay_ms) = cli.delay_ms {
        options.delay = Duration::from_millis(delay_ms);
    }
    if let Some(timeout_secs) = cli.timeout_secs {
        options.timeout = Duration::from_secs(timeout_secs);
    }
    if let Some(max_retries) = cli.max_retries {
        options.max_retries = max_retries;
    }
    if let Some(user_agent) = &cli.user_agent {
        options.user_agent = user_agent.clone();
    }
    if let Some(accept_language) = &cli.accept_language {
        options.accept_language = accept_language.clone();
    }
    options.force_refresh = cli.force_refresh;
    options.extract_documents = !cli.no_documents;
    options.extract_tables = !cli.no_tables;
    options
}

fn read_url_list(path: &Path) -> anyhow::Result<Vec<String>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("reading URL list {}", path.display()))?;
    Ok(content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let level = if cli.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    harvest_logging::initialize(LogDestination::Terminal, level);

    let mut urls = cli.urls.clone();
    if let Some(path) = &cli.input {
        urls.extend(read_url_list(path)?);
    }
    if urls.is_empty() {
        anyhow::bail!("no URLs to harvest");
    }

    // Fail before any network work if the output directory is unusable.
    ensure_output_dir(&cli.output)
        .with_context(|| format!("preparing output directory {}", cli.output.display()))?;

    let started_at = Utc::now();
    let sink = Arc::new(RecordingSink::default());
    let harvester = Harvester::new(build_options(&cli)).with_sink(sink.clone());

    let cancel = harvester.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            harvest_warn!("Interrupt received, stopping after the current chunk");
            cancel.cancel();
        }
    });

    harvest_info!("Harvesting {} URLs into {}", urls.len(), cli.output.display());
    let results = harvester.harvest_many(&urls).await;

    let writer = AtomicFileWriter::new(cli.output.clone());
    let mut written = Vec::with_capacity(results.len());
    for harvested in &results {
        match writer.write_bundle(&harvested.bundle) {
            Ok(path) => {
                harvest_info!("Wrote {}", path.display());
                written.push(serde_json::json!({
                    "url": harvested.bundle.source.url(),
                    "file": path.file_name().and_then(|name| name.to_str()),
                    "score": harvested.validation.score,
                    "valid": harvested.validation.is_valid,
                    "blocks": harvested.bundle.blocks.len(),
                    "documents": harvested.bundle.documents.len(),
                    "from_cache": harvested.from_cache,
                }));
            }
            Err(err) => {
                harvest_warn!(
                    "Could not write bundle for {}: {err}",
                    harvested.bundle.metadata.normalized_url
                );
            }
        }
    }

    let failures = sink.take_failures();
    let manifest = serde_json::json!({
        "session_id": harvester.session_id(),
        "run_id": harvest_logging::current_run_id(),
        "started_at": started_at.to_rfc3339(),
        "finished_at": Utc::now().to_rfc3339(),
        "urls": urls.len(),
        "harvested": results.len(),
        "failed": failures.len(),
        "bundles": written,
        "failures": failures
            .iter()
            .map(|(url, error)| serde_json::json!({ "url": url, "error": error }))
            .collect::<Vec<_>>(),
    });
    writer.write("run_manifest.json", &serde_json::to_string_pretty(&manifest)?)?;

    harvest_info!(
        "Harvested {} of {} URLs, {} failed",
        results.len(),
        urls.len(),
        failures.len()
    );
    if results.is_empty() {
        anyhow::bail!("all {} URLs failed", urls.len());
    }
    Ok(())
}
