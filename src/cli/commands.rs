//! CLI command implementation: replay observations through the QC engine
//!
//! Wires the ingest stream, the registry snapshot, the partitioned pipeline,
//! and the JSONL sinks together, with progress reporting and Ctrl-C
//! cancellation.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::Arc;

use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::app::services::ingest::ObservationStream;
use crate::app::services::pipeline::{PipelineStats, QcPipeline};
use crate::app::services::registry::{InMemoryStore, RegistryClient};
use crate::cli::args::Args;
use crate::constants::PROGRESS_UPDATE_INTERVAL;
use crate::{Error, Result};

/// Run the QC engine over the configured input
pub async fn run(args: Args) -> Result<PipelineStats> {
    let config = args.to_config()?;

    let store = match &args.registry {
        Some(path) => InMemoryStore::load_snapshot(path)?,
        None => {
            warn!("no registry snapshot given; every check will be inapplicable");
            InMemoryStore::new()
        }
    };
    let registry = RegistryClient::new(Arc::new(store), config.registry.clone());

    let cancellation = CancellationToken::new();
    spawn_interrupt_watcher(cancellation.clone());

    let (pipeline, output) = QcPipeline::spawn(&config, registry.clone(), cancellation.clone());

    let outcome_writer = spawn_jsonl_writer(output.outcomes, args.outcomes.as_deref())?;
    let event_writer = spawn_jsonl_writer(output.events, args.events.as_deref())?;

    let mut stream = ObservationStream::from_path(&args.input)?;
    let progress = observation_progress();

    let mut submitted = 0usize;
    while let Some(observation) = stream.next_observation() {
        if cancellation.is_cancelled() {
            break;
        }
        if pipeline.submit(observation).await.is_err() {
            warn!("pipeline stopped accepting observations");
            break;
        }
        submitted += 1;
        if submitted % PROGRESS_UPDATE_INTERVAL == 0 {
            progress.set_message(format!("{submitted} observations"));
            progress.tick();
        }
    }

    let stats = pipeline.finish().await;
    registry.close().await;

    let outcome_count = join_writer(outcome_writer).await?;
    let event_count = join_writer(event_writer).await?;

    progress.finish_and_clear();
    print_summary(&stats, stream.stats().summary(), outcome_count, event_count);

    if cancellation.is_cancelled() {
        return Err(Error::processing_interrupted("cancelled by user"));
    }

    info!("{}", stats.summary());
    Ok(stats)
}

/// Cancel the pipeline on Ctrl-C
fn spawn_interrupt_watcher(cancellation: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, cancelling QC pipeline");
            cancellation.cancel();
        }
    });
}

/// Drain a channel into a JSONL sink (file, or stdout when no path is given)
fn spawn_jsonl_writer<T>(
    mut rx: mpsc::Receiver<T>,
    path: Option<&Path>,
) -> Result<JoinHandle<Result<usize>>>
where
    T: Serialize + Send + 'static,
{
    let mut sink: Box<dyn Write + Send> = match path {
        Some(path) => Box::new(BufWriter::new(File::create(path).map_err(|e| {
            Error::io(format!("cannot create output file '{}'", path.display()), e)
        })?)),
        None => Box::new(std::io::stdout()),
    };

    Ok(tokio::spawn(async move {
        let mut count = 0usize;
        while let Some(item) = rx.recv().await {
            let line = serde_json::to_string(&item)?;
            writeln!(sink, "{line}")
                .map_err(|e| Error::io("failed to write output line", e))?;
            count += 1;
        }
        sink.flush()
            .map_err(|e| Error::io("failed to flush output", e))?;
        Ok(count)
    }))
}

async fn join_writer(handle: JoinHandle<Result<usize>>) -> Result<usize> {
    handle
        .await
        .map_err(|e| Error::pipeline(format!("output writer failed: {e}")))?
}

fn observation_progress() -> ProgressBar {
    let progress = ProgressBar::new_spinner();
    progress.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {msg}")
            .unwrap(),
    );
    progress.set_message("Replaying observations");
    progress
}

fn print_summary(
    stats: &PipelineStats,
    ingest_summary: String,
    outcome_count: usize,
    event_count: usize,
) {
    println!("{}", "QC replay complete".bright_green().bold());
    println!("  {}", ingest_summary);
    println!(
        "  {} observations -> {} outcomes, {} events",
        stats.observations.to_string().bright_white(),
        outcome_count.to_string().bright_white(),
        event_count.to_string().bright_white()
    );
    if stats.unchecked > 0 {
        println!(
            "  {} {} observations had no applicable check",
            "note:".bright_yellow(),
            stats.unchecked
        );
    }
    if stats.late_window_drops + stats.late_delta_drops > 0 {
        println!(
            "  {} late arrivals dropped: {} window, {} delta",
            "note:".bright_yellow(),
            stats.late_window_drops,
            stats.late_delta_drops
        );
    }
}
