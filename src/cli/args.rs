//! Command-line argument definitions for the sensor QC engine
//!
//! This module defines the complete CLI interface using the clap derive API.

use crate::config::{PipelineConfig, QcConfig};
use crate::Result;
use clap::Parser;
use std::path::PathBuf;

/// CLI arguments for the streaming sensor QC engine
///
/// Replays CSV observation files through the QC evaluation engine against a
/// harvested registry snapshot and writes structured outcomes and events as
/// JSON lines.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "sensorqc",
    version,
    about = "Streaming quality control for environmental sensor observations",
    long_about = "Replays CSV sensor observations through a family of statistical and \
                  metadata-driven QC checks: range, step and spike deltas, windowed \
                  variance (sigma), null aggregates and runs, and feature-level metadata \
                  checks. Thresholds are resolved from a registry snapshot keyed by the \
                  (feature, procedure, observableproperty) triple."
)]
pub struct Args {
    /// Input path: a CSV observation file or a directory of them
    ///
    /// Wire form per row:
    /// feature,procedure,observableproperty,epochMillis,value[,...]
    /// with the literal token NotAValue marking a null observation.
    #[arg(
        short = 'i',
        long = "input",
        value_name = "PATH",
        help = "CSV observation file or directory to replay"
    )]
    pub input: PathBuf,

    /// Registry snapshot to resolve thresholds from
    ///
    /// A JSON object mapping colon-delimited registry keys to scalar string
    /// values, as produced by the harvesting procedures. Without a snapshot
    /// every check is inapplicable and observations pass through unchecked.
    #[arg(
        short = 'r',
        long = "registry",
        value_name = "PATH",
        help = "JSON registry snapshot (key -> value)"
    )]
    pub registry: Option<PathBuf>,

    /// Output file for QC outcomes as JSON lines; stdout if omitted
    #[arg(
        short = 'o',
        long = "outcomes",
        value_name = "PATH",
        help = "Write QC outcomes to this file as JSON lines"
    )]
    pub outcomes: Option<PathBuf>,

    /// Output file for QC events as JSON lines; stdout if omitted
    #[arg(
        short = 'e',
        long = "events",
        value_name = "PATH",
        help = "Write QC events to this file as JSON lines"
    )]
    pub events: Option<PathBuf>,

    /// Number of PUID-hash partitions
    ///
    /// Defaults to the number of available CPU cores. Observations of one
    /// sensor always land on the same partition, preserving event-time
    /// order per sensor.
    #[arg(
        short = 'w',
        long = "workers",
        value_name = "N",
        help = "Number of partition workers (default: CPU cores)"
    )]
    pub workers: Option<usize>,

    /// Enable verbose (debug-level) logging
    #[arg(short = 'v', long = "verbose", help = "Enable verbose logging")]
    pub verbose: bool,
}

impl Args {
    /// Build the engine configuration implied by the arguments
    pub fn to_config(&self) -> Result<QcConfig> {
        let mut pipeline = PipelineConfig::default();
        if let Some(workers) = self.workers {
            pipeline.partitions = workers;
        }

        let config = QcConfig {
            pipeline,
            ..Default::default()
        };
        config.validate()?;
        Ok(config)
    }
}
