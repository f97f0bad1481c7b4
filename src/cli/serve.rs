//! Run the chart server.

use crate::server::ChartServer;
use crate::source::{CsvConfig, GeneratorConfig, GeneratorKind, LiveConfig, SourceConfig};
use anyhow::{Context, Result};
use clap::ValueEnum;
use std::path::Path;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SourceArg {
    /// Seeded mock generator
    Random,
    /// Replay a pipe-delimited file
    Csv,
    /// Accept uploads on /live
    Live,
    /// Boot unconfigured and wait for /admin
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum KindArg {
    OrnsteinUhlenbeck,
    Linear,
}

pub async fn run(
    port: u16,
    source: SourceArg,
    kind: KindArg,
    charts: u32,
    tick_ms: u64,
    csv: Option<&Path>,
    time_column: Option<&str>,
) -> Result<()> {
    let config = match source {
        SourceArg::Random => Some(SourceConfig::Random(GeneratorConfig {
            data_type: match kind {
                KindArg::OrnsteinUhlenbeck => GeneratorKind::OrnsteinUhlenbeck,
                KindArg::Linear => GeneratorKind::Linear,
            },
            number_of_charts_to_generate: charts,
            update_interval_milliseconds: tick_ms,
            ..GeneratorConfig::default()
        })),
        SourceArg::Csv => {
            let path = csv.context("--csv is required for the csv source")?;
            let time_column =
                time_column.context("--time-column is required for the csv source")?;
            Some(SourceConfig::Csv(CsvConfig {
                file_name: path.display().to_string(),
                name_of_time_column: time_column.to_string(),
            }))
        }
        SourceArg::Live => Some(SourceConfig::Live(LiveConfig::default())),
        SourceArg::None => None,
    };

    let server = match &config {
        Some(config) => ChartServer::with_config(port, config).context("building data source")?,
        None => ChartServer::new(port),
    };

    eprintln!(
        "  chartstream v{} on http://127.0.0.1:{port}",
        env!("CARGO_PKG_VERSION")
    );
    match &config {
        Some(config) => eprintln!("  Source: {}", config.mode()),
        None => eprintln!("  Source: none (configure via /admin)"),
    }

    let shutdown = server.shutdown_handle();
    tokio::spawn(async move {
        let _ = tokio::signal::ctrl_c().await;
        info!("received shutdown signal");
        shutdown.notify_one();
    });

    server.serve().await
}
