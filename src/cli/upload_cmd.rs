//! Push a pipe-delimited file into a live server.

use crate::cli;
use crate::source::csv;
use crate::upload::UploadClient;
use crate::wire::UploadRequest;
use anyhow::{Context, Result};
use std::path::Path;

pub async fn run(server: Option<&str>, path: &Path, time_column: &str) -> Result<()> {
    let endpoint = cli::resolve_server(server);
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    let charts = csv::parse_table(&text, time_column)?;

    let client = UploadClient::new(&endpoint);
    for name in charts.keys() {
        client
            .create_chart(name)
            .await
            .with_context(|| format!("creating chart '{name}' (does it already exist?)"))?;
    }

    let uploads: Vec<UploadRequest> = charts
        .iter()
        .map(|(name, series)| UploadRequest {
            chart_name: name.clone(),
            packet: series.rows().to_vec(),
        })
        .collect();
    let rows: usize = uploads.iter().map(|u| u.packet.len()).sum();
    client.upload_batch(&uploads).await?;

    println!(
        "  Pushed {} charts ({rows} rows) to {endpoint}",
        uploads.len()
    );
    Ok(())
}
