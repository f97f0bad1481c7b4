//! One-shot chart listing against a server.

use crate::cli;
use crate::client::ChartClient;
use anyhow::{Context, Result};

pub async fn run(server: Option<&str>) -> Result<()> {
    let endpoint = cli::resolve_server(server);
    let client = ChartClient::new(&endpoint);
    let listing = client
        .refresh_charts()
        .await
        .with_context(|| format!("listing charts on {endpoint}"))?;

    if listing.is_empty() {
        println!("  No charts on {endpoint}");
        return Ok(());
    }
    println!("  {} charts on {endpoint}:", listing.len());
    for info in listing.values() {
        println!("  {:<32} {:>8} rows  [{}]", info.id, info.size, info.kind);
    }
    Ok(())
}
