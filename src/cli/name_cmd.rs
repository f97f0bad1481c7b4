//! One-shot stream name lookup.

use crate::cli;
use crate::client::ChartClient;
use anyhow::Result;

pub async fn run(server: Option<&str>) -> Result<()> {
    let endpoint = cli::resolve_server(server);
    let client = ChartClient::new(&endpoint);
    println!("  {}", client.stream_name().await);
    Ok(())
}
