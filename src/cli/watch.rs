//! Follow a server's charts and keep a local store in sync.

use crate::cli;
use crate::client::ChartClient;
use crate::compose::{Multichart, Table};
use crate::poller::Poller;
use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tracing::info;

pub async fn run(
    server: Option<&str>,
    interval_ms: u64,
    subscribe: &[String],
    cycles: Option<u64>,
    table: bool,
) -> Result<()> {
    let endpoint = cli::resolve_server(server);
    let client = ChartClient::new(&endpoint);
    let mut poller = Poller::new(client, Duration::from_millis(interval_ms));

    let listing = poller
        .discover()
        .await
        .with_context(|| format!("listing charts on {endpoint}"))?;
    if !subscribe.is_empty() {
        for name in subscribe {
            if !listing.contains_key(name) {
                // Keep the subscription anyway; live servers grow charts.
                eprintln!("  Warning: server does not know chart '{name}' yet");
            }
            poller.subscribe(name);
        }
        poller.retain_subscriptions(subscribe);
    }
    eprintln!(
        "  Watching {} of {} charts on {endpoint} every {interval_ms}ms",
        poller.subscribed().len(),
        listing.len()
    );

    let shutdown = Arc::new(Notify::new());
    let signal = Arc::clone(&shutdown);
    tokio::spawn(async move {
        let _ = tokio::signal::ctrl_c().await;
        info!("received shutdown signal");
        signal.notify_one();
    });

    poller.run(shutdown, cycles).await?;
    let subscribed = poller.subscribed().to_vec();
    let store = poller.into_store();

    println!();
    for name in &subscribed {
        match store.get(name) {
            Some(series) if !series.is_empty() => println!(
                "  {name}: {} rows, watermark t={}",
                series.len(),
                series.watermark()
            ),
            _ => println!("  {name}: no rows"),
        }
    }

    if table {
        // Compose only charts the server actually served; a subscription
        // the server never knew has no store entry to join.
        let present: Vec<String> = subscribed
            .iter()
            .filter(|name| store.get(name).is_some())
            .cloned()
            .collect();
        if present.is_empty() {
            println!("  Nothing to compose.");
        } else {
            let multichart = Multichart::new("watch", present)?;
            let composed = multichart.composed_table(&store)?;
            println!();
            print_table(&composed);
        }
    }
    Ok(())
}

fn print_table(table: &Table) {
    println!("  {}", table.columns.join(" | "));
    for row in &table.rows {
        let mut cells = vec![row.time.to_string()];
        for value in &row.values {
            cells.push(match value {
                Some(v) => v.to_string(),
                None => "-".to_string(),
            });
        }
        println!("  {}", cells.join(" | "));
    }
}
