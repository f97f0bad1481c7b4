// Copyright 2026 Chartstream Contributors
// SPDX-License-Identifier: Apache-2.0

use anyhow::Result;
use chartstream::cli::{
    self,
    serve::{KindArg, SourceArg},
};
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "chartstream",
    about = "Chartstream — incremental time-series streaming over HTTP",
    version,
    after_help = "Run 'chartstream <command> --help' for details on each command."
)]
struct Cli {
    /// Enable verbose/debug logging
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the chart server
    Serve {
        /// Port to listen on
        #[arg(long, default_value = "8417")]
        port: u16,
        /// Data source to serve
        #[arg(long, value_enum, default_value = "random")]
        source: SourceArg,
        /// Generator flavor (random source)
        #[arg(long, value_enum, default_value = "ornstein-uhlenbeck")]
        kind: KindArg,
        /// Number of generated charts (random source)
        #[arg(long, default_value = "5")]
        charts: u32,
        /// Generator tick in milliseconds (random source)
        #[arg(long, default_value = "1000")]
        tick_ms: u64,
        /// Pipe-delimited file to serve (csv source)
        #[arg(long)]
        csv: Option<PathBuf>,
        /// Name of the shared time column (csv source)
        #[arg(long)]
        time_column: Option<String>,
    },
    /// Follow a server's charts and keep a local store in sync
    Watch {
        /// Server URL (default from CHARTSTREAM_SERVER)
        #[arg(long)]
        server: Option<String>,
        /// Fetch interval in milliseconds
        #[arg(long, default_value = "1000")]
        interval_ms: u64,
        /// Chart to subscribe to (repeatable; default all)
        #[arg(long = "subscribe")]
        subscribe: Vec<String>,
        /// Stop after this many fetch cycles
        #[arg(long)]
        cycles: Option<u64>,
        /// Print the joined table of subscribed charts on shutdown
        #[arg(long)]
        table: bool,
    },
    /// List the charts a server knows
    List {
        /// Server URL (default from CHARTSTREAM_SERVER)
        #[arg(long)]
        server: Option<String>,
    },
    /// Print the server's stream name
    Name {
        /// Server URL (default from CHARTSTREAM_SERVER)
        #[arg(long)]
        server: Option<String>,
    },
    /// Push a pipe-delimited file into a live server
    Upload {
        /// Server URL (default from CHARTSTREAM_SERVER)
        #[arg(long)]
        server: Option<String>,
        /// Pipe-delimited file to push
        #[arg(long)]
        csv: PathBuf,
        /// Name of the shared time column
        #[arg(long)]
        time_column: String,
    },
    /// Generate shell completion scripts
    Completions {
        /// Shell type (bash, zsh, fish, powershell)
        shell: Shell,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    cli::init_tracing(cli.verbose);

    let result = match cli.command {
        Commands::Serve {
            port,
            source,
            kind,
            charts,
            tick_ms,
            csv,
            time_column,
        } => {
            cli::serve::run(
                port,
                source,
                kind,
                charts,
                tick_ms,
                csv.as_deref(),
                time_column.as_deref(),
            )
            .await
        }
        Commands::Watch {
            server,
            interval_ms,
            subscribe,
            cycles,
            table,
        } => cli::watch::run(server.as_deref(), interval_ms, &subscribe, cycles, table).await,
        Commands::List { server } => cli::list_cmd::run(server.as_deref()).await,
        Commands::Name { server } => cli::name_cmd::run(server.as_deref()).await,
        Commands::Upload {
            server,
            csv,
            time_column,
        } => cli::upload_cmd::run(server.as_deref(), &csv, &time_column).await,
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "chartstream", &mut std::io::stdout());
            Ok(())
        }
    };

    // Consistent exit codes: 0=success, 1=error
    if let Err(e) = &result {
        eprintln!("  Error: {e:#}");
        std::process::exit(1);
    }

    result
}
