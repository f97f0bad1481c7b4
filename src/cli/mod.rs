//! CLI subcommand implementations for the chartstream binary.

pub mod list_cmd;
pub mod name_cmd;
pub mod serve;
pub mod upload_cmd;
pub mod watch;

use tracing_subscriber::EnvFilter;

pub const DEFAULT_SERVER: &str = "http://127.0.0.1:8417";
pub const SERVER_ENV: &str = "CHARTSTREAM_SERVER";

/// Server URL from the flag if given, else the environment, else the
/// default.
pub fn resolve_server(flag: Option<&str>) -> String {
    if let Some(server) = flag {
        return server.to_string();
    }
    std::env::var(SERVER_ENV).unwrap_or_else(|_| DEFAULT_SERVER.to_string())
}

/// Initialize tracing. `--verbose` raises the crate's level to debug;
/// `RUST_LOG` still wins for anything it names.
pub fn init_tracing(verbose: bool) {
    let directive = if verbose {
        "chartstream=debug"
    } else {
        "chartstream=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(directive.parse().unwrap()))
        .init();
}
