//! LedgerLink API server binary

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use ledgerlink_core::LedgerLinkContext;
use tracing_subscriber::EnvFilter;

use ledgerlink_api::server::run_server;
use ledgerlink_api::state::ApiConfig;

/// LedgerLink - provider integrations for business financial analytics
#[derive(Parser)]
#[command(name = "ledgerlink", version, about, long_about = None)]
struct Cli {
    /// Address to bind
    #[arg(long, default_value = "0.0.0.0", env = "LEDGERLINK_HOST")]
    host: String,

    /// Port to listen on
    #[arg(long, default_value_t = 3007, env = "PORT")]
    port: u16,

    /// Data directory (settings.json and the store database)
    #[arg(long, env = "LEDGERLINK_DIR")]
    data_dir: Option<PathBuf>,

    /// Disable permissive CORS
    #[arg(long)]
    no_cors: bool,
}

/// Data directory from the CLI flag or the default under the home directory
fn resolve_data_dir(flag: Option<PathBuf>) -> Result<PathBuf> {
    if let Some(dir) = flag {
        return Ok(dir);
    }
    dirs::home_dir()
        .map(|home| home.join(".ledgerlink"))
        .context("Could not determine home directory; pass --data-dir")
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let data_dir = resolve_data_dir(cli.data_dir)?;
    std::fs::create_dir_all(&data_dir)
        .with_context(|| format!("Failed to create data directory {:?}", data_dir))?;

    // Startup failures are fatal: a missing provider key pair or an
    // un-openable store means the server refuses to boot, no retry loop
    let ctx = match LedgerLinkContext::new(&data_dir) {
        Ok(ctx) => Arc::new(ctx),
        Err(e) => {
            tracing::error!("Startup failed: {}", e);
            std::process::exit(1);
        }
    };

    let config = ApiConfig {
        host: cli.host,
        port: cli.port,
        enable_cors: !cli.no_cors,
        data_dir,
    };

    run_server(&config, ctx)
        .await
        .map_err(|e| anyhow::anyhow!("Server error: {}", e))
}
