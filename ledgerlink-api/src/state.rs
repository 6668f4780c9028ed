//! Application state for the API server

use std::path::PathBuf;
use std::sync::Arc;

use ledgerlink_core::LedgerLinkContext;

/// API server state
#[derive(Clone)]
pub struct AppState {
    /// Core context (store handle, adapters, services)
    pub ctx: Arc<LedgerLinkContext>,
    /// API version
    pub version: String,
}

impl AppState {
    pub fn new(ctx: Arc<LedgerLinkContext>) -> Self {
        Self {
            ctx,
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// API server configuration
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,
    pub enable_cors: bool,
    pub data_dir: PathBuf,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3007,
            enable_cors: true,
            data_dir: PathBuf::from("."),
        }
    }
}
