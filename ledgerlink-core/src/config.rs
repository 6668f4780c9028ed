//! Configuration management
//!
//! Settings live in `settings.json` inside the data directory:
//! ```json
//! {
//!   "stripe": { "clientId": "ca_...", "secretKey": "sk_...", "redirectUri": "..." },
//!   "xero": { "clientId": "...", "clientSecret": "...", "redirectUri": "..." }
//! }
//! ```
//!
//! Environment variables override file values (STRIPE_CLIENT_ID,
//! STRIPE_SECRET_KEY, XERO_CLIENT_ID, XERO_CLIENT_SECRET, the redirect URIs
//! and the provider base URLs). Base-URL overrides exist so tests can point
//! the adapters at a local mock server.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::domain::result::{Error, Result};

/// Default Stripe OAuth base URL
pub const STRIPE_CONNECT_URL: &str = "https://connect.stripe.com";
/// Default Stripe REST API base URL
pub const STRIPE_API_URL: &str = "https://api.stripe.com";
/// Default Xero identity (token) base URL
pub const XERO_IDENTITY_URL: &str = "https://identity.xero.com";
/// Default Xero login (consent screen) base URL
pub const XERO_LOGIN_URL: &str = "https://login.xero.com";
/// Default Xero REST API base URL
pub const XERO_API_URL: &str = "https://api.xero.com";

/// Raw settings.json structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SettingsFile {
    #[serde(default)]
    stripe: ProviderSettingsFile,
    #[serde(default)]
    xero: ProviderSettingsFile,
    /// Fields written by other tools; preserved on save
    #[serde(flatten)]
    other: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProviderSettingsFile {
    #[serde(default)]
    client_id: Option<String>,
    #[serde(default)]
    client_secret: Option<String>,
    #[serde(default)]
    secret_key: Option<String>,
    #[serde(default)]
    redirect_uri: Option<String>,
}

/// Stripe application credentials and endpoints
#[derive(Debug, Clone)]
pub struct StripeConfig {
    pub client_id: String,
    pub secret_key: String,
    pub redirect_uri: String,
    pub connect_base_url: String,
    pub api_base_url: String,
}

/// Xero application credentials and endpoints
#[derive(Debug, Clone)]
pub struct XeroConfig {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
    pub identity_base_url: String,
    pub login_base_url: String,
    pub api_base_url: String,
}

/// LedgerLink configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub stripe: StripeConfig,
    pub xero: XeroConfig,
    // Keep the raw settings for preservation when saving
    _raw_settings: SettingsFile,
}

fn env_or(var: &str, fallback: Option<String>) -> String {
    std::env::var(var).ok().or(fallback).unwrap_or_default()
}

fn env_or_default(var: &str, default: &str) -> String {
    std::env::var(var).unwrap_or_else(|_| default.to_string())
}

impl Config {
    /// Load config from the data directory, applying environment overrides
    pub fn load(data_dir: &Path) -> Result<Self> {
        let settings_path = data_dir.join("settings.json");

        let raw: SettingsFile = if settings_path.exists() {
            let content = std::fs::read_to_string(&settings_path)?;
            serde_json::from_str(&content).unwrap_or_default()
        } else {
            SettingsFile::default()
        };

        let stripe = StripeConfig {
            client_id: env_or("STRIPE_CLIENT_ID", raw.stripe.client_id.clone()),
            secret_key: env_or("STRIPE_SECRET_KEY", raw.stripe.secret_key.clone()),
            redirect_uri: env_or("STRIPE_REDIRECT_URI", raw.stripe.redirect_uri.clone()),
            connect_base_url: env_or_default("STRIPE_CONNECT_BASE_URL", STRIPE_CONNECT_URL),
            api_base_url: env_or_default("STRIPE_API_BASE_URL", STRIPE_API_URL),
        };

        let xero = XeroConfig {
            client_id: env_or("XERO_CLIENT_ID", raw.xero.client_id.clone()),
            client_secret: env_or("XERO_CLIENT_SECRET", raw.xero.client_secret.clone()),
            redirect_uri: env_or("XERO_REDIRECT_URI", raw.xero.redirect_uri.clone()),
            identity_base_url: env_or_default("XERO_IDENTITY_BASE_URL", XERO_IDENTITY_URL),
            login_base_url: env_or_default("XERO_LOGIN_BASE_URL", XERO_LOGIN_URL),
            api_base_url: env_or_default("XERO_API_BASE_URL", XERO_API_URL),
        };

        Ok(Self {
            stripe,
            xero,
            _raw_settings: raw,
        })
    }

    /// Validate that the provider application credentials are present.
    ///
    /// A missing client id/secret pair is a startup-time fatal error: the
    /// server refuses to boot rather than fail on the first OAuth call.
    pub fn validate(&self) -> Result<()> {
        if self.stripe.client_id.is_empty() || self.stripe.secret_key.is_empty() {
            return Err(Error::Config(
                "Missing Stripe keys: set STRIPE_CLIENT_ID and STRIPE_SECRET_KEY".to_string(),
            ));
        }
        if self.xero.client_id.is_empty() || self.xero.client_secret.is_empty() {
            return Err(Error::Config(
                "Missing Xero keys: set XERO_CLIENT_ID and XERO_CLIENT_SECRET".to_string(),
            ));
        }
        Ok(())
    }

    /// Save config to the data directory.
    /// Preserves settings that LedgerLink doesn't manage.
    pub fn save(&self, data_dir: &Path) -> Result<()> {
        let settings_path = data_dir.join("settings.json");

        // Load existing settings to preserve fields we don't manage
        let mut settings = if settings_path.exists() {
            let content = std::fs::read_to_string(&settings_path)?;
            serde_json::from_str::<SettingsFile>(&content).unwrap_or_default()
        } else {
            SettingsFile::default()
        };

        settings.stripe.client_id = Some(self.stripe.client_id.clone());
        settings.stripe.secret_key = Some(self.stripe.secret_key.clone());
        settings.stripe.redirect_uri = Some(self.stripe.redirect_uri.clone());
        settings.xero.client_id = Some(self.xero.client_id.clone());
        settings.xero.client_secret = Some(self.xero.client_secret.clone());
        settings.xero.redirect_uri = Some(self.xero.redirect_uri.clone());

        let content = serde_json::to_string_pretty(&settings)?;
        std::fs::write(&settings_path, content)?;
        Ok(())
    }
}
