//! Xero API client (accounting provider)
//!
//! Handles the Xero OAuth flow (token endpoint with HTTP Basic client
//! authentication), tenant discovery via `/connections`, and the paginated
//! bank-transaction ledger. Pages are numbered; a page returning fewer
//! records than the page size signals exhaustion.

use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use regex::Regex;
use reqwest::Client;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value as JsonValue;
use url::form_urlencoded;
use uuid::Uuid;

use crate::config::XeroConfig;
use crate::domain::result::{Error, Result};
use crate::domain::{CanonicalTransaction, CredentialRecord, Direction, ProviderKind};
use crate::ports::{LedgerPage, ProviderAdapter, TokenGrant, TokenPair};

/// OAuth scopes requested on the consent screen
const XERO_SCOPES: &str = "openid profile email accounting.transactions accounting.contacts";

/// Bank transactions returned per page by the Xero API
const LEDGER_PAGE_SIZE: usize = 100;

// =============================================================================
// API Response Models (matching the Xero API spec)
// =============================================================================

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: String,
}

#[derive(Debug, Deserialize)]
struct TokenErrorResponse {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
}

/// One entry of `GET /connections`
#[derive(Debug, Deserialize)]
struct Connection {
    #[serde(rename = "tenantId")]
    tenant_id: String,
}

#[derive(Debug, Deserialize)]
struct BankTransactionsResponse {
    #[serde(rename = "BankTransactions", default)]
    bank_transactions: Vec<JsonValue>,
}

// =============================================================================
// Xero HTTP Client
// =============================================================================

/// Xero adapter
///
/// Implements the `ProviderAdapter` trait for the accounting-provider slot.
#[derive(Debug)]
pub struct XeroAdapter {
    client: Client,
    client_id: String,
    client_secret: String,
    redirect_uri: String,
    identity_base_url: String,
    login_base_url: String,
    api_base_url: String,
}

impl XeroAdapter {
    /// Create a new Xero adapter from config.
    ///
    /// Base URLs come from the config so tests can point the adapter at a
    /// local mock server.
    pub fn new(config: &XeroConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| Error::provider(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            redirect_uri: config.redirect_uri.clone(),
            identity_base_url: config.identity_base_url.trim_end_matches('/').to_string(),
            login_base_url: config.login_base_url.trim_end_matches('/').to_string(),
            api_base_url: config.api_base_url.trim_end_matches('/').to_string(),
        })
    }

    fn urlencode(value: &str) -> String {
        form_urlencoded::byte_serialize(value.as_bytes()).collect()
    }

    /// Client credentials as an HTTP Basic Authorization header value
    fn basic_auth_header(&self) -> String {
        let pair = format!("{}:{}", self.client_id, self.client_secret);
        format!(
            "Basic {}",
            base64::engine::general_purpose::STANDARD.encode(pair)
        )
    }

    /// Map request errors to user-friendly messages
    fn map_request_error(&self, error: reqwest::Error) -> Error {
        if error.is_timeout() {
            Error::provider("Connection to Xero timed out after 30 seconds")
        } else if error.is_connect() {
            Error::provider("Unable to connect to Xero servers")
        } else {
            Error::provider(format!("Xero request failed: {}", error))
        }
    }

    /// Read the provider's error description from a token error body
    async fn token_error_message(response: reqwest::Response) -> String {
        let status = response.status();
        match response.json::<TokenErrorResponse>().await {
            Ok(body) => body
                .error_description
                .or(body.error)
                .unwrap_or_else(|| format!("HTTP {}", status)),
            Err(_) => format!("HTTP {}", status),
        }
    }

    /// POST the token endpoint with the given grant parameters
    async fn request_tokens(&self, params: &[(&str, &str)]) -> Result<reqwest::Response> {
        let url = format!("{}/connect/token", self.identity_base_url);

        self.client
            .post(&url)
            .header("Authorization", self.basic_auth_header())
            .form(params)
            .send()
            .await
            .map_err(|e| self.map_request_error(e))
    }

    /// Resolve the tenant id of the first connected organisation
    async fn fetch_tenant_id(&self, access_token: &str) -> Result<String> {
        let url = format!("{}/connections", self.api_base_url);

        let response = self
            .client
            .get(&url)
            .bearer_auth(access_token)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| self.map_request_error(e))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            return Err(Error::provider_status(
                status,
                format!("Xero connections lookup failed: HTTP {}", status),
            ));
        }

        let connections: Vec<Connection> = response
            .json()
            .await
            .map_err(|e| Error::provider(format!("Failed to parse Xero connections: {}", e)))?;

        connections
            .into_iter()
            .next()
            .map(|c| c.tenant_id)
            .ok_or_else(|| Error::OAuthExchange("No Xero organization connected".to_string()))
    }

    /// Parse a Xero date value: ISO date-time strings ("2024-02-03T00:00:00")
    /// or the legacy `/Date(1706918400000+0000)/` wire format.
    fn parse_date(value: Option<&str>) -> Option<DateTime<Utc>> {
        let raw = value?;

        if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
            return Some(dt.with_timezone(&Utc));
        }
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
            return Some(Utc.from_utc_datetime(&naive));
        }
        if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
            return Some(Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0)?));
        }

        // Legacy wire format: /Date(<unix millis>[+offset])/
        let wire = Regex::new(r"/Date\((-?\d+)").ok()?;
        let millis: i64 = wire.captures(raw)?.get(1)?.as_str().parse().ok()?;
        Utc.timestamp_millis_opt(millis).single()
    }

    /// Total as a decimal; Xero sends JSON numbers
    fn parse_total(value: Option<&JsonValue>) -> Decimal {
        let total = value.and_then(|v| v.as_f64()).unwrap_or(0.0);
        Decimal::try_from(total).unwrap_or_else(|_| Decimal::new((total * 100.0) as i64, 2))
    }
}

#[async_trait]
impl ProviderAdapter for XeroAdapter {
    fn name(&self) -> &str {
        "xero"
    }

    fn kind(&self) -> ProviderKind {
        ProviderKind::Accounting
    }

    fn authorize_url(&self, business_id: Uuid) -> String {
        format!(
            "{}/identity/connect/authorize?response_type=code&client_id={}&redirect_uri={}&scope={}&state={}",
            self.login_base_url,
            self.client_id,
            Self::urlencode(&self.redirect_uri),
            Self::urlencode(XERO_SCOPES),
            business_id
        )
    }

    async fn exchange_code(&self, code: &str) -> Result<TokenGrant> {
        let response = self
            .request_tokens(&[
                ("grant_type", "authorization_code"),
                ("code", code),
                ("redirect_uri", &self.redirect_uri),
            ])
            .await?;

        if !response.status().is_success() {
            return Err(Error::OAuthExchange(Self::token_error_message(response).await));
        }

        let body: TokenResponse = response
            .json()
            .await
            .map_err(|e| Error::OAuthExchange(format!("Invalid token response: {}", e)))?;

        // The token response carries no organisation identity; resolve the
        // tenant from the connections endpoint before storing anything
        let tenant_id = self.fetch_tenant_id(&body.access_token).await?;

        Ok(TokenGrant {
            access_token: body.access_token,
            refresh_token: body.refresh_token,
            account_id: tenant_id,
        })
    }

    async fn refresh_tokens(&self, refresh_token: &str) -> Result<TokenPair> {
        let response = self
            .request_tokens(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token),
            ])
            .await?;

        if !response.status().is_success() {
            return Err(Error::OAuthRefresh(Self::token_error_message(response).await));
        }

        let body: TokenResponse = response
            .json()
            .await
            .map_err(|e| Error::OAuthRefresh(format!("Invalid token response: {}", e)))?;

        Ok(TokenPair {
            access_token: body.access_token,
            refresh_token: body.refresh_token,
        })
    }

    async fn fetch_ledger_page(
        &self,
        credentials: &CredentialRecord,
        cursor: Option<&str>,
    ) -> Result<LedgerPage> {
        let page: u32 = cursor.and_then(|c| c.parse().ok()).unwrap_or(1);

        // Newest-first ordering is part of this endpoint's contract and is
        // preserved through the page walk
        let url = format!(
            "{}/api.xro/2.0/BankTransactions?page={}&order={}",
            self.api_base_url,
            page,
            Self::urlencode("Date DESC"),
        );

        let response = self
            .client
            .get(&url)
            .bearer_auth(&credentials.access_token)
            .header("Xero-tenant-id", &credentials.account_id)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| self.map_request_error(e))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            return Err(Error::provider_status(
                status,
                format!("Xero bank transactions fetch failed: HTTP {}", status),
            ));
        }

        let body: BankTransactionsResponse = response
            .json()
            .await
            .map_err(|e| Error::provider(format!("Failed to parse Xero response: {}", e)))?;

        // A short page means the walk is done; pagination is judged on the
        // raw page size, before the DELETED filter below
        let next_cursor = if body.bank_transactions.len() >= LEDGER_PAGE_SIZE {
            Some((page + 1).to_string())
        } else {
            None
        };

        let records = body
            .bank_transactions
            .into_iter()
            .filter(|tx| {
                tx.get("Status").and_then(|s| s.as_str()) != Some("DELETED")
            })
            .collect();

        Ok(LedgerPage {
            records,
            next_cursor,
        })
    }

    fn normalize(&self, record: &JsonValue) -> CanonicalTransaction {
        let tx_type = record
            .get("Type")
            .and_then(|v| v.as_str())
            .unwrap_or("")
            .to_uppercase();

        let direction = if tx_type == "SPEND" {
            Direction::Outflow
        } else {
            Direction::Inflow
        };

        let total = Self::parse_total(record.get("Total"));
        let amount = match direction {
            Direction::Outflow => -total,
            Direction::Inflow => total,
        };

        let date = Self::parse_date(
            record
                .get("DateString")
                .and_then(|v| v.as_str())
                .or_else(|| record.get("Date").and_then(|v| v.as_str())),
        );

        let counterparty = record
            .get("Contact")
            .and_then(|c| c.get("Name"))
            .and_then(|v| v.as_str())
            .filter(|s| !s.is_empty())
            .unwrap_or(CanonicalTransaction::UNKNOWN)
            .to_string();

        let description = record
            .get("Reference")
            .and_then(|v| v.as_str())
            .filter(|s| !s.is_empty())
            .unwrap_or(CanonicalTransaction::UNKNOWN)
            .to_string();

        CanonicalTransaction {
            transaction_id: record
                .get("BankTransactionID")
                .and_then(|v| v.as_str())
                .unwrap_or("")
                .to_string(),
            provider: ProviderKind::Accounting,
            amount,
            currency: record
                .get("CurrencyCode")
                .and_then(|v| v.as_str())
                .unwrap_or("")
                .to_uppercase(),
            date,
            description,
            // Xero treats missing status as an authorised transaction
            status: record
                .get("Status")
                .and_then(|v| v.as_str())
                .unwrap_or("AUTHORISED")
                .to_string(),
            direction,
            counterparty,
            raw: record.clone(),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
