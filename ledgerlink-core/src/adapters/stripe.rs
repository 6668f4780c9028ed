//! Stripe API client (payment provider)
//!
//! Handles the Stripe Connect OAuth flow and ledger/directory reads on the
//! connected account. Balance transactions are paginated with Stripe's
//! `starting_after` + `has_more` mechanics: the cursor is the id of the last
//! record of the previous page.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use reqwest::Client;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value as JsonValue;
use url::form_urlencoded;
use uuid::Uuid;

use crate::config::StripeConfig;
use crate::domain::result::{Error, Result};
use crate::domain::{CanonicalTransaction, CredentialRecord, Direction, ProviderKind};
use crate::ports::{LedgerPage, ProviderAdapter, TokenGrant, TokenPair};

/// Records requested per balance-transaction page
const LEDGER_PAGE_LIMIT: u32 = 100;
/// Records requested per directory/sales listing
const LIST_LIMIT: u32 = 100;
/// Records requested per charge/refund listing
const SALES_LIMIT: u32 = 50;

// =============================================================================
// API Response Models (matching the Stripe API spec)
// =============================================================================

#[derive(Debug, Deserialize)]
struct OAuthTokenResponse {
    access_token: String,
    refresh_token: Option<String>,
    stripe_user_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OAuthErrorResponse {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
    #[serde(default)]
    error: Option<ApiErrorBody>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    message: Option<String>,
}

/// Generic Stripe list envelope: `{ "data": [...], "has_more": bool }`
#[derive(Debug, Deserialize)]
struct ListResponse<T> {
    data: Vec<T>,
    #[serde(default)]
    has_more: bool,
}

/// Stripe customer (directory listing for aggregation)
#[derive(Debug, Clone, Deserialize)]
pub struct StripeCustomer {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

/// Stripe subscription (directory listing for aggregation)
#[derive(Debug, Clone, Deserialize)]
pub struct StripeSubscription {
    pub id: String,
    /// Owning customer id
    pub customer: String,
    /// UNIX creation timestamp
    pub created: i64,
    #[serde(default)]
    pub items: SubscriptionItems,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SubscriptionItems {
    #[serde(default)]
    pub data: Vec<SubscriptionItem>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SubscriptionItem {
    #[serde(default)]
    pub price: Option<SubscriptionPrice>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SubscriptionPrice {
    /// Product id the price belongs to
    #[serde(default)]
    pub product: Option<String>,
}

/// Stripe product (product-id to name lookup for aggregation)
#[derive(Debug, Clone, Deserialize)]
pub struct StripeProduct {
    pub id: String,
    pub name: String,
}

/// Stripe charge (sales listings)
#[derive(Debug, Clone, Deserialize)]
pub struct StripeCharge {
    pub id: String,
    /// Amount in minor units
    pub amount: i64,
    pub currency: String,
    pub status: String,
    #[serde(default)]
    pub description: Option<String>,
    pub created: i64,
    #[serde(default)]
    pub customer: Option<String>,
    #[serde(default)]
    pub billing_details: Option<BillingDetails>,
    #[serde(default)]
    pub payment_method_details: Option<PaymentMethodDetails>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BillingDetails {
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PaymentMethodDetails {
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub card: Option<CardDetails>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CardDetails {
    pub brand: String,
    pub last4: String,
}

/// Stripe refund (sales listings)
#[derive(Debug, Clone, Deserialize)]
pub struct StripeRefund {
    pub id: String,
    /// Amount in minor units
    pub amount: i64,
    pub currency: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub reason: Option<String>,
    pub created: i64,
    #[serde(default)]
    pub payment_intent: Option<String>,
}

// =============================================================================
// Stripe HTTP Client
// =============================================================================

/// Stripe adapter
///
/// Implements the `ProviderAdapter` trait for the payment-provider slot and
/// exposes the directory/sales listings the aggregation and sales services
/// need.
#[derive(Debug)]
pub struct StripeAdapter {
    client: Client,
    client_id: String,
    secret_key: String,
    redirect_uri: String,
    connect_base_url: String,
    api_base_url: String,
}

impl StripeAdapter {
    /// Create a new Stripe adapter from config.
    ///
    /// Base URLs come from the config so tests can point the adapter at a
    /// local mock server.
    pub fn new(config: &StripeConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| Error::provider(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            client_id: config.client_id.clone(),
            secret_key: config.secret_key.clone(),
            redirect_uri: config.redirect_uri.clone(),
            connect_base_url: config.connect_base_url.trim_end_matches('/').to_string(),
            api_base_url: config.api_base_url.trim_end_matches('/').to_string(),
        })
    }

    fn urlencode(value: &str) -> String {
        form_urlencoded::byte_serialize(value.as_bytes()).collect()
    }

    /// Map request errors to user-friendly messages
    fn map_request_error(&self, error: reqwest::Error) -> Error {
        if error.is_timeout() {
            Error::provider("Connection to Stripe timed out after 30 seconds")
        } else if error.is_connect() {
            Error::provider("Unable to connect to Stripe servers")
        } else {
            Error::provider(format!("Stripe request failed: {}", error))
        }
    }

    /// Read the provider's error description from an OAuth error body
    async fn oauth_error_message(response: reqwest::Response) -> String {
        let status = response.status();
        match response.json::<OAuthErrorResponse>().await {
            Ok(body) => body
                .error_description
                .or(body.error)
                .unwrap_or_else(|| format!("HTTP {}", status)),
            Err(_) => format!("HTTP {}", status),
        }
    }

    /// Read the error message from a REST API error body
    async fn api_error(response: reqwest::Response) -> Error {
        let status = response.status().as_u16();
        let message = match response.json::<ApiErrorResponse>().await {
            Ok(body) => body
                .error
                .and_then(|e| e.message)
                .unwrap_or_else(|| format!("Stripe API error: HTTP {}", status)),
            Err(_) => format!("Stripe API error: HTTP {}", status),
        };
        Error::provider_status(status, message)
    }

    /// GET a Stripe list endpoint on behalf of a connected account (or the
    /// platform account when `stripe_account` is None)
    async fn get_list<T: serde::de::DeserializeOwned>(
        &self,
        path_and_query: &str,
        stripe_account: Option<&str>,
    ) -> Result<ListResponse<T>> {
        let url = format!("{}{}", self.api_base_url, path_and_query);

        let mut request = self.client.get(&url).bearer_auth(&self.secret_key);
        if let Some(account) = stripe_account {
            request = request.header("Stripe-Account", account);
        }

        let response = request.send().await.map_err(|e| self.map_request_error(e))?;

        if !response.status().is_success() {
            return Err(Self::api_error(response).await);
        }

        response
            .json::<ListResponse<T>>()
            .await
            .map_err(|e| Error::provider(format!("Failed to parse Stripe response: {}", e)))
    }

    /// List customers on the connected account (aggregation input)
    pub async fn list_customers(&self, credentials: &CredentialRecord) -> Result<Vec<StripeCustomer>> {
        let list = self
            .get_list(
                &format!("/v1/customers?limit={}", LIST_LIMIT),
                Some(&credentials.account_id),
            )
            .await?;
        Ok(list.data)
    }

    /// List subscriptions on the connected account (aggregation input)
    pub async fn list_subscriptions(
        &self,
        credentials: &CredentialRecord,
    ) -> Result<Vec<StripeSubscription>> {
        let list = self
            .get_list(
                &format!("/v1/subscriptions?limit={}", LIST_LIMIT),
                Some(&credentials.account_id),
            )
            .await?;
        Ok(list.data)
    }

    /// List products on the connected account (product-id to name lookup)
    pub async fn list_products(&self, credentials: &CredentialRecord) -> Result<Vec<StripeProduct>> {
        let list = self
            .get_list(
                &format!("/v1/products?limit={}", LIST_LIMIT),
                Some(&credentials.account_id),
            )
            .await?;
        Ok(list.data)
    }

    /// List charges on the platform account, optionally for one customer
    pub async fn list_charges(&self, customer: Option<&str>) -> Result<Vec<StripeCharge>> {
        let mut path = format!("/v1/charges?limit={}", SALES_LIMIT);
        if let Some(customer_id) = customer {
            path.push_str(&format!("&customer={}", Self::urlencode(customer_id)));
        }
        let list = self.get_list(&path, None).await?;
        Ok(list.data)
    }

    /// List refunds on the platform account
    pub async fn list_refunds(&self) -> Result<Vec<StripeRefund>> {
        let list = self
            .get_list(&format!("/v1/refunds?limit={}", SALES_LIMIT), None)
            .await?;
        Ok(list.data)
    }

    /// Convert minor-unit amount to major units
    fn major_units(minor: i64) -> Decimal {
        Decimal::new(minor, 2)
    }
}

#[async_trait]
impl ProviderAdapter for StripeAdapter {
    fn name(&self) -> &str {
        "stripe"
    }

    fn kind(&self) -> ProviderKind {
        ProviderKind::Payment
    }

    fn authorize_url(&self, business_id: Uuid) -> String {
        format!(
            "{}/oauth/authorize?response_type=code&client_id={}&scope=read_write&redirect_uri={}&state={}",
            self.connect_base_url,
            self.client_id,
            Self::urlencode(&self.redirect_uri),
            business_id
        )
    }

    async fn exchange_code(&self, code: &str) -> Result<TokenGrant> {
        let url = format!("{}/oauth/token", self.connect_base_url);

        let response = self
            .client
            .post(&url)
            .form(&[
                ("grant_type", "authorization_code"),
                ("client_id", &self.client_id),
                ("client_secret", &self.secret_key),
                ("code", code),
            ])
            .send()
            .await
            .map_err(|e| self.map_request_error(e))?;

        if !response.status().is_success() {
            return Err(Error::OAuthExchange(Self::oauth_error_message(response).await));
        }

        let body: OAuthTokenResponse = response
            .json()
            .await
            .map_err(|e| Error::OAuthExchange(format!("Invalid token response: {}", e)))?;

        let account_id = body
            .stripe_user_id
            .ok_or_else(|| Error::OAuthExchange("Token response missing stripe_user_id".to_string()))?;

        Ok(TokenGrant {
            access_token: body.access_token,
            refresh_token: body.refresh_token.unwrap_or_default(),
            account_id,
        })
    }

    async fn refresh_tokens(&self, refresh_token: &str) -> Result<TokenPair> {
        let url = format!("{}/oauth/token", self.connect_base_url);

        let response = self
            .client
            .post(&url)
            .form(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token),
                ("client_id", &self.client_id),
                ("client_secret", &self.secret_key),
            ])
            .send()
            .await
            .map_err(|e| self.map_request_error(e))?;

        if !response.status().is_success() {
            return Err(Error::OAuthRefresh(Self::oauth_error_message(response).await));
        }

        let body: OAuthTokenResponse = response
            .json()
            .await
            .map_err(|e| Error::OAuthRefresh(format!("Invalid token response: {}", e)))?;

        Ok(TokenPair {
            access_token: body.access_token.clone(),
            // Stripe may rotate the refresh token; keep the previous one
            // only when no replacement was issued
            refresh_token: body.refresh_token.unwrap_or_else(|| refresh_token.to_string()),
        })
    }

    async fn fetch_ledger_page(
        &self,
        credentials: &CredentialRecord,
        cursor: Option<&str>,
    ) -> Result<LedgerPage> {
        let mut path = format!("/v1/balance_transactions?limit={}", LEDGER_PAGE_LIMIT);
        if let Some(starting_after) = cursor {
            path.push_str(&format!("&starting_after={}", Self::urlencode(starting_after)));
        }

        let list: ListResponse<JsonValue> =
            self.get_list(&path, Some(&credentials.account_id)).await?;

        // The cursor for the next page is the id of the last record while
        // the provider reports more data
        let next_cursor = if list.has_more {
            list.data
                .last()
                .and_then(|record| record.get("id"))
                .and_then(|id| id.as_str())
                .map(|id| id.to_string())
        } else {
            None
        };

        Ok(LedgerPage {
            records: list.data,
            next_cursor,
        })
    }

    fn normalize(&self, record: &JsonValue) -> CanonicalTransaction {
        let amount = record
            .get("amount")
            .and_then(|v| v.as_i64())
            .map(Self::major_units)
            .unwrap_or_default();

        let currency = record
            .get("currency")
            .and_then(|v| v.as_str())
            .unwrap_or("")
            .to_uppercase();

        let date = record
            .get("created")
            .and_then(|v| v.as_i64())
            .and_then(|ts| Utc.timestamp_opt(ts, 0).single());

        // Description falls back to the reporting category, matching the
        // payment provider's own reporting views
        let description = record
            .get("description")
            .and_then(|v| v.as_str())
            .filter(|s| !s.is_empty())
            .or_else(|| record.get("reporting_category").and_then(|v| v.as_str()))
            .unwrap_or(CanonicalTransaction::UNKNOWN)
            .to_string();

        let status = record
            .get("status")
            .and_then(|v| v.as_str())
            .unwrap_or(CanonicalTransaction::UNKNOWN)
            .to_string();

        let counterparty = record
            .get("source")
            .and_then(|s| s.get("billing_details"))
            .and_then(|b| b.get("email"))
            .and_then(|v| v.as_str())
            .unwrap_or(CanonicalTransaction::UNKNOWN)
            .to_string();

        CanonicalTransaction {
            transaction_id: record
                .get("id")
                .and_then(|v| v.as_str())
                .unwrap_or("")
                .to_string(),
            provider: ProviderKind::Payment,
            amount,
            currency,
            date,
            description,
            status,
            direction: Direction::from_amount(amount),
            counterparty,
            raw: record.clone(),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
