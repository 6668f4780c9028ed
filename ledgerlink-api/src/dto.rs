//! Request and response shapes for the HTTP surface
//!
//! Request fields arrive as options and are validated in the handlers so a
//! missing field produces a 400 with a descriptive message rather than a
//! deserialization rejection.

use chrono::{DateTime, Utc};
use ledgerlink_core::CanonicalTransaction;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::error::ApiError;

/// Parse and validate a business id ("BID") from a request field
pub fn parse_bid(raw: &Option<String>, location: &str) -> Result<uuid::Uuid, ApiError> {
    let raw = raw
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ApiError::BadRequest(format!("Missing BID in {}", location)))?;
    uuid::Uuid::parse_str(raw)
        .map_err(|_| ApiError::BadRequest(format!("Invalid BID: {}", raw)))
}

// === Registration ===

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub success: bool,
    pub message: String,
    pub data: RegisterData,
}

#[derive(Debug, Serialize)]
pub struct RegisterData {
    pub _id: String,
    pub name: String,
    pub email: String,
    #[serde(rename = "stripeRedirectUrl")]
    pub stripe_redirect_url: String,
}

// === Provider connect ===

#[derive(Debug, Deserialize)]
pub struct ConnectRequest {
    #[serde(rename = "BID", default)]
    pub bid: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct StripeConnectResponse {
    pub message: String,
    #[serde(rename = "BID")]
    pub bid: String,
    #[serde(rename = "stripeAuthUrl")]
    pub stripe_auth_url: String,
}

#[derive(Debug, Deserialize)]
pub struct OAuthCallbackQuery {
    #[serde(default)]
    pub code: Option<String>,
    /// Business id, round-tripped through the provider as `state`
    #[serde(default)]
    pub state: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct StripeCallbackResponse {
    pub message: String,
    #[serde(rename = "BID")]
    pub bid: String,
    pub stripe_user_id: String,
}

#[derive(Debug, Serialize)]
pub struct SyncResponse {
    pub message: String,
    pub count: usize,
    pub transactions: Vec<CanonicalTransaction>,
}

// === Xero ===

#[derive(Debug, Serialize)]
pub struct XeroConnectResponse {
    #[serde(rename = "BID")]
    pub bid: String,
    pub message: String,
    pub url: String,
}

#[derive(Debug, Serialize)]
pub struct XeroCallbackResponse {
    pub message: String,
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Debug, Deserialize)]
pub struct BankTransactionsQuery {
    #[serde(rename = "BID", default)]
    pub bid: Option<String>,
}

/// Bank ledger entries keyed by ISO date
#[derive(Debug, Serialize)]
pub struct BankTransactionsResponse {
    pub transactions: Vec<JsonValue>,
}

// === Customers ===

#[derive(Debug, Serialize)]
pub struct CustomerAggregateResponse {
    #[serde(rename = "BID")]
    pub bid: String,
    pub message: String,
    pub total_customers: i64,
    #[serde(rename = "updatedAt")]
    pub updated_at: DateTime<Utc>,
    pub subscription: JsonValue,
}

// === Sales ===

#[derive(Debug, Serialize)]
pub struct SalesResponse {
    pub message: String,
    pub transactions: Vec<ledgerlink_core::services::SalePayment>,
}

#[derive(Debug, Serialize)]
pub struct RefundsResponse {
    pub message: String,
    pub refunds: Vec<ledgerlink_core::services::RefundRecord>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bid() {
        let id = uuid::Uuid::new_v4();
        assert_eq!(
            parse_bid(&Some(id.to_string()), "request body").unwrap(),
            id
        );

        assert!(parse_bid(&None, "request body").is_err());
        assert!(parse_bid(&Some("  ".to_string()), "request body").is_err());
        assert!(parse_bid(&Some("not-a-uuid".to_string()), "request body").is_err());
    }
}
