//! Provider adapter port
//!
//! Defines the interface to a third-party ledger provider: the OAuth
//! endpoints, the paginated ledger fetch, and the mapping from
//! provider-native records to canonical transactions. The orchestrator and
//! synchronizer depend only on this trait, not on Stripe or Xero specifics.

use async_trait::async_trait;
use serde_json::Value as JsonValue;
use uuid::Uuid;

use crate::domain::result::Result;
use crate::domain::{CanonicalTransaction, CredentialRecord, ProviderKind};

/// Tokens and account identity returned by an authorization-code exchange
#[derive(Debug, Clone)]
pub struct TokenGrant {
    pub access_token: String,
    pub refresh_token: String,
    /// Provider-assigned account/tenant id for the connected organisation
    pub account_id: String,
}

/// Rotated token pair returned by a refresh.
///
/// Providers rotate refresh tokens: the returned pair replaces the stored
/// one wholesale, the previous refresh token must not be kept.
#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// One page of provider-native ledger records
#[derive(Debug, Default)]
pub struct LedgerPage {
    /// Records in the provider's native return order
    pub records: Vec<JsonValue>,
    /// Opaque cursor for the next page; None signals exhaustion
    pub next_cursor: Option<String>,
}

/// Ledger provider trait
///
/// Implementations encapsulate one provider's endpoint shapes and pagination
/// mechanics (Stripe: last-id cursor with a has-more flag; Xero: page
/// numbers). All network failures surface as domain errors; auth rejections
/// carry the provider's HTTP status so callers can apply the single
/// refresh-then-retry policy.
#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    /// Provider name (e.g., "stripe", "xero")
    fn name(&self) -> &str;

    /// Which credential slot this provider occupies
    fn kind(&self) -> ProviderKind;

    /// Build the authorization URL for the provider's consent screen.
    ///
    /// The business id is embedded as the `state` parameter and round-tripped
    /// by the provider's redirect.
    fn authorize_url(&self, business_id: Uuid) -> String;

    /// Exchange an authorization code for tokens and the connected account id
    async fn exchange_code(&self, code: &str) -> Result<TokenGrant>;

    /// Exchange a refresh token for a rotated token pair.
    ///
    /// Fails with `Error::OAuthRefresh` when the token is invalid or
    /// expired; that failure is terminal for the current attempt.
    async fn refresh_tokens(&self, refresh_token: &str) -> Result<TokenPair>;

    /// Fetch one page of provider-native ledger records
    async fn fetch_ledger_page(
        &self,
        credentials: &CredentialRecord,
        cursor: Option<&str>,
    ) -> Result<LedgerPage>;

    /// Map a provider-native record to the canonical shape.
    ///
    /// Pure and total: missing optional fields map to defined defaults,
    /// never to an error.
    fn normalize(&self, record: &JsonValue) -> CanonicalTransaction;
}
