//! Business and credential domain models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Which third-party provider a credential or transaction set belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// Payment provider (Stripe)
    Payment,
    /// Accounting provider (Xero)
    Accounting,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Payment => "payment",
            ProviderKind::Accounting => "accounting",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "payment" => Some(ProviderKind::Payment),
            "accounting" => Some(ProviderKind::Accounting),
            _ => None,
        }
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A registered business (the owning entity for credentials and ledgers)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Business {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    /// Argon2 hash, never the raw password
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Business {
    /// Create a new business with a fresh id and timestamps
    pub fn new(name: String, email: String, password_hash: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name,
            email,
            password_hash,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Stored OAuth credential set for one (business, provider) pair.
///
/// Upserted on every completed code exchange or token refresh; at most one
/// record per pair, the latest refresh token always wins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CredentialRecord {
    pub provider: ProviderKind,
    /// Provider-assigned account id (Stripe account) or tenant id (Xero organisation)
    pub account_id: String,
    pub access_token: String,
    pub refresh_token: String,
    pub connected_at: DateTime<Utc>,
}

impl CredentialRecord {
    pub fn new(
        provider: ProviderKind,
        account_id: String,
        access_token: String,
        refresh_token: String,
    ) -> Self {
        Self {
            provider,
            account_id,
            access_token,
            refresh_token,
            connected_at: Utc::now(),
        }
    }

    /// Replace the token pair after a refresh, keeping the account identity
    pub fn with_rotated_tokens(mut self, access_token: String, refresh_token: String) -> Self {
        self.access_token = access_token;
        self.refresh_token = refresh_token;
        self
    }
}
