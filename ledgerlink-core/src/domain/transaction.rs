//! Canonical transaction domain model

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use super::business::ProviderKind;

/// Money flow direction of a ledger entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Inflow,
    Outflow,
}

impl Direction {
    /// Derive direction from a signed amount (payment charges carry no
    /// explicit direction, only a sign)
    pub fn from_amount(amount: Decimal) -> Self {
        if amount < Decimal::ZERO {
            Direction::Outflow
        } else {
            Direction::Inflow
        }
    }
}

/// Provider-agnostic normalized ledger entry.
///
/// Rebuilt fresh on every synchronization pass; a sync replaces the entire
/// stored set for a business, it never merges with a previous fetch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CanonicalTransaction {
    /// Provider-native id, unique within provider + account
    pub transaction_id: String,
    pub provider: ProviderKind,
    /// Signed amount in major currency units
    pub amount: Decimal,
    /// Uppercased ISO currency code
    pub currency: String,
    /// Absolute instant where the provider gives one; None when the
    /// provider record carried no parseable date
    pub date: Option<DateTime<Utc>>,
    pub description: String,
    pub status: String,
    pub direction: Direction,
    /// Counterparty name (contact, bank account or customer email)
    pub counterparty: String,
    /// Provider-native record preserved opaquely for audit
    pub raw: JsonValue,
}

impl CanonicalTransaction {
    /// Default placeholder for missing optional provider fields
    pub const UNKNOWN: &'static str = "N/A";
}
