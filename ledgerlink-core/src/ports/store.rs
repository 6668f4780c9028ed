//! Document store port - persistence abstraction

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::result::Result;
use crate::domain::{Business, CanonicalTransaction, CredentialRecord, CustomerAggregate, ProviderKind};

/// Document store abstraction
///
/// This trait defines all persistence operations the services need.
/// Implementations (adapters) provide the actual storage logic; the store
/// handle is constructed once at startup and passed in explicitly.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    // === Businesses ===

    /// Insert a new business; fails with `Duplicate` when the email is taken
    async fn insert_business(&self, business: &Business) -> Result<()>;

    /// Get a business by id
    async fn get_business(&self, id: Uuid) -> Result<Option<Business>>;

    /// Get a business by email (registration duplicate check)
    async fn get_business_by_email(&self, email: &str) -> Result<Option<Business>>;

    // === Credentials ===

    /// Upsert the credential record for one (business, provider) pair.
    /// At most one record per pair; the new values fully replace the old.
    async fn upsert_credentials(
        &self,
        business_id: Uuid,
        credentials: &CredentialRecord,
    ) -> Result<()>;

    /// Get the stored credential record for one (business, provider) pair
    async fn get_credentials(
        &self,
        business_id: Uuid,
        provider: ProviderKind,
    ) -> Result<Option<CredentialRecord>>;

    // === Ledger transactions ===

    /// Replace the entire stored transaction set for one (business, provider)
    /// pair. Never appends or merges.
    async fn replace_transactions(
        &self,
        business_id: Uuid,
        provider: ProviderKind,
        transactions: &[CanonicalTransaction],
    ) -> Result<()>;

    /// Get the stored transaction set for one (business, provider) pair,
    /// in stored order
    async fn get_transactions(
        &self,
        business_id: Uuid,
        provider: ProviderKind,
    ) -> Result<Vec<CanonicalTransaction>>;

    // === Customer aggregates ===

    /// Upsert the customer aggregate, keyed uniquely by business id
    async fn upsert_aggregate(&self, aggregate: &CustomerAggregate) -> Result<()>;

    /// Get the stored customer aggregate for a business
    async fn get_aggregate(&self, business_id: Uuid) -> Result<Option<CustomerAggregate>>;
}
