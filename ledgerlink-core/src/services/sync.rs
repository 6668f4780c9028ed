//! Ledger sync service - full paginated synchronization from a provider
//!
//! Each call performs an independent, complete walk of the provider's ledger
//! from the first page. Nothing is persisted unless the walk finishes, so
//! the previously stored set stays the last known-good snapshot on failure.
//!
//! Known limitation: two concurrent syncs for the same business are not
//! coordinated; the last replace-all write wins.

use std::sync::Arc;

use uuid::Uuid;

use crate::domain::result::{Error, Result};
use crate::domain::{CanonicalTransaction, CredentialRecord, ProviderKind};
use crate::ports::{DocumentStore, ProviderAdapter};
use crate::services::ConnectService;

/// Ledger synchronizer over the connection orchestrator
pub struct LedgerSyncService {
    store: Arc<dyn DocumentStore>,
    connect: Arc<ConnectService>,
}

impl LedgerSyncService {
    pub fn new(store: Arc<dyn DocumentStore>, connect: Arc<ConnectService>) -> Self {
        Self { store, connect }
    }

    /// Synchronize the full ledger for a business from one provider.
    ///
    /// Walks pages sequentially, normalizing and accumulating records in the
    /// provider's return order. On an auth failure the stored tokens are
    /// refreshed exactly once and the walk restarts from the first page; a
    /// second auth failure is terminal. On success the stored set is
    /// replaced wholesale and the accumulated sequence returned.
    pub async fn sync_all(
        &self,
        business_id: Uuid,
        kind: ProviderKind,
    ) -> Result<Vec<CanonicalTransaction>> {
        let adapter = self.connect.adapter(kind)?;
        let credentials = self.connect.ensure_credentials(business_id, kind).await?;

        let transactions = match self.walk_ledger(adapter.as_ref(), &credentials).await {
            Ok(transactions) => transactions,
            Err(e) if e.is_auth_failure() => {
                tracing::info!(
                    business_id = %business_id,
                    provider = %kind,
                    "ledger fetch rejected, refreshing tokens and retrying once"
                );
                let refreshed = self.connect.refresh_credentials(business_id, kind).await?;
                self.walk_ledger(adapter.as_ref(), &refreshed)
                    .await
                    .map_err(|e| incomplete(kind, e))?
            }
            Err(e) => return Err(incomplete(kind, e)),
        };

        self.store
            .replace_transactions(business_id, kind, &transactions)
            .await?;

        tracing::info!(
            business_id = %business_id,
            provider = %kind,
            count = transactions.len(),
            "ledger synchronized"
        );

        Ok(transactions)
    }

    /// One complete page walk, first page to exhaustion
    async fn walk_ledger(
        &self,
        adapter: &dyn ProviderAdapter,
        credentials: &CredentialRecord,
    ) -> Result<Vec<CanonicalTransaction>> {
        let mut transactions = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            let page = adapter
                .fetch_ledger_page(credentials, cursor.as_deref())
                .await?;

            transactions.extend(page.records.iter().map(|record| adapter.normalize(record)));

            match page.next_cursor {
                Some(next) => cursor = Some(next),
                None => break,
            }
        }

        Ok(transactions)
    }
}

/// An aborted walk leaves the previous snapshot in place; auth failures keep
/// their own type so the caller can distinguish them from transport faults
fn incomplete(kind: ProviderKind, e: Error) -> Error {
    match e {
        Error::OAuthRefresh(_) => e,
        other => Error::SyncIncomplete(format!("{} ledger walk aborted: {}", kind, other)),
    }
}
