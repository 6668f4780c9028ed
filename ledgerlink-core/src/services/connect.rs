//! Connection service - OAuth connection lifecycle
//!
//! Drives the authorization-code flow for both provider slots: builds the
//! authorize URL, exchanges a returned code for tokens, and persists the
//! credential record keyed by (business, provider). Rotated token pairs are
//! written through to the store before being returned, so the latest refresh
//! token always wins.

use std::collections::HashMap;
use std::sync::Arc;

use uuid::Uuid;

use crate::domain::result::{Error, Result};
use crate::domain::{CredentialRecord, ProviderKind};
use crate::ports::{DocumentStore, ProviderAdapter};

/// Connection orchestrator over the provider registry
pub struct ConnectService {
    store: Arc<dyn DocumentStore>,
    providers: HashMap<ProviderKind, Arc<dyn ProviderAdapter>>,
}

impl ConnectService {
    pub fn new(store: Arc<dyn DocumentStore>, adapters: Vec<Arc<dyn ProviderAdapter>>) -> Self {
        let mut providers: HashMap<ProviderKind, Arc<dyn ProviderAdapter>> = HashMap::new();
        for adapter in adapters {
            providers.insert(adapter.kind(), adapter);
        }
        Self { store, providers }
    }

    /// Look up the registered adapter for a provider slot
    pub fn adapter(&self, kind: ProviderKind) -> Result<Arc<dyn ProviderAdapter>> {
        self.providers
            .get(&kind)
            .cloned()
            .ok_or_else(|| Error::Config(format!("No {} provider registered", kind)))
    }

    /// Build the provider's authorization URL for a known business
    pub async fn initiate(&self, business_id: Uuid, kind: ProviderKind) -> Result<String> {
        let adapter = self.adapter(kind)?;

        self.store
            .get_business(business_id)
            .await?
            .ok_or_else(|| Error::not_found(format!("Business {} not found", business_id)))?;

        Ok(adapter.authorize_url(business_id))
    }

    /// Exchange an authorization code and persist the credential record.
    ///
    /// Upserts keyed by (business, provider): a repeated handshake replaces
    /// the previous record, it never duplicates it.
    pub async fn complete_handshake(
        &self,
        code: &str,
        business_id: Uuid,
        kind: ProviderKind,
    ) -> Result<CredentialRecord> {
        let adapter = self.adapter(kind)?;

        self.store
            .get_business(business_id)
            .await?
            .ok_or_else(|| Error::not_found(format!("Business {} not found", business_id)))?;

        let grant = adapter.exchange_code(code).await?;
        let credentials = CredentialRecord::new(
            kind,
            grant.account_id,
            grant.access_token,
            grant.refresh_token,
        );

        self.store
            .upsert_credentials(business_id, &credentials)
            .await?;

        tracing::info!(
            business_id = %business_id,
            provider = %kind,
            account_id = %credentials.account_id,
            "provider account connected"
        );

        Ok(credentials)
    }

    /// Return the stored credentials for a business.
    ///
    /// Purely a store lookup: when nothing is stored this fails with
    /// `NotFound` and no network call is made. There is no expiry tracking;
    /// validity is discovered by attempting the provider operation and
    /// refreshing once on an auth failure.
    pub async fn ensure_credentials(
        &self,
        business_id: Uuid,
        kind: ProviderKind,
    ) -> Result<CredentialRecord> {
        self.store
            .get_credentials(business_id, kind)
            .await?
            .ok_or_else(|| {
                Error::not_found(format!(
                    "{} account not connected for business {}",
                    kind, business_id
                ))
            })
    }

    /// Refresh the stored tokens and persist the rotated pair.
    ///
    /// The write-through happens before the new pair is returned so a crash
    /// after the provider rotates the refresh token cannot strand the only
    /// valid copy in memory.
    pub async fn refresh_credentials(
        &self,
        business_id: Uuid,
        kind: ProviderKind,
    ) -> Result<CredentialRecord> {
        let adapter = self.adapter(kind)?;
        let current = self.ensure_credentials(business_id, kind).await?;

        let pair = adapter.refresh_tokens(&current.refresh_token).await?;
        let rotated = current.with_rotated_tokens(pair.access_token, pair.refresh_token);

        self.store.upsert_credentials(business_id, &rotated).await?;

        tracing::info!(
            business_id = %business_id,
            provider = %kind,
            "provider tokens refreshed"
        );

        Ok(rotated)
    }
}
