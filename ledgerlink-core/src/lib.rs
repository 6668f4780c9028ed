//! LedgerLink Core - provider integrations for business financial analytics
//!
//! This crate implements the core domain logic following hexagonal architecture:
//!
//! - **domain**: Core business entities (Business, CredentialRecord, CanonicalTransaction, ...)
//! - **ports**: Trait definitions for external dependencies (DocumentStore, ProviderAdapter)
//! - **services**: Business logic orchestration (connect, sync, aggregation, registration)
//! - **adapters**: Concrete implementations (DuckDB, Stripe, Xero)

pub mod adapters;
pub mod config;
pub mod domain;
pub mod ports;
pub mod services;

use std::path::Path;
use std::sync::Arc;

use adapters::duckdb::DuckDbStore;
use adapters::stripe::StripeAdapter;
use adapters::xero::XeroAdapter;
use config::Config;
use ports::{DocumentStore, ProviderAdapter};
use services::*;

// Re-export commonly used types at crate root
pub use domain::result::{Error, Result};
pub use domain::{
    Business, CanonicalTransaction, CredentialRecord, CustomerAggregate, Direction, ProviderKind,
};

/// Main context for LedgerLink operations
///
/// This is the primary entry point for all business logic. It holds the
/// store handle, configuration, and all services, constructed explicitly at
/// startup - there is no ambient global state.
pub struct LedgerLinkContext {
    pub config: Config,
    pub store: Arc<DuckDbStore>,
    pub stripe: Arc<StripeAdapter>,
    pub xero: Arc<XeroAdapter>,
    pub connect_service: Arc<ConnectService>,
    pub sync_service: LedgerSyncService,
    pub aggregation_service: CustomerAggregationService,
    pub registration_service: RegistrationService,
    pub sales_service: SalesService,
}

impl LedgerLinkContext {
    /// Create a new LedgerLink context.
    ///
    /// Opens (or creates) the store database in the data directory, ensures
    /// the schema, and wires the provider adapters and services. A store
    /// that cannot be opened or missing provider credentials fail here,
    /// which callers treat as fatal at startup.
    pub fn new(data_dir: &Path) -> Result<Self> {
        let config = Config::load(data_dir)?;
        config.validate()?;

        let store = Arc::new(DuckDbStore::new(&data_dir.join("ledgerlink.duckdb"))?);
        store.ensure_schema()?;

        let stripe = Arc::new(StripeAdapter::new(&config.stripe)?);
        let xero = Arc::new(XeroAdapter::new(&config.xero)?);

        let connect_service = Arc::new(ConnectService::new(
            store.clone() as Arc<dyn DocumentStore>,
            vec![
                stripe.clone() as Arc<dyn ProviderAdapter>,
                xero.clone() as Arc<dyn ProviderAdapter>,
            ],
        ));
        let sync_service = LedgerSyncService::new(store.clone(), connect_service.clone());
        let aggregation_service = CustomerAggregationService::new(
            store.clone(),
            connect_service.clone(),
            stripe.clone(),
        );
        let registration_service = RegistrationService::new(
            store.clone(),
            stripe.clone() as Arc<dyn ProviderAdapter>,
        );
        let sales_service = SalesService::new(stripe.clone());

        Ok(Self {
            config,
            store,
            stripe,
            xero,
            connect_service,
            sync_service,
            aggregation_service,
            registration_service,
            sales_service,
        })
    }
}
