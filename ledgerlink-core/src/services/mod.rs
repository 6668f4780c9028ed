//! Service layer - business logic orchestration
//!
//! Services coordinate domain logic and port interactions. Each service
//! focuses on a specific use case or feature area.

mod aggregate;
mod auth;
mod connect;
mod sales;
mod sync;

pub use aggregate::CustomerAggregationService;
pub use auth::{hash_password, verify_password, RegisteredBusiness, RegistrationService};
pub use connect::ConnectService;
pub use sales::{RefundRecord, SalePayment, SalesService};
pub use sync::LedgerSyncService;
