//! LedgerLink API Server
//!
//! REST surface over the ledgerlink-core services.
//!
//! ## Endpoints
//!
//! ### Registration
//! - POST /auth/register - create a business account
//!
//! ### Payment provider (Stripe)
//! - POST /connect/connect - build the authorize URL
//! - GET  /connect/stripe/callback - exchange the returned code
//! - POST /connect/transactions - full paginated transaction sync
//!
//! ### Accounting provider (Xero)
//! - POST /xero/connect - build the authorize URL
//! - GET  /xero/callback - exchange the returned code
//! - GET  /xero/bank_transactions - sync and normalize the bank ledger
//!
//! ### Analytics
//! - POST /customers/actual_customer - customer/subscription aggregation
//! - GET  /sales/actual_sales[/:customer_id] - charge listings
//! - GET  /sales/refunds - refund listings

pub mod dto;
pub mod error;
pub mod routes;
pub mod server;
pub mod state;

pub use error::*;
pub use server::*;
pub use state::*;
