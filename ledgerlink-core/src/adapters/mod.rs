//! Adapter implementations
//!
//! Adapters implement the port traits with concrete technologies:
//! - DuckDB for the DocumentStore port
//! - Stripe HTTP client for the payment ProviderAdapter
//! - Xero HTTP client for the accounting ProviderAdapter

pub mod duckdb;
pub mod stripe;
pub mod xero;

#[cfg(test)]
pub mod provider_mock;
