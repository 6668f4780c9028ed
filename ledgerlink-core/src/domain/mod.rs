//! Core domain entities
//!
//! All business entities are defined here. These are pure data structures
//! with validation logic - no I/O or external dependencies.

mod aggregate;
mod business;
mod transaction;
pub mod result;

pub use aggregate::{
    CustomerAggregate, MonthCount, MonthlyData, SubscriptionBucket, YearSummary,
    UNKNOWN_SUBSCRIPTION,
};
pub use business::{Business, CredentialRecord, ProviderKind};
pub use transaction::{CanonicalTransaction, Direction};
