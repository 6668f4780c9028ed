//! Customer aggregate domain model
//!
//! Derived data: recomputed in full on each aggregation run and stored with
//! upsert-replace semantics, one record per business.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Bucket name used when a subscription's product cannot be resolved to a name
pub const UNKNOWN_SUBSCRIPTION: &str = "Unknown Subscription";

/// Count cell for a single month
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthCount {
    pub actual: i64,
}

/// Per-month creation counts.
///
/// A struct with one field per month rather than a map, so serialization
/// always emits calendar order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthlyData {
    #[serde(rename = "January")]
    pub january: MonthCount,
    #[serde(rename = "February")]
    pub february: MonthCount,
    #[serde(rename = "March")]
    pub march: MonthCount,
    #[serde(rename = "April")]
    pub april: MonthCount,
    #[serde(rename = "May")]
    pub may: MonthCount,
    #[serde(rename = "June")]
    pub june: MonthCount,
    #[serde(rename = "July")]
    pub july: MonthCount,
    #[serde(rename = "August")]
    pub august: MonthCount,
    #[serde(rename = "September")]
    pub september: MonthCount,
    #[serde(rename = "October")]
    pub october: MonthCount,
    #[serde(rename = "November")]
    pub november: MonthCount,
    #[serde(rename = "December")]
    pub december: MonthCount,
}

impl MonthlyData {
    /// Mutable access by 1-based calendar month number
    pub fn get_mut(&mut self, month: u32) -> &mut MonthCount {
        match month {
            1 => &mut self.january,
            2 => &mut self.february,
            3 => &mut self.march,
            4 => &mut self.april,
            5 => &mut self.may,
            6 => &mut self.june,
            7 => &mut self.july,
            8 => &mut self.august,
            9 => &mut self.september,
            10 => &mut self.october,
            11 => &mut self.november,
            _ => &mut self.december,
        }
    }

    /// Read access by 1-based calendar month number
    pub fn get(&self, month: u32) -> MonthCount {
        match month {
            1 => self.january,
            2 => self.february,
            3 => self.march,
            4 => self.april,
            5 => self.may,
            6 => self.june,
            7 => self.july,
            8 => self.august,
            9 => self.september,
            10 => self.october,
            11 => self.november,
            _ => self.december,
        }
    }

    /// Sum of all month counters
    pub fn total(&self) -> i64 {
        (1..=12).map(|m| self.get(m).actual).sum()
    }
}

/// One calendar year inside a subscription bucket
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct YearSummary {
    pub total_customers: i64,
    /// Global distinct-customer count divided by 12, floored. Applied
    /// identically to every bucket; see DESIGN.md for the recorded quirk.
    pub average_customers: i64,
    pub monthly_data: MonthlyData,
}

/// One subscription/product bucket, years keyed by calendar year
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionBucket {
    pub data: BTreeMap<i32, YearSummary>,
}

/// Full per-business customer aggregate
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomerAggregate {
    pub business_id: Uuid,
    /// Distinct customers observed across all subscription buckets
    pub total_customers: i64,
    pub updated_at: DateTime<Utc>,
    pub subscription: BTreeMap<String, SubscriptionBucket>,
}

impl CustomerAggregate {
    pub fn new(business_id: Uuid) -> Self {
        Self {
            business_id,
            total_customers: 0,
            updated_at: Utc::now(),
            subscription: BTreeMap::new(),
        }
    }
}
