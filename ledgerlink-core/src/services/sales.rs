//! Sales service - platform-level charge and refund listings

use std::sync::Arc;

use chrono::{DateTime, Local};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::adapters::stripe::{StripeAdapter, StripeCharge, StripeRefund};
use crate::domain::result::Result;
use crate::domain::CanonicalTransaction;

/// Formatted charge, shaped for the sales listings
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SalePayment {
    pub transaction_id: String,
    /// Major units, two decimal places
    pub amount: String,
    pub currency: String,
    pub status: String,
    pub description: String,
    pub date: String,
    pub time: String,
    pub customer_id: String,
    pub customer_email: String,
    pub payment_method: String,
}

/// Formatted refund
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefundRecord {
    pub refund_id: String,
    pub amount: String,
    pub currency: String,
    pub status: String,
    pub reason: String,
    pub created: String,
    pub payment_intent: String,
}

/// Sales listings over the payment provider's platform account
pub struct SalesService {
    stripe: Arc<StripeAdapter>,
}

impl SalesService {
    pub fn new(stripe: Arc<StripeAdapter>) -> Self {
        Self { stripe }
    }

    /// List charges, optionally narrowed to one customer
    pub async fn actual_sales(&self, customer: Option<&str>) -> Result<Vec<SalePayment>> {
        let charges = self.stripe.list_charges(customer).await?;
        Ok(charges.iter().map(format_payment).collect())
    }

    /// List refunds
    pub async fn refunds(&self) -> Result<Vec<RefundRecord>> {
        let refunds = self.stripe.list_refunds().await?;
        Ok(refunds.iter().map(format_refund).collect())
    }
}

fn local_datetime(ts: i64) -> DateTime<Local> {
    DateTime::from_timestamp(ts, 0)
        .unwrap_or(DateTime::UNIX_EPOCH)
        .with_timezone(&Local)
}

fn major_units(minor: i64) -> String {
    Decimal::new(minor, 2).to_string()
}

/// Format a charge the way the sales listings present payments
fn format_payment(charge: &StripeCharge) -> SalePayment {
    let created = local_datetime(charge.created);

    let payment_method = match &charge.payment_method_details {
        Some(details) => match &details.card {
            Some(card) => format!("{} **** {}", card.brand.to_uppercase(), card.last4),
            None => details
                .kind
                .clone()
                .unwrap_or_else(|| CanonicalTransaction::UNKNOWN.to_string()),
        },
        None => CanonicalTransaction::UNKNOWN.to_string(),
    };

    SalePayment {
        transaction_id: charge.id.clone(),
        amount: major_units(charge.amount),
        currency: charge.currency.to_uppercase(),
        status: charge.status.clone(),
        description: charge
            .description
            .clone()
            .unwrap_or_else(|| "No description".to_string()),
        date: created.format("%Y-%m-%d").to_string(),
        time: created.format("%H:%M:%S").to_string(),
        customer_id: charge
            .customer
            .clone()
            .unwrap_or_else(|| CanonicalTransaction::UNKNOWN.to_string()),
        customer_email: charge
            .billing_details
            .as_ref()
            .and_then(|b| b.email.clone())
            .unwrap_or_else(|| CanonicalTransaction::UNKNOWN.to_string()),
        payment_method,
    }
}

fn format_refund(refund: &StripeRefund) -> RefundRecord {
    RefundRecord {
        refund_id: refund.id.clone(),
        amount: major_units(refund.amount),
        currency: refund.currency.to_uppercase(),
        status: refund
            .status
            .clone()
            .unwrap_or_else(|| CanonicalTransaction::UNKNOWN.to_string()),
        reason: refund
            .reason
            .clone()
            .unwrap_or_else(|| CanonicalTransaction::UNKNOWN.to_string()),
        created: local_datetime(refund.created)
            .format("%Y-%m-%d %H:%M:%S")
            .to_string(),
        payment_intent: refund
            .payment_intent
            .clone()
            .unwrap_or_else(|| CanonicalTransaction::UNKNOWN.to_string()),
    }
}
