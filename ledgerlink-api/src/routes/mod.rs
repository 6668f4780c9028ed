//! API route handlers

pub mod auth;
pub mod connect;
pub mod customers;
pub mod health;
pub mod sales;
pub mod xero;

use axum::{routing::get, routing::post, Router};

use crate::state::AppState;

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Liveness
        .route("/", get(health::root))
        .route("/health", get(health::health_check))
        // Registration
        .route("/auth/register", post(auth::register))
        // Payment provider (Stripe)
        .route("/connect/connect", post(connect::connect))
        .route("/connect/stripe/callback", get(connect::stripe_callback))
        .route("/connect/transactions", post(connect::transactions))
        // Accounting provider (Xero)
        .route("/xero/connect", post(xero::connect))
        .route("/xero/callback", get(xero::callback))
        .route("/xero/bank_transactions", get(xero::bank_transactions))
        // Customer aggregation
        .route("/customers/actual_customer", post(customers::actual_customer))
        // Sales listings
        .route("/sales/actual_sales", get(sales::actual_sales))
        .route("/sales/actual_sales/:customer_id", get(sales::actual_sales_for_customer))
        .route("/sales/refunds", get(sales::refunds))
        // State
        .with_state(state)
}
