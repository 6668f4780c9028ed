//! Customer aggregation endpoint

use axum::{extract::State, Json};

use crate::dto::{parse_bid, ConnectRequest, CustomerAggregateResponse};
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// POST /customers/actual_customer - recompute and persist the customer
/// aggregate for a business
pub async fn actual_customer(
    State(state): State<AppState>,
    Json(req): Json<ConnectRequest>,
) -> ApiResult<Json<CustomerAggregateResponse>> {
    let business_id = parse_bid(&req.bid, "request body")?;

    let aggregate = state
        .ctx
        .aggregation_service
        .run(business_id)
        .await
        .map_err(ApiError::context("Failed to fetch customers"))?;

    let subscription = serde_json::to_value(&aggregate.subscription)
        .map_err(|e| ApiError::from(ledgerlink_core::Error::from(e)))?;

    Ok(Json(CustomerAggregateResponse {
        bid: business_id.to_string(),
        message: "Customers actuals details retrieved".to_string(),
        total_customers: aggregate.total_customers,
        updated_at: aggregate.updated_at,
        subscription,
    }))
}
