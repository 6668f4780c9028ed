//! Sales listing endpoints

use axum::{
    extract::{Path, State},
    Json,
};

use crate::dto::{RefundsResponse, SalesResponse};
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// GET /sales/actual_sales - list charges on the platform account
pub async fn actual_sales(State(state): State<AppState>) -> ApiResult<Json<SalesResponse>> {
    let transactions = state
        .ctx
        .sales_service
        .actual_sales(None)
        .await
        .map_err(ApiError::context("Failed to fetch Stripe transactions"))?;

    Ok(Json(SalesResponse {
        message: "Stripe transactions fetched successfully".to_string(),
        transactions,
    }))
}

/// GET /sales/actual_sales/:customer_id - list charges for one customer
pub async fn actual_sales_for_customer(
    State(state): State<AppState>,
    Path(customer_id): Path<String>,
) -> ApiResult<Json<SalesResponse>> {
    let transactions = state
        .ctx
        .sales_service
        .actual_sales(Some(&customer_id))
        .await
        .map_err(ApiError::context(format!(
            "Failed to fetch transactions for customer {}",
            customer_id
        )))?;

    Ok(Json(SalesResponse {
        message: format!("Stripe transactions fetched for customer {}", customer_id),
        transactions,
    }))
}

/// GET /sales/refunds - list refunds on the platform account
pub async fn refunds(State(state): State<AppState>) -> ApiResult<Json<RefundsResponse>> {
    let refunds = state
        .ctx
        .sales_service
        .refunds()
        .await
        .map_err(ApiError::context("Failed to fetch Stripe refunds"))?;

    Ok(Json(RefundsResponse {
        message: "Stripe refunds fetched successfully".to_string(),
        refunds,
    }))
}
