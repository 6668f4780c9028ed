//! Payment-provider connection and sync endpoints

use axum::{
    extract::{Query, State},
    Json,
};
use ledgerlink_core::ProviderKind;

use crate::dto::{
    parse_bid, ConnectRequest, OAuthCallbackQuery, StripeCallbackResponse, StripeConnectResponse,
    SyncResponse,
};
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// POST /connect/connect - build the payment-provider authorize URL
pub async fn connect(
    State(state): State<AppState>,
    Json(req): Json<ConnectRequest>,
) -> ApiResult<Json<StripeConnectResponse>> {
    let business_id = parse_bid(&req.bid, "request body")?;

    let url = state
        .ctx
        .connect_service
        .initiate(business_id, ProviderKind::Payment)
        .await
        .map_err(ApiError::context("Failed to generate Stripe connect URL"))?;

    Ok(Json(StripeConnectResponse {
        message: "Stripe Connect URL generated".to_string(),
        bid: business_id.to_string(),
        stripe_auth_url: url,
    }))
}

/// GET /connect/stripe/callback - exchange the returned code for tokens
pub async fn stripe_callback(
    State(state): State<AppState>,
    Query(query): Query<OAuthCallbackQuery>,
) -> ApiResult<Json<StripeCallbackResponse>> {
    let code = query
        .code
        .as_deref()
        .filter(|c| !c.is_empty())
        .ok_or_else(|| ApiError::BadRequest("Missing code or BID".to_string()))?;
    let business_id = parse_bid(&query.state, "callback query")?;

    let credentials = state
        .ctx
        .connect_service
        .complete_handshake(code, business_id, ProviderKind::Payment)
        .await
        .map_err(ApiError::context("Stripe OAuth failed"))?;

    Ok(Json(StripeCallbackResponse {
        message: "Stripe account connected successfully".to_string(),
        bid: business_id.to_string(),
        stripe_user_id: credentials.account_id,
    }))
}

/// POST /connect/transactions - full paginated transaction sync
pub async fn transactions(
    State(state): State<AppState>,
    Json(req): Json<ConnectRequest>,
) -> ApiResult<Json<SyncResponse>> {
    let business_id = parse_bid(&req.bid, "request body")?;

    let transactions = state
        .ctx
        .sync_service
        .sync_all(business_id, ProviderKind::Payment)
        .await
        .map_err(ApiError::context("Failed to fetch transactions"))?;

    Ok(Json(SyncResponse {
        message: "Transactions fetched successfully".to_string(),
        count: transactions.len(),
        transactions,
    }))
}
