//! Accounting-provider connection and ledger endpoints

use axum::{
    extract::{Query, State},
    Json,
};
use ledgerlink_core::{CanonicalTransaction, Direction, ProviderKind};
use serde_json::{json, Value as JsonValue};

use crate::dto::{
    parse_bid, BankTransactionsQuery, BankTransactionsResponse, ConnectRequest,
    OAuthCallbackQuery, XeroCallbackResponse, XeroConnectResponse,
};
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// POST /xero/connect - build the accounting-provider authorize URL
pub async fn connect(
    State(state): State<AppState>,
    Json(req): Json<ConnectRequest>,
) -> ApiResult<Json<XeroConnectResponse>> {
    let business_id = parse_bid(&req.bid, "request body")?;

    let url = state
        .ctx
        .connect_service
        .initiate(business_id, ProviderKind::Accounting)
        .await
        .map_err(ApiError::context("Failed to generate Xero connect URL"))?;

    Ok(Json(XeroConnectResponse {
        bid: business_id.to_string(),
        message: "XERO url generated".to_string(),
        url,
    }))
}

/// GET /xero/callback - exchange the returned code for tokens
pub async fn callback(
    State(state): State<AppState>,
    Query(query): Query<OAuthCallbackQuery>,
) -> ApiResult<Json<XeroCallbackResponse>> {
    let code = query
        .code
        .as_deref()
        .filter(|c| !c.is_empty())
        .ok_or_else(|| ApiError::BadRequest("Authorization code missing".to_string()))?;
    let business_id = parse_bid(&query.state, "callback query")?;

    let credentials = state
        .ctx
        .connect_service
        .complete_handshake(code, business_id, ProviderKind::Accounting)
        .await
        .map_err(ApiError::context("Xero OAuth failed"))?;

    Ok(Json(XeroCallbackResponse {
        message: "Xero connected successfully".to_string(),
        access_token: credentials.access_token,
        refresh_token: credentials.refresh_token,
    }))
}

/// GET /xero/bank_transactions?BID= - sync and normalize the bank ledger
pub async fn bank_transactions(
    State(state): State<AppState>,
    Query(query): Query<BankTransactionsQuery>,
) -> ApiResult<Json<BankTransactionsResponse>> {
    let business_id = parse_bid(&query.bid, "query string")?;

    let transactions = state
        .ctx
        .sync_service
        .sync_all(business_id, ProviderKind::Accounting)
        .await
        .map_err(ApiError::context("Failed to fetch Xero transactions"))?;

    Ok(Json(BankTransactionsResponse {
        transactions: transactions.iter().map(bank_transaction_payload).collect(),
    }))
}

/// Shape one canonical bank transaction as a single-key object keyed by its
/// ISO date, carrying the accounting-provider fields alongside the empty
/// categorisation slot downstream consumers fill in
fn bank_transaction_payload(tx: &CanonicalTransaction) -> JsonValue {
    let direction = match tx.direction {
        Direction::Outflow => "SPEND",
        Direction::Inflow => "RECEIVE",
    };

    let contact = if tx.counterparty == CanonicalTransaction::UNKNOWN {
        ""
    } else {
        tx.counterparty.as_str()
    };
    let bank_account = tx
        .raw
        .get("BankAccount")
        .and_then(|b| b.get("Name"))
        .and_then(|v| v.as_str())
        .unwrap_or("");
    let (from, to) = match tx.direction {
        Direction::Outflow => (bank_account, contact),
        Direction::Inflow => (contact, bank_account),
    };

    let iso_date = tx.date.map(|d| d.to_rfc3339());
    let key = iso_date.clone().unwrap_or_else(|| "unknown_date".to_string());

    let entry = json!({
        "3rd_party": "xero",
        "3rd_party_type": "bank transaction",
        "transaction_direction": direction,
        "transaction_from": from,
        "transaction_to": to,
        "batch_payment": tx.raw.get("BatchPayment").and_then(|b| b.get("Reference")).and_then(|v| v.as_str()).unwrap_or(""),
        "is_reconciled": tx.raw.get("IsReconciled").and_then(|v| v.as_bool()).unwrap_or(false),
        "reference": tx.raw.get("Reference").and_then(|v| v.as_str()).unwrap_or(""),
        "currency_code": tx.currency.as_str(),
        "currency_rate": tx.raw.get("CurrencyRate").cloned().unwrap_or_else(|| json!(1)),
        "transaction_date": iso_date,
        "transaction_status": tx.status.as_str(),
        "transaction_amount": tx.amount,
        "transaction_total_tax": tx.raw.get("TotalTax").cloned().unwrap_or_else(|| json!(0)),
        "transaction_total": tx.amount,
        "last_updated": tx.raw.get("UpdatedDateUTC").cloned().unwrap_or(JsonValue::Null),
        "our_categorisation": {
            "transaction_category": "",
            "transaction_subcategory": "",
            "transaction_department": "",
            "transaction_type": ""
        }
    });

    let mut keyed = serde_json::Map::new();
    keyed.insert(key, entry);
    JsonValue::Object(keyed)
}
