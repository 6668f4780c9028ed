//! Registration endpoint

use axum::{extract::State, http::StatusCode, Json};

use crate::dto::{RegisterData, RegisterRequest, RegisterResponse};
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// POST /auth/register - create a business account
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<RegisterResponse>)> {
    let registered = state
        .ctx
        .registration_service
        .register(
            req.name.as_deref().unwrap_or(""),
            req.email.as_deref().unwrap_or(""),
            req.password.as_deref().unwrap_or(""),
        )
        .await
        .map_err(ApiError::context("Failed to register business"))?;

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            success: true,
            message: "Business account created successfully".to_string(),
            data: RegisterData {
                _id: registered.business.id.to_string(),
                name: registered.business.name,
                email: registered.business.email,
                stripe_redirect_url: registered.payment_authorize_url,
            },
        }),
    ))
}
