//! API error types

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use ledgerlink_core::Error as CoreError;
use serde::Serialize;
use thiserror::Error;

/// API error types
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{context}")]
    Core {
        context: String,
        #[source]
        source: CoreError,
    },
}

impl ApiError {
    /// Wrap a core error with a route-level context message; the context
    /// becomes the response `message`, the core error the `error` field
    pub fn context(context: impl Into<String>) -> impl FnOnce(CoreError) -> ApiError {
        let context = context.into();
        move |source| ApiError::Core { context, source }
    }
}

impl From<CoreError> for ApiError {
    fn from(source: CoreError) -> Self {
        ApiError::Core {
            context: "Request failed".to_string(),
            source,
        }
    }
}

/// Error response body: `{ message, error }`
#[derive(Serialize)]
pub struct ErrorResponse {
    pub message: String,
    pub error: String,
}

fn status_for(error: &CoreError) -> StatusCode {
    match error {
        CoreError::Validation(_) => StatusCode::BAD_REQUEST,
        CoreError::NotFound(_) => StatusCode::NOT_FOUND,
        CoreError::Duplicate(_) => StatusCode::CONFLICT,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message, error) = match self {
            ApiError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, msg.clone(), msg)
            }
            ApiError::Core { context, source } => {
                (status_for(&source), context, source.to_string())
            }
        };

        let body = ErrorResponse { message, error };
        (status, Json(body)).into_response()
    }
}

/// API result type
pub type ApiResult<T> = Result<T, ApiError>;
