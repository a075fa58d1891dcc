use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use baladi_core::StoreError;
use baladi_offer::eligibility::RedeemError;
use baladi_venue::filters::SearchError;

#[derive(Debug)]
pub enum AppError {
    Unauthorized(String),
    Validation(String),
    NotFound(String),
    Conflict { code: &'static str, message: String },
    Contention { attempts: u32 },
    Internal(anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::Unauthorized(msg) => {
                (StatusCode::UNAUTHORIZED, Json(json!({ "error": msg }))).into_response()
            }
            AppError::Validation(msg) => {
                (StatusCode::UNPROCESSABLE_ENTITY, Json(json!({ "error": msg }))).into_response()
            }
            AppError::NotFound(msg) => {
                (StatusCode::NOT_FOUND, Json(json!({ "error": msg }))).into_response()
            }
            AppError::Conflict { code, message } => (
                StatusCode::CONFLICT,
                Json(json!({ "error": message, "code": code })),
            )
                .into_response(),
            AppError::Contention { attempts } => {
                let mut response = (
                    StatusCode::SERVICE_UNAVAILABLE,
                    Json(json!({
                        "error": "redemption is contended, retry shortly",
                        "attempts": attempts,
                    })),
                )
                    .into_response();
                response.headers_mut().insert(
                    axum::http::header::RETRY_AFTER,
                    axum::http::HeaderValue::from_static("1"),
                );
                response
            }
            AppError::Internal(err) => {
                tracing::error!("Internal Server Error: {err:#}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": "Internal Server Error" })),
                )
                    .into_response()
            }
        }
    }
}

impl From<RedeemError> for AppError {
    fn from(err: RedeemError) -> Self {
        match err {
            RedeemError::NotRedeemable(reason) => AppError::Conflict {
                code: reason.as_str(),
                message: format!("offer is not redeemable: {reason}"),
            },
            RedeemError::UserLimitExceeded => AppError::Conflict {
                code: "user_limit_exceeded",
                message: "per-user redemption limit reached".to_string(),
            },
            RedeemError::ContentionExceeded { attempts } => AppError::Contention { attempts },
            RedeemError::OfferNotFound => AppError::NotFound("offer not found".to_string()),
            RedeemError::Store(e) => AppError::Internal(anyhow::Error::new(e)),
        }
    }
}

impl From<SearchError> for AppError {
    fn from(err: SearchError) -> Self {
        match err {
            SearchError::InvalidFilter(msg) => AppError::Validation(msg),
            SearchError::Store(e) => AppError::Internal(anyhow::Error::new(e)),
        }
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound => AppError::NotFound("record not found".to_string()),
            other => AppError::Internal(anyhow::Error::new(other)),
        }
    }
}
