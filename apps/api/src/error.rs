use axum::Json;
use axum::http::{HeaderName, HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use leasegate_application::NOT_AUTHORIZED_MESSAGE;
use leasegate_core::AppError;
use tracing::{error, warn};

mod types;

pub use types::ErrorResponse;

/// Header naming the limiter tier that evaluated the request.
pub const RATE_LIMIT_TIER_HEADER: HeaderName = HeaderName::from_static("x-ratelimit-tier");

const INTERNAL_ERROR_MESSAGE: &str = "internal server error";

/// HTTP API error wrapper around core application errors.
#[derive(Debug)]
pub struct ApiError(pub AppError);

impl From<AppError> for ApiError {
    fn from(value: AppError) -> Self {
        Self(value)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self.0 {
            AppError::RateLimited {
                message,
                retry_after_seconds,
                tier_index,
            } => {
                let mut response = (
                    StatusCode::TOO_MANY_REQUESTS,
                    Json(ErrorResponse::new(message)),
                )
                    .into_response();
                let headers = response.headers_mut();
                headers.insert(header::RETRY_AFTER, HeaderValue::from(retry_after_seconds));
                headers.insert(RATE_LIMIT_TIER_HEADER, HeaderValue::from(tier_index));
                response
            }
            AppError::Forbidden(detail) => {
                warn!(detail = %detail, "request forbidden");
                (
                    StatusCode::FORBIDDEN,
                    Json(ErrorResponse::new(NOT_AUTHORIZED_MESSAGE)),
                )
                    .into_response()
            }
            AppError::Internal(detail) => {
                error!(detail = %detail, "request failed with internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(ErrorResponse::new(INTERNAL_ERROR_MESSAGE)),
                )
                    .into_response()
            }
            other => {
                let status = match other {
                    AppError::Validation(_) => StatusCode::BAD_REQUEST,
                    AppError::NotFound(_) => StatusCode::NOT_FOUND,
                    AppError::Conflict(_) => StatusCode::CONFLICT,
                    _ => StatusCode::UNAUTHORIZED,
                };

                (status, Json(ErrorResponse::new(other.to_string()))).into_response()
            }
        }
    }
}

/// Standard API result type.
pub type ApiResult<T> = Result<T, ApiError>;
