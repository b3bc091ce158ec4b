use axum::body::{Body, to_bytes};
use axum::extract::{Request, State};
use axum::http::{HeaderValue, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use leasegate_core::AppError;
use leasegate_domain::{RequestMetadata, rate_limit_key};
use serde_json::Value;
use tracing::warn;

use crate::client_address::client_address;
use crate::error::{ApiError, RATE_LIMIT_TIER_HEADER};
use crate::state::AppState;

/// Largest body buffered while looking for a credential identifier.
pub const MAX_IDENTITY_BODY_BYTES: usize = 64 * 1024;

const IDENTITY_FIELDS: [&str; 2] = ["email", "username"];

/// Applies the tiered limiter keyed by credential identifier and client address.
///
/// The body is buffered, inspected and re-attached unchanged. Each admitted
/// response carries the evaluated tier; its status feeds the adaptive tracker.
pub async fn rate_limit(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let address = client_address(request.headers());
    let metadata = RequestMetadata::new(request.uri().path(), request.method().as_str());

    let (parts, body) = request.into_parts();
    let bytes = match to_bytes(body, MAX_IDENTITY_BODY_BYTES).await {
        Ok(bytes) => bytes,
        Err(error) => {
            return ApiError(AppError::Validation(format!(
                "request body could not be read within {MAX_IDENTITY_BODY_BYTES} bytes: {error}"
            )))
            .into_response();
        }
    };

    let identity = credential_identifier(&bytes);
    let key = rate_limit_key(identity.as_deref(), address.as_str());
    let decision = state.rate_limit_service.check_limit(&key, &metadata).await;

    if !decision.allowed {
        record_outcome(&state, &key, false).await;
        return ApiError(AppError::RateLimited {
            message: decision.message,
            retry_after_seconds: decision.retry_after_seconds.unwrap_or(1),
            tier_index: decision.tier_index,
        })
        .into_response();
    }

    let mut response = next.run(Request::from_parts(parts, Body::from(bytes))).await;
    response.headers_mut().insert(
        RATE_LIMIT_TIER_HEADER,
        HeaderValue::from(decision.tier_index),
    );

    if let Some(success) = outcome_for_status(response.status()) {
        record_outcome(&state, &key, success).await;
    }

    response
}

fn credential_identifier(body: &[u8]) -> Option<String> {
    if body.is_empty() {
        return None;
    }

    let payload = serde_json::from_slice::<Value>(body).ok()?;
    IDENTITY_FIELDS.iter().find_map(|field| {
        payload
            .get(field)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(str::to_lowercase)
    })
}

fn outcome_for_status(status: StatusCode) -> Option<bool> {
    match status.as_u16() {
        0..=399 => Some(true),
        401 | 403 | 422 | 429 => Some(false),
        _ => None,
    }
}

async fn record_outcome(state: &AppState, key: &str, success: bool) {
    if let Err(error) = state
        .adaptive_rate_limit_service
        .record_outcome(key, success)
        .await
    {
        warn!(key, success, error = %error, "failed to record client behavior");
    }
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;

    use super::{credential_identifier, outcome_for_status};

    #[test]
    fn identifier_prefers_email_then_username() {
        assert_eq!(
            credential_identifier(br#"{"email":"  Alice@Example.COM ","username":"al"}"#),
            Some("alice@example.com".to_owned())
        );
        assert_eq!(
            credential_identifier(br#"{"email":"","username":"Bob"}"#),
            Some("bob".to_owned())
        );
        assert_eq!(credential_identifier(br#"{"resource":"lease"}"#), None);
        assert_eq!(credential_identifier(b"not json"), None);
        assert_eq!(credential_identifier(b""), None);
    }

    #[test]
    fn statuses_map_to_outcomes() {
        assert_eq!(outcome_for_status(StatusCode::OK), Some(true));
        assert_eq!(outcome_for_status(StatusCode::NO_CONTENT), Some(true));
        assert_eq!(outcome_for_status(StatusCode::UNAUTHORIZED), Some(false));
        assert_eq!(outcome_for_status(StatusCode::FORBIDDEN), Some(false));
        assert_eq!(outcome_for_status(StatusCode::UNPROCESSABLE_ENTITY), Some(false));
        assert_eq!(outcome_for_status(StatusCode::TOO_MANY_REQUESTS), Some(false));
        assert_eq!(outcome_for_status(StatusCode::NOT_FOUND), None);
        assert_eq!(outcome_for_status(StatusCode::INTERNAL_SERVER_ERROR), None);
    }
}
