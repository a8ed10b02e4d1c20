use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use storefront_core::DomainError;
use storefront_infra::command_dispatcher::DispatchError;
use storefront_pricing::TierRejection;

pub fn dispatch_error_to_response(err: DispatchError) -> axum::response::Response {
    match err {
        DispatchError::Rejected { code, reason } => {
            json_error(StatusCode::UNPROCESSABLE_ENTITY, code, reason)
        }
        DispatchError::Concurrency(msg) => json_error(StatusCode::CONFLICT, "concurrent_modification", msg),
        DispatchError::Conflict(msg) => json_error(StatusCode::CONFLICT, "conflict", msg),
        DispatchError::Validation(msg) => json_error(StatusCode::BAD_REQUEST, "validation_error", msg),
        DispatchError::InvariantViolation(msg) => {
            json_error(StatusCode::UNPROCESSABLE_ENTITY, "invariant_violation", msg)
        }
        DispatchError::NotFound => json_error(StatusCode::NOT_FOUND, "not_found", "not found"),
        DispatchError::Publish(msg) => json_error(StatusCode::BAD_GATEWAY, "publish_error", msg),
        err @ (DispatchError::Deserialize(_) | DispatchError::CorruptStream(_) | DispatchError::Store(_)) => {
            tracing::error!(error = %err, "storage failure");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "store_error", err.to_string())
        }
    }
}

/// A tier form that failed its syntax check.
pub fn rejection_to_response(rejection: TierRejection) -> axum::response::Response {
    json_error(StatusCode::UNPROCESSABLE_ENTITY, rejection.code(), rejection.to_string())
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

/// A path segment that is not an id.
pub fn invalid_id(err: DomainError) -> axum::response::Response {
    json_error(StatusCode::BAD_REQUEST, err.code(), err.to_string())
}
