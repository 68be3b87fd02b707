use core::str::FromStr;

use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use stockroom_core::{ErrorCode, Page};
use stockroom_infra::ServiceError;

/// HTTP status for each stable error code.
pub fn status_for(code: ErrorCode) -> StatusCode {
    match code {
        ErrorCode::InvalidArgument => StatusCode::BAD_REQUEST,
        ErrorCode::NotFound => StatusCode::NOT_FOUND,
        ErrorCode::OptimisticLockFailed
        | ErrorCode::Conflict
        | ErrorCode::InvalidTransferState
        | ErrorCode::AlreadyTerminal => StatusCode::CONFLICT,
        ErrorCode::InsufficientStock
        | ErrorCode::InsufficientReservation
        | ErrorCode::LocationInactive => StatusCode::UNPROCESSABLE_ENTITY,
        ErrorCode::PersistenceFailure => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

pub fn service_error_to_response(err: ServiceError) -> axum::response::Response {
    let code = err.code();
    if code == ErrorCode::PersistenceFailure {
        tracing::error!(error = %err, "request failed in the record store");
    }
    json_error(status_for(code), code.as_str(), err.to_string())
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

/// Parse a path or body identifier, answering 400 `invalid_argument` on failure.
pub fn parse_id<T: FromStr>(raw: &str, what: &str) -> Result<T, axum::response::Response> {
    raw.parse().map_err(|_| {
        json_error(
            StatusCode::BAD_REQUEST,
            ErrorCode::InvalidArgument.as_str(),
            format!("invalid {what}: {raw}"),
        )
    })
}

pub fn parse_opt_id<T: FromStr>(
    raw: Option<&str>,
    what: &str,
) -> Result<Option<T>, axum::response::Response> {
    raw.map(|r| parse_id(r, what)).transpose()
}

/// Build a page from raw query values; negatives are rejected.
pub fn parse_page(limit: Option<i64>, offset: Option<i64>) -> Result<Page, axum::response::Response> {
    Page::from_raw(limit.unwrap_or(0), offset.unwrap_or(0))
        .map_err(|e| service_error_to_response(ServiceError::from(e)))
}
