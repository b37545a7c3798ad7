use axum::{
    extract::Request,
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::time::Instant;
use thiserror::Error;
use tracing::{error, info, warn};

/// Logs one line per request. Handlers report what happened through the
/// `Result<(), ApiError>` extension set by [`to_response`].
pub async fn logging_middleware(req: Request, next: Next) -> Response {
    let method = req.method().clone();
    let uri = req.uri().clone();
    let start = Instant::now();

    let response = next.run(req).await;

    let status = response.status();
    let elapsed = start.elapsed();
    match response.extensions().get::<Result<(), ApiError>>() {
        Some(Ok(_)) => info!(
            method = %method,
            uri = %uri,
            status = %status,
            elapsed = ?elapsed,
            "Processed request"
        ),
        Some(Err(value)) if status.is_server_error() => error!(
            method = %method,
            uri = %uri,
            status = %status,
            elapsed = ?elapsed,
            value = %value,
            "Failed to process request"
        ),
        Some(Err(value)) => warn!(
            method = %method,
            uri = %uri,
            status = %status,
            elapsed = ?elapsed,
            value = %value,
            "Rejected request"
        ),
        None => warn!(
            method = %method,
            uri = %uri,
            status = %status,
            elapsed = ?elapsed,
            "Processed request, but no Response extension is set"
        ),
    }

    response
}

#[derive(Error, Clone, Debug)]
pub enum ApiError {
    #[error("Failed to create transaction")]
    TransactionCreationFailed,
    #[error("Failed to hash password {0}")]
    PasswordHashFailed(String),
    #[error("{0}")]
    General(String),
    #[error("Failed to generate token: {0}")]
    TokenGenerationFailed(String),
    #[error("Database error: {0}")]
    DbError(String),
    #[error("Failed to validate: {0}")]
    ValidationFail(String),
}

pub fn to_response<T: IntoResponse>(
    response: T,               //The response that we are sending + StatusCode
    ext: Result<(), ApiError>, //The extension, that we want to give logging middleware
) -> Response {
    let mut response = response.into_response();

    response.extensions_mut().insert(ext);

    response
}

/// `{"error": message}` with `status`, logging `ext` as the cause.
pub fn error_response(status: StatusCode, message: impl Into<String>, ext: ApiError) -> Response {
    to_response(
        (
            status,
            Json(json!({
                "error": message.into()
            })),
        ),
        Err(ext),
    )
}

pub fn internal_error(ext: ApiError) -> Response {
    error_response(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error", ext)
}
