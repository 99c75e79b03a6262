use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

#[derive(Debug)]
pub enum ApiError {
    /// Plain-text 400 from the OAuth callback.
    BadRequest(String),
    /// Token exchange failure; the message is echoed to the caller.
    AuthFailed(String),
    ListFailed,
    UploadFailed,
    InvalidUpload(String),
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

fn json_error(status: StatusCode, error: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: error.into(),
        }),
    )
        .into_response()
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg).into_response(),
            ApiError::AuthFailed(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Authentication failed: {msg}"),
            )
                .into_response(),
            ApiError::ListFailed => {
                json_error(StatusCode::INTERNAL_SERVER_ERROR, "Failed to list files")
            }
            ApiError::UploadFailed => {
                json_error(StatusCode::INTERNAL_SERVER_ERROR, "Failed to upload file")
            }
            ApiError::InvalidUpload(msg) => json_error(StatusCode::BAD_REQUEST, msg),
        }
    }
}
