use crate::services::{object_store::StoreError, uploads::UploadError};
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::fmt;

/// A lightweight wrapper for general errors that keeps the message local.
#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub message: String,
}

impl AppError {
    /// Create a new AppError with a specific status and message.
    pub fn new(status: StatusCode, msg: impl Into<String>) -> Self {
        Self {
            status,
            message: msg.into(),
        }
    }

    /// Shortcut for a 500 Internal Server Error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, msg)
    }

    /// Shortcut for 404 Not Found
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, msg)
    }

    /// Shortcut for 400 Bad Request
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, msg)
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for AppError {}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!(status = self.status.as_u16(), "{}", self.message);
        } else {
            tracing::debug!(status = self.status.as_u16(), "{}", self.message);
        }

        let body = Json(json!({
            "error": self.message,
            "status": self.status.as_u16()
        }));

        (self.status, body).into_response()
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::internal(err.to_string())
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::BucketNotFound(_) | StoreError::ObjectNotFound { .. } => {
                AppError::not_found(err.to_string())
            }
        }
    }
}

impl From<UploadError> for AppError {
    fn from(err: UploadError) -> Self {
        match err {
            UploadError::BadRequest(msg) => AppError::bad_request(msg),
            UploadError::NotFound(msg) => AppError::not_found(msg),
            UploadError::PreconditionFailed => {
                AppError::new(StatusCode::PRECONDITION_FAILED, "Precondition failed")
            }
            UploadError::NotImplemented(msg) => AppError::new(StatusCode::NOT_IMPLEMENTED, msg),
            UploadError::Io(msg) => AppError::internal(msg),
            UploadError::Store(store) => store.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upload_errors_map_to_http_statuses() {
        let cases = [
            (UploadError::BadRequest("bad".into()), StatusCode::BAD_REQUEST),
            (UploadError::NotFound("gone".into()), StatusCode::NOT_FOUND),
            (UploadError::PreconditionFailed, StatusCode::PRECONDITION_FAILED),
            (UploadError::NotImplemented("no".into()), StatusCode::NOT_IMPLEMENTED),
            (UploadError::Io("reset".into()), StatusCode::INTERNAL_SERVER_ERROR),
            (
                UploadError::Store(StoreError::BucketNotFound("b".into())),
                StatusCode::NOT_FOUND,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(AppError::from(err).status, status);
        }
    }

    #[test]
    fn io_message_is_passed_through() {
        let err = AppError::from(UploadError::Io("connection reset by peer".into()));
        assert_eq!(err.message, "connection reset by peer");
    }
}
