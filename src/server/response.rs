use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::json;

use crate::error::Error;

/// Standard API response wrapper
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    #[must_use]
    pub fn success(data: T) -> Self {
        Self {
            data: Some(data),
            error: None,
        }
    }
}

/// API error that converts to a proper HTTP response. Business-rule
/// rejections may carry a structured `detail` object for the caller's UI
/// (e.g. the owner name and redemption time of a double-scanned pass).
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
    pub detail: Option<serde_json::Value>,
}

impl ApiError {
    #[must_use]
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    #[must_use]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    #[must_use]
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, message)
    }

    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }

    #[must_use]
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            detail: None,
        }
    }

    #[must_use]
    pub fn with_detail(mut self, detail: serde_json::Value) -> Self {
        self.detail = Some(detail);
        self
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut body = json!({ "data": null, "error": self.message });
        if let Some(detail) = self.detail {
            body["detail"] = detail;
        }
        (self.status, Json(body)).into_response()
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        if !err.is_rejection() {
            tracing::error!("request failed: {err}");
        }

        let message = err.to_string();
        match err {
            Error::InputRequired(_) => ApiError::bad_request(message),
            Error::StudentNotFound | Error::TokenNotFound | Error::NotFound => {
                ApiError::not_found(message)
            }
            Error::DuplicateRollNumber => ApiError::conflict(message),
            Error::ActivePassExists {
                token,
                student_name,
            } => ApiError::conflict(message).with_detail(json!({
                "token": token,
                "student_name": student_name,
            })),
            Error::AlreadyRedeemed {
                student_name,
                used_at,
            } => ApiError::conflict(message).with_detail(json!({
                "student_name": student_name,
                "used_at": used_at,
            })),
            _ => ApiError::internal("Internal server error"),
        }
    }
}
