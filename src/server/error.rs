//! JSON error responses
//!
//! Every [`ViewError`] is rendered as `{ code, message, details? }` with the
//! matching HTTP status. Storage failures are logged in full and reported
//! with a generic message.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::views::ViewError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    ValidationFailed,
    NotFound,
    Forbidden,
    Unauthorized,
    InternalError,
}

impl ErrorCode {
    pub fn status_code(self) -> StatusCode {
        match self {
            ErrorCode::ValidationFailed => StatusCode::BAD_REQUEST,
            ErrorCode::NotFound => StatusCode::NOT_FOUND,
            ErrorCode::Forbidden => StatusCode::FORBIDDEN,
            ErrorCode::Unauthorized => StatusCode::UNAUTHORIZED,
            ErrorCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: ErrorCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl From<ViewError> for ErrorBody {
    fn from(err: ViewError) -> Self {
        match err {
            ViewError::Invalid(errors) => ErrorBody {
                code: ErrorCode::ValidationFailed,
                message: "The submitted form has errors".to_string(),
                details: serde_json::to_value(&errors).ok(),
            },
            ViewError::NotFound(what) => ErrorBody {
                code: ErrorCode::NotFound,
                message: format!("{} not found", what),
                details: None,
            },
            ViewError::Forbidden(reason) => ErrorBody {
                code: ErrorCode::Forbidden,
                message: reason,
                details: None,
            },
            ViewError::Unauthenticated => ErrorBody {
                code: ErrorCode::Unauthorized,
                message: "Authentication required".to_string(),
                details: None,
            },
            ViewError::Storage(err) => {
                tracing::error!("Storage error: {:#}", err);
                ErrorBody {
                    code: ErrorCode::InternalError,
                    message: "Internal server error".to_string(),
                    details: None,
                }
            }
        }
    }
}

impl IntoResponse for ViewError {
    fn into_response(self) -> Response {
        let body = ErrorBody::from(self);
        (body.code.status_code(), Json(body)).into_response()
    }
}
