use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use pastebin_lite_common::{ErrorBody, ValidationError};
use thiserror::Error;
use tracing::{debug, error};

use crate::store::StoreError;

/// Body-level failures do not echo parser details back to the caller.
pub const INVALID_INPUT: &str = "Invalid input";

pub type Result<T, E = AppError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),
    #[error("paste content is too large")]
    PayloadTooLarge,
    /// Unknown, expired and exhausted pastes all look the same to callers.
    #[error("Paste not found")]
    NotFound,
    #[error("store unavailable")]
    Unavailable,
    #[error("internal error: {0:#}")]
    Internal(#[from] anyhow::Error),
}

impl From<ValidationError> for AppError {
    fn from(e: ValidationError) -> Self {
        Self::Validation(e.to_string())
    }
}

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        Self::Internal(e.into())
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            Self::PayloadTooLarge
        } else {
            debug!("Rejected request body: {}", rejection.body_text());
            Self::Validation(INVALID_INPUT.into())
        }
    }
}

impl AppError {
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to show to the caller. Internal details stay in the
    /// logs.
    pub fn public_message(&self) -> String {
        match self {
            Self::Internal(_) => "Internal server error".into(),
            other => other.to_string(),
        }
    }

    /// Logs failures the caller will not see the details of.
    pub fn report(&self) {
        if let Self::Internal(e) = self {
            error!("Request failed: {e:#}");
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        self.report();

        let body = ErrorBody {
            error: self.public_message(),
        };
        (self.status(), Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn internal_errors_hide_details() {
        let err = AppError::from(StoreError::Corrupt("secret row".into()));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.public_message(), "Internal server error");
        assert!(err.to_string().contains("secret row"));
    }

    #[test]
    fn validation_errors_are_bad_requests() {
        let err = AppError::from(ValidationError::EmptyContent);
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.public_message(), "content must be a non-empty string");
    }

    #[test]
    fn not_found_is_opaque() {
        assert_eq!(AppError::NotFound.status(), StatusCode::NOT_FOUND);
        assert_eq!(AppError::NotFound.public_message(), "Paste not found");
    }
}
