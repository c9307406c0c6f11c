use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

pub use crate::error::AppError;

/// Error response format
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorDetail {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::NotConnected => StatusCode::CONFLICT,
            AppError::Validation(_) | AppError::InvalidSql(_) | AppError::InvalidIdentifier { .. } => {
                StatusCode::BAD_REQUEST
            }
            AppError::ConnectionFailed { .. } | AppError::InvalidTranslationResponse(_) => {
                StatusCode::BAD_GATEWAY
            }
            AppError::QueryExecutionFailed { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::TranslationUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::TranslationTimeout => StatusCode::GATEWAY_TIMEOUT,
            AppError::IllegalTransition { .. } | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Actionable hint shown alongside the message
    fn suggestion(&self) -> Option<&'static str> {
        match self {
            AppError::NotConnected => Some("Connect to a database first with POST /api/connections."),
            AppError::TranslationUnavailable(_) => {
                Some("Check that the LLM service is running and LLM_BASE_URL points to it.")
            }
            AppError::TranslationTimeout => {
                Some("Try a simpler question or raise LLM_TIMEOUT_SECS.")
            }
            AppError::InvalidIdentifier { .. } => {
                Some("Names may contain only letters, digits and underscores.")
            }
            _ => None,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(code = self.error_code(), "Request failed: {}", self);
        }

        let mut error_detail = ErrorDetail::new(self.error_code(), self.to_string());
        if let Some(suggestion) = self.suggestion() {
            error_detail = error_detail.with_details(suggestion);
        }

        let body = Json(ErrorResponse {
            error: error_detail,
        });

        (status, body).into_response()
    }
}
