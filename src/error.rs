use thiserror::Error;

use crate::validation::IdentifierKind;

/// Maximum length of SQL or LLM text echoed back in error messages
pub const EXCERPT_MAX_LEN: usize = 100;

/// Application error types
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not connected to any database")]
    NotConnected,

    #[error("Failed to connect to database at {host}:{port}: {cause}")]
    ConnectionFailed {
        host: String,
        port: u16,
        cause: String,
    },

    #[error("Failed to execute SQL: {sql}: {cause}")]
    QueryExecutionFailed { sql: String, cause: String },

    #[error("Invalid SQL statement: {0}")]
    InvalidSql(String),

    #[error("LLM service is unavailable: {0}")]
    TranslationUnavailable(String),

    #[error("LLM returned invalid response: {0}")]
    InvalidTranslationResponse(String),

    #[error("Translation request timed out")]
    TranslationTimeout,

    #[error("Invalid {kind} name '{name}': must contain only letters, digits, and underscores, and start with a letter or underscore")]
    InvalidIdentifier { name: String, kind: IdentifierKind },

    #[error("Illegal {aggregate} transition: cannot {action} while {from}")]
    IllegalTransition {
        aggregate: &'static str,
        from: String,
        action: &'static str,
    },

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn connection_failed(host: &str, port: u16, cause: impl std::fmt::Display) -> Self {
        AppError::ConnectionFailed {
            host: host.to_string(),
            port,
            cause: cause.to_string(),
        }
    }

    pub fn query_execution_failed(sql: &str, cause: impl std::fmt::Display) -> Self {
        AppError::QueryExecutionFailed {
            sql: truncate(sql, EXCERPT_MAX_LEN),
            cause: cause.to_string(),
        }
    }

    pub fn invalid_sql(sql: &str) -> Self {
        AppError::InvalidSql(truncate(sql, EXCERPT_MAX_LEN))
    }

    pub fn invalid_translation_response(response: &str) -> Self {
        AppError::InvalidTranslationResponse(truncate(response, EXCERPT_MAX_LEN))
    }

    pub fn invalid_identifier(name: &str, kind: IdentifierKind) -> Self {
        AppError::InvalidIdentifier {
            name: truncate(name, EXCERPT_MAX_LEN),
            kind,
        }
    }

    pub fn illegal_transition(
        aggregate: &'static str,
        from: impl std::fmt::Debug,
        action: &'static str,
    ) -> Self {
        AppError::IllegalTransition {
            aggregate,
            from: format!("{:?}", from),
            action,
        }
    }

    /// Stable error code for programmatic handling
    pub const fn error_code(&self) -> &'static str {
        match self {
            AppError::NotConnected => "NOT_CONNECTED",
            AppError::ConnectionFailed { .. } => "CONNECTION_FAILED",
            AppError::QueryExecutionFailed { .. } => "QUERY_EXECUTION_FAILED",
            AppError::InvalidSql(_) => "INVALID_SQL",
            AppError::TranslationUnavailable(_) => "LLM_UNAVAILABLE",
            AppError::InvalidTranslationResponse(_) => "LLM_INVALID_RESPONSE",
            AppError::TranslationTimeout => "TRANSLATION_TIMEOUT",
            AppError::InvalidIdentifier { .. } => "INVALID_IDENTIFIER",
            AppError::IllegalTransition { .. } => "ILLEGAL_TRANSITION",
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

/// Cut `value` to at most `max_len` characters, marking the cut with "..."
pub fn truncate(value: &str, max_len: usize) -> String {
    if value.chars().count() <= max_len {
        return value.to_string();
    }
    let mut cut: String = value.chars().take(max_len).collect();
    cut.push_str("...");
    cut
}
