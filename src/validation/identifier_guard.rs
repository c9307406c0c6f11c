use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::AppError;

/// Unquoted PostgreSQL identifier: letters, digits, underscores; no leading digit
static VALID_IDENTIFIER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("Invalid identifier regex")
});

/// What an identifier names, used in error messages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdentifierKind {
    Schema,
    Table,
    Column,
}

impl fmt::Display for IdentifierKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IdentifierKind::Schema => write!(f, "schema"),
            IdentifierKind::Table => write!(f, "table"),
            IdentifierKind::Column => write!(f, "column"),
        }
    }
}

/// An identifier already wrapped in dialect quotes, safe to splice into SQL text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EscapedIdentifier(String);

impl EscapedIdentifier {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EscapedIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Guards schema identifiers before they are interpolated into introspection SQL.
///
/// Validation and escaping are independent: callers validate first and still
/// escape, so neither layer alone stands between user input and the SQL text.
pub struct IdentifierGuard;

impl IdentifierGuard {
    /// Reject anything outside the strict identifier allow-list
    pub fn validate(identifier: &str, kind: IdentifierKind) -> Result<(), AppError> {
        if identifier.trim().is_empty() || !VALID_IDENTIFIER.is_match(identifier) {
            return Err(AppError::invalid_identifier(identifier, kind));
        }
        Ok(())
    }

    /// Wrap in double quotes, doubling any embedded double quote
    pub fn escape(identifier: &str) -> EscapedIdentifier {
        EscapedIdentifier(format!("\"{}\"", identifier.replace('"', "\"\"")))
    }

    /// Wrap in single quotes, doubling any embedded single quote.
    /// For identifiers compared as values inside information_schema queries.
    pub fn escape_string_literal(value: &str) -> String {
        format!("'{}'", value.replace('\'', "''"))
    }

    /// Validate then escape in one step
    pub fn validated(identifier: &str, kind: IdentifierKind) -> Result<EscapedIdentifier, AppError> {
        Self::validate(identifier, kind)?;
        Ok(Self::escape(identifier))
    }
}
