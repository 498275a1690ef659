//! Error types for glyphdrill operations.
//!
//! Wrong keystrokes are not errors; they are ordinary state transitions.
//! Everything in here is either degenerate input rejected at the boundary,
//! an operation invoked in the wrong stage, or a ledger/config backend
//! failure.

use std::collections::HashMap;
use thiserror::Error;

/// Result type alias for glyphdrill operations.
pub type GlyphResult<T> = Result<T, GlyphError>;

/// Main error type for all glyphdrill operations.
#[derive(Error, Debug)]
pub enum GlyphError {
    /// Input validation failed.
    #[error("Validation error: {message}")]
    Validation {
        message: String,
        code: ErrorCode,
        details: HashMap<String, String>,
        suggestion: Option<String>,
    },

    /// Symbol not present in the catalog.
    #[error("Symbol not found: {message}")]
    NotFound {
        message: String,
        code: ErrorCode,
        symbol_code: Option<String>,
    },

    /// Operation invoked in a stage or state that does not support it.
    #[error("Precondition violated: {message}")]
    Precondition { message: String, code: ErrorCode },

    /// Progress ledger operation failed.
    #[error("Database error: {message}")]
    Database {
        message: String,
        code: ErrorCode,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Error codes for programmatic handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    // Validation (VAL_xxx)
    ValInvalidInput,
    ValSetTooSmall,
    ValInvalidCode,
    ValUnknownPack,

    // Symbols (SYM_xxx)
    SymNotFound,

    // Session state (STATE_xxx)
    StateWrongStage,
    StateNotAllowed,

    // Database (DB_xxx)
    DbConnectionFailed,
    DbOperationFailed,

    // Internal
    Internal,
}

impl ErrorCode {
    /// Get the string representation of the error code.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::ValInvalidInput => "VAL_001",
            ErrorCode::ValSetTooSmall => "VAL_002",
            ErrorCode::ValInvalidCode => "VAL_003",
            ErrorCode::ValUnknownPack => "VAL_004",
            ErrorCode::SymNotFound => "SYM_001",
            ErrorCode::StateWrongStage => "STATE_001",
            ErrorCode::StateNotAllowed => "STATE_002",
            ErrorCode::DbConnectionFailed => "DB_001",
            ErrorCode::DbOperationFailed => "DB_002",
            ErrorCode::Internal => "INT_001",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl GlyphError {
    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            code: ErrorCode::ValInvalidInput,
            details: HashMap::new(),
            suggestion: None,
        }
    }

    /// Create a validation error with suggestion.
    pub fn validation_with_suggestion(
        message: impl Into<String>,
        suggestion: impl Into<String>,
    ) -> Self {
        Self::Validation {
            message: message.into(),
            code: ErrorCode::ValInvalidInput,
            details: HashMap::new(),
            suggestion: Some(suggestion.into()),
        }
    }

    /// Reject a working set below the minimum size.
    pub fn set_too_small(size: usize, minimum: usize) -> Self {
        let mut details = HashMap::new();
        details.insert("size".to_string(), size.to_string());
        details.insert("minimum".to_string(), minimum.to_string());
        Self::Validation {
            message: format!("working set of {} symbols is below the minimum of {}", size, minimum),
            code: ErrorCode::ValSetTooSmall,
            details,
            suggestion: Some(format!("Keep at least {} symbols active", minimum)),
        }
    }

    /// Reject a string that is not a 4-digit hex input code.
    pub fn invalid_code(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        let mut details = HashMap::new();
        details.insert("input".to_string(), raw.clone());
        Self::Validation {
            message: format!("'{}' is not a 4-digit hex code", raw),
            code: ErrorCode::ValInvalidCode,
            details,
            suggestion: Some("Use exactly four characters from 0-9 and A-F".to_string()),
        }
    }

    /// Reject an unknown pack name.
    pub fn unknown_pack(name: impl Into<String>) -> Self {
        Self::Validation {
            message: format!("unknown symbol pack '{}'", name.into()),
            code: ErrorCode::ValUnknownPack,
            details: HashMap::new(),
            suggestion: Some("Run with a pack name listed by the catalog".to_string()),
        }
    }

    /// Create a not found error.
    pub fn not_found(symbol_code: impl Into<String>) -> Self {
        let code = symbol_code.into();
        Self::NotFound {
            message: format!("Symbol with code '{}' not found", code),
            code: ErrorCode::SymNotFound,
            symbol_code: Some(code),
        }
    }

    /// Operation requires a different stage.
    pub fn wrong_stage(message: impl Into<String>) -> Self {
        Self::Precondition {
            message: message.into(),
            code: ErrorCode::StateWrongStage,
        }
    }

    /// Operation is disabled in the current configuration.
    pub fn not_allowed(message: impl Into<String>) -> Self {
        Self::Precondition {
            message: message.into(),
            code: ErrorCode::StateNotAllowed,
        }
    }

    /// Create a database error.
    pub fn database(message: impl Into<String>) -> Self {
        Self::Database {
            message: message.into(),
            code: ErrorCode::DbOperationFailed,
            source: None,
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Get the error code.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Validation { code, .. } => *code,
            Self::NotFound { code, .. } => *code,
            Self::Precondition { code, .. } => *code,
            Self::Database { code, .. } => *code,
            _ => ErrorCode::Internal,
        }
    }

    /// Get a user-friendly suggestion for resolving this error.
    pub fn suggestion(&self) -> Option<&str> {
        match self {
            Self::Validation { suggestion, .. } => suggestion.as_deref(),
            Self::NotFound { .. } => Some("Check the code against the symbol catalog"),
            Self::Database { .. } => Some("Check that the progress ledger path is writable"),
            Self::Configuration(_) => Some("Use a .toml, .json or .yaml config file"),
            _ => None,
        }
    }

    /// Whether the error came from calling an operation in the wrong state.
    pub fn is_precondition(&self) -> bool {
        matches!(self, Self::Precondition { .. })
    }
}

impl From<rusqlite::Error> for GlyphError {
    fn from(err: rusqlite::Error) -> Self {
        let code = match &err {
            rusqlite::Error::SqliteFailure(_, _) => ErrorCode::DbConnectionFailed,
            _ => ErrorCode::DbOperationFailed,
        };
        Self::Database {
            message: err.to_string(),
            code,
            source: Some(Box::new(err)),
        }
    }
}

impl<T> From<std::sync::PoisonError<T>> for GlyphError {
    fn from(err: std::sync::PoisonError<T>) -> Self {
        Self::Internal(format!("lock poisoned: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(ErrorCode::ValSetTooSmall.as_str(), "VAL_002");
        assert_eq!(ErrorCode::StateWrongStage.as_str(), "STATE_001");
        assert_eq!(ErrorCode::Internal.to_string(), "INT_001");
    }

    #[test]
    fn test_set_too_small_carries_details() {
        let err = GlyphError::set_too_small(2, 3);
        assert_eq!(err.code(), ErrorCode::ValSetTooSmall);
        assert!(err.suggestion().unwrap().contains('3'));
        match err {
            GlyphError::Validation { details, .. } => {
                assert_eq!(details.get("size").map(String::as_str), Some("2"));
            }
            other => panic!("unexpected variant: {other:?}"),
        }
    }

    #[test]
    fn test_precondition_classification() {
        assert!(GlyphError::wrong_stage("not in stage 1").is_precondition());
        assert!(!GlyphError::internal("boom").is_precondition());
        assert_eq!(GlyphError::internal("boom").code(), ErrorCode::Internal);
    }

    #[test]
    fn test_rusqlite_conversion() {
        let err: GlyphError = rusqlite::Error::QueryReturnedNoRows.into();
        assert_eq!(err.code(), ErrorCode::DbOperationFailed);
    }
}
