//! Error taxonomy for the database view engine.
//!
//! `NotFound` variants are raised synchronously by mutation entry points
//! before any CRDT write happens, so a failed operation never leaves a
//! partially written document behind.

use thiserror::Error;

/// Errors surfaced by the database view engine.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DatabaseError {
    #[error("Field not found: {id}")]
    FieldNotFound { id: String },

    #[error("View not found: {id}")]
    ViewNotFound { id: String },

    #[error("Row not found: {id}")]
    RowNotFound { id: String },

    #[error("Filter not found: {id}")]
    FilterNotFound { id: String },

    #[error("Sort not found: {id}")]
    SortNotFound { id: String },

    #[error("Group not found: {id}")]
    GroupNotFound { id: String },

    #[error("Calculation not found: {id}")]
    CalculationNotFound { id: String },

    #[error("Select option not found: {id}")]
    OptionNotFound { id: String },

    #[error("Invalid operation: {message}")]
    InvalidOperation { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl DatabaseError {
    pub fn internal(message: impl std::fmt::Display) -> Self {
        DatabaseError::Internal {
            message: message.to_string(),
        }
    }

    pub fn invalid(message: impl std::fmt::Display) -> Self {
        DatabaseError::InvalidOperation {
            message: message.to_string(),
        }
    }

    /// Whether this error is one of the typed "referenced structure is
    /// absent" conditions. The all-views fan-out treats these as the
    /// expected per-view skip case.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            DatabaseError::FieldNotFound { .. }
                | DatabaseError::ViewNotFound { .. }
                | DatabaseError::RowNotFound { .. }
                | DatabaseError::FilterNotFound { .. }
                | DatabaseError::SortNotFound { .. }
                | DatabaseError::GroupNotFound { .. }
                | DatabaseError::CalculationNotFound { .. }
                | DatabaseError::OptionNotFound { .. }
        )
    }
}

/// Result type for engine operations.
pub type DatabaseResult<T> = std::result::Result<T, DatabaseError>;
