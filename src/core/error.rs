//! Typed error handling for the backorder engine
//!
//! Every operation exposed by the engine returns a specific error variant
//! rather than a generic `anyhow::Error`, so callers can match on the kind
//! and the offending field/value. The presentation layer owns localization;
//! errors here only carry structured detail.
//!
//! # Error Categories
//!
//! - [`ValidationError`]: malformed input (missing reference, bad quantity,
//!   page size out of bounds). Corrected by the caller, never retried
//!   automatically.
//! - [`InvalidTransition`]: lifecycle rule violation. Surfaced, not retried.
//! - [`EngineError::AuthenticationRequired`]: no acting identity available.
//! - [`StorageError`]: persistence failure. Reads may retry once; mutations
//!   are never partially applied.
//! - [`EngineError::NoMorePages`]: pagination exhausted. A boundary signal,
//!   not a fault.

use std::fmt;
use uuid::Uuid;

use crate::core::model::RequestStatus;

/// The main error type for the backorder engine
#[derive(Debug)]
pub enum EngineError {
    /// Malformed input
    Validation(ValidationError),

    /// Lifecycle rule violation
    InvalidTransition(InvalidTransition),

    /// No acting identity available for a mutating operation
    AuthenticationRequired,

    /// Underlying persistence failure
    Storage(StorageError),

    /// Pagination exhausted: the prior page reported no further pages
    NoMorePages { last_page: usize },

    /// The target record does not exist in the store
    NotFound { id: Uuid },
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineError::Validation(e) => write!(f, "{}", e),
            EngineError::InvalidTransition(e) => write!(f, "{}", e),
            EngineError::AuthenticationRequired => {
                write!(f, "No acting identity available; sign in before mutating")
            }
            EngineError::Storage(e) => write!(f, "{}", e),
            EngineError::NoMorePages { last_page } => {
                write!(f, "No pages beyond page {}", last_page)
            }
            EngineError::NotFound { id } => {
                write!(f, "Out-of-stock request '{}' not found", id)
            }
        }
    }
}

impl std::error::Error for EngineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            EngineError::Validation(e) => Some(e),
            EngineError::InvalidTransition(e) => Some(e),
            EngineError::Storage(e) => Some(e),
            _ => None,
        }
    }
}

impl EngineError {
    /// Get the error code for this error
    pub fn error_code(&self) -> &'static str {
        match self {
            EngineError::Validation(e) => e.error_code(),
            EngineError::InvalidTransition(e) => e.error_code(),
            EngineError::AuthenticationRequired => "AUTHENTICATION_REQUIRED",
            EngineError::Storage(e) => e.error_code(),
            EngineError::NoMorePages { .. } => "NO_MORE_PAGES",
            EngineError::NotFound { .. } => "REQUEST_NOT_FOUND",
        }
    }

    /// Whether a read path may retry once after this error
    pub fn is_transient(&self) -> bool {
        matches!(self, EngineError::Storage(_))
    }
}

// =============================================================================
// Validation Errors
// =============================================================================

/// Errors related to input validation
#[derive(Debug)]
pub enum ValidationError {
    /// A required relation reference is missing or nil
    MissingReference { field: &'static str },

    /// A required text field is empty after trimming
    EmptyField { field: &'static str },

    /// Quantity must be at least 1
    NonPositiveQuantity { quantity: u32 },

    /// Requested page size falls outside the configured bounds
    PageSizeOutOfBounds { requested: usize, max: usize },
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::MissingReference { field } => {
                write!(f, "Required reference '{}' is missing", field)
            }
            ValidationError::EmptyField { field } => {
                write!(f, "Field '{}' must not be empty", field)
            }
            ValidationError::NonPositiveQuantity { quantity } => {
                write!(f, "Quantity must be at least 1 (got {})", quantity)
            }
            ValidationError::PageSizeOutOfBounds { requested, max } => {
                write!(f, "Page size {} is out of bounds (1..={})", requested, max)
            }
        }
    }
}

impl std::error::Error for ValidationError {}

impl ValidationError {
    pub fn error_code(&self) -> &'static str {
        match self {
            ValidationError::MissingReference { .. } => "MISSING_REFERENCE",
            ValidationError::EmptyField { .. } => "EMPTY_FIELD",
            ValidationError::NonPositiveQuantity { .. } => "NON_POSITIVE_QUANTITY",
            ValidationError::PageSizeOutOfBounds { .. } => "PAGE_SIZE_OUT_OF_BOUNDS",
        }
    }
}

impl From<ValidationError> for EngineError {
    fn from(err: ValidationError) -> Self {
        EngineError::Validation(err)
    }
}

// =============================================================================
// Transition Errors
// =============================================================================

/// Errors related to lifecycle transitions
#[derive(Debug)]
pub enum InvalidTransition {
    /// Return quantity exceeds the currently open quantity
    QuantityExceedsOpen { requested: u32, open: u32 },

    /// The record is in a state that accepts no such transition
    TerminalState { status: RequestStatus },
}

impl fmt::Display for InvalidTransition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InvalidTransition::QuantityExceedsOpen { requested, open } => {
                write!(
                    f,
                    "Return quantity {} exceeds open quantity {}",
                    requested, open
                )
            }
            InvalidTransition::TerminalState { status } => {
                write!(f, "No transition allowed from status '{}'", status)
            }
        }
    }
}

impl std::error::Error for InvalidTransition {}

impl InvalidTransition {
    pub fn error_code(&self) -> &'static str {
        match self {
            InvalidTransition::QuantityExceedsOpen { .. } => "QUANTITY_EXCEEDS_OPEN",
            InvalidTransition::TerminalState { .. } => "TERMINAL_STATE",
        }
    }
}

impl From<InvalidTransition> for EngineError {
    fn from(err: InvalidTransition) -> Self {
        EngineError::InvalidTransition(err)
    }
}

// =============================================================================
// Storage Errors
// =============================================================================

/// Errors surfaced by the persistence collaborator
#[derive(Debug)]
pub enum StorageError {
    /// Backend cannot be reached
    Unavailable { message: String },

    /// A read query failed
    QueryFailed { message: String },

    /// A write failed; the record was not persisted
    WriteFailed { message: String },
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageError::Unavailable { message } => {
                write!(f, "Storage unavailable: {}", message)
            }
            StorageError::QueryFailed { message } => {
                write!(f, "Storage query failed: {}", message)
            }
            StorageError::WriteFailed { message } => {
                write!(f, "Storage write failed: {}", message)
            }
        }
    }
}

impl std::error::Error for StorageError {}

impl StorageError {
    pub fn error_code(&self) -> &'static str {
        match self {
            StorageError::Unavailable { .. } => "STORAGE_UNAVAILABLE",
            StorageError::QueryFailed { .. } => "STORAGE_QUERY_FAILED",
            StorageError::WriteFailed { .. } => "STORAGE_WRITE_FAILED",
        }
    }
}

impl From<StorageError> for EngineError {
    fn from(err: StorageError) -> Self {
        EngineError::Storage(err)
    }
}

// =============================================================================
// Result type alias
// =============================================================================

/// A specialized Result type for engine operations
pub type EngineResult<T> = Result<T, EngineError>;
