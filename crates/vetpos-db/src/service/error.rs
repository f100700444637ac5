//! # Service Error Type
//!
//! Everything `create_sale` or a transfer operation can fail with.
//!
//! ## Error Taxonomy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  ErrorKind      Raised                      Examples                    │
//! │  ─────────────  ──────────────────────────  ──────────────────────────  │
//! │  Validation     before any transaction      empty cart, bad uuid,       │
//! │                                             unknown customer / pet      │
//! │  Precondition   inside the transaction,     no open drawer, short       │
//! │                 which is then rolled back   stock, transfer status,     │
//! │                                             plan limit                  │
//! │  NotFound       lookups                     transfer or sale id         │
//! │  Conflict       constraint violations       sale number still taken     │
//! │                                             after every retry           │
//! │  Storage        sqlx / SQLite               pool closed, I/O            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! No variant implies partial success: a failed operation never leaves rows
//! behind.

use serde::Serialize;
use thiserror::Error;
use vetpos_core::{CoreError, ValidationError};

use crate::error::{DbError, LedgerError};

/// Service-level error: a domain failure or a storage failure.
#[derive(Debug, Error)]
pub enum PosError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Db(#[from] DbError),
}

impl From<ValidationError> for PosError {
    fn from(err: ValidationError) -> Self {
        PosError::Core(CoreError::Validation(err))
    }
}

impl From<LedgerError> for PosError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::Rule(err) => PosError::Core(err),
            LedgerError::Db(err) => PosError::Db(err),
        }
    }
}

/// Result type for service operations.
pub type PosResult<T> = Result<T, PosError>;

/// Coarse category of a [`PosError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    Validation,
    Precondition,
    NotFound,
    Conflict,
    Storage,
}

/// Error codes for API responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Input validation failed (400)
    ValidationError,

    /// Checkout without lines (400)
    EmptyCart,

    /// Resource not found (404)
    NotFound,

    /// Not enough stock (409)
    InsufficientStock,

    /// Cash sale without an open drawer (409)
    CashDrawerNotOpen,

    /// Transfer is in the wrong state (409)
    InvalidTransferStatus,

    /// Transfer to the same location (400)
    SameLocationTransfer,

    /// Plan does not include the action (403)
    PlanLimitReached,

    /// Uniqueness conflict (409)
    Conflict,

    /// Database operation failed (500)
    DatabaseError,
}

impl PosError {
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        PosError::Core(CoreError::not_found(entity, id))
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            PosError::Core(err) => match err {
                CoreError::Validation(_) | CoreError::EmptyCart | CoreError::SameLocationTransfer => {
                    ErrorKind::Validation
                }
                CoreError::NotFound { .. } => ErrorKind::NotFound,
                CoreError::InsufficientStock { .. }
                | CoreError::CashDrawerNotOpen { .. }
                | CoreError::InvalidTransferStatus { .. }
                | CoreError::PlanLimitReached { .. } => ErrorKind::Precondition,
            },
            PosError::Db(err) => match err {
                DbError::NotFound { .. } => ErrorKind::NotFound,
                DbError::UniqueViolation { .. } | DbError::ForeignKeyViolation { .. } => {
                    ErrorKind::Conflict
                }
                _ => ErrorKind::Storage,
            },
        }
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            PosError::Core(err) => match err {
                CoreError::Validation(_) => ErrorCode::ValidationError,
                CoreError::EmptyCart => ErrorCode::EmptyCart,
                CoreError::NotFound { .. } => ErrorCode::NotFound,
                CoreError::InsufficientStock { .. } => ErrorCode::InsufficientStock,
                CoreError::CashDrawerNotOpen { .. } => ErrorCode::CashDrawerNotOpen,
                CoreError::InvalidTransferStatus { .. } => ErrorCode::InvalidTransferStatus,
                CoreError::SameLocationTransfer => ErrorCode::SameLocationTransfer,
                CoreError::PlanLimitReached { .. } => ErrorCode::PlanLimitReached,
            },
            PosError::Db(err) => match err {
                DbError::NotFound { .. } => ErrorCode::NotFound,
                DbError::UniqueViolation { .. } | DbError::ForeignKeyViolation { .. } => {
                    ErrorCode::Conflict
                }
                _ => ErrorCode::DatabaseError,
            },
        }
    }
}

/// What an API layer sends to the client when an operation fails.
///
/// ```json
/// { "code": "CASH_DRAWER_NOT_OPEN", "message": "No open cash drawer for today; ..." }
/// ```
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiError {
    pub code: ErrorCode,
    pub message: String,
}

impl From<PosError> for ApiError {
    fn from(err: PosError) -> Self {
        let message = match err.kind() {
            // Storage details stay in the logs
            ErrorKind::Storage => {
                tracing::error!(error = %err, "Database operation failed");
                "Database operation failed".to_string()
            }
            _ => err.to_string(),
        };

        ApiError {
            code: err.code(),
            message,
        }
    }
}
