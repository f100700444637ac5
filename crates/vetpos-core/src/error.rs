//! # Error Types
//!
//! Domain-specific error types for vetpos-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  vetpos-core errors (this file)                                        │
//! │  ├── ValidationError  - bad input, rejected before any transaction     │
//! │  └── CoreError        - precondition / business rule failures          │
//! │                                                                         │
//! │  vetpos-db errors                                                      │
//! │  ├── DbError          - storage failures (constraints, pool, sqlx)     │
//! │  └── PosError         - what a service call returns (Core | Db)        │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → PosError → API layer              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

use crate::inventory::TransferStatus;
use crate::quantity::Quantity;

// =============================================================================
// Core Error
// =============================================================================

/// Business rule violations and precondition failures.
///
/// Every variant leaves the database untouched: the services check these
/// either before opening a transaction or inside one that is then rolled back.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A referenced entity does not exist for the tenant.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Not enough stock to sell or transfer.
    ///
    /// ## When This Occurs
    /// - Transfer request larger than the source item's quantity
    /// - Sale line larger than remaining stock (negative stock disabled)
    /// - A concurrent sale or transfer consumed the stock first
    #[error("Insufficient stock for {item}: available {available}, requested {requested}")]
    InsufficientStock {
        item: String,
        available: Quantity,
        requested: Quantity,
    },

    /// Cash payment attempted without a drawer opened today.
    #[error("No open cash drawer for today{}; open a drawer before accepting cash", location_suffix(.location_id))]
    CashDrawerNotOpen { location_id: Option<String> },

    /// Transfer is not in a state that allows the requested operation.
    ///
    /// ## When This Occurs
    /// - Completing a transfer twice
    /// - Cancelling a completed transfer
    /// - Cancelling an already cancelled transfer
    #[error("Transfer {transfer_id} is {status}, cannot {operation}")]
    InvalidTransferStatus {
        transfer_id: String,
        status: TransferStatus,
        operation: &'static str,
    },

    /// Source and destination of a transfer are the same location.
    #[error("Transfer source and destination must be different locations")]
    SameLocationTransfer,

    /// The tenant's plan does not allow the action.
    #[error("Plan limit reached: {action} is not available for this account")]
    PlanLimitReached { action: String },

    /// Checkout submitted without line items.
    #[error("Cart is empty")]
    EmptyCart,

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

fn location_suffix(location_id: &Option<String>) -> String {
    match location_id {
        Some(id) => format!(" at location {}", id),
        None => String::new(),
    }
}

impl CoreError {
    /// Creates a NotFound error for a given entity type and ID.
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        CoreError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// Raised before a transaction is opened; the caller can fix the input and
/// resubmit.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format (e.g., invalid UUID, conflicting references).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// A referenced record does not exist or belongs to another tenant.
    #[error("{field} references unknown record '{id}'")]
    InvalidReference { field: String, id: String },
}

impl ValidationError {
    /// Creates an InvalidReference error.
    pub fn invalid_reference(field: impl Into<String>, id: impl Into<String>) -> Self {
        ValidationError::InvalidReference {
            field: field.into(),
            id: id.into(),
        }
    }
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insufficient_stock_message() {
        let err = CoreError::InsufficientStock {
            item: "Amoxicillin 250mg".to_string(),
            available: Quantity::from_units(3),
            requested: Quantity::from_units(5),
        };
        assert_eq!(
            err.to_string(),
            "Insufficient stock for Amoxicillin 250mg: available 3, requested 5"
        );
    }

    #[test]
    fn test_drawer_message_mentions_location() {
        let err = CoreError::CashDrawerNotOpen {
            location_id: Some("front-desk".to_string()),
        };
        assert!(err.to_string().contains("at location front-desk"));

        let err = CoreError::CashDrawerNotOpen { location_id: None };
        assert!(err.to_string().starts_with("No open cash drawer for today;"));
    }

    #[test]
    fn test_transfer_status_message() {
        let err = CoreError::InvalidTransferStatus {
            transfer_id: "t-1".to_string(),
            status: TransferStatus::Completed,
            operation: "cancel",
        };
        assert_eq!(err.to_string(), "Transfer t-1 is COMPLETED, cannot cancel");
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let core_err: CoreError = ValidationError::Required {
            field: "customer_id".to_string(),
        }
        .into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}
