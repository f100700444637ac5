//! # Validation Module
//!
//! Shape checks that run before the services open a transaction.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: THIS MODULE (pure)                                           │
//! │  ├── ids well formed, quantities positive, prices non-negative         │
//! │  └── discounts within bounds, line targets exclusive                   │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: Services (reads, still before the transaction)               │
//! │  └── customer / pet / location / item / service exist for the tenant   │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: SQLite                                                       │
//! │  ├── UNIQUE(tenant_id, sale_number)                                    │
//! │  ├── CHECK product XOR service, CHECK from <> to                       │
//! │  └── append-only triggers on the ledger                                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use crate::cart::{CartLine, CheckoutCart, SaleTotals};
use crate::error::{CoreError, CoreResult, ValidationError};
use crate::inventory::TransferRequest;
use crate::quantity::Quantity;
use crate::types::TaxRate;
use crate::{MAX_AMOUNT_CENTS, MAX_CART_ITEMS, MAX_ITEM_QUANTITY};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// Identifier Validators
// =============================================================================

/// Validates that `id` is a UUID.
///
/// ```rust
/// use vetpos_core::validation::validate_uuid;
///
/// assert!(validate_uuid("customer_id", "550e8400-e29b-41d4-a716-446655440000").is_ok());
/// assert!(validate_uuid("customer_id", "not-a-uuid").is_err());
/// assert!(validate_uuid("customer_id", "").is_err());
/// ```
pub fn validate_uuid(field: &str, id: &str) -> ValidationResult<()> {
    if id.trim().is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    uuid::Uuid::parse_str(id).map_err(|_| ValidationError::InvalidFormat {
        field: field.to_string(),
        reason: "must be a valid UUID".to_string(),
    })?;

    Ok(())
}

/// Validates an optional reference; `None` is fine.
pub fn validate_optional_uuid(field: &str, id: Option<&str>) -> ValidationResult<()> {
    match id {
        Some(id) => validate_uuid(field, id),
        None => Ok(()),
    }
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a line or transfer quantity.
///
/// ## Rules
/// - Must be positive (fractions allowed: 0.5 ml is a valid dose)
/// - Must not exceed `MAX_ITEM_QUANTITY` whole units
pub fn validate_quantity(field: &str, qty: Quantity) -> ValidationResult<()> {
    if !qty.is_positive() {
        return Err(ValidationError::MustBePositive {
            field: field.to_string(),
        });
    }

    if qty > Quantity::from_units(MAX_ITEM_QUANTITY) {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: MAX_ITEM_QUANTITY,
        });
    }

    Ok(())
}

/// Validates an amount in cents (prices, discounts, payments, balances).
///
/// ## Rules
/// - Must not be negative
/// - Must not exceed `MAX_AMOUNT_CENTS`
pub fn validate_amount_cents(field: &str, cents: i64) -> ValidationResult<()> {
    if !(0..=MAX_AMOUNT_CENTS).contains(&cents) {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: MAX_AMOUNT_CENTS,
        });
    }

    Ok(())
}

/// Validates a tax rate in basis points (0% to 100%).
pub fn validate_tax_rate_bps(bps: u32) -> ValidationResult<()> {
    if bps > 10_000 {
        return Err(ValidationError::OutOfRange {
            field: "tax_rate_bps".to_string(),
            min: 0,
            max: 10_000,
        });
    }

    Ok(())
}

fn validate_text(field: &str, value: Option<&str>, max: usize) -> ValidationResult<()> {
    match value {
        Some(v) if v.chars().count() > max => Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        }),
        _ => Ok(()),
    }
}

// =============================================================================
// Checkout
// =============================================================================

fn validate_line(index: usize, line: &CartLine) -> ValidationResult<()> {
    line.target().map_err(|err| match err {
        ValidationError::Required { .. } => ValidationError::Required {
            field: format!("lines[{}].inventory_item_id or service_id", index),
        },
        ValidationError::InvalidFormat { reason, .. } => ValidationError::InvalidFormat {
            field: format!("lines[{}]", index),
            reason,
        },
        other => other,
    })?;

    if let Some(id) = line.inventory_item_id.as_deref() {
        validate_uuid(&format!("lines[{}].inventory_item_id", index), id)?;
    }
    if let Some(id) = line.service_id.as_deref() {
        validate_uuid(&format!("lines[{}].service_id", index), id)?;
    }

    validate_quantity(&format!("lines[{}].quantity", index), line.quantity)?;
    validate_amount_cents(&format!("lines[{}].unit_price_cents", index), line.unit_price_cents)?;
    validate_amount_cents(&format!("lines[{}].discount_cents", index), line.discount_cents)?;
    validate_text(&format!("lines[{}].description", index), line.description.as_deref(), 200)?;

    let gross = line.gross().cents();
    if line.discount_cents > gross {
        return Err(ValidationError::OutOfRange {
            field: format!("lines[{}].discount_cents", index),
            min: 0,
            max: gross,
        });
    }

    Ok(())
}

/// Validates a checkout cart before any database work.
///
/// ## Rules
/// - At least one line, at most `MAX_CART_ITEMS`
/// - Each line sells exactly one product or service, positive quantity,
///   non-negative price, discount no larger than the line
/// - Sale discount no larger than the subtotal
/// - Amount paid non-negative
pub fn validate_cart(cart: &CheckoutCart) -> CoreResult<()> {
    if cart.lines.is_empty() {
        return Err(CoreError::EmptyCart);
    }

    if cart.lines.len() > MAX_CART_ITEMS {
        return Err(ValidationError::OutOfRange {
            field: "lines".to_string(),
            min: 1,
            max: MAX_CART_ITEMS as i64,
        }
        .into());
    }

    validate_optional_uuid("customer_id", cart.customer_id.as_deref())?;
    validate_optional_uuid("pet_id", cart.pet_id.as_deref())?;
    validate_optional_uuid("location_id", cart.location_id.as_deref())?;

    for (index, line) in cart.lines.iter().enumerate() {
        validate_line(index, line)?;
    }

    validate_amount_cents("discount_cents", cart.discount_cents)?;
    validate_amount_cents("amount_paid_cents", cart.amount_paid_cents)?;
    if let Some(bps) = cart.tax_rate_bps {
        validate_tax_rate_bps(bps)?;
    }
    validate_text("notes", cart.notes.as_deref(), 1_000)?;

    let totals = SaleTotals::compute(cart, TaxRate::zero());
    if totals.discount > totals.subtotal {
        return Err(ValidationError::OutOfRange {
            field: "discount_cents".to_string(),
            min: 0,
            max: totals.subtotal.cents(),
        }
        .into());
    }

    Ok(())
}

// =============================================================================
// Transfers
// =============================================================================

/// Validates a transfer request.
///
/// ## Rules
/// - Item and both locations are UUIDs
/// - Source and destination differ
/// - Quantity positive and within `MAX_ITEM_QUANTITY`
pub fn validate_transfer_request(request: &TransferRequest) -> CoreResult<()> {
    validate_uuid("item_id", &request.item_id)?;
    validate_uuid("from_location_id", &request.from_location_id)?;
    validate_uuid("to_location_id", &request.to_location_id)?;

    if request.from_location_id == request.to_location_id {
        return Err(CoreError::SameLocationTransfer);
    }

    validate_quantity("quantity", request.quantity)?;
    validate_text("notes", request.notes.as_deref(), 1_000)?;

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
