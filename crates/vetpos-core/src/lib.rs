//! # vetpos-core: Pure Business Logic for the Clinic POS Ledger
//!
//! Everything about a checkout or a stock transfer that can be decided without
//! a database: cart arithmetic, fixed-point quantities, sale numbering,
//! business-day windows, status transition rules and input validation.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       VetPOS Ledger Architecture                        │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │            Clinic UI / API layer (auth, plan limits)            │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ CheckoutCart / TransferRequest         │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │        vetpos-db services (SaleService, TransferService)        │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ vetpos-core (THIS CRATE) ★                      │   │
//! │  │                                                                 │   │
//! │  │   types · money · quantity · cart · sale_number · calendar     │   │
//! │  │   validation · error                                            │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO IMPLICIT CLOCK                      │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//!
//! 1. **Integer Money**: all monetary values are cents (`i64`)
//! 2. **Fixed-point Quantities**: stock is counted in thousandths (`i64`)
//! 3. **Tax-inclusive prices**: tax is a disclosed breakdown, never added
//! 4. **Explicit Errors**: typed errors, never strings or panics
//!
//! ## Example Usage
//!
//! ```rust
//! use vetpos_core::{Money, Quantity, TaxRate};
//!
//! let line = Money::from_cents(10_000).times_quantity(Quantity::from_units(2));
//! assert_eq!(line.cents(), 20_000);
//!
//! // 20.00 including 25% tax carries 4.00 of tax
//! assert_eq!(line.inclusive_tax(TaxRate::from_bps(2500)).cents(), 4_000);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod calendar;
pub mod cart;
pub mod cash;
pub mod error;
pub mod inventory;
pub mod money;
pub mod quantity;
pub mod sale_number;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use calendar::BusinessDay;
pub use cart::{CartLine, CheckoutCart, LineTarget, PaymentSettlement, SaleTotals};
pub use cash::*;
pub use error::{CoreError, CoreResult, ValidationError};
pub use inventory::*;
pub use money::Money;
pub use quantity::Quantity;
pub use sale_number::format_sale_number;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum line items allowed in a single checkout.
pub const MAX_CART_ITEMS: usize = 100;

/// Maximum whole units of a single line or transfer.
///
/// Catches keying mistakes such as 1000 instead of 10.
pub const MAX_ITEM_QUANTITY: i64 = 9_999;

/// Largest price, discount, payment or drawer amount accepted, in cents
/// (1,000,000.00).
///
/// With `MAX_CART_ITEMS` and `MAX_ITEM_QUANTITY` this keeps every cart sum
/// far inside `i64`.
pub const MAX_AMOUNT_CENTS: i64 = 100_000_000;
