//! # Domain Types
//!
//! Sales, their lines and payments, plus the clinic reference records a
//! checkout points at.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Sale Aggregate                                  │
//! │                                                                         │
//! │  ┌─────────────────┐ 1   * ┌─────────────────┐                          │
//! │  │      Sale       │──────►│    SaleItem     │  product XOR service     │
//! │  │  ─────────────  │       └─────────────────┘                          │
//! │  │  sale_number    │ 1   * ┌─────────────────┐                          │
//! │  │  status         │──────►│   SalePayment   │──► CashTransaction?      │
//! │  │  total_cents    │       └─────────────────┘                          │
//! │  └───────┬─────────┘                                                    │
//! │          │ weak refs                                                    │
//! │          ▼                                                              │
//! │  Customer · Pet · Location · staff (cashier from the active shift)     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Dual-Key Identity Pattern
//! - `id`: UUID v4, used for relations
//! - Business ID: `sale_number` (`YYYYMMDD-HHMMSSmmm`), unique per tenant

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;

use crate::money::Money;
use crate::quantity::Quantity;

// =============================================================================
// Tax Rate
// =============================================================================

/// Tax rate in basis points (1500 = 15%).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TaxRate(u32);

impl TaxRate {
    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        TaxRate(bps)
    }

    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    #[inline]
    pub const fn zero() -> Self {
        TaxRate(0)
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl Default for TaxRate {
    fn default() -> Self {
        TaxRate::zero()
    }
}

// =============================================================================
// Reference Records
// =============================================================================
// Owned by the surrounding clinic application; the ledger only reads them to
// validate a checkout or a transfer.

/// A physical clinic site.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Location {
    pub id: String,
    pub tenant_id: String,
    pub name: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

/// A pet owner.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Customer {
    pub id: String,
    pub tenant_id: String,
    pub name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

/// A patient, always owned by one customer.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Pet {
    pub id: String,
    pub tenant_id: String,
    pub customer_id: String,
    pub name: String,
    pub species: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

/// A billable clinic service (consultation, vaccination, ...).
///
/// Services carry no stock, so selling one never touches the ledger.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Service {
    pub id: String,
    pub tenant_id: String,
    pub name: String,
    pub price_cents: i64,
    pub is_active: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Sale Status
// =============================================================================

/// The status of a sale.
///
/// `PENDING` until the amount paid covers the total, then `COMPLETED`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SaleStatus {
    /// Created, not yet fully paid.
    Pending,
    /// Amount paid covers the total.
    Completed,
    /// Cancelled after the fact.
    Voided,
}

impl Default for SaleStatus {
    fn default() -> Self {
        SaleStatus::Pending
    }
}

impl fmt::Display for SaleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SaleStatus::Pending => "PENDING",
            SaleStatus::Completed => "COMPLETED",
            SaleStatus::Voided => "VOIDED",
        })
    }
}

// =============================================================================
// Payment Method
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentMethod {
    /// Physical cash; needs an open drawer.
    Cash,
    /// Card on an external terminal.
    Card,
    /// Bank transfer / wire.
    BankTransfer,
    /// Anything else the clinic accepts (vouchers, insurance).
    Other,
}

impl PaymentMethod {
    /// Cash is the only method that moves money through a drawer.
    #[inline]
    pub const fn is_cash(&self) -> bool {
        matches!(self, PaymentMethod::Cash)
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "CASH",
            PaymentMethod::Card => "CARD",
            PaymentMethod::BankTransfer => "BANK_TRANSFER",
            PaymentMethod::Other => "OTHER",
        }
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Sale
// =============================================================================

/// A checkout.
///
/// Invariant: `total_cents = subtotal_cents - discount_cents`. `tax_cents` is
/// the tax contained in the total, shown on the receipt, never added.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Sale {
    pub id: String,
    pub tenant_id: String,
    pub sale_number: String,
    pub location_id: Option<String>,
    pub customer_id: Option<String>,
    pub pet_id: Option<String>,
    /// Cashier of the active shift when the sale was rung up.
    pub staff_id: Option<String>,
    /// Logged-in user who submitted the checkout.
    pub user_id: String,
    pub status: SaleStatus,
    pub subtotal_cents: i64,
    pub tax_cents: i64,
    pub discount_cents: i64,
    pub total_cents: i64,
    pub amount_paid_cents: i64,
    pub payment_method: PaymentMethod,
    pub notes: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
    #[ts(as = "Option<String>")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl Sale {
    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }

    /// What is still owed on a partially paid sale.
    pub fn balance_due(&self) -> Money {
        let due = self.total_cents - self.amount_paid_cents;
        Money::from_cents(due.max(0))
    }
}

// =============================================================================
// Sale Item
// =============================================================================

/// A line of a sale. Immutable once written.
///
/// Exactly one of `inventory_item_id` / `service_id` is set.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct SaleItem {
    pub id: String,
    pub sale_id: String,
    pub inventory_item_id: Option<String>,
    pub service_id: Option<String>,
    /// Item or service name at time of sale (frozen).
    pub description: String,
    pub quantity_milli: i64,
    pub unit_price_cents: i64,
    pub discount_cents: i64,
    /// `quantity × unit price − discount`.
    pub line_total_cents: i64,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl SaleItem {
    #[inline]
    pub fn quantity(&self) -> Quantity {
        Quantity::from_milli(self.quantity_milli)
    }

    #[inline]
    pub fn line_total(&self) -> Money {
        Money::from_cents(self.line_total_cents)
    }

    /// Product lines deplete stock, service lines do not.
    #[inline]
    pub fn is_product(&self) -> bool {
        self.inventory_item_id.is_some()
    }
}

// =============================================================================
// Sale Payment
// =============================================================================

/// A payment towards a sale.
///
/// `amount_cents` is what was applied to the sale; for cash the customer may
/// hand over more (`tendered_cents`) and get `change_cents` back.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct SalePayment {
    pub id: String,
    pub sale_id: String,
    pub payment_method: PaymentMethod,
    pub amount_cents: i64,
    pub tendered_cents: i64,
    pub change_cents: i64,
    /// Drawer movement backing a cash payment.
    pub cash_transaction_id: Option<String>,
    pub reference: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl SalePayment {
    #[inline]
    pub fn amount(&self) -> Money {
        Money::from_cents(self.amount_cents)
    }
}

// =============================================================================
// Hydrated Sale
// =============================================================================

/// A sale read back after commit with everything the receipt needs.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SaleDetail {
    pub sale: Sale,
    pub items: Vec<SaleItem>,
    pub payments: Vec<SalePayment>,
    pub customer: Option<Customer>,
    pub pet: Option<Pet>,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sale_status_default() {
        assert_eq!(SaleStatus::default(), SaleStatus::Pending);
    }

    #[test]
    fn test_payment_method_wire_format() {
        let json = serde_json::to_string(&PaymentMethod::BankTransfer).unwrap();
        assert_eq!(json, "\"BANK_TRANSFER\"");
        assert_eq!(PaymentMethod::BankTransfer.to_string(), "BANK_TRANSFER");
        assert!(PaymentMethod::Cash.is_cash());
        assert!(!PaymentMethod::Card.is_cash());
    }

    #[test]
    fn test_balance_due_never_negative() {
        let now = Utc::now();
        let mut sale = Sale {
            id: "s".to_string(),
            tenant_id: "t".to_string(),
            sale_number: "20260101-000000000".to_string(),
            location_id: None,
            customer_id: None,
            pet_id: None,
            staff_id: None,
            user_id: "u".to_string(),
            status: SaleStatus::Pending,
            subtotal_cents: 20_000,
            tax_cents: 0,
            discount_cents: 0,
            total_cents: 20_000,
            amount_paid_cents: 15_000,
            payment_method: PaymentMethod::Cash,
            notes: None,
            created_at: now,
            updated_at: now,
            completed_at: None,
        };
        assert_eq!(sale.balance_due().cents(), 5_000);

        sale.amount_paid_cents = 25_000;
        assert!(sale.balance_due().is_zero());
    }
}
