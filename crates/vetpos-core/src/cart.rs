//! # Checkout Cart
//!
//! The input to `create_sale` and the arithmetic that turns it into sale
//! totals.
//!
//! ## Totals
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  line 1:  2 × 100.00 − 0.00   = 200.00                                  │
//! │  line 2:  1 ×  45.00 − 5.00   =  40.00                                  │
//! │                                 ───────                                 │
//! │  subtotal                       240.00                                  │
//! │  sale discount                − 10.00                                   │
//! │  total                          230.00   ← what the customer owes       │
//! │  of which tax (15% incl.)        30.00   ← receipt disclosure only      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::ValidationError;
use crate::money::Money;
use crate::quantity::Quantity;
use crate::types::{PaymentMethod, TaxRate};

// =============================================================================
// Cart Line
// =============================================================================

/// One requested line of a checkout.
///
/// The API accepts both ids as optional fields; [`CartLine::target`] enforces
/// that exactly one is present.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CartLine {
    pub inventory_item_id: Option<String>,
    pub service_id: Option<String>,
    /// Receipt text; defaults to the item or service name.
    pub description: Option<String>,
    pub quantity: Quantity,
    /// Tax-inclusive unit price.
    pub unit_price_cents: i64,
    #[serde(default)]
    pub discount_cents: i64,
}

/// What a cart line sells.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineTarget<'a> {
    Product(&'a str),
    Service(&'a str),
}

impl CartLine {
    /// Resolves the line to a product or a service.
    pub fn target(&self) -> Result<LineTarget<'_>, ValidationError> {
        match (self.inventory_item_id.as_deref(), self.service_id.as_deref()) {
            (Some(item), None) => Ok(LineTarget::Product(item)),
            (None, Some(service)) => Ok(LineTarget::Service(service)),
            (Some(_), Some(_)) => Err(ValidationError::InvalidFormat {
                field: "line".to_string(),
                reason: "must reference an inventory item or a service, not both".to_string(),
            }),
            (None, None) => Err(ValidationError::Required {
                field: "line inventory_item_id or service_id".to_string(),
            }),
        }
    }

    /// `quantity × unit price` before the line discount.
    pub fn gross(&self) -> Money {
        Money::from_cents(self.unit_price_cents).times_quantity(self.quantity)
    }

    /// `quantity × unit price − line discount`.
    pub fn line_total(&self) -> Money {
        self.gross() - Money::from_cents(self.discount_cents)
    }
}

// =============================================================================
// Checkout Cart
// =============================================================================

/// Everything the till submits for one checkout.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CheckoutCart {
    pub customer_id: Option<String>,
    pub pet_id: Option<String>,
    pub location_id: Option<String>,
    pub lines: Vec<CartLine>,
    /// Sale-level discount, taken off the subtotal.
    #[serde(default)]
    pub discount_cents: i64,
    /// Rate used for the receipt's tax breakdown; falls back to the
    /// configured default.
    pub tax_rate_bps: Option<u32>,
    pub payment_method: PaymentMethod,
    pub amount_paid_cents: i64,
    pub notes: Option<String>,
}

impl CheckoutCart {
    /// Number of product lines (those that will write ledger rows).
    pub fn product_line_count(&self) -> usize {
        self.lines
            .iter()
            .filter(|l| l.inventory_item_id.is_some())
            .count()
    }
}

// =============================================================================
// Sale Totals
// =============================================================================

/// Monetary header of a sale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleTotals {
    pub subtotal: Money,
    pub discount: Money,
    /// Tax contained in `total`; informational.
    pub tax: Money,
    pub total: Money,
}

impl SaleTotals {
    /// Computes the totals of a cart.
    ///
    /// ```rust
    /// use vetpos_core::{CartLine, CheckoutCart, PaymentMethod, Quantity, SaleTotals, TaxRate};
    ///
    /// let cart = CheckoutCart {
    ///     customer_id: None,
    ///     pet_id: None,
    ///     location_id: None,
    ///     lines: vec![CartLine {
    ///         inventory_item_id: Some("item".into()),
    ///         service_id: None,
    ///         description: None,
    ///         quantity: Quantity::from_units(2),
    ///         unit_price_cents: 10_000,
    ///         discount_cents: 0,
    ///     }],
    ///     discount_cents: 0,
    ///     tax_rate_bps: None,
    ///     payment_method: PaymentMethod::Cash,
    ///     amount_paid_cents: 20_000,
    ///     notes: None,
    /// };
    ///
    /// let totals = SaleTotals::compute(&cart, TaxRate::zero());
    /// assert_eq!(totals.total.cents(), 20_000);
    /// ```
    pub fn compute(cart: &CheckoutCart, default_rate: TaxRate) -> SaleTotals {
        let subtotal: Money = cart.lines.iter().map(CartLine::line_total).sum();
        let discount = Money::from_cents(cart.discount_cents);
        let total = subtotal - discount;
        let rate = cart.tax_rate_bps.map(TaxRate::from_bps).unwrap_or(default_rate);

        SaleTotals {
            subtotal,
            discount,
            tax: total.inclusive_tax(rate),
            total,
        }
    }
}

// =============================================================================
// Payment Settlement
// =============================================================================

/// How an amount handed over settles against a sale total.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaymentSettlement {
    /// Put towards the sale (never more than the total).
    pub applied: Money,
    /// What the customer handed over.
    pub tendered: Money,
    /// Returned to the customer.
    pub change: Money,
    /// Whether the sale is paid in full.
    pub settles: bool,
}

impl PaymentSettlement {
    pub fn settle(total: Money, paid: Money) -> PaymentSettlement {
        let applied = paid.min(total);
        PaymentSettlement {
            applied,
            tendered: paid,
            change: paid - applied,
            settles: paid >= total,
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn product_line(qty: i64, price: i64, discount: i64) -> CartLine {
        CartLine {
            inventory_item_id: Some("item".to_string()),
            service_id: None,
            description: None,
            quantity: Quantity::from_units(qty),
            unit_price_cents: price,
            discount_cents: discount,
        }
    }

    fn cart(lines: Vec<CartLine>, discount: i64) -> CheckoutCart {
        CheckoutCart {
            customer_id: None,
            pet_id: None,
            location_id: None,
            lines,
            discount_cents: discount,
            tax_rate_bps: None,
            payment_method: PaymentMethod::Card,
            amount_paid_cents: 0,
            notes: None,
        }
    }

    #[test]
    fn test_total_is_subtotal_minus_discount() {
        let c = cart(vec![product_line(2, 10_000, 0), product_line(1, 4_500, 500)], 1_000);
        let totals = SaleTotals::compute(&c, TaxRate::from_bps(1500));

        assert_eq!(totals.subtotal.cents(), 24_000);
        assert_eq!(totals.discount.cents(), 1_000);
        assert_eq!(totals.total.cents(), 23_000);
        assert_eq!(totals.total, totals.subtotal - totals.discount);
        // tax is inside the total
        assert_eq!(totals.tax.cents(), 3_000);
    }

    #[test]
    fn test_tax_never_increases_total() {
        let c = cart(vec![product_line(3, 999, 0)], 0);
        let untaxed = SaleTotals::compute(&c, TaxRate::zero());
        let taxed = SaleTotals::compute(&c, TaxRate::from_bps(2000));

        assert_eq!(untaxed.total, taxed.total);
        assert!(taxed.tax.is_positive());
        assert!(untaxed.tax.is_zero());
    }

    #[test]
    fn test_cart_rate_overrides_default() {
        let mut c = cart(vec![product_line(1, 11_000, 0)], 0);
        c.tax_rate_bps = Some(1000);
        let totals = SaleTotals::compute(&c, TaxRate::from_bps(2500));
        assert_eq!(totals.tax.cents(), 1_000);
    }

    #[test]
    fn test_line_target_exclusive() {
        let mut line = product_line(1, 100, 0);
        assert_eq!(line.target().unwrap(), LineTarget::Product("item"));

        line.service_id = Some("svc".to_string());
        assert!(line.target().is_err());

        line.inventory_item_id = None;
        assert_eq!(line.target().unwrap(), LineTarget::Service("svc"));

        line.service_id = None;
        assert!(line.target().is_err());
    }

    #[test]
    fn test_partial_payment_does_not_settle() {
        let s = PaymentSettlement::settle(Money::from_cents(20_000), Money::from_cents(15_000));
        assert!(!s.settles);
        assert_eq!(s.applied.cents(), 15_000);
        assert!(s.change.is_zero());
    }

    #[test]
    fn test_overpayment_gives_change() {
        let s = PaymentSettlement::settle(Money::from_cents(20_000), Money::from_cents(25_000));
        assert!(s.settles);
        assert_eq!(s.applied.cents(), 20_000);
        assert_eq!(s.change.cents(), 5_000);
        assert_eq!(s.tendered.cents(), 25_000);
    }
}
