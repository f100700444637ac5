//! # Inventory Types
//!
//! Stock records, the append-only movement ledger and transfer requests.
//!
//! ## Ledger
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  inventory_items.quantity_milli   ← current stock (mutable)             │
//! │  inventory_movements              ← every change, signed, never edited  │
//! │                                                                         │
//! │  Sale of 2        →  SALE_OUT      −2   ref SALE/<sale id>              │
//! │  Transfer 5 A→B   →  TRANSFER_OUT  −5   ref TRANSFER/<transfer id>  (A) │
//! │                      TRANSFER_IN   +5   ref TRANSFER/<transfer id>  (B) │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Transfer Lifecycle
//! ```text
//!   PENDING ──dispatch──► IN_TRANSIT ──complete──► COMPLETED
//!      │                      │
//!      └──────cancel──────────┴──────────────────► CANCELLED
//!
//!   PENDING ──complete──► COMPLETED   (dispatch is optional)
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;

use crate::money::Money;
use crate::quantity::Quantity;

// =============================================================================
// Inventory Item
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ItemStatus {
    Active,
    Inactive,
}

/// Stock of one product at one location.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct InventoryItem {
    pub id: String,
    pub tenant_id: String,
    pub location_id: String,
    pub name: String,
    /// `normalize_item_name(name)`; part of the destination lookup key.
    pub name_key: String,
    /// Empty string when uncategorised.
    pub category: String,
    pub sku: Option<String>,
    pub quantity_milli: i64,
    pub cost_cents: i64,
    pub price_cents: i64,
    pub min_stock_milli: i64,
    pub status: ItemStatus,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl InventoryItem {
    #[inline]
    pub fn quantity(&self) -> Quantity {
        Quantity::from_milli(self.quantity_milli)
    }

    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        self.status == ItemStatus::Active
    }

    /// At or below the reorder threshold.
    pub fn is_low_stock(&self) -> bool {
        self.quantity_milli <= self.min_stock_milli
    }

    /// Identity of this product at another location of the same tenant.
    pub fn lookup_key_at(&self, location_id: &str) -> ItemLookupKey {
        ItemLookupKey {
            tenant_id: self.tenant_id.clone(),
            location_id: location_id.to_string(),
            name_key: self.name_key.clone(),
            category: self.category.clone(),
        }
    }
}

/// Explicit match key for "the same product" across locations.
///
/// Two items are the same product only if tenant, location, normalised name
/// and category all agree; a bare name match is not enough.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ItemLookupKey {
    pub tenant_id: String,
    pub location_id: String,
    pub name_key: String,
    pub category: String,
}

/// Canonical form of an item name: trimmed, lowercase, single-spaced.
///
/// ```rust
/// use vetpos_core::normalize_item_name;
///
/// assert_eq!(normalize_item_name("  Amoxicillin   250MG "), "amoxicillin 250mg");
/// ```
pub fn normalize_item_name(name: &str) -> String {
    name.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Input for creating a stock record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewInventoryItem {
    pub location_id: String,
    pub name: String,
    pub category: Option<String>,
    pub sku: Option<String>,
    pub quantity: Quantity,
    pub cost_cents: i64,
    pub price_cents: i64,
    pub min_stock: Quantity,
}

// =============================================================================
// Inventory Movement (Ledger)
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MovementType {
    /// Sold at checkout (negative).
    SaleOut,
    /// Left the source location of a transfer (negative).
    TransferOut,
    /// Arrived at the destination of a transfer (positive).
    TransferIn,
    /// Manual stock correction (either sign).
    Adjustment,
    /// Goods received from a supplier (positive).
    Received,
}

impl MovementType {
    /// Whether movements of this type must carry a negative, positive or
    /// either-signed quantity.
    pub fn accepts(&self, quantity: Quantity) -> bool {
        match self {
            MovementType::SaleOut | MovementType::TransferOut => quantity.is_negative(),
            MovementType::TransferIn | MovementType::Received => quantity.is_positive(),
            MovementType::Adjustment => !quantity.is_zero(),
        }
    }
}

/// What kind of record a movement points back to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReferenceType {
    Sale,
    Transfer,
    Manual,
}

/// One row of the stock ledger. Never updated or deleted.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct InventoryMovement {
    pub id: String,
    pub tenant_id: String,
    pub item_id: String,
    pub location_id: String,
    pub movement_type: MovementType,
    /// Signed: negative leaves stock, positive enters it.
    pub quantity_milli: i64,
    pub reason: String,
    pub reference_type: ReferenceType,
    pub reference_id: Option<String>,
    pub created_by: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl InventoryMovement {
    #[inline]
    pub fn quantity(&self) -> Quantity {
        Quantity::from_milli(self.quantity_milli)
    }
}

// =============================================================================
// Inventory Transfer
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransferStatus {
    Pending,
    InTransit,
    Completed,
    Cancelled,
}

impl TransferStatus {
    pub const fn as_str(&self) -> &'static str {
        match self {
            TransferStatus::Pending => "PENDING",
            TransferStatus::InTransit => "IN_TRANSIT",
            TransferStatus::Completed => "COMPLETED",
            TransferStatus::Cancelled => "CANCELLED",
        }
    }

    pub const fn is_terminal(&self) -> bool {
        matches!(self, TransferStatus::Completed | TransferStatus::Cancelled)
    }

    pub const fn can_dispatch(&self) -> bool {
        matches!(self, TransferStatus::Pending)
    }

    pub const fn can_complete(&self) -> bool {
        matches!(self, TransferStatus::Pending | TransferStatus::InTransit)
    }

    /// Cancelling twice is an error, not a no-op.
    pub const fn can_cancel(&self) -> bool {
        !self.is_terminal()
    }
}

impl fmt::Display for TransferStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A request to move stock of one item between two locations of a tenant.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct InventoryTransfer {
    pub id: String,
    pub tenant_id: String,
    /// Source item (at `from_location_id`).
    pub item_id: String,
    pub from_location_id: String,
    pub to_location_id: String,
    pub quantity_milli: i64,
    pub status: TransferStatus,
    pub notes: Option<String>,
    pub requested_by: String,
    /// Item that received the stock; set on completion.
    pub destination_item_id: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
    #[ts(as = "Option<String>")]
    pub completed_at: Option<DateTime<Utc>>,
    #[ts(as = "Option<String>")]
    pub cancelled_at: Option<DateTime<Utc>>,
}

impl InventoryTransfer {
    #[inline]
    pub fn quantity(&self) -> Quantity {
        Quantity::from_milli(self.quantity_milli)
    }
}

/// Staff input for `create_inventory_transfer`.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TransferRequest {
    pub item_id: String,
    pub from_location_id: String,
    pub to_location_id: String,
    pub quantity: Quantity,
    pub notes: Option<String>,
}

// =============================================================================
// Unit Tests
// =============================================================================
