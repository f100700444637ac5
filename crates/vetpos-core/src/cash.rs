//! # Cash Drawer Types
//!
//! ```text
//!   CashDrawer (one per location per day, OPEN → CLOSED)
//!       │
//!       ├── CashShift (a cashier's session on the drawer, ACTIVE → CLOSED)
//!       │
//!       └── CashTransaction (every cash movement: float, cash sales)
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DrawerStatus {
    Open,
    Closed,
}

/// A cash register session.
///
/// `location_id = None` is a tenant-wide drawer.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct CashDrawer {
    pub id: String,
    pub tenant_id: String,
    pub location_id: Option<String>,
    pub status: DrawerStatus,
    pub opening_balance_cents: i64,
    pub closing_balance_cents: Option<i64>,
    pub opened_by: String,
    #[ts(as = "String")]
    pub opened_at: DateTime<Utc>,
    #[ts(as = "Option<String>")]
    pub closed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ShiftStatus {
    Active,
    Closed,
}

/// A cashier working a drawer.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct CashShift {
    pub id: String,
    pub tenant_id: String,
    pub drawer_id: String,
    pub cashier_id: String,
    pub status: ShiftStatus,
    #[ts(as = "String")]
    pub started_at: DateTime<Utc>,
    #[ts(as = "Option<String>")]
    pub ended_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CashTransactionType {
    /// Float counted into the drawer when it is opened.
    OpeningFloat,
    /// Cash taken for a sale.
    SaleCash,
}

/// One cash movement against a drawer.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct CashTransaction {
    pub id: String,
    pub tenant_id: String,
    pub drawer_id: String,
    pub shift_id: Option<String>,
    pub transaction_type: CashTransactionType,
    pub amount_cents: i64,
    pub sale_id: Option<String>,
    pub created_by: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl CashTransaction {
    #[inline]
    pub fn amount(&self) -> Money {
        Money::from_cents(self.amount_cents)
    }
}

/// Result of the drawer/shift lookup made at checkout.
#[derive(Debug, Clone, Default)]
pub struct DrawerResolution {
    pub drawer: Option<CashDrawer>,
    pub shift: Option<CashShift>,
}

impl DrawerResolution {
    /// Whether a drawer is open for today.
    #[inline]
    pub fn has_open_drawer(&self) -> bool {
        self.drawer.is_some()
    }

    /// The cashier to attribute the sale to, if a shift is running.
    pub fn attending_staff(&self) -> Option<&str> {
        self.shift.as_ref().map(|s| s.cashier_id.as_str())
    }
}
