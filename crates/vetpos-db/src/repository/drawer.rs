//! # Cash Drawer Repository
//!
//! Drawers, cashier shifts and the cash that moves through them.
//!
//! ## Drawer Resolution at Checkout
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  resolve(tenant, location, now)                                         │
//! │                                                                         │
//! │  1. OPEN drawers of the tenant, newest first                           │
//! │  2. keep those opened inside BusinessDay::containing(now)              │
//! │  3. sale at a location:  drawer at that location, else tenant-wide     │
//! │     sale without one:    tenant-wide drawer, else any                  │
//! │  4. newest ACTIVE shift on the chosen drawer → attending cashier       │
//! │                                                                         │
//! │  Read only. A missing drawer is not an error here; the sale service    │
//! │  decides (cash needs one, card does not).                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{DbError, DbResult, LedgerError, LedgerResult};
use vetpos_core::validation::{validate_amount_cents, validate_optional_uuid, validate_uuid};
use vetpos_core::{
    BusinessDay, CashDrawer, CashShift, CashTransaction, CashTransactionType, CoreError,
    DrawerResolution, DrawerStatus, Money, ShiftStatus,
};

const DRAWER_COLUMNS: &str = r#"
    id, tenant_id, location_id, status, opening_balance_cents, closing_balance_cents,
    opened_by, opened_at, closed_at
"#;

const SHIFT_COLUMNS: &str = "id, tenant_id, drawer_id, cashier_id, status, started_at, ended_at";

const TRANSACTION_COLUMNS: &str = r#"
    id, tenant_id, drawer_id, shift_id, transaction_type, amount_cents, sale_id,
    created_by, created_at
"#;

/// A cash movement about to be recorded.
#[derive(Debug, Clone)]
pub struct NewCashTransaction<'a> {
    pub tenant_id: &'a str,
    pub drawer_id: &'a str,
    pub shift_id: Option<&'a str>,
    pub transaction_type: CashTransactionType,
    pub amount: Money,
    pub sale_id: Option<&'a str>,
    pub created_by: &'a str,
}

// =============================================================================
// Connection-level operations (usable inside a transaction)
// =============================================================================

/// Finds today's open drawer and its running shift.
pub async fn resolve(
    conn: &mut SqliteConnection,
    tenant_id: &str,
    location_id: Option<&str>,
    now: DateTime<Utc>,
) -> DbResult<DrawerResolution> {
    let day = BusinessDay::containing(now);

    let sql = format!(
        "SELECT {} FROM cash_drawers WHERE tenant_id = ?1 AND status = 'OPEN' ORDER BY opened_at DESC",
        DRAWER_COLUMNS
    );
    let open: Vec<CashDrawer> = sqlx::query_as::<_, CashDrawer>(&sql)
        .bind(tenant_id)
        .fetch_all(&mut *conn)
        .await?
        .into_iter()
        .filter(|d| day.contains(d.opened_at))
        .collect();

    let tenant_wide = || open.iter().find(|d| d.location_id.is_none());
    let chosen = match location_id {
        Some(location) => open
            .iter()
            .find(|d| d.location_id.as_deref() == Some(location))
            .or_else(tenant_wide),
        None => tenant_wide().or_else(|| open.first()),
    }
    .cloned();

    let Some(drawer) = chosen else {
        debug!(tenant_id = %tenant_id, location_id = ?location_id, "No open drawer today");
        return Ok(DrawerResolution::default());
    };

    let sql = format!(
        r#"
        SELECT {} FROM cash_shifts
        WHERE drawer_id = ?1 AND tenant_id = ?2 AND status = 'ACTIVE'
        ORDER BY started_at DESC
        LIMIT 1
        "#,
        SHIFT_COLUMNS
    );
    let shift = sqlx::query_as::<_, CashShift>(&sql)
        .bind(&drawer.id)
        .bind(tenant_id)
        .fetch_optional(&mut *conn)
        .await?;

    debug!(
        drawer_id = %drawer.id,
        shift_id = ?shift.as_ref().map(|s| s.id.as_str()),
        "Resolved cash drawer"
    );

    Ok(DrawerResolution {
        drawer: Some(drawer),
        shift,
    })
}

/// Writes one cash transaction.
pub async fn record_cash_transaction(
    conn: &mut SqliteConnection,
    new: NewCashTransaction<'_>,
) -> DbResult<CashTransaction> {
    let row = CashTransaction {
        id: Uuid::new_v4().to_string(),
        tenant_id: new.tenant_id.to_string(),
        drawer_id: new.drawer_id.to_string(),
        shift_id: new.shift_id.map(str::to_string),
        transaction_type: new.transaction_type,
        amount_cents: new.amount.cents(),
        sale_id: new.sale_id.map(str::to_string),
        created_by: new.created_by.to_string(),
        created_at: Utc::now(),
    };

    debug!(
        drawer_id = %row.drawer_id,
        transaction_type = ?row.transaction_type,
        amount = %new.amount,
        "Recording cash transaction"
    );

    sqlx::query(
        r#"
        INSERT INTO cash_transactions (
            id, tenant_id, drawer_id, shift_id, transaction_type, amount_cents, sale_id,
            created_by, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
        "#,
    )
    .bind(&row.id)
    .bind(&row.tenant_id)
    .bind(&row.drawer_id)
    .bind(&row.shift_id)
    .bind(row.transaction_type)
    .bind(row.amount_cents)
    .bind(&row.sale_id)
    .bind(&row.created_by)
    .bind(row.created_at)
    .execute(conn)
    .await?;

    Ok(row)
}

async fn find_drawer(
    conn: &mut SqliteConnection,
    tenant_id: &str,
    drawer_id: &str,
) -> DbResult<Option<CashDrawer>> {
    let sql = format!(
        "SELECT {} FROM cash_drawers WHERE id = ?1 AND tenant_id = ?2",
        DRAWER_COLUMNS
    );

    let drawer = sqlx::query_as::<_, CashDrawer>(&sql)
        .bind(drawer_id)
        .bind(tenant_id)
        .fetch_optional(conn)
        .await?;

    Ok(drawer)
}

async fn find_shift(
    conn: &mut SqliteConnection,
    tenant_id: &str,
    shift_id: &str,
) -> DbResult<Option<CashShift>> {
    let sql = format!(
        "SELECT {} FROM cash_shifts WHERE id = ?1 AND tenant_id = ?2",
        SHIFT_COLUMNS
    );

    let shift = sqlx::query_as::<_, CashShift>(&sql)
        .bind(shift_id)
        .bind(tenant_id)
        .fetch_optional(conn)
        .await?;

    Ok(shift)
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for drawers, shifts and cash transactions.
#[derive(Debug, Clone)]
pub struct DrawerRepository {
    pool: SqlitePool,
}

impl DrawerRepository {
    pub fn new(pool: SqlitePool) -> Self {
        DrawerRepository { pool }
    }

    /// See [`resolve`].
    pub async fn resolve(
        &self,
        tenant_id: &str,
        location_id: Option<&str>,
        now: DateTime<Utc>,
    ) -> DbResult<DrawerResolution> {
        let mut conn = self.pool.acquire().await?;
        resolve(&mut conn, tenant_id, location_id, now).await
    }

    pub async fn get(&self, tenant_id: &str, drawer_id: &str) -> DbResult<Option<CashDrawer>> {
        let mut conn = self.pool.acquire().await?;
        find_drawer(&mut conn, tenant_id, drawer_id).await
    }

    /// Opens a drawer for the day.
    ///
    /// `location_id = None` opens a tenant-wide drawer. A non-zero float is
    /// booked as an `OPENING_FLOAT` cash transaction.
    pub async fn open_drawer(
        &self,
        tenant_id: &str,
        location_id: Option<&str>,
        opening_balance: Money,
        opened_by: &str,
    ) -> LedgerResult<CashDrawer> {
        validate_optional_uuid("location_id", location_id)?;
        validate_amount_cents("opening_balance_cents", opening_balance.cents())?;

        let drawer = CashDrawer {
            id: Uuid::new_v4().to_string(),
            tenant_id: tenant_id.to_string(),
            location_id: location_id.map(str::to_string),
            status: DrawerStatus::Open,
            opening_balance_cents: opening_balance.cents(),
            closing_balance_cents: None,
            opened_by: opened_by.to_string(),
            opened_at: Utc::now(),
            closed_at: None,
        };

        let mut tx = self.pool.begin().await.map_err(DbError::transaction)?;

        sqlx::query(
            r#"
            INSERT INTO cash_drawers (
                id, tenant_id, location_id, status, opening_balance_cents,
                closing_balance_cents, opened_by, opened_at, closed_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )
        .bind(&drawer.id)
        .bind(&drawer.tenant_id)
        .bind(&drawer.location_id)
        .bind(drawer.status)
        .bind(drawer.opening_balance_cents)
        .bind(drawer.closing_balance_cents)
        .bind(&drawer.opened_by)
        .bind(drawer.opened_at)
        .bind(drawer.closed_at)
        .execute(&mut *tx)
        .await
        .map_err(DbError::from)?;

        if opening_balance.is_positive() {
            record_cash_transaction(
                &mut tx,
                NewCashTransaction {
                    tenant_id,
                    drawer_id: &drawer.id,
                    shift_id: None,
                    transaction_type: CashTransactionType::OpeningFloat,
                    amount: opening_balance,
                    sale_id: None,
                    created_by: opened_by,
                },
            )
            .await?;
        }

        tx.commit().await.map_err(DbError::transaction)?;

        info!(
            drawer_id = %drawer.id,
            tenant_id = %tenant_id,
            location_id = ?location_id,
            opening_balance = %opening_balance,
            "Cash drawer opened"
        );
        Ok(drawer)
    }

    /// Closes an open drawer and ends any shift still running on it.
    pub async fn close_drawer(
        &self,
        tenant_id: &str,
        drawer_id: &str,
        closing_balance: Money,
    ) -> LedgerResult<CashDrawer> {
        validate_amount_cents("closing_balance_cents", closing_balance.cents())?;
        let now = Utc::now();

        let mut tx = self.pool.begin().await.map_err(DbError::transaction)?;

        let closed = sqlx::query(
            r#"
            UPDATE cash_drawers
            SET status = 'CLOSED', closing_balance_cents = ?1, closed_at = ?2
            WHERE id = ?3 AND tenant_id = ?4 AND status = 'OPEN'
            "#,
        )
        .bind(closing_balance.cents())
        .bind(now)
        .bind(drawer_id)
        .bind(tenant_id)
        .execute(&mut *tx)
        .await
        .map_err(DbError::from)?;

        if closed.rows_affected() == 0 {
            return Err(LedgerError::not_found("Open cash drawer", drawer_id));
        }

        sqlx::query(
            r#"
            UPDATE cash_shifts SET status = 'CLOSED', ended_at = ?1
            WHERE drawer_id = ?2 AND tenant_id = ?3 AND status = 'ACTIVE'
            "#,
        )
        .bind(now)
        .bind(drawer_id)
        .bind(tenant_id)
        .execute(&mut *tx)
        .await
        .map_err(DbError::from)?;

        let drawer = find_drawer(&mut tx, tenant_id, drawer_id)
            .await?
            .ok_or_else(|| LedgerError::not_found("Cash drawer", drawer_id))?;

        tx.commit().await.map_err(DbError::transaction)?;

        info!(drawer_id = %drawer_id, closing_balance = %closing_balance, "Cash drawer closed");
        Ok(drawer)
    }

    /// Starts a cashier's shift on an open drawer.
    pub async fn start_shift(&self, tenant_id: &str, drawer_id: &str, cashier_id: &str) -> LedgerResult<CashShift> {
        validate_uuid("cashier_id", cashier_id)?;

        let drawer = self
            .get(tenant_id, drawer_id)
            .await?
            .ok_or_else(|| LedgerError::not_found("Cash drawer", drawer_id))?;

        if drawer.status != DrawerStatus::Open {
            return Err(CoreError::CashDrawerNotOpen {
                location_id: drawer.location_id,
            }
            .into());
        }

        let shift = CashShift {
            id: Uuid::new_v4().to_string(),
            tenant_id: tenant_id.to_string(),
            drawer_id: drawer_id.to_string(),
            cashier_id: cashier_id.to_string(),
            status: ShiftStatus::Active,
            started_at: Utc::now(),
            ended_at: None,
        };

        sqlx::query(
            r#"
            INSERT INTO cash_shifts (id, tenant_id, drawer_id, cashier_id, status, started_at, ended_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(&shift.id)
        .bind(&shift.tenant_id)
        .bind(&shift.drawer_id)
        .bind(&shift.cashier_id)
        .bind(shift.status)
        .bind(shift.started_at)
        .bind(shift.ended_at)
        .execute(&self.pool)
        .await
        .map_err(DbError::from)?;

        info!(shift_id = %shift.id, drawer_id = %drawer_id, cashier_id = %cashier_id, "Shift started");
        Ok(shift)
    }

    /// Ends an active shift.
    pub async fn end_shift(&self, tenant_id: &str, shift_id: &str) -> LedgerResult<CashShift> {
        let ended = sqlx::query(
            r#"
            UPDATE cash_shifts SET status = 'CLOSED', ended_at = ?1
            WHERE id = ?2 AND tenant_id = ?3 AND status = 'ACTIVE'
            "#,
        )
        .bind(Utc::now())
        .bind(shift_id)
        .bind(tenant_id)
        .execute(&self.pool)
        .await
        .map_err(DbError::from)?;

        if ended.rows_affected() == 0 {
            return Err(LedgerError::not_found("Active shift", shift_id));
        }

        let mut conn = self.pool.acquire().await.map_err(DbError::from)?;
        let shift = find_shift(&mut conn, tenant_id, shift_id)
            .await?
            .ok_or_else(|| LedgerError::not_found("Shift", shift_id))?;

        info!(shift_id = %shift_id, "Shift ended");
        Ok(shift)
    }

    /// Cash transactions of a drawer, oldest first.
    pub async fn transactions_for_drawer(&self, tenant_id: &str, drawer_id: &str) -> DbResult<Vec<CashTransaction>> {
        let sql = format!(
            r#"
            SELECT {} FROM cash_transactions
            WHERE tenant_id = ?1 AND drawer_id = ?2
            ORDER BY created_at, rowid
            "#,
            TRANSACTION_COLUMNS
        );

        let transactions = sqlx::query_as::<_, CashTransaction>(&sql)
            .bind(tenant_id)
            .bind(drawer_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(transactions)
    }

    /// Cash that should be in the drawer: float plus cash takings.
    pub async fn expected_balance(&self, tenant_id: &str, drawer_id: &str) -> DbResult<Money> {
        let cents: i64 = sqlx::query_scalar(
            "SELECT COALESCE(SUM(amount_cents), 0) FROM cash_transactions WHERE tenant_id = ?1 AND drawer_id = ?2",
        )
        .bind(tenant_id)
        .bind(drawer_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(Money::from_cents(cents))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::Fixture;
    use chrono::Duration;

    #[tokio::test]
    async fn test_resolve_prefers_location_drawer() {
        let fx = Fixture::new().await;
        let drawers = fx.db.drawers();

        let tenant_wide = drawers
            .open_drawer(&fx.tenant_id, None, Money::zero(), &fx.user_id)
            .await
            .unwrap();
        let at_main = drawers
            .open_drawer(&fx.tenant_id, Some(&fx.main_id), Money::from_cents(5_000), &fx.user_id)
            .await
            .unwrap();

        let now = Utc::now();
        let main = drawers.resolve(&fx.tenant_id, Some(&fx.main_id), now).await.unwrap();
        assert_eq!(main.drawer.map(|d| d.id), Some(at_main.id));

        let branch = drawers.resolve(&fx.tenant_id, Some(&fx.branch_id), now).await.unwrap();
        assert_eq!(branch.drawer.map(|d| d.id), Some(tenant_wide.id.clone()));

        let anywhere = drawers.resolve(&fx.tenant_id, None, now).await.unwrap();
        assert_eq!(anywhere.drawer.map(|d| d.id), Some(tenant_wide.id));
    }

    #[tokio::test]
    async fn test_resolve_ignores_other_days_and_closed() {
        let fx = Fixture::new().await;
        let drawers = fx.db.drawers();
        let drawer = drawers
            .open_drawer(&fx.tenant_id, Some(&fx.main_id), Money::zero(), &fx.user_id)
            .await
            .unwrap();

        let tomorrow = Utc::now() + Duration::days(1);
        let later = drawers.resolve(&fx.tenant_id, Some(&fx.main_id), tomorrow).await.unwrap();
        assert!(!later.has_open_drawer());

        drawers
            .close_drawer(&fx.tenant_id, &drawer.id, Money::zero())
            .await
            .unwrap();
        let now = drawers.resolve(&fx.tenant_id, Some(&fx.main_id), Utc::now()).await.unwrap();
        assert!(!now.has_open_drawer());
    }

    #[tokio::test]
    async fn test_shift_supplies_attending_staff() {
        let fx = Fixture::new().await;
        let drawers = fx.db.drawers();
        let drawer = drawers
            .open_drawer(&fx.tenant_id, Some(&fx.main_id), Money::zero(), &fx.user_id)
            .await
            .unwrap();

        let resolution = drawers.resolve(&fx.tenant_id, Some(&fx.main_id), Utc::now()).await.unwrap();
        assert!(resolution.has_open_drawer());
        assert_eq!(resolution.attending_staff(), None);

        let shift = drawers
            .start_shift(&fx.tenant_id, &drawer.id, &fx.cashier_id)
            .await
            .unwrap();
        let resolution = drawers.resolve(&fx.tenant_id, Some(&fx.main_id), Utc::now()).await.unwrap();
        assert_eq!(resolution.attending_staff(), Some(fx.cashier_id.as_str()));

        drawers.end_shift(&fx.tenant_id, &shift.id).await.unwrap();
        let resolution = drawers.resolve(&fx.tenant_id, Some(&fx.main_id), Utc::now()).await.unwrap();
        assert_eq!(resolution.attending_staff(), None);

        // Ending twice is an error
        assert!(drawers.end_shift(&fx.tenant_id, &shift.id).await.is_err());
    }

    #[tokio::test]
    async fn test_opening_float_and_close() {
        let fx = Fixture::new().await;
        let drawers = fx.db.drawers();
        let drawer = drawers
            .open_drawer(&fx.tenant_id, None, Money::from_cents(10_000), &fx.user_id)
            .await
            .unwrap();

        let txns = drawers.transactions_for_drawer(&fx.tenant_id, &drawer.id).await.unwrap();
        assert_eq!(txns.len(), 1);
        assert_eq!(txns[0].transaction_type, CashTransactionType::OpeningFloat);
        assert_eq!(
            drawers.expected_balance(&fx.tenant_id, &drawer.id).await.unwrap(),
            Money::from_cents(10_000)
        );

        let closed = drawers
            .close_drawer(&fx.tenant_id, &drawer.id, Money::from_cents(10_000))
            .await
            .unwrap();
        assert_eq!(closed.status, DrawerStatus::Closed);
        assert_eq!(closed.closing_balance_cents, Some(10_000));

        let again = drawers.start_shift(&fx.tenant_id, &drawer.id, &fx.cashier_id).await;
        assert!(matches!(again, Err(LedgerError::Rule(CoreError::CashDrawerNotOpen { .. }))));
    }
}
