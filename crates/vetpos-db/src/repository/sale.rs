//! # Sale Repository
//!
//! Rows written by a checkout and the reads that hydrate a receipt.
//!
//! ## Sale Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Sale Lifecycle                                    │
//! │                                                                         │
//! │  (one transaction, see SaleService::create_sale)                       │
//! │   insert_sale()      → Sale { status: Pending }                        │
//! │   insert_item() × N  → SaleItem (never updated afterwards)             │
//! │   insert_payment()   → SalePayment (only when something was paid)      │
//! │   mark_completed()   → Sale { status: Completed }  if paid ≥ total     │
//! │                                                                         │
//! │  A PENDING sale keeps its balance due for a later payment.             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use crate::repository::directory;
use vetpos_core::{Sale, SaleDetail, SaleItem, SalePayment};

const SALE_COLUMNS: &str = r#"
    id, tenant_id, sale_number, location_id, customer_id, pet_id, staff_id, user_id,
    status, subtotal_cents, tax_cents, discount_cents, total_cents, amount_paid_cents,
    payment_method, notes, created_at, updated_at, completed_at
"#;

const ITEM_COLUMNS: &str = r#"
    id, sale_id, inventory_item_id, service_id, description, quantity_milli,
    unit_price_cents, discount_cents, line_total_cents, created_at
"#;

const PAYMENT_COLUMNS: &str = r#"
    id, sale_id, payment_method, amount_cents, tendered_cents, change_cents,
    cash_transaction_id, reference, created_at
"#;

// =============================================================================
// Connection-level writes (always inside the checkout transaction)
// =============================================================================

pub(crate) async fn insert_sale(conn: &mut SqliteConnection, sale: &Sale) -> DbResult<()> {
    debug!(id = %sale.id, sale_number = %sale.sale_number, "Inserting sale");

    sqlx::query(
        r#"
        INSERT INTO sales (
            id, tenant_id, sale_number, location_id, customer_id, pet_id, staff_id, user_id,
            status, subtotal_cents, tax_cents, discount_cents, total_cents, amount_paid_cents,
            payment_method, notes, created_at, updated_at, completed_at
        ) VALUES (
            ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8,
            ?9, ?10, ?11, ?12, ?13, ?14,
            ?15, ?16, ?17, ?18, ?19
        )
        "#,
    )
    .bind(&sale.id)
    .bind(&sale.tenant_id)
    .bind(&sale.sale_number)
    .bind(&sale.location_id)
    .bind(&sale.customer_id)
    .bind(&sale.pet_id)
    .bind(&sale.staff_id)
    .bind(&sale.user_id)
    .bind(sale.status)
    .bind(sale.subtotal_cents)
    .bind(sale.tax_cents)
    .bind(sale.discount_cents)
    .bind(sale.total_cents)
    .bind(sale.amount_paid_cents)
    .bind(sale.payment_method)
    .bind(&sale.notes)
    .bind(sale.created_at)
    .bind(sale.updated_at)
    .bind(sale.completed_at)
    .execute(conn)
    .await?;

    Ok(())
}

/// Inserts a line. Description and prices are snapshots; later changes to
/// the item or service do not touch the receipt.
pub(crate) async fn insert_item(conn: &mut SqliteConnection, item: &SaleItem) -> DbResult<()> {
    debug!(sale_id = %item.sale_id, description = %item.description, "Adding sale item");

    sqlx::query(
        r#"
        INSERT INTO sale_items (
            id, sale_id, inventory_item_id, service_id, description, quantity_milli,
            unit_price_cents, discount_cents, line_total_cents, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
        "#,
    )
    .bind(&item.id)
    .bind(&item.sale_id)
    .bind(&item.inventory_item_id)
    .bind(&item.service_id)
    .bind(&item.description)
    .bind(item.quantity_milli)
    .bind(item.unit_price_cents)
    .bind(item.discount_cents)
    .bind(item.line_total_cents)
    .bind(item.created_at)
    .execute(conn)
    .await?;

    Ok(())
}

pub(crate) async fn insert_payment(conn: &mut SqliteConnection, payment: &SalePayment) -> DbResult<()> {
    debug!(sale_id = %payment.sale_id, amount = %payment.amount(), "Recording payment");

    sqlx::query(
        r#"
        INSERT INTO sale_payments (
            id, sale_id, payment_method, amount_cents, tendered_cents, change_cents,
            cash_transaction_id, reference, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
        "#,
    )
    .bind(&payment.id)
    .bind(&payment.sale_id)
    .bind(payment.payment_method)
    .bind(payment.amount_cents)
    .bind(payment.tendered_cents)
    .bind(payment.change_cents)
    .bind(&payment.cash_transaction_id)
    .bind(&payment.reference)
    .bind(payment.created_at)
    .execute(conn)
    .await?;

    Ok(())
}

/// PENDING → COMPLETED.
pub(crate) async fn mark_completed(
    conn: &mut SqliteConnection,
    sale_id: &str,
    at: DateTime<Utc>,
) -> DbResult<()> {
    let result = sqlx::query(
        r#"
        UPDATE sales SET
            status = 'COMPLETED',
            completed_at = ?2,
            updated_at = ?2
        WHERE id = ?1 AND status = 'PENDING'
        "#,
    )
    .bind(sale_id)
    .bind(at)
    .execute(conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::not_found("Sale (pending)", sale_id));
    }

    Ok(())
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for sale reads.
#[derive(Debug, Clone)]
pub struct SaleRepository {
    pool: SqlitePool,
}

impl SaleRepository {
    /// Creates a new SaleRepository.
    pub fn new(pool: SqlitePool) -> Self {
        SaleRepository { pool }
    }

    /// Gets a sale by ID within the tenant.
    pub async fn get_by_id(&self, tenant_id: &str, id: &str) -> DbResult<Option<Sale>> {
        let sql = format!("SELECT {} FROM sales WHERE id = ?1 AND tenant_id = ?2", SALE_COLUMNS);

        let sale = sqlx::query_as::<_, Sale>(&sql)
            .bind(id)
            .bind(tenant_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(sale)
    }

    /// Gets a sale by its receipt number.
    pub async fn get_by_number(&self, tenant_id: &str, sale_number: &str) -> DbResult<Option<Sale>> {
        let sql = format!(
            "SELECT {} FROM sales WHERE tenant_id = ?1 AND sale_number = ?2",
            SALE_COLUMNS
        );

        let sale = sqlx::query_as::<_, Sale>(&sql)
            .bind(tenant_id)
            .bind(sale_number)
            .fetch_optional(&self.pool)
            .await?;

        Ok(sale)
    }

    /// Gets all items for a sale, in entry order.
    pub async fn get_items(&self, sale_id: &str) -> DbResult<Vec<SaleItem>> {
        let sql = format!(
            "SELECT {} FROM sale_items WHERE sale_id = ?1 ORDER BY created_at, rowid",
            ITEM_COLUMNS
        );

        let items = sqlx::query_as::<_, SaleItem>(&sql)
            .bind(sale_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(items)
    }

    /// Gets all payments for a sale.
    pub async fn get_payments(&self, sale_id: &str) -> DbResult<Vec<SalePayment>> {
        let sql = format!(
            "SELECT {} FROM sale_payments WHERE sale_id = ?1 ORDER BY created_at, rowid",
            PAYMENT_COLUMNS
        );

        let payments = sqlx::query_as::<_, SalePayment>(&sql)
            .bind(sale_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(payments)
    }

    /// A sale with its lines, payments, customer and pet.
    pub async fn get_detail(&self, tenant_id: &str, id: &str) -> DbResult<Option<SaleDetail>> {
        let Some(sale) = self.get_by_id(tenant_id, id).await? else {
            return Ok(None);
        };

        let items = self.get_items(&sale.id).await?;
        let payments = self.get_payments(&sale.id).await?;

        let mut conn = self.pool.acquire().await?;
        let customer = match sale.customer_id.as_deref() {
            Some(customer_id) => directory::find_customer(&mut conn, tenant_id, customer_id).await?,
            None => None,
        };
        let pet = match sale.pet_id.as_deref() {
            Some(pet_id) => directory::find_pet(&mut conn, tenant_id, pet_id).await?,
            None => None,
        };

        Ok(Some(SaleDetail {
            sale,
            items,
            payments,
            customer,
            pet,
        }))
    }

    /// Most recent sales of a tenant.
    pub async fn list_recent(&self, tenant_id: &str, limit: u32) -> DbResult<Vec<Sale>> {
        let sql = format!(
            "SELECT {} FROM sales WHERE tenant_id = ?1 ORDER BY created_at DESC, rowid DESC LIMIT ?2",
            SALE_COLUMNS
        );

        let sales = sqlx::query_as::<_, Sale>(&sql)
            .bind(tenant_id)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        Ok(sales)
    }

    /// Number of sales of a tenant.
    pub async fn count(&self, tenant_id: &str) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sales WHERE tenant_id = ?1")
            .bind(tenant_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}
