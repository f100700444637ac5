//! # Transfer Repository
//!
//! Inventory transfer rows. Every status change is a conditional UPDATE on
//! the expected current status, so two callers cannot both win the same
//! transition:
//!
//! ```text
//!   PENDING ──dispatch──► IN_TRANSIT
//!      │                      │
//!      ├──────complete────────┤──► COMPLETED
//!      └──────cancel──────────┴──► CANCELLED
//! ```

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::DbResult;
use vetpos_core::{InventoryTransfer, TransferStatus};

const TRANSFER_COLUMNS: &str = r#"
    id, tenant_id, item_id, from_location_id, to_location_id, quantity_milli, status,
    notes, requested_by, destination_item_id, created_at, updated_at, completed_at,
    cancelled_at
"#;

// =============================================================================
// Connection-level operations (usable inside a transaction)
// =============================================================================

pub(crate) async fn find_transfer(
    conn: &mut SqliteConnection,
    tenant_id: &str,
    id: &str,
) -> DbResult<Option<InventoryTransfer>> {
    let sql = format!(
        "SELECT {} FROM inventory_transfers WHERE id = ?1 AND tenant_id = ?2",
        TRANSFER_COLUMNS
    );

    let transfer = sqlx::query_as::<_, InventoryTransfer>(&sql)
        .bind(id)
        .bind(tenant_id)
        .fetch_optional(conn)
        .await?;

    Ok(transfer)
}

/// PENDING | IN_TRANSIT → COMPLETED. Returns false when the transfer was not
/// in a completable state (or does not exist).
pub(crate) async fn claim_for_completion(
    conn: &mut SqliteConnection,
    tenant_id: &str,
    id: &str,
    at: DateTime<Utc>,
) -> DbResult<bool> {
    let result = sqlx::query(
        r#"
        UPDATE inventory_transfers
        SET status = 'COMPLETED', completed_at = ?1, updated_at = ?1
        WHERE id = ?2 AND tenant_id = ?3 AND status IN ('PENDING', 'IN_TRANSIT')
        "#,
    )
    .bind(at)
    .bind(id)
    .bind(tenant_id)
    .execute(conn)
    .await?;

    Ok(result.rows_affected() == 1)
}

pub(crate) async fn set_destination_item(
    conn: &mut SqliteConnection,
    id: &str,
    destination_item_id: &str,
) -> DbResult<()> {
    sqlx::query("UPDATE inventory_transfers SET destination_item_id = ?1 WHERE id = ?2")
        .bind(destination_item_id)
        .bind(id)
        .execute(conn)
        .await?;

    Ok(())
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for inventory transfers.
#[derive(Debug, Clone)]
pub struct TransferRepository {
    pool: SqlitePool,
}

impl TransferRepository {
    pub fn new(pool: SqlitePool) -> Self {
        TransferRepository { pool }
    }

    pub async fn get(&self, tenant_id: &str, id: &str) -> DbResult<Option<InventoryTransfer>> {
        let mut conn = self.pool.acquire().await?;
        find_transfer(&mut conn, tenant_id, id).await
    }

    /// Transfers of a tenant, newest first, optionally of one status.
    pub async fn list(
        &self,
        tenant_id: &str,
        status: Option<TransferStatus>,
    ) -> DbResult<Vec<InventoryTransfer>> {
        let sql = format!(
            r#"
            SELECT {} FROM inventory_transfers
            WHERE tenant_id = ?1 AND (?2 IS NULL OR status = ?2)
            ORDER BY created_at DESC, rowid DESC
            "#,
            TRANSFER_COLUMNS
        );

        let transfers = sqlx::query_as::<_, InventoryTransfer>(&sql)
            .bind(tenant_id)
            .bind(status)
            .fetch_all(&self.pool)
            .await?;

        Ok(transfers)
    }

    pub async fn insert(&self, transfer: &InventoryTransfer) -> DbResult<()> {
        debug!(id = %transfer.id, item_id = %transfer.item_id, "Inserting transfer");

        sqlx::query(
            r#"
            INSERT INTO inventory_transfers (
                id, tenant_id, item_id, from_location_id, to_location_id, quantity_milli,
                status, notes, requested_by, destination_item_id, created_at, updated_at,
                completed_at, cancelled_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
            "#,
        )
        .bind(&transfer.id)
        .bind(&transfer.tenant_id)
        .bind(&transfer.item_id)
        .bind(&transfer.from_location_id)
        .bind(&transfer.to_location_id)
        .bind(transfer.quantity_milli)
        .bind(transfer.status)
        .bind(&transfer.notes)
        .bind(&transfer.requested_by)
        .bind(&transfer.destination_item_id)
        .bind(transfer.created_at)
        .bind(transfer.updated_at)
        .bind(transfer.completed_at)
        .bind(transfer.cancelled_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// PENDING → IN_TRANSIT. Returns whether the row changed.
    pub async fn mark_in_transit(&self, tenant_id: &str, id: &str) -> DbResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE inventory_transfers
            SET status = 'IN_TRANSIT', updated_at = ?1
            WHERE id = ?2 AND tenant_id = ?3 AND status = 'PENDING'
            "#,
        )
        .bind(Utc::now())
        .bind(id)
        .bind(tenant_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// PENDING | IN_TRANSIT → CANCELLED. Returns whether the row changed.
    pub async fn mark_cancelled(&self, tenant_id: &str, id: &str) -> DbResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE inventory_transfers
            SET status = 'CANCELLED', cancelled_at = ?1, updated_at = ?1
            WHERE id = ?2 AND tenant_id = ?3 AND status IN ('PENDING', 'IN_TRANSIT')
            "#,
        )
        .bind(Utc::now())
        .bind(id)
        .bind(tenant_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }
}
