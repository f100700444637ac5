//! # Inventory Ledger
//!
//! The append-only record of every stock change.
//!
//! ```text
//!   item.quantity  ==  opening stock  +  Σ movement.quantity
//!
//!   SALE_OUT      −qty   reference SALE      <sale id>
//!   TRANSFER_OUT  −qty   reference TRANSFER  <transfer id>   (source)
//!   TRANSFER_IN   +qty   reference TRANSFER  <transfer id>   (destination)
//!   RECEIVED      +qty   reference MANUAL
//!   ADJUSTMENT    ±qty   reference MANUAL
//! ```
//!
//! There is deliberately no update or delete here; the table's triggers abort
//! both.

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbResult, LedgerError, LedgerResult};
use vetpos_core::{InventoryMovement, MovementType, Quantity, ReferenceType, ValidationError};

/// A movement about to be appended.
#[derive(Debug, Clone)]
pub struct NewMovement<'a> {
    pub tenant_id: &'a str,
    pub item_id: &'a str,
    pub location_id: &'a str,
    pub movement_type: MovementType,
    /// Signed quantity; must agree with `movement_type`.
    pub quantity: Quantity,
    pub reason: String,
    pub reference_type: ReferenceType,
    pub reference_id: Option<&'a str>,
    pub created_by: Option<&'a str>,
}

const MOVEMENT_COLUMNS: &str = r#"
    id, tenant_id, item_id, location_id, movement_type, quantity_milli,
    reason, reference_type, reference_id, created_by, created_at
"#;

/// Appends one row to the ledger.
pub async fn append_movement(
    conn: &mut SqliteConnection,
    movement: NewMovement<'_>,
) -> LedgerResult<InventoryMovement> {
    if !movement.movement_type.accepts(movement.quantity) {
        return Err(LedgerError::from(ValidationError::InvalidFormat {
            field: "quantity".to_string(),
            reason: format!(
                "{:?} movement cannot carry quantity {}",
                movement.movement_type, movement.quantity
            ),
        }));
    }

    let row = InventoryMovement {
        id: Uuid::new_v4().to_string(),
        tenant_id: movement.tenant_id.to_string(),
        item_id: movement.item_id.to_string(),
        location_id: movement.location_id.to_string(),
        movement_type: movement.movement_type,
        quantity_milli: movement.quantity.milli(),
        reason: movement.reason,
        reference_type: movement.reference_type,
        reference_id: movement.reference_id.map(str::to_string),
        created_by: movement.created_by.map(str::to_string),
        created_at: Utc::now(),
    };

    debug!(
        item_id = %row.item_id,
        movement_type = ?row.movement_type,
        quantity = %movement.quantity,
        "Appending inventory movement"
    );

    sqlx::query(
        r#"
        INSERT INTO inventory_movements (
            id, tenant_id, item_id, location_id, movement_type, quantity_milli,
            reason, reference_type, reference_id, created_by, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
        "#,
    )
    .bind(&row.id)
    .bind(&row.tenant_id)
    .bind(&row.item_id)
    .bind(&row.location_id)
    .bind(row.movement_type)
    .bind(row.quantity_milli)
    .bind(&row.reason)
    .bind(row.reference_type)
    .bind(&row.reference_id)
    .bind(&row.created_by)
    .bind(row.created_at)
    .execute(conn)
    .await
    .map_err(crate::DbError::from)?;

    Ok(row)
}

/// Repository for ledger reads.
#[derive(Debug, Clone)]
pub struct LedgerRepository {
    pool: SqlitePool,
}

impl LedgerRepository {
    pub fn new(pool: SqlitePool) -> Self {
        LedgerRepository { pool }
    }

    /// All movements of one stock record, oldest first.
    pub async fn movements_for_item(&self, tenant_id: &str, item_id: &str) -> DbResult<Vec<InventoryMovement>> {
        let sql = format!(
            "SELECT {} FROM inventory_movements WHERE tenant_id = ?1 AND item_id = ?2 ORDER BY created_at, rowid",
            MOVEMENT_COLUMNS
        );

        let movements = sqlx::query_as::<_, InventoryMovement>(&sql)
            .bind(tenant_id)
            .bind(item_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(movements)
    }

    /// Movements written on behalf of one sale or transfer.
    pub async fn movements_for_reference(
        &self,
        tenant_id: &str,
        reference_type: ReferenceType,
        reference_id: &str,
    ) -> DbResult<Vec<InventoryMovement>> {
        let sql = format!(
            r#"
            SELECT {} FROM inventory_movements
            WHERE tenant_id = ?1 AND reference_type = ?2 AND reference_id = ?3
            ORDER BY created_at, rowid
            "#,
            MOVEMENT_COLUMNS
        );

        let movements = sqlx::query_as::<_, InventoryMovement>(&sql)
            .bind(tenant_id)
            .bind(reference_type)
            .bind(reference_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(movements)
    }

    /// Σ of the signed movement quantities of an item.
    pub async fn net_quantity_for_item(&self, tenant_id: &str, item_id: &str) -> DbResult<Quantity> {
        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COALESCE(SUM(quantity_milli), 0)
            FROM inventory_movements
            WHERE tenant_id = ?1 AND item_id = ?2
            "#,
        )
        .bind(tenant_id)
        .bind(item_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(Quantity::from_milli(total))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{seed_item, Fixture};
    use crate::DbError;

    #[tokio::test]
    async fn test_sign_must_match_type() {
        let fx = Fixture::new().await;
        let item = seed_item(&fx.db, &fx.tenant_id, &fx.main_id, "Gauze", 10).await;
        let mut conn = fx.db.pool().acquire().await.unwrap();

        let result = append_movement(
            &mut conn,
            NewMovement {
                tenant_id: &fx.tenant_id,
                item_id: &item.id,
                location_id: &fx.main_id,
                movement_type: MovementType::SaleOut,
                quantity: Quantity::from_units(1),
                reason: "wrong sign".to_string(),
                reference_type: ReferenceType::Manual,
                reference_id: None,
                created_by: None,
            },
        )
        .await;

        assert!(matches!(result, Err(LedgerError::Rule(_))));
    }

    #[tokio::test]
    async fn test_ledger_rows_cannot_change() {
        let fx = Fixture::new().await;
        let item = seed_item(&fx.db, &fx.tenant_id, &fx.main_id, "Gauze", 10).await;

        let update = sqlx::query("UPDATE inventory_movements SET quantity_milli = 1 WHERE item_id = ?1")
            .bind(&item.id)
            .execute(fx.db.pool())
            .await
            .map_err(DbError::from);
        assert!(matches!(update, Err(DbError::QueryFailed(ref m)) if m.contains("append-only")));

        let delete = sqlx::query("DELETE FROM inventory_movements WHERE item_id = ?1")
            .bind(&item.id)
            .execute(fx.db.pool())
            .await
            .map_err(DbError::from);
        assert!(matches!(delete, Err(DbError::QueryFailed(_))));

        let ledger = fx.db.ledger();
        assert_eq!(ledger.movements_for_item(&fx.tenant_id, &item.id).await.unwrap().len(), 1);
        assert_eq!(
            ledger.net_quantity_for_item(&fx.tenant_id, &item.id).await.unwrap(),
            Quantity::from_units(10)
        );
    }
}
