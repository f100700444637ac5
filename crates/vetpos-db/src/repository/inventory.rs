//! # Inventory Repository
//!
//! Stock records, one per product per location.
//!
//! ## Stock Mutation
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  decrement_stock(item, 2)                                               │
//! │                                                                         │
//! │   UPDATE inventory_items                                               │
//! │      SET quantity_milli = quantity_milli - 2000                        │
//! │    WHERE id = ? AND tenant_id = ?                                      │
//! │      AND quantity_milli >= 2000          ← omitted when negative       │
//! │   RETURNING quantity_milli                  stock is allowed           │
//! │                                                                         │
//! │   row returned  → new quantity                                         │
//! │   no row        → item missing (NotFound) or short (InsufficientStock) │
//! │                                                                         │
//! │  Two checkouts racing for the last unit: the second UPDATE sees the    │
//! │  first one's result and matches no row.                                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every mutator here only touches `inventory_items`; the caller appends the
//! matching ledger row in the same transaction.

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{DbError, DbResult, LedgerError, LedgerResult};
use crate::repository::ledger::{self, NewMovement};
use vetpos_core::validation::{validate_quantity, validate_uuid};
use vetpos_core::{
    normalize_item_name, CoreError, InventoryItem, ItemLookupKey, ItemStatus, MovementType,
    NewInventoryItem, Quantity, ReferenceType, ValidationError,
};

const ITEM_COLUMNS: &str = r#"
    id, tenant_id, location_id, name, name_key, category, sku, quantity_milli,
    cost_cents, price_cents, min_stock_milli, status, created_at, updated_at
"#;

// =============================================================================
// Connection-level operations (usable inside a transaction)
// =============================================================================

/// Loads an item of the tenant, at any location.
pub(crate) async fn find_item(
    conn: &mut SqliteConnection,
    tenant_id: &str,
    item_id: &str,
) -> DbResult<Option<InventoryItem>> {
    let sql = format!(
        "SELECT {} FROM inventory_items WHERE id = ?1 AND tenant_id = ?2",
        ITEM_COLUMNS
    );

    let item = sqlx::query_as::<_, InventoryItem>(&sql)
        .bind(item_id)
        .bind(tenant_id)
        .fetch_optional(conn)
        .await?;

    Ok(item)
}

/// Finds "the same product" at the key's location.
pub async fn find_by_lookup_key(
    conn: &mut SqliteConnection,
    key: &ItemLookupKey,
) -> DbResult<Option<InventoryItem>> {
    let sql = format!(
        r#"
        SELECT {} FROM inventory_items
        WHERE tenant_id = ?1 AND location_id = ?2 AND name_key = ?3 AND category = ?4
        "#,
        ITEM_COLUMNS
    );

    let item = sqlx::query_as::<_, InventoryItem>(&sql)
        .bind(&key.tenant_id)
        .bind(&key.location_id)
        .bind(&key.name_key)
        .bind(&key.category)
        .fetch_optional(conn)
        .await?;

    Ok(item)
}

/// Inserts a stock record. Does not write a ledger row.
pub async fn insert_item(
    conn: &mut SqliteConnection,
    tenant_id: &str,
    new: &NewInventoryItem,
) -> DbResult<InventoryItem> {
    let now = Utc::now();
    let item = InventoryItem {
        id: Uuid::new_v4().to_string(),
        tenant_id: tenant_id.to_string(),
        location_id: new.location_id.clone(),
        name: new.name.trim().to_string(),
        name_key: normalize_item_name(&new.name),
        category: new.category.as_deref().map(str::trim).unwrap_or("").to_string(),
        sku: new.sku.clone(),
        quantity_milli: new.quantity.milli(),
        cost_cents: new.cost_cents,
        price_cents: new.price_cents,
        min_stock_milli: new.min_stock.milli(),
        status: ItemStatus::Active,
        created_at: now,
        updated_at: now,
    };

    debug!(id = %item.id, location_id = %item.location_id, name = %item.name, "Inserting inventory item");

    sqlx::query(
        r#"
        INSERT INTO inventory_items (
            id, tenant_id, location_id, name, name_key, category, sku, quantity_milli,
            cost_cents, price_cents, min_stock_milli, status, created_at, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
        "#,
    )
    .bind(&item.id)
    .bind(&item.tenant_id)
    .bind(&item.location_id)
    .bind(&item.name)
    .bind(&item.name_key)
    .bind(&item.category)
    .bind(&item.sku)
    .bind(item.quantity_milli)
    .bind(item.cost_cents)
    .bind(item.price_cents)
    .bind(item.min_stock_milli)
    .bind(item.status)
    .bind(item.created_at)
    .bind(item.updated_at)
    .execute(conn)
    .await?;

    Ok(item)
}

/// Takes `quantity` off an item; returns the remaining quantity.
///
/// Fails with `InsufficientStock` when the item holds less than `quantity`
/// unless `allow_negative` is set.
pub async fn decrement_stock(
    conn: &mut SqliteConnection,
    tenant_id: &str,
    item_id: &str,
    quantity: Quantity,
    allow_negative: bool,
) -> LedgerResult<Quantity> {
    let remaining: Option<i64> = sqlx::query_scalar(
        r#"
        UPDATE inventory_items
        SET quantity_milli = quantity_milli - ?1,
            updated_at = ?2
        WHERE id = ?3 AND tenant_id = ?4
          AND (?5 OR quantity_milli >= ?1)
        RETURNING quantity_milli
        "#,
    )
    .bind(quantity.milli())
    .bind(Utc::now())
    .bind(item_id)
    .bind(tenant_id)
    .bind(allow_negative)
    .fetch_optional(&mut *conn)
    .await
    .map_err(DbError::from)?;

    match remaining {
        Some(milli) => Ok(Quantity::from_milli(milli)),
        None => {
            let item = find_item(conn, tenant_id, item_id)
                .await?
                .ok_or_else(|| LedgerError::not_found("Inventory item", item_id))?;

            Err(CoreError::InsufficientStock {
                available: item.quantity(),
                item: item.name,
                requested: quantity,
            }
            .into())
        }
    }
}

/// Adds `quantity` to an item; returns the new quantity.
pub async fn increment_stock(
    conn: &mut SqliteConnection,
    tenant_id: &str,
    item_id: &str,
    quantity: Quantity,
) -> LedgerResult<Quantity> {
    let updated: Option<i64> = sqlx::query_scalar(
        r#"
        UPDATE inventory_items
        SET quantity_milli = quantity_milli + ?1,
            updated_at = ?2
        WHERE id = ?3 AND tenant_id = ?4
        RETURNING quantity_milli
        "#,
    )
    .bind(quantity.milli())
    .bind(Utc::now())
    .bind(item_id)
    .bind(tenant_id)
    .fetch_optional(conn)
    .await
    .map_err(DbError::from)?;

    updated
        .map(Quantity::from_milli)
        .ok_or_else(|| LedgerError::not_found("Inventory item", item_id))
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for stock records.
#[derive(Debug, Clone)]
pub struct InventoryRepository {
    pool: SqlitePool,
}

impl InventoryRepository {
    pub fn new(pool: SqlitePool) -> Self {
        InventoryRepository { pool }
    }

    /// Gets an item by ID within the tenant.
    pub async fn get(&self, tenant_id: &str, item_id: &str) -> DbResult<Option<InventoryItem>> {
        let mut conn = self.pool.acquire().await?;
        find_item(&mut conn, tenant_id, item_id).await
    }

    /// Gets an item only if it is stocked at `location_id`.
    pub async fn get_at_location(
        &self,
        tenant_id: &str,
        location_id: &str,
        item_id: &str,
    ) -> DbResult<Option<InventoryItem>> {
        Ok(self
            .get(tenant_id, item_id)
            .await?
            .filter(|item| item.location_id == location_id))
    }

    /// Looks an item up by name and category at a location.
    pub async fn find_by_name(
        &self,
        tenant_id: &str,
        location_id: &str,
        name: &str,
        category: Option<&str>,
    ) -> DbResult<Option<InventoryItem>> {
        let key = ItemLookupKey {
            tenant_id: tenant_id.to_string(),
            location_id: location_id.to_string(),
            name_key: normalize_item_name(name),
            category: category.map(str::trim).unwrap_or("").to_string(),
        };

        let mut conn = self.pool.acquire().await?;
        find_by_lookup_key(&mut conn, &key).await
    }

    /// All items stocked at a location, by name.
    pub async fn list_for_location(&self, tenant_id: &str, location_id: &str) -> DbResult<Vec<InventoryItem>> {
        let sql = format!(
            "SELECT {} FROM inventory_items WHERE tenant_id = ?1 AND location_id = ?2 ORDER BY name_key",
            ITEM_COLUMNS
        );

        let items = sqlx::query_as::<_, InventoryItem>(&sql)
            .bind(tenant_id)
            .bind(location_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(items)
    }

    /// Creates a stock record; opening stock is booked as a `RECEIVED`
    /// movement so the ledger accounts for the whole quantity.
    pub async fn create_item(
        &self,
        tenant_id: &str,
        new: &NewInventoryItem,
        created_by: Option<&str>,
    ) -> LedgerResult<InventoryItem> {
        validate_uuid("location_id", &new.location_id)?;
        if new.name.trim().is_empty() {
            return Err(ValidationError::Required { field: "name".to_string() }.into());
        }
        if new.quantity.is_negative() {
            return Err(ValidationError::MustBePositive { field: "quantity".to_string() }.into());
        }

        let mut tx = self.pool.begin().await.map_err(DbError::transaction)?;

        let item = insert_item(&mut tx, tenant_id, new).await?;

        if new.quantity.is_positive() {
            ledger::append_movement(
                &mut tx,
                NewMovement {
                    tenant_id,
                    item_id: &item.id,
                    location_id: &item.location_id,
                    movement_type: MovementType::Received,
                    quantity: new.quantity,
                    reason: "Opening stock".to_string(),
                    reference_type: ReferenceType::Manual,
                    reference_id: None,
                    created_by,
                },
            )
            .await?;
        }

        tx.commit().await.map_err(DbError::transaction)?;

        info!(item_id = %item.id, quantity = %new.quantity, "Inventory item created");
        Ok(item)
    }

    /// Books goods received from a supplier.
    pub async fn receive_stock(
        &self,
        tenant_id: &str,
        item_id: &str,
        quantity: Quantity,
        received_by: &str,
    ) -> LedgerResult<InventoryItem> {
        validate_quantity("quantity", quantity)?;

        self.apply_manual(
            tenant_id,
            item_id,
            quantity,
            MovementType::Received,
            "Stock received".to_string(),
            received_by,
        )
        .await
    }

    /// Corrects a count by `delta` (either sign).
    ///
    /// A correction may take stock to zero but never below it.
    pub async fn adjust_stock(
        &self,
        tenant_id: &str,
        item_id: &str,
        delta: Quantity,
        reason: &str,
        adjusted_by: &str,
    ) -> LedgerResult<InventoryItem> {
        if delta.is_zero() {
            return Err(ValidationError::MustBePositive { field: "delta".to_string() }.into());
        }
        if reason.trim().is_empty() {
            return Err(ValidationError::Required { field: "reason".to_string() }.into());
        }

        self.apply_manual(
            tenant_id,
            item_id,
            delta,
            MovementType::Adjustment,
            reason.trim().to_string(),
            adjusted_by,
        )
        .await
    }

    async fn apply_manual(
        &self,
        tenant_id: &str,
        item_id: &str,
        delta: Quantity,
        movement_type: MovementType,
        reason: String,
        user_id: &str,
    ) -> LedgerResult<InventoryItem> {
        let mut tx = self.pool.begin().await.map_err(DbError::transaction)?;

        let item = find_item(&mut tx, tenant_id, item_id)
            .await?
            .ok_or_else(|| LedgerError::not_found("Inventory item", item_id))?;

        if delta.is_negative() {
            decrement_stock(&mut tx, tenant_id, item_id, -delta, false).await?;
        } else {
            increment_stock(&mut tx, tenant_id, item_id, delta).await?;
        }

        ledger::append_movement(
            &mut tx,
            NewMovement {
                tenant_id,
                item_id,
                location_id: &item.location_id,
                movement_type,
                quantity: delta,
                reason,
                reference_type: ReferenceType::Manual,
                reference_id: None,
                created_by: Some(user_id),
            },
        )
        .await?;

        let updated = find_item(&mut tx, tenant_id, item_id)
            .await?
            .ok_or_else(|| LedgerError::not_found("Inventory item", item_id))?;

        tx.commit().await.map_err(DbError::transaction)?;

        info!(item_id = %item_id, delta = %delta, movement_type = ?movement_type, "Stock updated");
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{seed_item, Fixture};

    #[tokio::test]
    async fn test_conditional_decrement() {
        let fx = Fixture::new().await;
        let item = seed_item(&fx.db, &fx.tenant_id, &fx.main_id, "Bandage Roll", 3).await;
        let mut conn = fx.db.pool().acquire().await.unwrap();

        let left = decrement_stock(&mut conn, &fx.tenant_id, &item.id, Quantity::from_units(2), false)
            .await
            .unwrap();
        assert_eq!(left, Quantity::from_units(1));

        let err = decrement_stock(&mut conn, &fx.tenant_id, &item.id, Quantity::from_units(2), false)
            .await
            .unwrap_err();
        match err {
            LedgerError::Rule(CoreError::InsufficientStock { available, requested, .. }) => {
                assert_eq!(available, Quantity::from_units(1));
                assert_eq!(requested, Quantity::from_units(2));
            }
            other => panic!("expected InsufficientStock, got {:?}", other),
        }

        let left = decrement_stock(&mut conn, &fx.tenant_id, &item.id, Quantity::from_units(2), true)
            .await
            .unwrap();
        assert_eq!(left, Quantity::from_units(-1));
    }

    #[tokio::test]
    async fn test_decrement_other_tenant_is_not_found() {
        let fx = Fixture::new().await;
        let item = seed_item(&fx.db, &fx.tenant_id, &fx.main_id, "Bandage Roll", 3).await;
        let mut conn = fx.db.pool().acquire().await.unwrap();

        let err = decrement_stock(
            &mut conn,
            "0b7e3f9a-1111-4000-8000-000000000099",
            &item.id,
            Quantity::from_units(1),
            false,
        )
        .await
        .unwrap_err();

        assert!(matches!(err, LedgerError::Rule(CoreError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_lookup_key_normalises_name() {
        let fx = Fixture::new().await;
        let repo = fx.db.inventory();
        let item = repo
            .create_item(
                &fx.tenant_id,
                &NewInventoryItem {
                    location_id: fx.main_id.clone(),
                    name: "Carprofen 75mg".to_string(),
                    category: Some("Medication".to_string()),
                    sku: None,
                    quantity: Quantity::from_units(4),
                    cost_cents: 300,
                    price_cents: 900,
                    min_stock: Quantity::zero(),
                },
                None,
            )
            .await
            .unwrap();

        let found = repo
            .find_by_name(&fx.tenant_id, &fx.main_id, "  carprofen   75MG ", Some("Medication"))
            .await
            .unwrap();
        assert_eq!(found.map(|i| i.id), Some(item.id.clone()));

        // Category is part of the identity
        let other = repo
            .find_by_name(&fx.tenant_id, &fx.main_id, "Carprofen 75mg", None)
            .await
            .unwrap();
        assert!(other.is_none());
    }

    #[tokio::test]
    async fn test_duplicate_lookup_key_rejected() {
        let fx = Fixture::new().await;
        seed_item(&fx.db, &fx.tenant_id, &fx.main_id, "Saline 500ml", 1).await;

        let result = fx
            .db
            .inventory()
            .create_item(
                &fx.tenant_id,
                &NewInventoryItem {
                    location_id: fx.main_id.clone(),
                    name: "SALINE  500ML".to_string(),
                    category: Some("Medication".to_string()),
                    sku: None,
                    quantity: Quantity::zero(),
                    cost_cents: 0,
                    price_cents: 0,
                    min_stock: Quantity::zero(),
                },
                None,
            )
            .await;

        assert!(matches!(result, Err(LedgerError::Db(DbError::UniqueViolation { .. }))));
    }

    #[tokio::test]
    async fn test_receive_and_adjust_keep_ledger_in_step() {
        let fx = Fixture::new().await;
        let item = seed_item(&fx.db, &fx.tenant_id, &fx.main_id, "Syringe 5ml", 10).await;
        let repo = fx.db.inventory();

        repo.receive_stock(&fx.tenant_id, &item.id, Quantity::from_units(5), &fx.user_id)
            .await
            .unwrap();
        let updated = repo
            .adjust_stock(&fx.tenant_id, &item.id, Quantity::from_milli(-2_500), "Damaged", &fx.user_id)
            .await
            .unwrap();
        assert_eq!(updated.quantity(), Quantity::from_milli(12_500));

        let over = repo
            .adjust_stock(&fx.tenant_id, &item.id, Quantity::from_units(-20), "Recount", &fx.user_id)
            .await;
        assert!(matches!(over, Err(LedgerError::Rule(CoreError::InsufficientStock { .. }))));

        let net = fx.db.ledger().net_quantity_for_item(&fx.tenant_id, &item.id).await.unwrap();
        assert_eq!(net, updated.quantity());
    }
}
