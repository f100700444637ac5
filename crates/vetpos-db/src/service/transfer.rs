//! # Transfer Service
//!
//! Moves stock of one product between two locations of a tenant.
//!
//! ## Protocol
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  create    validate, plan gate, locations ∈ tenant, item at source,    │
//! │            enough stock now → PENDING. No stock moves yet.             │
//! │                                                                         │
//! │  dispatch  PENDING → IN_TRANSIT                                        │
//! │                                                                         │
//! │  complete  BEGIN                                                       │
//! │            ├── claim: PENDING|IN_TRANSIT → COMPLETED (conditional)     │
//! │            ├── source:  conditional decrement, TRANSFER_OUT −q         │
//! │            ├── destination (same tenant, location, name, category)    │
//! │            │     found   → increment                                   │
//! │            │     missing → clone of the source record holding q       │
//! │            │   TRANSFER_IN +q                                          │
//! │            └── remember destination_item_id                            │
//! │            COMMIT                                                      │
//! │                                                                         │
//! │  cancel    PENDING|IN_TRANSIT → CANCELLED. No stock moves.             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Source plus destination quantity is the same before and after `complete`.
//! The claim makes a second `complete` fail instead of moving stock twice.

use chrono::Utc;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::DbError;
use crate::pool::Database;
use crate::repository::ledger::{self, NewMovement};
use crate::repository::{directory, inventory, transfer as transfer_rows};
use crate::service::gate::{AllowAll, GatedAction, PlanGate};
use crate::service::{PosError, PosResult};
use vetpos_core::validation::{validate_transfer_request, validate_uuid};
use vetpos_core::{
    CoreError, InventoryTransfer, MovementType, NewInventoryItem, Quantity, ReferenceType,
    TransferRequest, TransferStatus, ValidationError,
};

/// Creates and advances inventory transfers.
#[derive(Clone)]
pub struct TransferService {
    db: Database,
    gate: Arc<dyn PlanGate>,
}

impl TransferService {
    pub fn new(db: Database) -> Self {
        TransferService {
            db,
            gate: Arc::new(AllowAll),
        }
    }

    /// Replaces the plan gate.
    pub fn with_gate(mut self, gate: impl PlanGate + 'static) -> Self {
        self.gate = Arc::new(gate);
        self
    }

    /// Records a transfer request in PENDING.
    ///
    /// The stock check here is advisory; `complete_inventory_transfer`
    /// checks again when the stock actually moves.
    pub async fn create_inventory_transfer(
        &self,
        tenant_id: &str,
        requested_by: &str,
        request: &TransferRequest,
    ) -> PosResult<InventoryTransfer> {
        validate_uuid("tenant_id", tenant_id)?;
        validate_uuid("requested_by", requested_by)?;
        validate_transfer_request(request)?;

        if !self.gate.allows(tenant_id, GatedAction::TransferInventory) {
            warn!(tenant_id = %tenant_id, "Transfer rejected by plan gate");
            return Err(CoreError::PlanLimitReached {
                action: GatedAction::TransferInventory.to_string(),
            }
            .into());
        }

        let mut conn = self.db.pool().acquire().await.map_err(DbError::from)?;
        for (field, location_id) in [
            ("from_location_id", &request.from_location_id),
            ("to_location_id", &request.to_location_id),
        ] {
            if directory::find_location(&mut conn, tenant_id, location_id).await?.is_none() {
                return Err(ValidationError::invalid_reference(field, location_id.as_str()).into());
            }
        }

        let item = inventory::find_item(&mut conn, tenant_id, &request.item_id)
            .await?
            .filter(|item| item.location_id == request.from_location_id)
            .ok_or_else(|| PosError::not_found("Inventory item", &request.item_id))?;
        drop(conn);

        if item.quantity() < request.quantity {
            return Err(CoreError::InsufficientStock {
                available: item.quantity(),
                item: item.name,
                requested: request.quantity,
            }
            .into());
        }

        let now = Utc::now();
        let transfer = InventoryTransfer {
            id: Uuid::new_v4().to_string(),
            tenant_id: tenant_id.to_string(),
            item_id: item.id,
            from_location_id: request.from_location_id.clone(),
            to_location_id: request.to_location_id.clone(),
            quantity_milli: request.quantity.milli(),
            status: TransferStatus::Pending,
            notes: request.notes.clone(),
            requested_by: requested_by.to_string(),
            destination_item_id: None,
            created_at: now,
            updated_at: now,
            completed_at: None,
            cancelled_at: None,
        };

        self.db.transfers().insert(&transfer).await?;

        info!(
            transfer_id = %transfer.id,
            tenant_id = %tenant_id,
            quantity = %request.quantity,
            "Inventory transfer requested"
        );
        Ok(transfer)
    }

    /// PENDING → IN_TRANSIT.
    pub async fn dispatch_inventory_transfer(&self, transfer_id: &str, tenant_id: &str) -> PosResult<InventoryTransfer> {
        validate_uuid("transfer_id", transfer_id)?;

        if !self.db.transfers().mark_in_transit(tenant_id, transfer_id).await? {
            return Err(self.rejected(tenant_id, transfer_id, "dispatch").await);
        }

        info!(transfer_id = %transfer_id, "Inventory transfer dispatched");
        self.get_transfer(transfer_id, tenant_id).await
    }

    /// Moves the stock and closes the transfer, atomically.
    pub async fn complete_inventory_transfer(&self, transfer_id: &str, tenant_id: &str) -> PosResult<InventoryTransfer> {
        validate_uuid("transfer_id", transfer_id)?;
        let now = Utc::now();

        let mut tx = self.db.pool().begin().await.map_err(DbError::transaction)?;

        if !transfer_rows::claim_for_completion(&mut tx, tenant_id, transfer_id, now).await? {
            drop(tx);
            return Err(self.rejected(tenant_id, transfer_id, "complete").await);
        }

        let transfer = transfer_rows::find_transfer(&mut tx, tenant_id, transfer_id)
            .await?
            .ok_or_else(|| PosError::not_found("Transfer", transfer_id))?;
        let quantity = transfer.quantity();
        let reason = format!("Transfer {}", transfer.id);

        let source = inventory::find_item(&mut tx, tenant_id, &transfer.item_id)
            .await?
            .ok_or_else(|| PosError::not_found("Inventory item", &transfer.item_id))?;

        inventory::decrement_stock(&mut tx, tenant_id, &source.id, quantity, false).await?;
        ledger::append_movement(
            &mut tx,
            NewMovement {
                tenant_id,
                item_id: &source.id,
                location_id: &transfer.from_location_id,
                movement_type: MovementType::TransferOut,
                quantity: -quantity,
                reason: reason.clone(),
                reference_type: ReferenceType::Transfer,
                reference_id: Some(&transfer.id),
                created_by: Some(&transfer.requested_by),
            },
        )
        .await?;

        let key = source.lookup_key_at(&transfer.to_location_id);
        let destination_id = match inventory::find_by_lookup_key(&mut tx, &key).await? {
            Some(existing) => {
                inventory::increment_stock(&mut tx, tenant_id, &existing.id, quantity).await?;
                existing.id
            }
            None => {
                let created = inventory::insert_item(
                    &mut tx,
                    tenant_id,
                    &NewInventoryItem {
                        location_id: transfer.to_location_id.clone(),
                        name: source.name.clone(),
                        category: Some(source.category.clone()),
                        sku: source.sku.clone(),
                        quantity,
                        cost_cents: source.cost_cents,
                        price_cents: source.price_cents,
                        min_stock: Quantity::from_milli(source.min_stock_milli),
                    },
                )
                .await?;
                created.id
            }
        };

        ledger::append_movement(
            &mut tx,
            NewMovement {
                tenant_id,
                item_id: &destination_id,
                location_id: &transfer.to_location_id,
                movement_type: MovementType::TransferIn,
                quantity,
                reason,
                reference_type: ReferenceType::Transfer,
                reference_id: Some(&transfer.id),
                created_by: Some(&transfer.requested_by),
            },
        )
        .await?;

        transfer_rows::set_destination_item(&mut tx, &transfer.id, &destination_id).await?;

        tx.commit().await.map_err(DbError::transaction)?;

        info!(
            transfer_id = %transfer_id,
            source_item_id = %source.id,
            destination_item_id = %destination_id,
            quantity = %quantity,
            "Inventory transfer completed"
        );
        self.get_transfer(transfer_id, tenant_id).await
    }

    /// PENDING | IN_TRANSIT → CANCELLED.
    pub async fn cancel_inventory_transfer(&self, transfer_id: &str, tenant_id: &str) -> PosResult<InventoryTransfer> {
        validate_uuid("transfer_id", transfer_id)?;

        if !self.db.transfers().mark_cancelled(tenant_id, transfer_id).await? {
            return Err(self.rejected(tenant_id, transfer_id, "cancel").await);
        }

        info!(transfer_id = %transfer_id, "Inventory transfer cancelled");
        self.get_transfer(transfer_id, tenant_id).await
    }

    pub async fn get_transfer(&self, transfer_id: &str, tenant_id: &str) -> PosResult<InventoryTransfer> {
        self.db
            .transfers()
            .get(tenant_id, transfer_id)
            .await?
            .ok_or_else(|| PosError::not_found("Transfer", transfer_id))
    }

    /// Transfers of a tenant, newest first.
    pub async fn list_transfers(
        &self,
        tenant_id: &str,
        status: Option<TransferStatus>,
    ) -> PosResult<Vec<InventoryTransfer>> {
        Ok(self.db.transfers().list(tenant_id, status).await?)
    }

    /// Explains why a conditional status update matched no row.
    async fn rejected(&self, tenant_id: &str, transfer_id: &str, operation: &'static str) -> PosError {
        match self.db.transfers().get(tenant_id, transfer_id).await {
            Ok(Some(transfer)) => {
                warn!(
                    transfer_id = %transfer_id,
                    status = %transfer.status,
                    operation,
                    "Transfer in wrong state"
                );
                CoreError::InvalidTransferStatus {
                    transfer_id: transfer_id.to_string(),
                    status: transfer.status,
                    operation,
                }
                .into()
            }
            Ok(None) => PosError::not_found("Transfer", transfer_id),
            Err(err) => err.into(),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
