//! Shared fixtures for the in-crate tests: a migrated in-memory database
//! holding one tenant with two locations.

use uuid::Uuid;

use crate::config::EngineConfig;
use crate::pool::{Database, DbConfig};
use crate::service::SaleService;
use vetpos_core::{
    CartLine, CashDrawer, CashShift, InventoryItem, Money, NewInventoryItem, Quantity, Service,
};

pub(crate) struct Fixture {
    pub db: Database,
    pub tenant_id: String,
    pub user_id: String,
    pub cashier_id: String,
    pub main_id: String,
    pub branch_id: String,
}

impl Fixture {
    pub async fn new() -> Self {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        Self::for_new_tenant(db).await
    }

    /// A second tenant living in the same database.
    pub async fn other_tenant(&self) -> Fixture {
        Self::for_new_tenant(self.db.clone()).await
    }

    async fn for_new_tenant(db: Database) -> Self {
        let tenant_id = Uuid::new_v4().to_string();
        let main = db.directory().create_location(&tenant_id, "Main Clinic").await.unwrap();
        let branch = db.directory().create_location(&tenant_id, "Branch").await.unwrap();

        Fixture {
            db,
            tenant_id,
            user_id: Uuid::new_v4().to_string(),
            cashier_id: Uuid::new_v4().to_string(),
            main_id: main.id,
            branch_id: branch.id,
        }
    }

    pub fn service(&self) -> SaleService {
        SaleService::new(self.db.clone(), EngineConfig::default())
    }

    /// Opens a zero-float drawer at the main clinic with the cashier on shift.
    pub async fn open_drawer_with_shift(&self) -> (CashDrawer, CashShift) {
        let drawers = self.db.drawers();
        let drawer = drawers
            .open_drawer(&self.tenant_id, Some(&self.main_id), Money::zero(), &self.user_id)
            .await
            .unwrap();
        let shift = drawers
            .start_shift(&self.tenant_id, &drawer.id, &self.cashier_id)
            .await
            .unwrap();
        (drawer, shift)
    }

    pub async fn seed_service(&self, name: &str, price_cents: i64) -> Service {
        self.db
            .directory()
            .create_service(&self.tenant_id, name, price_cents)
            .await
            .unwrap()
    }
}

/// Stocks `units` of a medication at a location.
pub(crate) async fn seed_item(
    db: &Database,
    tenant_id: &str,
    location_id: &str,
    name: &str,
    units: i64,
) -> InventoryItem {
    db.inventory()
        .create_item(
            tenant_id,
            &NewInventoryItem {
                location_id: location_id.to_string(),
                name: name.to_string(),
                category: Some("Medication".to_string()),
                sku: None,
                quantity: Quantity::from_units(units),
                cost_cents: 4_000,
                price_cents: 10_000,
                min_stock: Quantity::zero(),
            },
            None,
        )
        .await
        .unwrap()
}

pub(crate) fn product_line(item_id: &str, units: i64, unit_price_cents: i64) -> CartLine {
    CartLine {
        inventory_item_id: Some(item_id.to_string()),
        service_id: None,
        description: None,
        quantity: Quantity::from_units(units),
        unit_price_cents,
        discount_cents: 0,
    }
}

pub(crate) fn service_line(service_id: &str, units: i64, unit_price_cents: i64) -> CartLine {
    CartLine {
        inventory_item_id: None,
        service_id: Some(service_id.to_string()),
        description: None,
        quantity: Quantity::from_units(units),
        unit_price_cents,
        discount_cents: 0,
    }
}
