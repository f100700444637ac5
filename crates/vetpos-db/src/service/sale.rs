//! # Sale Service
//!
//! Turns a checkout cart into a sale, its lines, stock movements, cash
//! drawer entry and payment, all in one transaction.
//!
//! ## Checkout Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  create_sale(tenant, user, cart)                                        │
//! │                                                                         │
//! │  Before the transaction (errors leave nothing behind)                  │
//! │  ├── plan gate: CreateSale                                             │
//! │  ├── validate_cart: lines, quantities, prices, discounts               │
//! │  └── references: location, customer, pet ∈ customer, items, services  │
//! │                                                                         │
//! │  BEGIN                                                                 │
//! │  ├── sale number for this attempt                                      │
//! │  ├── resolve today's drawer + shift (cash requires a drawer)           │
//! │  ├── INSERT sale (PENDING)                                             │
//! │  ├── per line: INSERT sale_item                                        │
//! │  │     product → conditional stock decrement + SALE_OUT movement       │
//! │  ├── cash → SALE_CASH cash transaction for the applied amount (or 0)   │
//! │  ├── INSERT sale_payment for the applied amount                        │
//! │  └── paid ≥ total → COMPLETED                                          │
//! │  COMMIT                                                                │
//! │                                                                         │
//! │  UNIQUE(tenant_id, sale_number) tripped → whole transaction again      │
//! │  with the next attempt number, up to `sale_number_attempts`.           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::EngineConfig;
use crate::error::DbError;
use crate::pool::Database;
use crate::repository::drawer::{self, NewCashTransaction};
use crate::repository::ledger::{self, NewMovement};
use crate::repository::{inventory, sale as sale_rows};
use crate::service::gate::{AllowAll, GatedAction, PlanGate};
use crate::service::{PosError, PosResult};
use vetpos_core::validation::{validate_cart, validate_uuid};
use vetpos_core::{
    format_sale_number, CashTransactionType, CheckoutCart, CoreError, LineTarget, Money,
    MovementType, PaymentSettlement, Quantity, ReferenceType, Sale, SaleDetail, SaleItem,
    SalePayment, SaleStatus, SaleTotals, ValidationError,
};

/// Source of "now" for sale numbers and the business day.
pub type Clock = fn() -> DateTime<Utc>;

/// A cart line after its references were checked.
#[derive(Debug, Clone)]
struct PreparedLine {
    inventory_item_id: Option<String>,
    service_id: Option<String>,
    description: String,
    quantity: Quantity,
    unit_price: Money,
    discount: Money,
    line_total: Money,
}

/// Creates and reads sales.
#[derive(Clone)]
pub struct SaleService {
    db: Database,
    config: EngineConfig,
    gate: Arc<dyn PlanGate>,
    clock: Clock,
}

impl SaleService {
    pub fn new(db: Database, config: EngineConfig) -> Self {
        SaleService {
            db,
            config,
            gate: Arc::new(AllowAll),
            clock: Utc::now,
        }
    }

    /// Replaces the plan gate.
    pub fn with_gate(mut self, gate: impl PlanGate + 'static) -> Self {
        self.gate = Arc::new(gate);
        self
    }

    /// Replaces the clock.
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// Rings up a cart.
    ///
    /// ## Returns
    /// The committed sale with its items, payments, customer and pet.
    ///
    /// ## Errors
    /// - Validation: empty cart, malformed lines, unknown references
    /// - Precondition: plan limit, no open drawer for cash, short stock
    /// - Conflict: sale number still taken after every attempt
    pub async fn create_sale(
        &self,
        tenant_id: &str,
        user_id: &str,
        cart: &CheckoutCart,
    ) -> PosResult<SaleDetail> {
        validate_uuid("tenant_id", tenant_id)?;
        validate_uuid("user_id", user_id)?;

        if !self.gate.allows(tenant_id, GatedAction::CreateSale) {
            warn!(tenant_id = %tenant_id, "Sale rejected by plan gate");
            return Err(CoreError::PlanLimitReached {
                action: GatedAction::CreateSale.to_string(),
            }
            .into());
        }

        validate_cart(cart)?;
        let lines = self.prepare_lines(tenant_id, cart).await?;
        let totals = SaleTotals::compute(cart, self.config.default_tax_rate());

        let attempts = self.config.sale_number_attempts.max(1);
        let mut attempt = 0;
        let sale_id = loop {
            match self
                .write_sale(tenant_id, user_id, cart, &lines, &totals, attempt)
                .await
            {
                Ok(id) => break id,
                Err(PosError::Db(err))
                    if err.is_unique_violation_on("sale_number") && attempt + 1 < attempts =>
                {
                    warn!(tenant_id = %tenant_id, attempt, "Sale number collision, retrying");
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        };

        self.get_sale(tenant_id, &sale_id).await
    }

    /// A sale with its lines, payments, customer and pet.
    pub async fn get_sale(&self, tenant_id: &str, sale_id: &str) -> PosResult<SaleDetail> {
        validate_uuid("sale_id", sale_id)?;

        self.db
            .sales()
            .get_detail(tenant_id, sale_id)
            .await?
            .ok_or_else(|| PosError::not_found("Sale", sale_id))
    }

    /// Checks every reference of the cart against the tenant's records.
    async fn prepare_lines(&self, tenant_id: &str, cart: &CheckoutCart) -> PosResult<Vec<PreparedLine>> {
        let directory = self.db.directory();

        if let Some(location_id) = cart.location_id.as_deref() {
            if directory.get_location(tenant_id, location_id).await?.is_none() {
                return Err(ValidationError::invalid_reference("location_id", location_id).into());
            }
        }

        if let Some(customer_id) = cart.customer_id.as_deref() {
            if directory.get_customer(tenant_id, customer_id).await?.is_none() {
                return Err(ValidationError::invalid_reference("customer_id", customer_id).into());
            }
        }

        if let Some(pet_id) = cart.pet_id.as_deref() {
            let pet = directory
                .get_pet(tenant_id, pet_id)
                .await?
                .ok_or_else(|| ValidationError::invalid_reference("pet_id", pet_id))?;

            if let Some(customer_id) = cart.customer_id.as_deref() {
                if pet.customer_id != customer_id {
                    return Err(ValidationError::InvalidFormat {
                        field: "pet_id".to_string(),
                        reason: "pet does not belong to the customer".to_string(),
                    }
                    .into());
                }
            }
        }

        let inventory = self.db.inventory();
        let mut prepared = Vec::with_capacity(cart.lines.len());

        for (index, line) in cart.lines.iter().enumerate() {
            let name = match line.target()? {
                LineTarget::Product(item_id) => {
                    let item = inventory
                        .get(tenant_id, item_id)
                        .await?
                        .filter(|item| item.is_active())
                        .filter(|item| match cart.location_id.as_deref() {
                            Some(location) => item.location_id == location,
                            None => true,
                        })
                        .ok_or_else(|| {
                            ValidationError::invalid_reference(
                                format!("lines[{}].inventory_item_id", index),
                                item_id,
                            )
                        })?;
                    item.name
                }
                LineTarget::Service(service_id) => {
                    let service = directory
                        .get_service(tenant_id, service_id)
                        .await?
                        .filter(|service| service.is_active)
                        .ok_or_else(|| {
                            ValidationError::invalid_reference(
                                format!("lines[{}].service_id", index),
                                service_id,
                            )
                        })?;
                    service.name
                }
            };

            prepared.push(PreparedLine {
                inventory_item_id: line.inventory_item_id.clone(),
                service_id: line.service_id.clone(),
                description: line
                    .description
                    .as_deref()
                    .map(str::trim)
                    .filter(|d| !d.is_empty())
                    .map(str::to_string)
                    .unwrap_or(name),
                quantity: line.quantity,
                unit_price: Money::from_cents(line.unit_price_cents),
                discount: Money::from_cents(line.discount_cents),
                line_total: line.line_total(),
            });
        }

        Ok(prepared)
    }

    /// One attempt at the checkout transaction. Returns the new sale's id.
    async fn write_sale(
        &self,
        tenant_id: &str,
        user_id: &str,
        cart: &CheckoutCart,
        lines: &[PreparedLine],
        totals: &SaleTotals,
        attempt: u32,
    ) -> PosResult<String> {
        let now = (self.clock)();
        let sale_number = format_sale_number(now, attempt);
        let location_id = cart.location_id.as_deref();

        let mut tx = self.db.pool().begin().await.map_err(DbError::transaction)?;

        let resolution = drawer::resolve(&mut tx, tenant_id, location_id, now).await?;
        let is_cash = cart.payment_method.is_cash();
        if is_cash && !resolution.has_open_drawer() {
            warn!(tenant_id = %tenant_id, location_id = ?location_id, "Cash sale without an open drawer");
            return Err(CoreError::CashDrawerNotOpen {
                location_id: cart.location_id.clone(),
            }
            .into());
        }

        let settlement = PaymentSettlement::settle(totals.total, Money::from_cents(cart.amount_paid_cents));

        let sale = Sale {
            id: Uuid::new_v4().to_string(),
            tenant_id: tenant_id.to_string(),
            sale_number,
            location_id: cart.location_id.clone(),
            customer_id: cart.customer_id.clone(),
            pet_id: cart.pet_id.clone(),
            staff_id: resolution.attending_staff().map(str::to_string),
            user_id: user_id.to_string(),
            status: SaleStatus::Pending,
            subtotal_cents: totals.subtotal.cents(),
            tax_cents: totals.tax.cents(),
            discount_cents: totals.discount.cents(),
            total_cents: totals.total.cents(),
            amount_paid_cents: settlement.applied.cents(),
            payment_method: cart.payment_method,
            notes: cart.notes.clone(),
            created_at: now,
            updated_at: now,
            completed_at: None,
        };

        debug!(sale_number = %sale.sale_number, attempt, "Writing sale");
        sale_rows::insert_sale(&mut tx, &sale).await?;

        for line in lines {
            let item = SaleItem {
                id: Uuid::new_v4().to_string(),
                sale_id: sale.id.clone(),
                inventory_item_id: line.inventory_item_id.clone(),
                service_id: line.service_id.clone(),
                description: line.description.clone(),
                quantity_milli: line.quantity.milli(),
                unit_price_cents: line.unit_price.cents(),
                discount_cents: line.discount.cents(),
                line_total_cents: line.line_total.cents(),
                created_at: now,
            };
            sale_rows::insert_item(&mut tx, &item).await?;

            if let Some(item_id) = line.inventory_item_id.as_deref() {
                inventory::decrement_stock(
                    &mut tx,
                    tenant_id,
                    item_id,
                    line.quantity,
                    self.config.allow_negative_stock,
                )
                .await?;

                let stocked_at = inventory::find_item(&mut tx, tenant_id, item_id)
                    .await?
                    .map(|i| i.location_id)
                    .ok_or_else(|| PosError::not_found("Inventory item", item_id))?;

                ledger::append_movement(
                    &mut tx,
                    NewMovement {
                        tenant_id,
                        item_id,
                        location_id: &stocked_at,
                        movement_type: MovementType::SaleOut,
                        quantity: -line.quantity,
                        reason: format!("Sale {}", sale.sale_number),
                        reference_type: ReferenceType::Sale,
                        reference_id: Some(&sale.id),
                        created_by: Some(user_id),
                    },
                )
                .await?;
            }
        }

        // Cash sales always leave a drawer entry, even when nothing was paid yet
        let mut cash_transaction_id = None;
        if is_cash {
            if let Some(open) = resolution.drawer.as_ref() {
                let cash = drawer::record_cash_transaction(
                    &mut tx,
                    NewCashTransaction {
                        tenant_id,
                        drawer_id: &open.id,
                        shift_id: resolution.shift.as_ref().map(|s| s.id.as_str()),
                        transaction_type: CashTransactionType::SaleCash,
                        amount: settlement.applied,
                        sale_id: Some(&sale.id),
                        created_by: user_id,
                    },
                )
                .await?;
                cash_transaction_id = Some(cash.id);
            }
        }

        let payment = SalePayment {
            id: Uuid::new_v4().to_string(),
            sale_id: sale.id.clone(),
            payment_method: cart.payment_method,
            amount_cents: settlement.applied.cents(),
            tendered_cents: settlement.tendered.cents(),
            change_cents: settlement.change.cents(),
            cash_transaction_id,
            reference: None,
            created_at: now,
        };
        sale_rows::insert_payment(&mut tx, &payment).await?;

        if settlement.settles {
            sale_rows::mark_completed(&mut tx, &sale.id, now).await?;
        }

        tx.commit().await.map_err(DbError::transaction)?;

        info!(
            sale_id = %sale.id,
            sale_number = %sale.sale_number,
            tenant_id = %tenant_id,
            total = %totals.total,
            completed = settlement.settles,
            "Sale created"
        );

        Ok(sale.id)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::ErrorKind;
    use crate::testing::{product_line, seed_item, service_line, Fixture};
    use chrono::{Duration, TimeZone};
    use vetpos_core::{CartLine, InventoryItem, PaymentMethod};

    fn cart(lines: Vec<CartLine>, method: PaymentMethod, paid: i64) -> CheckoutCart {
        CheckoutCart {
            customer_id: None,
            pet_id: None,
            location_id: None,
            lines,
            discount_cents: 0,
            tax_rate_bps: None,
            payment_method: method,
            amount_paid_cents: paid,
            notes: None,
        }
    }

    async fn stock_of(fx: &Fixture, item: &InventoryItem) -> Quantity {
        fx.db
            .inventory()
            .get(&fx.tenant_id, &item.id)
            .await
            .unwrap()
            .unwrap()
            .quantity()
    }

    async fn row_count(fx: &Fixture, table: &str) -> i64 {
        sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", table))
            .fetch_one(fx.db.pool())
            .await
            .unwrap()
    }

    fn fixed_clock() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 19, 12, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn test_cash_sale_paid_in_full() {
        let fx = Fixture::new().await;
        let (drawer, _shift) = fx.open_drawer_with_shift().await;
        let item = seed_item(&fx.db, &fx.tenant_id, &fx.main_id, "Amoxicillin 250mg", 10).await;
        let service = fx.service();

        let mut checkout = cart(vec![product_line(&item.id, 2, 10_000)], PaymentMethod::Cash, 20_000);
        checkout.location_id = Some(fx.main_id.clone());

        let detail = service.create_sale(&fx.tenant_id, &fx.user_id, &checkout).await.unwrap();

        assert_eq!(detail.sale.status, SaleStatus::Completed);
        assert_eq!(detail.sale.total_cents, 20_000);
        assert!(detail.sale.completed_at.is_some());
        assert_eq!(detail.sale.staff_id.as_deref(), Some(fx.cashier_id.as_str()));
        assert_eq!(detail.items.len(), 1);
        assert_eq!(stock_of(&fx, &item).await, Quantity::from_units(8));

        let movements = fx
            .db
            .ledger()
            .movements_for_reference(&fx.tenant_id, ReferenceType::Sale, &detail.sale.id)
            .await
            .unwrap();
        assert_eq!(movements.len(), 1);
        assert_eq!(movements[0].movement_type, MovementType::SaleOut);
        assert_eq!(movements[0].quantity(), Quantity::from_units(-2));
        assert_eq!(movements[0].item_id, item.id);

        let cash: Vec<_> = fx
            .db
            .drawers()
            .transactions_for_drawer(&fx.tenant_id, &drawer.id)
            .await
            .unwrap()
            .into_iter()
            .filter(|t| t.transaction_type == CashTransactionType::SaleCash)
            .collect();
        assert_eq!(cash.len(), 1);
        assert_eq!(cash[0].amount_cents, 20_000);
        assert_eq!(cash[0].sale_id.as_deref(), Some(detail.sale.id.as_str()));

        assert_eq!(detail.payments.len(), 1);
        assert_eq!(detail.payments[0].amount_cents, 20_000);
        assert_eq!(detail.payments[0].cash_transaction_id.as_deref(), Some(cash[0].id.as_str()));
    }

    #[tokio::test]
    async fn test_partial_payment_stays_pending() {
        let fx = Fixture::new().await;
        let item = seed_item(&fx.db, &fx.tenant_id, &fx.main_id, "Amoxicillin 250mg", 10).await;

        let checkout = cart(vec![product_line(&item.id, 2, 10_000)], PaymentMethod::Card, 15_000);
        let detail = fx
            .service()
            .create_sale(&fx.tenant_id, &fx.user_id, &checkout)
            .await
            .unwrap();

        assert_eq!(detail.sale.status, SaleStatus::Pending);
        assert_eq!(detail.sale.total_cents, 20_000);
        assert_eq!(detail.sale.balance_due(), Money::from_cents(5_000));
        assert!(detail.sale.completed_at.is_none());
        assert_eq!(detail.payments.len(), 1);
        assert_eq!(detail.payments[0].amount_cents, 15_000);
        assert_eq!(detail.payments[0].cash_transaction_id, None);
    }

    #[tokio::test]
    async fn test_change_is_returned() {
        let fx = Fixture::new().await;
        fx.open_drawer_with_shift().await;
        let item = seed_item(&fx.db, &fx.tenant_id, &fx.main_id, "Flea Collar", 5).await;

        let checkout = cart(vec![product_line(&item.id, 1, 1_750)], PaymentMethod::Cash, 2_000);
        let detail = fx
            .service()
            .create_sale(&fx.tenant_id, &fx.user_id, &checkout)
            .await
            .unwrap();

        let payment = &detail.payments[0];
        assert_eq!(payment.amount_cents, 1_750);
        assert_eq!(payment.tendered_cents, 2_000);
        assert_eq!(payment.change_cents, 250);
        assert_eq!(detail.sale.amount_paid_cents, 1_750);
    }

    #[tokio::test]
    async fn test_cash_without_drawer_writes_nothing() {
        let fx = Fixture::new().await;
        let item = seed_item(&fx.db, &fx.tenant_id, &fx.main_id, "Amoxicillin 250mg", 10).await;

        let checkout = cart(vec![product_line(&item.id, 2, 10_000)], PaymentMethod::Cash, 20_000);
        let err = fx
            .service()
            .create_sale(&fx.tenant_id, &fx.user_id, &checkout)
            .await
            .unwrap_err();

        assert!(matches!(err, PosError::Core(CoreError::CashDrawerNotOpen { .. })));
        assert_eq!(err.kind(), ErrorKind::Precondition);
        assert_eq!(row_count(&fx, "sales").await, 0);
        assert_eq!(row_count(&fx, "sale_items").await, 0);
        assert_eq!(row_count(&fx, "sale_payments").await, 0);
        assert_eq!(stock_of(&fx, &item).await, Quantity::from_units(10));

        // Only the opening stock row
        let movements = fx.db.ledger().movements_for_item(&fx.tenant_id, &item.id).await.unwrap();
        assert_eq!(movements.len(), 1);
        assert_eq!(movements[0].movement_type, MovementType::Received);
    }

    #[tokio::test]
    async fn test_yesterdays_drawer_does_not_take_cash() {
        fn tomorrow() -> DateTime<Utc> {
            Utc::now() + Duration::days(1)
        }

        let fx = Fixture::new().await;
        fx.open_drawer_with_shift().await;
        let item = seed_item(&fx.db, &fx.tenant_id, &fx.main_id, "Amoxicillin 250mg", 10).await;

        let checkout = cart(vec![product_line(&item.id, 1, 10_000)], PaymentMethod::Cash, 10_000);
        let err = fx
            .service()
            .with_clock(tomorrow)
            .create_sale(&fx.tenant_id, &fx.user_id, &checkout)
            .await
            .unwrap_err();

        assert!(matches!(err, PosError::Core(CoreError::CashDrawerNotOpen { .. })));
    }

    #[tokio::test]
    async fn test_card_sale_needs_no_drawer() {
        let fx = Fixture::new().await;
        let svc = fx.seed_service("Consultation", 4_500).await;

        let checkout = cart(vec![service_line(&svc.id, 1, 4_500)], PaymentMethod::Card, 4_500);
        let detail = fx
            .service()
            .create_sale(&fx.tenant_id, &fx.user_id, &checkout)
            .await
            .unwrap();

        assert_eq!(detail.sale.status, SaleStatus::Completed);
        assert_eq!(detail.sale.staff_id, None);
        assert_eq!(detail.items[0].description, "Consultation");
        assert!(!detail.items[0].is_product());
        assert_eq!(row_count(&fx, "cash_transactions").await, 0);
    }

    #[tokio::test]
    async fn test_short_stock_rolls_back_every_line() {
        let fx = Fixture::new().await;
        let plenty = seed_item(&fx.db, &fx.tenant_id, &fx.main_id, "Gauze Pads", 50).await;
        let scarce = seed_item(&fx.db, &fx.tenant_id, &fx.main_id, "Insulin Pen", 1).await;

        let checkout = cart(
            vec![product_line(&plenty.id, 5, 300), product_line(&scarce.id, 2, 8_000)],
            PaymentMethod::Card,
            17_500,
        );
        let err = fx
            .service()
            .create_sale(&fx.tenant_id, &fx.user_id, &checkout)
            .await
            .unwrap_err();

        match err {
            PosError::Core(CoreError::InsufficientStock { item, available, requested }) => {
                assert_eq!(item, "Insulin Pen");
                assert_eq!(available, Quantity::from_units(1));
                assert_eq!(requested, Quantity::from_units(2));
            }
            other => panic!("expected InsufficientStock, got {:?}", other),
        }

        assert_eq!(stock_of(&fx, &plenty).await, Quantity::from_units(50));
        assert_eq!(row_count(&fx, "sales").await, 0);
        assert_eq!(row_count(&fx, "inventory_movements").await, 2);
    }

    #[tokio::test]
    async fn test_negative_stock_when_allowed() {
        let fx = Fixture::new().await;
        let item = seed_item(&fx.db, &fx.tenant_id, &fx.main_id, "Insulin Pen", 1).await;
        let config = EngineConfig {
            allow_negative_stock: true,
            ..EngineConfig::default()
        };
        let service = SaleService::new(fx.db.clone(), config);

        let checkout = cart(vec![product_line(&item.id, 3, 8_000)], PaymentMethod::Card, 24_000);
        service.create_sale(&fx.tenant_id, &fx.user_id, &checkout).await.unwrap();

        assert_eq!(stock_of(&fx, &item).await, Quantity::from_units(-2));
        let net = fx.db.ledger().net_quantity_for_item(&fx.tenant_id, &item.id).await.unwrap();
        assert_eq!(net, Quantity::from_units(-2));
    }

    #[tokio::test]
    async fn test_totals_and_inclusive_tax() {
        let fx = Fixture::new().await;
        let item = seed_item(&fx.db, &fx.tenant_id, &fx.main_id, "Kibble 2kg", 20).await;
        let svc = fx.seed_service("Vaccination", 6_000).await;

        let mut product = product_line(&item.id, 3, 2_500);
        product.discount_cents = 500;
        let mut checkout = cart(
            vec![product, service_line(&svc.id, 1, 6_000)],
            PaymentMethod::Card,
            0,
        );
        checkout.discount_cents = 1_000;
        checkout.tax_rate_bps = Some(2_500);

        let detail = fx
            .service()
            .create_sale(&fx.tenant_id, &fx.user_id, &checkout)
            .await
            .unwrap();
        let sale = &detail.sale;

        let line_sum: i64 = detail.items.iter().map(|i| i.line_total_cents).sum();
        assert_eq!(sale.subtotal_cents, line_sum);
        assert_eq!(sale.subtotal_cents, 7_000 + 6_000);
        assert_eq!(sale.total_cents, sale.subtotal_cents - sale.discount_cents);
        assert_eq!(sale.total_cents, 12_000);
        // 12_000 includes 25% tax: 12_000 × 2500 / 12500
        assert_eq!(sale.tax_cents, 2_400);

        // Nothing paid: stays open with a zero payment row
        assert_eq!(sale.status, SaleStatus::Pending);
        assert_eq!(detail.payments.len(), 1);
        assert_eq!(detail.payments[0].amount_cents, 0);
        assert_eq!(detail.payments[0].payment_method, PaymentMethod::Card);
    }

    #[tokio::test]
    async fn test_unpaid_cash_sale_still_hits_the_drawer() {
        let fx = Fixture::new().await;
        let (drawer, _shift) = fx.open_drawer_with_shift().await;
        let item = seed_item(&fx.db, &fx.tenant_id, &fx.main_id, "Ear Cleaner 120ml", 6).await;

        let checkout = cart(vec![product_line(&item.id, 1, 1_200)], PaymentMethod::Cash, 0);
        let detail = fx
            .service()
            .create_sale(&fx.tenant_id, &fx.user_id, &checkout)
            .await
            .unwrap();

        assert_eq!(detail.sale.status, SaleStatus::Pending);
        assert_eq!(detail.sale.amount_paid_cents, 0);
        assert_eq!(detail.sale.balance_due(), Money::from_cents(1_200));

        let cash: Vec<_> = fx
            .db
            .drawers()
            .transactions_for_drawer(&fx.tenant_id, &drawer.id)
            .await
            .unwrap()
            .into_iter()
            .filter(|t| t.transaction_type == CashTransactionType::SaleCash)
            .collect();
        assert_eq!(cash.len(), 1);
        assert_eq!(cash[0].amount_cents, 0);
        assert_eq!(cash[0].sale_id.as_deref(), Some(detail.sale.id.as_str()));

        assert_eq!(detail.payments.len(), 1);
        assert_eq!(detail.payments[0].amount_cents, 0);
        assert_eq!(detail.payments[0].tendered_cents, 0);
        assert_eq!(detail.payments[0].cash_transaction_id.as_deref(), Some(cash[0].id.as_str()));
    }

    #[tokio::test]
    async fn test_fractional_quantity() {
        let fx = Fixture::new().await;
        let item = seed_item(&fx.db, &fx.tenant_id, &fx.main_id, "Chlorhexidine (L)", 5).await;

        let mut line = product_line(&item.id, 0, 333);
        line.quantity = Quantity::from_milli(500);
        let checkout = cart(vec![line], PaymentMethod::Card, 167);
        let detail = fx
            .service()
            .create_sale(&fx.tenant_id, &fx.user_id, &checkout)
            .await
            .unwrap();

        assert_eq!(detail.sale.total_cents, 167);
        assert_eq!(stock_of(&fx, &item).await, Quantity::from_milli(4_500));
    }

    #[tokio::test]
    async fn test_sale_number_collision_retries() {
        let fx = Fixture::new().await;
        let svc = fx.seed_service("Nail Trim", 1_500).await;
        let service = fx.service().with_clock(fixed_clock);
        let checkout = cart(vec![service_line(&svc.id, 1, 1_500)], PaymentMethod::Card, 1_500);

        let first = service.create_sale(&fx.tenant_id, &fx.user_id, &checkout).await.unwrap();
        let second = service.create_sale(&fx.tenant_id, &fx.user_id, &checkout).await.unwrap();
        let third = service.create_sale(&fx.tenant_id, &fx.user_id, &checkout).await.unwrap();

        assert_eq!(first.sale.sale_number, "20261019-120000000");
        assert_eq!(second.sale.sale_number, "20261019-120000000-1");
        assert_eq!(third.sale.sale_number, "20261019-120000000-2");

        // Attempts exhausted
        let err = service.create_sale(&fx.tenant_id, &fx.user_id, &checkout).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);
        assert_eq!(row_count(&fx, "sales").await, 3);
        assert_eq!(row_count(&fx, "sale_items").await, 3);
    }

    #[tokio::test]
    async fn test_sale_numbers_are_per_tenant() {
        let fx = Fixture::new().await;
        let other = fx.other_tenant().await;
        let service = fx.service().with_clock(fixed_clock);

        let svc = fx.seed_service("Nail Trim", 1_500).await;
        let other_svc = other.seed_service("Nail Trim", 1_500).await;

        let a = service
            .create_sale(&fx.tenant_id, &fx.user_id, &cart(vec![service_line(&svc.id, 1, 1_500)], PaymentMethod::Card, 0))
            .await
            .unwrap();
        let b = service
            .create_sale(
                &other.tenant_id,
                &other.user_id,
                &cart(vec![service_line(&other_svc.id, 1, 1_500)], PaymentMethod::Card, 0),
            )
            .await
            .unwrap();

        assert_eq!(a.sale.sale_number, b.sale.sale_number);
    }

    #[tokio::test]
    async fn test_references_are_checked_first() {
        let fx = Fixture::new().await;
        let item = seed_item(&fx.db, &fx.tenant_id, &fx.main_id, "Ear Cleaner", 4).await;
        let directory = fx.db.directory();
        let owner = directory.create_customer(&fx.tenant_id, "Ana Ruiz", None, None).await.unwrap();
        let stranger = directory.create_customer(&fx.tenant_id, "Ben Cole", None, None).await.unwrap();
        let pet = directory.create_pet(&fx.tenant_id, &owner.id, "Luna", None).await.unwrap();
        let service = fx.service();

        // Pet of another customer
        let mut checkout = cart(vec![product_line(&item.id, 1, 900)], PaymentMethod::Card, 900);
        checkout.customer_id = Some(stranger.id.clone());
        checkout.pet_id = Some(pet.id.clone());
        let err = service.create_sale(&fx.tenant_id, &fx.user_id, &checkout).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);

        // Item stocked at another location
        let mut checkout = cart(vec![product_line(&item.id, 1, 900)], PaymentMethod::Card, 900);
        checkout.location_id = Some(fx.branch_id.clone());
        let err = service.create_sale(&fx.tenant_id, &fx.user_id, &checkout).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);

        // Unknown service
        let checkout = cart(
            vec![service_line("7d9e4c1a-2222-4000-8000-000000000abc", 1, 900)],
            PaymentMethod::Card,
            900,
        );
        let err = service.create_sale(&fx.tenant_id, &fx.user_id, &checkout).await.unwrap_err();
        assert!(matches!(
            err,
            PosError::Core(CoreError::Validation(ValidationError::InvalidReference { .. }))
        ));

        // Item of another tenant
        let other = fx.other_tenant().await;
        let checkout = cart(vec![product_line(&item.id, 1, 900)], PaymentMethod::Card, 900);
        let err = service.create_sale(&other.tenant_id, &other.user_id, &checkout).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);

        assert_eq!(row_count(&fx, "sales").await, 0);
        assert_eq!(stock_of(&fx, &item).await, Quantity::from_units(4));
    }

    #[tokio::test]
    async fn test_empty_cart_and_plan_gate() {
        let fx = Fixture::new().await;

        let err = fx
            .service()
            .create_sale(&fx.tenant_id, &fx.user_id, &cart(vec![], PaymentMethod::Card, 0))
            .await
            .unwrap_err();
        assert!(matches!(err, PosError::Core(CoreError::EmptyCart)));

        let svc = fx.seed_service("Consultation", 4_500).await;
        let blocked = fx.service().with_gate(|_: &str, action: GatedAction| action != GatedAction::CreateSale);
        let err = blocked
            .create_sale(
                &fx.tenant_id,
                &fx.user_id,
                &cart(vec![service_line(&svc.id, 1, 4_500)], PaymentMethod::Card, 4_500),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, PosError::Core(CoreError::PlanLimitReached { .. })));
        assert_eq!(row_count(&fx, "sales").await, 0);
    }

    #[tokio::test]
    async fn test_get_sale_hydrates_customer_and_pet() {
        let fx = Fixture::new().await;
        let svc = fx.seed_service("Dental Cleaning", 18_000).await;
        let directory = fx.db.directory();
        let customer = directory
            .create_customer(&fx.tenant_id, "Ana Ruiz", Some("555-0101"), None)
            .await
            .unwrap();
        let pet = directory
            .create_pet(&fx.tenant_id, &customer.id, "Luna", Some("feline"))
            .await
            .unwrap();

        let mut checkout = cart(vec![service_line(&svc.id, 1, 18_000)], PaymentMethod::BankTransfer, 18_000);
        checkout.customer_id = Some(customer.id.clone());
        checkout.pet_id = Some(pet.id.clone());

        let service = fx.service();
        let created = service.create_sale(&fx.tenant_id, &fx.user_id, &checkout).await.unwrap();
        let fetched = service.get_sale(&fx.tenant_id, &created.sale.id).await.unwrap();

        assert_eq!(fetched.customer.map(|c| c.name), Some("Ana Ruiz".to_string()));
        assert_eq!(fetched.pet.map(|p| p.name), Some("Luna".to_string()));

        let other = fx.other_tenant().await;
        let err = service.get_sale(&other.tenant_id, &created.sale.id).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_sale_items_are_immutable() {
        let fx = Fixture::new().await;
        let svc = fx.seed_service("Consultation", 4_500).await;
        fx.service()
            .create_sale(
                &fx.tenant_id,
                &fx.user_id,
                &cart(vec![service_line(&svc.id, 1, 4_500)], PaymentMethod::Card, 4_500),
            )
            .await
            .unwrap();

        let result = sqlx::query("UPDATE sale_items SET unit_price_cents = 1")
            .execute(fx.db.pool())
            .await;
        assert!(result.is_err());
    }
}
