//! # Demo Clinic Seeder
//!
//! Creates a demo tenant and walks it through a working day.
//!
//! ## Usage
//! ```bash
//! # Seed ./vetpos_dev.db
//! cargo run -p vetpos-db --bin seed
//!
//! # Specify database path
//! cargo run -p vetpos-db --bin seed -- --db ./data/vetpos.db
//! ```
//!
//! ## What Gets Created
//! - Two locations: "Downtown Clinic" and "Riverside Branch"
//! - A customer with one pet, two services
//! - Stock at the downtown clinic
//! - An open cash drawer with a 100.00 float and a cashier shift
//! - One cash checkout and one completed transfer to the branch
//!
//! The resulting sale and transfer are printed as JSON.

use std::env;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;
use vetpos_core::{
    CartLine, CheckoutCart, Money, NewInventoryItem, PaymentMethod, Quantity, TransferRequest,
};
use vetpos_db::{Database, EngineConfig, SaleService, TransferService};

/// Demo stock: (name, category, units, price in cents)
const STOCK: &[(&str, &str, i64, i64)] = &[
    ("Amoxicillin 250mg", "Medication", 120, 850),
    ("Meloxicam 1.5mg/ml", "Medication", 40, 2_400),
    ("Rabies Vaccine", "Vaccine", 30, 3_500),
    ("Flea & Tick Collar", "Retail", 25, 4_999),
    ("Grain-Free Kibble 5kg", "Food", 18, 6_250),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,vetpos=debug,sqlx=warn"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let args: Vec<String> = env::args().collect();
    let mut config = EngineConfig::from_env()?;
    if env::var("VETPOS_DB_PATH").is_err() {
        config.database_path = PathBuf::from("./vetpos_dev.db");
    }

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    config.database_path = PathBuf::from(&args[i + 1]);
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("VetPOS Demo Clinic Seeder");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>    Database file path (default: ./vetpos_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("🌱 VetPOS Demo Clinic Seeder");
    println!("============================");
    println!("Database: {}", config.database_path.display());
    println!();

    let db = Database::new(config.db_config()).await?;
    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    // Every run seeds a fresh tenant, so reruns never collide
    let tenant_id = Uuid::new_v4().to_string();
    let manager_id = Uuid::new_v4().to_string();
    let cashier_id = Uuid::new_v4().to_string();

    let directory = db.directory();
    let downtown = directory.create_location(&tenant_id, "Downtown Clinic").await?;
    let riverside = directory.create_location(&tenant_id, "Riverside Branch").await?;
    let customer = directory
        .create_customer(&tenant_id, "Maria Lopez", Some("+1 555 0142"), None)
        .await?;
    let pet = directory
        .create_pet(&tenant_id, &customer.id, "Bruno", Some("Dog"))
        .await?;
    let consultation = directory.create_service(&tenant_id, "Consultation", 4_500).await?;
    directory.create_service(&tenant_id, "Nail Trim", 1_500).await?;
    println!("✓ Tenant {} with 2 locations", tenant_id);

    let mut items = Vec::with_capacity(STOCK.len());
    for (name, category, units, price_cents) in STOCK {
        let item = db
            .inventory()
            .create_item(
                &tenant_id,
                &NewInventoryItem {
                    location_id: downtown.id.clone(),
                    name: name.to_string(),
                    category: Some(category.to_string()),
                    sku: None,
                    quantity: Quantity::from_units(*units),
                    cost_cents: price_cents * 6 / 10,
                    price_cents: *price_cents,
                    min_stock: Quantity::from_units(5),
                },
                Some(&manager_id),
            )
            .await?;
        items.push(item);
    }
    println!("✓ Stocked {} items at {}", items.len(), downtown.name);

    let drawer = db
        .drawers()
        .open_drawer(&tenant_id, Some(&downtown.id), Money::from_cents(10_000), &manager_id)
        .await?;
    db.drawers().start_shift(&tenant_id, &drawer.id, &cashier_id).await?;
    println!("✓ Drawer open with a {} float", Money::from_cents(drawer.opening_balance_cents));

    let medication = &items[0];
    let cart = CheckoutCart {
        customer_id: Some(customer.id.clone()),
        pet_id: Some(pet.id.clone()),
        location_id: Some(downtown.id.clone()),
        lines: vec![
            CartLine {
                inventory_item_id: Some(medication.id.clone()),
                service_id: None,
                description: None,
                quantity: Quantity::from_units(14),
                unit_price_cents: medication.price_cents,
                discount_cents: 0,
            },
            CartLine {
                inventory_item_id: None,
                service_id: Some(consultation.id.clone()),
                description: None,
                quantity: Quantity::from_units(1),
                unit_price_cents: consultation.price_cents,
                discount_cents: 0,
            },
        ],
        discount_cents: 0,
        tax_rate_bps: None,
        payment_method: PaymentMethod::Cash,
        amount_paid_cents: 20_000,
        notes: Some("Ear infection follow-up".to_string()),
    };

    let sales = SaleService::new(db.clone(), config.clone());
    let sale = sales.create_sale(&tenant_id, &cashier_id, &cart).await?;
    println!("✓ Sale {} ({})", sale.sale.sale_number, sale.sale.status);

    let transfers = TransferService::new(db.clone());
    let request = TransferRequest {
        item_id: items[1].id.clone(),
        from_location_id: downtown.id.clone(),
        to_location_id: riverside.id.clone(),
        quantity: Quantity::from_units(10),
        notes: Some("Weekly restock".to_string()),
    };
    let transfer = transfers
        .create_inventory_transfer(&tenant_id, &manager_id, &request)
        .await?;
    let transfer = transfers
        .complete_inventory_transfer(&transfer.id, &tenant_id)
        .await?;
    println!("✓ Transfer {} ({})", transfer.id, transfer.status);

    let balance = db.drawers().expected_balance(&tenant_id, &drawer.id).await?;
    println!("✓ Drawer expected balance: {}", balance);

    println!();
    println!("{}", serde_json::to_string_pretty(&sale)?);
    println!("{}", serde_json::to_string_pretty(&transfer)?);

    println!();
    println!("✓ Seed complete!");

    Ok(())
}
