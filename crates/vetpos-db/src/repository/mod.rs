//! # Repository Module
//!
//! Database repository implementations for the clinic POS ledger.
//!
//! ## Two Levels of Access
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  Repository structs (hold a SqlitePool)                                │
//! │  └── db.inventory().get(tenant, id)        one-off reads and           │
//! │      db.drawers().open_drawer(...)         self-contained writes       │
//! │                                                                         │
//! │  Module functions (take &mut SqliteConnection)                         │
//! │  └── inventory::decrement_stock(&mut tx, ...)                          │
//! │      ledger::append_movement(&mut tx, ...)                             │
//! │      drawer::resolve(&mut tx, ...)                                     │
//! │                                                                         │
//! │  The services compose the module functions on one transaction so a    │
//! │  checkout or a transfer completion commits or rolls back as a whole.  │
//! │  The repository structs call the same functions on a pooled           │
//! │  connection, so each query exists once.                               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`DirectoryRepository`](directory::DirectoryRepository) - Locations, customers, pets, services
//! - [`InventoryRepository`](inventory::InventoryRepository) - Stock records
//! - [`LedgerRepository`](ledger::LedgerRepository) - Append-only movement ledger
//! - [`DrawerRepository`](drawer::DrawerRepository) - Cash drawers, shifts, cash transactions
//! - [`SaleRepository`](sale::SaleRepository) - Sales, items, payments
//! - [`TransferRepository`](transfer::TransferRepository) - Inventory transfers

pub mod directory;
pub mod drawer;
pub mod inventory;
pub mod ledger;
pub mod sale;
pub mod transfer;
