//! # vetpos-db: Database Layer, Ledger and Orchestrators
//!
//! Owns every write of the clinic POS: stock records and their append-only
//! movement ledger, cash drawers and shifts, sales and inventory transfers.
//! SQLite through sqlx; every multi-row write runs in one transaction.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        VetPOS Ledger Data Flow                          │
//! │                                                                         │
//! │  API layer (auth, plan lookup)                                         │
//! │       │  CheckoutCart / TransferRequest                                │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    vetpos-db (THIS CRATE)                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   Services    │    │  Repositories │    │   Database   │  │   │
//! │  │   │               │    │               │    │   (pool.rs)  │  │   │
//! │  │   │ SaleService   │───►│ inventory     │───►│ SqlitePool   │  │   │
//! │  │   │ Transfer-     │    │ ledger        │    │ migrations   │  │   │
//! │  │   │   Service     │    │ drawer, sale  │    │              │  │   │
//! │  │   │ PlanGate      │    │ transfer, ... │    │              │  │   │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘  │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     SQLite Database                             │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`config`] - Engine settings from the environment
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Table-level access (inventory, ledger, drawer, ...)
//! - [`service`] - Sale and transfer orchestrators, plan gate, API errors
//!
//! ## Usage
//!
//! ```rust,ignore
//! use vetpos_db::{Database, EngineConfig, SaleService};
//!
//! let config = EngineConfig::from_env()?;
//! let db = Database::new(config.db_config()).await?;
//!
//! let sales = SaleService::new(db.clone(), config);
//! let detail = sales.create_sale(&tenant_id, &user_id, &cart).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod config;
pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;
pub mod service;

#[cfg(test)]
mod testing;

// =============================================================================
// Re-exports
// =============================================================================

pub use config::{ConfigError, EngineConfig};
pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::directory::DirectoryRepository;
pub use repository::drawer::DrawerRepository;
pub use repository::inventory::InventoryRepository;
pub use repository::ledger::LedgerRepository;
pub use repository::sale::SaleRepository;
pub use repository::transfer::TransferRepository;

pub use service::{
    AllowAll, ApiError, ErrorCode, ErrorKind, GatedAction, PlanGate, PosError, PosResult,
    SaleService, TransferService,
};
