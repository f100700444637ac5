//! # Service Module
//!
//! The two orchestrators that write across several tables at once:
//!
//! - [`SaleService`] - checkout: sale, lines, stock, cash drawer, payment
//! - [`TransferService`] - stock moves between locations of a tenant
//!
//! Both take the plan gate as a [`PlanGate`] and report failures as
//! [`PosError`], which the API layer turns into an [`ApiError`].

pub mod error;
pub mod gate;
pub mod sale;
pub mod transfer;

pub use error::{ApiError, ErrorCode, ErrorKind, PosError, PosResult};
pub use gate::{AllowAll, GatedAction, PlanGate};
pub use sale::{Clock, SaleService};
pub use transfer::TransferService;
