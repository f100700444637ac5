//! Plan gate: the subscription check that runs before a sale or a transfer.
//!
//! The ledger does not know about plans. The application passes in whatever
//! answers "may this tenant do this?"; the default says yes.

use std::fmt;

/// Actions a plan can switch off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GatedAction {
    CreateSale,
    TransferInventory,
}

impl GatedAction {
    pub const fn as_str(&self) -> &'static str {
        match self {
            GatedAction::CreateSale => "create_sale",
            GatedAction::TransferInventory => "transfer_inventory",
        }
    }
}

impl fmt::Display for GatedAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Yes/no answer on whether a tenant's plan includes an action.
pub trait PlanGate: Send + Sync {
    fn allows(&self, tenant_id: &str, action: GatedAction) -> bool;
}

/// Allows everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

impl PlanGate for AllowAll {
    fn allows(&self, _tenant_id: &str, _action: GatedAction) -> bool {
        true
    }
}

impl<F> PlanGate for F
where
    F: Fn(&str, GatedAction) -> bool + Send + Sync,
{
    fn allows(&self, tenant_id: &str, action: GatedAction) -> bool {
        self(tenant_id, action)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_closure_gate() {
        let no_transfers = |_: &str, action: GatedAction| action != GatedAction::TransferInventory;

        assert!(no_transfers.allows("t", GatedAction::CreateSale));
        assert!(!no_transfers.allows("t", GatedAction::TransferInventory));
        assert!(AllowAll.allows("t", GatedAction::TransferInventory));
    }
}
