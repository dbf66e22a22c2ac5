//! Connected, network-verified, role-resolved identity.

use haki_types::{Address, ChainId, HakiError, HakiResult, RoleSet, RoleTag};
use serde::{Deserialize, Serialize};

use crate::ports::ContractHandles;

/// The local view of the connected user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub address: Address,
    pub chain_id: ChainId,
    pub roles: RoleSet,
}

impl Session {
    pub fn has_role(&self, role: RoleTag) -> bool {
        self.roles.contains(role)
    }

    /// Gate for write operations: fails with [`HakiError::MissingRole`]
    /// unless at least one of `allowed` is held.
    pub fn require_any(&self, operation: &'static str, allowed: &[RoleTag]) -> HakiResult<()> {
        if self.roles.contains_any(allowed) {
            Ok(())
        } else {
            Err(HakiError::MissingRole {
                operation,
                required: allowed.to_vec(),
            })
        }
    }
}

/// Session plus the contract handles bound to it.
///
/// Passed explicitly to the synchronizer; dropping every clone releases the
/// handles.
#[derive(Debug, Clone)]
pub struct SessionContext {
    pub session: Session,
    pub handles: ContractHandles,
}

impl SessionContext {
    pub fn address(&self) -> Address {
        self.session.address
    }

    pub fn require_any(&self, operation: &'static str, allowed: &[RoleTag]) -> HakiResult<()> {
        self.session.require_any(operation, allowed)
    }
}
