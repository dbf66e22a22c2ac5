//! Role resolution against the registry.

use futures::future::join_all;
use haki_types::{Address, RoleSet, RoleTag};
use tracing::debug;

use crate::ports::{ContractResult, Registry};

/// Check every known role for `account`.
///
/// All five checks run concurrently and are joined before the result is
/// used; a single failed check fails the whole resolution, but only after
/// every check has completed.
pub async fn resolve_roles(registry: &dyn Registry, account: Address) -> ContractResult<RoleSet> {
    let checks = RoleTag::ALL.iter().map(|role| async move {
        registry
            .has_role(role.role_id(), account)
            .await
            .map(|held| (*role, held))
    });

    let mut roles = RoleSet::new();
    for result in join_all(checks).await {
        let (role, held) = result?;
        if held {
            roles.insert(role);
        }
    }

    debug!(account = ?account, roles = %roles, "Roles resolved");
    Ok(roles)
}
