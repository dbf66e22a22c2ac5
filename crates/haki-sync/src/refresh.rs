//! Full snapshot refresh.
//!
//! 1. list every bounty (a failure here fails the refresh)
//! 2. narrow by the plan's scope
//! 3. per bounty, fan out the sub-reads concurrently
//! 4. assemble the snapshot
//!
//! Sub-read failures are absorbed: the affected sub-collection is empty.

use futures::future::join_all;
use haki_session::ContractHandles;
use haki_telemetry::metrics::{HistogramTimer, REFRESHES, REFRESH_DURATION, SUBCOLLECTION_FALLBACKS};
use haki_types::{Address, Amount, Bounty, BountyId, Contribution, ContractError, HakiResult};
use tracing::{debug, instrument, warn};

use crate::domain::{BountyView, ContributionScope, RefreshPlan, Snapshot};

/// Pull a fresh snapshot according to `plan`.
#[instrument(skip(handles, plan), fields(scope = ?plan.scope))]
pub async fn refresh(handles: &ContractHandles, plan: &RefreshPlan) -> HakiResult<Snapshot> {
    let _timer = HistogramTimer::new(&REFRESH_DURATION);
    let result = pull(handles, plan).await;
    match &result {
        Ok(snapshot) => {
            REFRESHES.with_label_values(&["ok"]).inc();
            debug!(bounties = snapshot.len(), "Snapshot refreshed");
        }
        Err(e) => {
            REFRESHES.with_label_values(&["failed"]).inc();
            warn!(error = %e, "Bounty listing failed");
        }
    }
    result
}

async fn pull(handles: &ContractHandles, plan: &RefreshPlan) -> HakiResult<Snapshot> {
    let bounties = handles.registry.get_all_bounties().await?;
    let loads = bounties
        .into_iter()
        .filter(|bounty| plan.scope.includes(bounty))
        .map(|bounty| load_view(handles, plan, bounty));
    Ok(Snapshot::from_views(join_all(loads).await))
}

fn fall_back<T: Default>(collection: &'static str, bounty: BountyId, result: Result<T, ContractError>) -> T {
    result.unwrap_or_else(|e| {
        SUBCOLLECTION_FALLBACKS.with_label_values(&[collection]).inc();
        warn!(bounty = %bounty, collection, error = %e, "Sub-collection unavailable, using empty");
        T::default()
    })
}

async fn load_view(handles: &ContractHandles, plan: &RefreshPlan, bounty: Bounty) -> BountyView {
    let id = bounty.id;

    let milestones = async {
        if !plan.milestones {
            return Vec::new();
        }
        fall_back("milestones", id, handles.registry.get_all_milestones(id).await)
    };

    let applications = async {
        if !plan.applications {
            return Vec::new();
        }
        fall_back("applications", id, handles.registry.get_applications(id).await)
    };

    let balance = async {
        if !plan.balance {
            return None;
        }
        fall_back("balance", id, handles.escrow.get_bounty_balance(id).await.map(Some))
    };

    let contributions = load_contributions(handles, plan.contributions, id);

    let (milestones, applications, balance, contributions) =
        tokio::join!(milestones, applications, balance, contributions);

    BountyView {
        bounty,
        milestones,
        contributions,
        applications,
        balance,
    }
}

async fn load_contributions(
    handles: &ContractHandles,
    scope: ContributionScope,
    id: BountyId,
) -> Vec<Contribution> {
    let contribution = |donor: Address, amount: Amount| Contribution {
        bounty_id: id,
        donor,
        amount,
    };

    match scope {
        ContributionScope::None => Vec::new(),
        ContributionScope::Donor(donor) => fall_back(
            "contributions",
            id,
            handles
                .escrow
                .get_donor_contribution(id, donor)
                .await
                .map(|amount| vec![contribution(donor, amount)]),
        ),
        ContributionScope::AllDonors => {
            let donors = fall_back("donors", id, handles.escrow.get_donors(id).await);
            let reads = donors.into_iter().map(|donor| async move {
                handles
                    .escrow
                    .get_donor_contribution(id, donor)
                    .await
                    .map(|amount| contribution(donor, amount))
            });
            let all: Result<Vec<_>, _> = join_all(reads).await.into_iter().collect();
            fall_back("contributions", id, all)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Dashboard, Scope};
    use haki_session::adapters::{InMemoryChain, ReadFault};
    use haki_session::{ContractConnector, Escrow, Registry, Token};
    use haki_types::ChainId;

    fn ngo() -> Address {
        Address::repeat_byte(0x0A)
    }

    fn donor() -> Address {
        Address::repeat_byte(0x0D)
    }

    async fn handles(chain: &InMemoryChain, signer: Address) -> ContractHandles {
        chain
            .connect(&chain.addresses(), signer, ChainId::SEPOLIA)
            .await
            .unwrap()
    }

    async fn seeded() -> InMemoryChain {
        let chain = InMemoryChain::new();
        let ngo_view = chain.view(ngo());
        ngo_view.create_bounty(&[Amount::from(10u64), Amount::from(20u64)]).await.unwrap();
        chain.view(Address::repeat_byte(0x0B)).create_bounty(&[Amount::from(5u64)]).await.unwrap();

        chain.mint(donor(), Amount::from(100u64));
        let donor_view = chain.view(donor());
        donor_view.approve(chain.addresses().escrow, Amount::from(30u64)).await.unwrap();
        donor_view.deposit(BountyId(1), donor(), Amount::from(30u64)).await.unwrap();
        chain
    }

    #[tokio::test]
    async fn test_full_refresh_assembles_every_bounty() {
        let chain = seeded().await;
        let snapshot = refresh(&handles(&chain, ngo()).await, &RefreshPlan::full())
            .await
            .unwrap();

        assert_eq!(snapshot.ids(), vec![BountyId(1), BountyId(2)]);
        let first = snapshot.get(BountyId(1)).unwrap();
        assert_eq!(first.milestones.len(), 2);
        assert_eq!(first.contributions.len(), 1);
        assert_eq!(first.total_contributed(), Amount::from(30u64));
        assert_eq!(first.balance, Some(Amount::from(30u64)));
    }

    #[tokio::test]
    async fn test_refresh_is_idempotent() {
        let chain = seeded().await;
        let h = handles(&chain, ngo()).await;
        let a = refresh(&h, &RefreshPlan::full()).await.unwrap();
        let b = refresh(&h, &RefreshPlan::full()).await.unwrap();
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn test_ngo_scope_filters_to_owner() {
        let chain = seeded().await;
        let plan = RefreshPlan::for_dashboard(Dashboard::Ngo, ngo());
        let snapshot = refresh(&handles(&chain, ngo()).await, &plan).await.unwrap();
        assert_eq!(snapshot.ids(), vec![BountyId(1)]);
        assert!(snapshot.get(BountyId(1)).unwrap().contributions.is_empty());
    }

    #[tokio::test]
    async fn test_missing_donor_list_yields_empty_contributions() {
        let chain = seeded().await;
        chain.fail_read(ReadFault::Donors(BountyId(1)));

        let snapshot = refresh(&handles(&chain, ngo()).await, &RefreshPlan::full())
            .await
            .unwrap();
        let view = snapshot.get(BountyId(1)).unwrap();
        assert!(view.contributions.is_empty());
        assert_eq!(view.milestones.len(), 2);
    }

    #[tokio::test]
    async fn test_failed_sub_reads_never_fail_refresh() {
        let chain = seeded().await;
        for fault in [
            ReadFault::Milestones(BountyId(2)),
            ReadFault::Applications(BountyId(2)),
            ReadFault::Balance(BountyId(2)),
            ReadFault::Contributions(BountyId(1)),
        ] {
            chain.fail_read(fault);
        }

        let snapshot = refresh(&handles(&chain, ngo()).await, &RefreshPlan::full())
            .await
            .unwrap();
        let second = snapshot.get(BountyId(2)).unwrap();
        assert!(second.milestones.is_empty());
        assert!(second.applications.is_empty());
        assert_eq!(second.balance, None);
        assert!(snapshot.get(BountyId(1)).unwrap().contributions.is_empty());
    }

    #[tokio::test]
    async fn test_listing_failure_fails_refresh() {
        let chain = seeded().await;
        chain.fail_read(ReadFault::Bounties);
        assert!(refresh(&handles(&chain, ngo()).await, &RefreshPlan::full())
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_donor_plan_reads_only_caller_contribution() {
        let chain = seeded().await;
        let plan = RefreshPlan::for_dashboard(Dashboard::Donor, donor());
        let snapshot = refresh(&handles(&chain, donor()).await, &plan).await.unwrap();

        let first = snapshot.get(BountyId(1)).unwrap();
        assert_eq!(first.contributions[0].donor, donor());
        assert_eq!(first.contributions[0].amount, Amount::from(30u64));
        let second = snapshot.get(BountyId(2)).unwrap();
        assert_eq!(second.contributions[0].amount, Amount::zero());
        assert!(second.milestones.is_empty());
    }

    #[tokio::test]
    async fn test_assigned_scope_for_lawyer() {
        let chain = seeded().await;
        let lawyer = Address::repeat_byte(0x1A);
        chain.assign_lawyer(BountyId(2), lawyer).unwrap();

        let plan = RefreshPlan::for_dashboard(Dashboard::Lawyer, lawyer)
            .with_scope(Scope::AssignedTo(lawyer));
        let snapshot = refresh(&handles(&chain, lawyer).await, &plan).await.unwrap();
        assert_eq!(snapshot.ids(), vec![BountyId(2)]);
    }
}
