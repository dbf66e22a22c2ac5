//! Snapshot refresh, change subscriptions and publication order.

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use haki_session::adapters::{InMemoryChain, ReadFault};
    use haki_session::{ContractTopic, Registry};
    use haki_sync::adapters::InMemoryPinner;
    use haki_sync::{refresh, BountyActions, RefreshPlan, Synchronizer};
    use haki_types::{parse_units, Amount, BountyId, MilestoneState, RoleTag};

    use crate::integration::support::{connect_as, donor, lawyer, ngo, DelayedListing};

    async fn wait_for(sync: &Synchronizer, refreshes: u64) {
        tokio::time::timeout(Duration::from_secs(2), async {
            while sync.refreshes_started() < refreshes {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap_or_else(|_| panic!("expected {} refreshes, saw {}", refreshes, sync.refreshes_started()));
    }

    #[tokio::test]
    async fn test_refresh_without_writes_is_stable() {
        let chain = InMemoryChain::new();
        let ctx = connect_as(&chain, ngo(), &[RoleTag::Ngo]).await;
        ctx.handles.registry.create_bounty(&[Amount::from(4u64), Amount::from(6u64)]).await.unwrap();

        let first = refresh(&ctx.handles, &RefreshPlan::full()).await.unwrap();
        let second = refresh(&ctx.handles, &RefreshPlan::full()).await.unwrap();
        assert_eq!(first, second);
        assert!(second.regressions_since(&first).is_empty());
    }

    #[tokio::test]
    async fn test_missing_sub_collections_are_empty_not_errors() {
        let chain = InMemoryChain::new();
        let ctx = connect_as(&chain, ngo(), &[RoleTag::Ngo]).await;
        ctx.handles.registry.create_bounty(&[Amount::from(1u64)]).await.unwrap();
        chain.fail_read(ReadFault::Donors(BountyId(1)));
        chain.fail_read(ReadFault::Applications(BountyId(1)));

        let snapshot = refresh(&ctx.handles, &RefreshPlan::full()).await.unwrap();
        let view = snapshot.get(BountyId(1)).unwrap();
        assert!(view.contributions.is_empty());
        assert!(view.applications.is_empty());
        assert_eq!(view.milestones.len(), 1);

        chain.heal();
        let healed = refresh(&ctx.handles, &RefreshPlan::full()).await.unwrap();
        assert_eq!(healed.get(BountyId(1)).unwrap().milestones, view.milestones);
    }

    /// Drive one milestone through its whole lifecycle while change
    /// notifications trigger extra refreshes; no published snapshot may move
    /// it backwards.
    #[tokio::test]
    async fn test_milestone_lifecycle_is_monotonic() {
        let chain = InMemoryChain::new();
        let ngo_ctx = connect_as(&chain, ngo(), &[RoleTag::Ngo]).await;
        let donor_ctx = connect_as(&chain, donor(), &[RoleTag::Donor]).await;

        let observer = Arc::new(Synchronizer::new(ngo_ctx.handles.clone(), RefreshPlan::full()));
        let _subscription = observer.subscribe();
        let ngo_actions = BountyActions::new(ngo_ctx, Arc::clone(&observer), Arc::new(InMemoryPinner::new()));
        let donor_sync = Arc::new(Synchronizer::new(donor_ctx.handles.clone(), RefreshPlan::full()));
        let donor_actions = BountyActions::new(donor_ctx, donor_sync, Arc::new(InMemoryPinner::new()));

        ngo_actions.register_ngo("NGO-1").await.unwrap();
        ngo_actions.create_bounty(&["2"]).await.unwrap();
        let mut history = vec![observer.snapshot()];

        chain.mint(donor(), parse_units("5", 18).unwrap());
        donor_actions.fund_bounty(BountyId(1), "2").await.unwrap();
        tokio::task::yield_now().await;
        history.push(observer.snapshot());

        ngo_actions.approve_milestone(BountyId(1), 0).await.unwrap();
        history.push(observer.snapshot());

        chain.assign_lawyer(BountyId(1), lawyer()).unwrap();
        ngo_actions.release_milestone_funds(BountyId(1), 0).await.unwrap();
        history.push(observer.snapshot());

        // Let the notification-driven refreshes land as well
        tokio::time::sleep(Duration::from_millis(50)).await;
        history.push(observer.snapshot());

        for pair in history.windows(2) {
            assert!(pair[1].regressions_since(&pair[0]).is_empty());
        }
        let mut states: Vec<_> = history
            .iter()
            .filter_map(|s| s.milestone(BountyId(1), 0).map(|m| m.state()))
            .collect();
        states.dedup();
        assert_eq!(
            states,
            vec![MilestoneState::Unapproved, MilestoneState::Approved, MilestoneState::Released]
        );
        assert_eq!(chain.token_balance(lawyer()), parse_units("2", 18).unwrap());
    }

    #[tokio::test]
    async fn test_unsubscribe_restores_listener_count() {
        let chain = InMemoryChain::new();
        let ctx = connect_as(&chain, ngo(), &[RoleTag::Ngo]).await;
        let before = chain.listener_count();

        let sync = Arc::new(Synchronizer::new(ctx.handles.clone(), RefreshPlan::full()));
        let subscription = sync.subscribe();
        assert_eq!(chain.listener_count(), before + 4);

        chain.emit(ContractTopic::BountyCreated, Some(BountyId(1)));
        wait_for(&sync, 1).await;

        subscription.unsubscribe();
        assert_eq!(chain.listener_count(), before);

        chain.emit(ContractTopic::BountyUpdated, None);
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(sync.refreshes_started(), 1);
    }

    #[tokio::test]
    async fn test_resubscribe_does_not_accumulate() {
        let chain = InMemoryChain::new();
        let ctx = connect_as(&chain, ngo(), &[RoleTag::Ngo]).await;
        let sync = Arc::new(Synchronizer::new(ctx.handles.clone(), RefreshPlan::full()));

        for _ in 0..5 {
            let subscription = sync.subscribe();
            assert_eq!(chain.listener_count(), 4);
            drop(subscription);
        }
        assert_eq!(chain.listener_count(), 0);
    }

    /// A refresh that started first but finished last overwrites the newer
    /// one; the published snapshot follows completion order.
    #[tokio::test]
    async fn test_last_completed_refresh_wins() {
        let chain = InMemoryChain::new();
        let ctx = connect_as(&chain, ngo(), &[RoleTag::Ngo]).await;
        let handles = DelayedListing::wrap(
            &ctx.handles,
            [Duration::from_millis(200), Duration::ZERO],
        );
        let sync = Arc::new(Synchronizer::new(handles, RefreshPlan::full()));

        let slow = tokio::spawn({
            let sync = Arc::clone(&sync);
            async move { sync.refresh().await }
        });
        wait_for(&sync, 1).await;
        tokio::time::sleep(Duration::from_millis(20)).await;

        ctx.handles.registry.create_bounty(&[Amount::from(1u64)]).await.unwrap();
        let fast = sync.refresh().await.unwrap();
        assert_eq!(fast.len(), 1);
        assert_eq!(sync.snapshot().len(), 1);

        let stale = slow.await.unwrap().unwrap();
        assert!(stale.is_empty());
        assert!(sync.snapshot().is_empty());
        assert_eq!(sync.refreshes_started(), 2);
    }
}
