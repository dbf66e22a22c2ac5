//! Session handshake and role gating across crates.

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use haki_session::adapters::{InMemoryChain, InMemoryWallet, WalletCall};
    use haki_session::Registry;
    use haki_sync::adapters::InMemoryPinner;
    use haki_sync::{BountyActions, Dashboard, RefreshPlan, Synchronizer};
    use haki_types::{Amount, BountyId, ChainId, HakiError, MilestoneState, RoleTag};

    use crate::integration::support::{connect_as, donor, ngo, session_manager, steward};

    fn switches(calls: &[WalletCall]) -> usize {
        calls.iter().filter(|c| matches!(c, WalletCall::Switch(_))).count()
    }

    #[tokio::test]
    async fn test_on_target_chain_no_switch() {
        let chain = InMemoryChain::new();
        let (wallet, manager) = session_manager(&chain, InMemoryWallet::new(ChainId::SEPOLIA));

        let ctx = manager.connect().await.unwrap();
        assert_eq!(ctx.session.chain_id, ChainId::SEPOLIA);
        assert_eq!(switches(&wallet.calls()), 0);
    }

    #[tokio::test]
    async fn test_known_other_chain_switches_once() {
        let chain = InMemoryChain::new();
        let wallet = InMemoryWallet::new(ChainId(1)).with_known_chain(ChainId::SEPOLIA);
        let (wallet, manager) = session_manager(&chain, wallet);

        manager.connect().await.unwrap();
        assert_eq!(switches(&wallet.calls()), 1);
        assert!(!wallet.calls().iter().any(|c| matches!(c, WalletCall::Add(_))));
        assert_eq!(wallet.current_chain(), ChainId::SEPOLIA);
    }

    #[tokio::test]
    async fn test_unknown_chain_adds_then_switches() {
        let chain = InMemoryChain::new();
        let (wallet, manager) = session_manager(&chain, InMemoryWallet::new(ChainId(1)));

        let ctx = manager.connect().await.unwrap();
        let remediation: Vec<_> = wallet
            .calls()
            .into_iter()
            .filter(|c| matches!(c, WalletCall::Switch(_) | WalletCall::Add(_)))
            .collect();
        assert_eq!(
            remediation,
            vec![
                WalletCall::Switch(ChainId::SEPOLIA),
                WalletCall::Add(ChainId::SEPOLIA),
                WalletCall::Switch(ChainId::SEPOLIA),
            ]
        );
        assert_eq!(ctx.session.chain_id, ChainId::SEPOLIA);
    }

    #[tokio::test]
    async fn test_rejected_switch_aborts_without_session() {
        let chain = InMemoryChain::new();
        let wallet = InMemoryWallet::new(ChainId(1))
            .with_known_chain(ChainId::SEPOLIA)
            .rejecting_switch();
        let (_, manager) = session_manager(&chain, wallet);

        let err = manager.connect().await.unwrap_err();
        assert_eq!(err, HakiError::UserRejected);
        assert!(manager.current().is_none());
        assert_eq!(chain.role_check_count(), 0);
    }

    #[tokio::test]
    async fn test_missing_role_never_reaches_chain() {
        let chain = InMemoryChain::new();
        chain.view(ngo()).create_bounty(&[Amount::from(1u64)]).await.unwrap();
        let ctx = connect_as(&chain, donor(), &[RoleTag::Donor]).await;
        let sync = Arc::new(Synchronizer::new(ctx.handles.clone(), RefreshPlan::full()));
        let actions = BountyActions::new(ctx, Arc::clone(&sync), Arc::new(InMemoryPinner::new()));

        for result in [
            actions.approve_milestone(BountyId(1), 0).await,
            actions.release_milestone_funds(BountyId(1), 0).await,
            actions.create_bounty(&["1"]).await,
            actions.apply_for_bounty(BountyId(1)).await,
            actions.set_escrow_address(donor()).await,
        ] {
            assert!(matches!(result, Err(HakiError::MissingRole { .. })));
        }
        assert_eq!(sync.refreshes_started(), 0);
    }

    #[tokio::test]
    async fn test_case_steward_may_approve() {
        let chain = InMemoryChain::new();
        let ngo_ctx = connect_as(&chain, ngo(), &[RoleTag::Ngo]).await;
        tokio_test::assert_ok!(ngo_ctx.handles.registry.create_bounty(&[Amount::from(3u64)]).await);

        let ctx = connect_as(&chain, steward(), &[RoleTag::CaseSteward]).await;
        assert!(Synchronizer::for_dashboard(&ctx, Dashboard::Admin).is_ok());
        let sync = Arc::new(Synchronizer::new(ctx.handles.clone(), RefreshPlan::full()));
        let actions = BountyActions::new(ctx, Arc::clone(&sync), Arc::new(InMemoryPinner::new()));

        actions.approve_milestone(BountyId(1), 0).await.unwrap();
        let state = sync.snapshot().milestone(BountyId(1), 0).map(|m| m.state());
        assert_eq!(state, Some(MilestoneState::Approved));
    }

    #[tokio::test]
    async fn test_dashboard_access_follows_roles() {
        let chain = InMemoryChain::new();
        let ctx = connect_as(&chain, ngo(), &[RoleTag::Ngo]).await;

        assert!(Synchronizer::for_dashboard(&ctx, Dashboard::Ngo).is_ok());
        for dashboard in [Dashboard::Admin, Dashboard::Donor, Dashboard::Lawyer] {
            assert!(matches!(
                Synchronizer::for_dashboard(&ctx, dashboard),
                Err(HakiError::MissingRole { .. })
            ));
        }
    }
}
