//! Identity registration through the pin gateway, then the on-chain flows
//! that depend on a registered identity.

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use haki_pin_gateway::Credentials;
    use haki_session::adapters::InMemoryChain;
    use haki_session::{Registry, SessionContext};
    use haki_sync::adapters::HttpPinner;
    use haki_sync::{document_hash, BountyActions, Dashboard, RefreshPlan, Synchronizer};
    use haki_types::{BountyId, HakiError, RoleTag};

    use crate::integration::support::{connect_as, lawyer, ngo, PinStack};

    fn actions(stack: &PinStack, ctx: SessionContext, dashboard: Dashboard) -> (Arc<Synchronizer>, BountyActions) {
        let plan = RefreshPlan::for_dashboard(dashboard, ctx.address());
        let sync = Arc::new(Synchronizer::new(ctx.handles.clone(), plan));
        let pinner = Arc::new(HttpPinner::new(stack.pinning_config()).unwrap());
        let actions = BountyActions::new(ctx, Arc::clone(&sync), pinner);
        (sync, actions)
    }

    #[tokio::test]
    async fn test_registered_identity_matches_pinned_document() {
        let stack = PinStack::spawn(Some(Credentials::Bearer("jwt".into()))).await;
        let chain = InMemoryChain::new();
        let ctx = connect_as(&chain, lawyer(), &[RoleTag::Lawyer]).await;
        let (_, lawyer_actions) = actions(&stack, ctx, Dashboard::Lawyer);

        lawyer_actions.register_lawyer("LSK-2024-001").await.unwrap();

        let record = chain.view(lawyer()).get_lawyer_identity(lawyer()).await.unwrap();
        assert!(record.is_registered());
        let pinned = &stack.service.documents()[0];
        assert_eq!(pinned["lsk"], "LSK-2024-001");
        assert_eq!(pinned["type"], "lawyer");
        assert_eq!(record.payload_hash, document_hash(pinned));
    }

    #[tokio::test]
    async fn test_pin_rejection_skips_registration() {
        let stack = PinStack::spawn(Some(Credentials::Bearer("jwt".into()))).await;
        stack.service.reject_with(401, "invalid JWT");
        let chain = InMemoryChain::new();
        let ctx = connect_as(&chain, ngo(), &[RoleTag::Ngo]).await;
        let (sync, ngo_actions) = actions(&stack, ctx, Dashboard::Ngo);

        let err = ngo_actions.register_ngo("NGO-77").await.unwrap_err();
        assert_eq!(err, HakiError::Pinning("pinata failed: invalid JWT".into()));
        let record = chain.view(ngo()).get_ngo_identity(ngo()).await.unwrap();
        assert!(!record.is_registered());
        assert_eq!(sync.refreshes_started(), 0);
    }

    #[tokio::test]
    async fn test_missing_credentials_skip_registration() {
        let stack = PinStack::spawn(None).await;
        let chain = InMemoryChain::new();
        let ctx = connect_as(&chain, ngo(), &[RoleTag::Ngo]).await;
        let (_, ngo_actions) = actions(&stack, ctx, Dashboard::Ngo);

        assert!(matches!(
            ngo_actions.register_ngo("NGO-78").await,
            Err(HakiError::Pinning(_))
        ));
        assert!(stack.service.documents().is_empty());
    }

    /// NGO registers and posts a bounty; a lawyer registers and applies with
    /// the pinned identity as proposal reference.
    #[tokio::test]
    async fn test_register_post_and_apply() {
        let stack = PinStack::spawn(Some(Credentials::Bearer("jwt".into()))).await;
        let chain = InMemoryChain::new();

        let ngo_ctx = connect_as(&chain, ngo(), &[RoleTag::Ngo]).await;
        let (ngo_sync, ngo_actions) = actions(&stack, ngo_ctx, Dashboard::Ngo);
        assert_eq!(
            ngo_actions.create_bounty(&["10"]).await.unwrap_err(),
            HakiError::IdentityNotRegistered(RoleTag::Ngo)
        );
        ngo_actions.register_ngo("NGO-1").await.unwrap();
        ngo_actions.create_bounty(&["10", "2.5"]).await.unwrap();
        assert_eq!(ngo_sync.snapshot().ids(), vec![BountyId(1)]);

        let lawyer_ctx = connect_as(&chain, lawyer(), &[RoleTag::Lawyer]).await;
        let (lawyer_sync, lawyer_actions) = actions(&stack, lawyer_ctx, Dashboard::Lawyer);
        lawyer_actions.register_lawyer("LSK-9").await.unwrap();
        lawyer_actions.apply_for_bounty(BountyId(1)).await.unwrap();

        let identity = chain.view(lawyer()).get_lawyer_identity(lawyer()).await.unwrap();
        let snapshot = lawyer_sync.snapshot();
        let applied: Vec<_> = snapshot.applied_by(&lawyer()).map(|v| v.id()).collect();
        assert_eq!(applied, vec![BountyId(1)]);
        assert_eq!(
            snapshot.get(BountyId(1)).unwrap().applications[0].proposal_uri,
            identity.cid
        );

        ngo_sync.refresh().await.unwrap();
        assert!(ngo_sync.snapshot().get(BountyId(1)).unwrap().has_applied(&lawyer()));
    }
}
