//! Snapshot of bounty state, rebuilt in full by every refresh.

use std::collections::BTreeMap;

use haki_types::{Address, Amount, Application, Bounty, BountyId, Contribution, Milestone, MilestoneState};
use serde::Serialize;

/// One bounty with the sub-collections the refresh plan asked for.
///
/// A sub-collection whose read failed is empty, never missing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BountyView {
    pub bounty: Bounty,
    pub milestones: Vec<Milestone>,
    pub contributions: Vec<Contribution>,
    pub applications: Vec<Application>,
    /// Escrow balance; `None` when not requested or unreadable.
    pub balance: Option<Amount>,
}

impl BountyView {
    /// View with every sub-collection empty.
    pub fn bare(bounty: Bounty) -> Self {
        Self {
            bounty,
            milestones: Vec::new(),
            contributions: Vec::new(),
            applications: Vec::new(),
            balance: None,
        }
    }

    pub fn id(&self) -> BountyId {
        self.bounty.id
    }

    /// Sum of all recorded contributions.
    pub fn total_contributed(&self) -> Amount {
        self.contributions
            .iter()
            .fold(Amount::zero(), |acc, c| acc.saturating_add(c.amount))
    }

    pub fn has_applied(&self, lawyer: &Address) -> bool {
        self.applications.iter().any(|a| a.lawyer == *lawyer)
    }
}

/// A milestone observed moving backwards between two snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MilestoneRegression {
    pub bounty_id: BountyId,
    pub index: u32,
    pub from: MilestoneState,
    pub to: MilestoneState,
}

/// Bounty views keyed by id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Snapshot {
    bounties: BTreeMap<BountyId, BountyView>,
}

impl Snapshot {
    pub fn from_views(views: impl IntoIterator<Item = BountyView>) -> Self {
        Self {
            bounties: views.into_iter().map(|v| (v.id(), v)).collect(),
        }
    }

    pub fn get(&self, id: BountyId) -> Option<&BountyView> {
        self.bounties.get(&id)
    }

    pub fn len(&self) -> usize {
        self.bounties.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bounties.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &BountyView> {
        self.bounties.values()
    }

    pub fn ids(&self) -> Vec<BountyId> {
        self.bounties.keys().copied().collect()
    }

    pub fn milestone(&self, id: BountyId, index: u32) -> Option<&Milestone> {
        self.get(id)?.milestones.iter().find(|m| m.index == index)
    }

    /// Bounties `lawyer` has applied for.
    pub fn applied_by<'a>(&'a self, lawyer: &'a Address) -> impl Iterator<Item = &'a BountyView> {
        self.iter().filter(move |v| v.has_applied(lawyer))
    }

    /// Bounties `lawyer` has been selected for.
    pub fn assigned_to<'a>(&'a self, lawyer: &'a Address) -> impl Iterator<Item = &'a BountyView> {
        self.iter().filter(move |v| v.bounty.is_assigned_to(lawyer))
    }

    /// Milestones present in both snapshots whose state went backwards.
    pub fn regressions_since(&self, previous: &Snapshot) -> Vec<MilestoneRegression> {
        let mut found = Vec::new();
        for view in self.iter() {
            for milestone in &view.milestones {
                let Some(before) = previous.milestone(view.id(), milestone.index) else {
                    continue;
                };
                let (from, to) = (before.state(), milestone.state());
                if !from.can_transition_to(to) {
                    found.push(MilestoneRegression {
                        bounty_id: view.id(),
                        index: milestone.index,
                        from,
                        to,
                    });
                }
            }
        }
        found
    }
}
