//! What a refresh pulls, per dashboard.

use haki_types::{Address, Bounty, RoleTag};

/// Role-specific dashboards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dashboard {
    Admin,
    Ngo,
    Donor,
    Lawyer,
}

impl Dashboard {
    /// Roles any one of which opens the dashboard.
    pub fn allowed_roles(self) -> &'static [RoleTag] {
        match self {
            Self::Admin => &[RoleTag::Admin, RoleTag::CaseSteward],
            Self::Ngo => &[RoleTag::Ngo],
            Self::Donor => &[RoleTag::Donor],
            Self::Lawyer => &[RoleTag::Lawyer],
        }
    }
}

/// Which bounties survive the listing step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    All,
    /// Bounties created by this NGO.
    OwnedBy(Address),
    /// Bounties this lawyer was selected for.
    AssignedTo(Address),
}

impl Scope {
    pub fn includes(&self, bounty: &Bounty) -> bool {
        match self {
            Self::All => true,
            Self::OwnedBy(ngo) => bounty.is_owned_by(ngo),
            Self::AssignedTo(lawyer) => bounty.is_assigned_to(lawyer),
        }
    }
}

/// Which contributions to read per bounty.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContributionScope {
    None,
    /// Donor list, then one contribution read per donor.
    AllDonors,
    /// Only this donor's contribution.
    Donor(Address),
}

/// Refresh instructions: scope filter plus the sub-reads to fan out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshPlan {
    pub scope: Scope,
    pub milestones: bool,
    pub contributions: ContributionScope,
    pub applications: bool,
    pub balance: bool,
}

impl RefreshPlan {
    /// Everything, for every bounty.
    pub fn full() -> Self {
        Self {
            scope: Scope::All,
            milestones: true,
            contributions: ContributionScope::AllDonors,
            applications: true,
            balance: true,
        }
    }

    /// The reads `dashboard` shows to `caller`.
    pub fn for_dashboard(dashboard: Dashboard, caller: Address) -> Self {
        match dashboard {
            Dashboard::Admin => Self {
                scope: Scope::All,
                milestones: true,
                contributions: ContributionScope::AllDonors,
                applications: false,
                balance: false,
            },
            Dashboard::Ngo => Self {
                scope: Scope::OwnedBy(caller),
                milestones: true,
                contributions: ContributionScope::None,
                applications: true,
                balance: false,
            },
            Dashboard::Donor => Self {
                scope: Scope::All,
                milestones: false,
                contributions: ContributionScope::Donor(caller),
                applications: false,
                balance: true,
            },
            Dashboard::Lawyer => Self {
                scope: Scope::All,
                milestones: false,
                contributions: ContributionScope::None,
                applications: true,
                balance: false,
            },
        }
    }

    pub fn with_scope(mut self, scope: Scope) -> Self {
        self.scope = scope;
        self
    }
}

impl Default for RefreshPlan {
    fn default() -> Self {
        Self::full()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use haki_types::BountyId;

    fn bounty(ngo: u8, lawyer: Option<u8>) -> Bounty {
        Bounty {
            id: BountyId(1),
            ngo: Address::repeat_byte(ngo),
            active: true,
            lawyer_selected: lawyer.is_some(),
            assigned_lawyer: lawyer.map(Address::repeat_byte),
        }
    }

    #[test]
    fn test_ngo_plan_scopes_to_caller() {
        let me = Address::repeat_byte(1);
        let plan = RefreshPlan::for_dashboard(Dashboard::Ngo, me);
        assert!(plan.scope.includes(&bounty(1, None)));
        assert!(!plan.scope.includes(&bounty(2, None)));
        assert!(plan.applications);
    }

    #[test]
    fn test_assigned_scope() {
        let lawyer = Address::repeat_byte(9);
        let scope = Scope::AssignedTo(lawyer);
        assert!(scope.includes(&bounty(1, Some(9))));
        assert!(!scope.includes(&bounty(1, None)));
    }

    #[test]
    fn test_donor_plan_reads_own_contribution_and_balance() {
        let me = Address::repeat_byte(4);
        let plan = RefreshPlan::for_dashboard(Dashboard::Donor, me);
        assert_eq!(plan.contributions, ContributionScope::Donor(me));
        assert!(plan.balance);
        assert_eq!(plan.scope, Scope::All);
    }

    #[test]
    fn test_admin_dashboard_accepts_case_steward() {
        assert!(Dashboard::Admin.allowed_roles().contains(&RoleTag::CaseSteward));
    }
}
