//! # Role Tags
//!
//! The five capabilities recognised by the registry contract. Membership is
//! authoritative on-chain; a [`RoleSet`] is only the mirror taken at connect
//! time (or after an account change).
//!
//! | Tag | Registry identifier |
//! |-----|---------------------|
//! | `Admin` | `ADMIN_ROLE` |
//! | `CaseSteward` | `CASE_STEWARD_ROLE` |
//! | `Ngo` | `NGO_ROLE` |
//! | `Donor` | `DONOR_ROLE` |
//! | `Lawyer` | `LAWYER_ROLE` |

use std::collections::BTreeSet;
use std::fmt;

use primitive_types::H256;
use serde::{Deserialize, Serialize};

/// Opaque 32-byte role identifier passed to `hasRole`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoleId(pub H256);

const ADMIN_ROLE: [u8; 32] = [
    0xf2, 0x3a, 0x6e, 0x3e, 0x6a, 0x9d, 0x3f, 0xf4,
    0xe9, 0xf1, 0xd4, 0xfb, 0xa2, 0xbb, 0xfe, 0x5e,
    0xda, 0xc2, 0xff, 0xb8, 0x7d, 0x3c, 0xaa, 0xab,
    0xcb, 0x24, 0x6d, 0xf9, 0xe4, 0xcb, 0x52, 0xf2,
];

const CASE_STEWARD_ROLE: [u8; 32] = [
    0xb5, 0x2a, 0x0e, 0x93, 0xc2, 0x74, 0xe5, 0x3d,
    0x58, 0x40, 0xa2, 0x2a, 0xc6, 0x81, 0xe4, 0x7a,
    0xbf, 0x90, 0xd7, 0xf3, 0xb7, 0x85, 0x0e, 0x7b,
    0xa1, 0xc6, 0x64, 0x1e, 0xcb, 0x5b, 0x40, 0xad,
];

const NGO_ROLE: [u8; 32] = [
    0x1b, 0x4e, 0x2b, 0xca, 0xd8, 0x43, 0x46, 0xb7,
    0xf4, 0x12, 0x50, 0x5c, 0xbe, 0xcf, 0x9f, 0x08,
    0xae, 0x81, 0x4a, 0x25, 0x56, 0x07, 0x18, 0x18,
    0x2c, 0x9b, 0x3f, 0x56, 0x84, 0x7b, 0xfb, 0x3e,
];

const DONOR_ROLE: [u8; 32] = [
    0x75, 0x6b, 0x03, 0x34, 0xd9, 0x11, 0xda, 0x1e,
    0x4c, 0x1a, 0x01, 0x0b, 0xf7, 0xcb, 0x2a, 0xc2,
    0x27, 0x3a, 0x6d, 0xc5, 0xd2, 0xa5, 0x52, 0x4f,
    0x33, 0xa3, 0xeb, 0x18, 0xdc, 0x8d, 0x2b, 0x47,
];

const LAWYER_ROLE: [u8; 32] = [
    0xe4, 0x6f, 0x1b, 0x29, 0xc7, 0xc4, 0xff, 0x1d,
    0xf2, 0xa8, 0xc6, 0xb6, 0xc1, 0x79, 0xe5, 0x2f,
    0x1d, 0x9b, 0x93, 0xa9, 0x9a, 0x26, 0xc5, 0x92,
    0xe5, 0x64, 0xaf, 0x8a, 0x96, 0x3a, 0x8b, 0x2b,
];

/// Enumerated capability held by an account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RoleTag {
    Admin,
    CaseSteward,
    Ngo,
    Donor,
    Lawyer,
}

impl RoleTag {
    /// Every role, in check order.
    pub const ALL: [RoleTag; 5] = [
        RoleTag::Admin,
        RoleTag::CaseSteward,
        RoleTag::Ngo,
        RoleTag::Donor,
        RoleTag::Lawyer,
    ];

    /// Fixed registry identifier for this role.
    pub fn role_id(self) -> RoleId {
        let bytes = match self {
            Self::Admin => ADMIN_ROLE,
            Self::CaseSteward => CASE_STEWARD_ROLE,
            Self::Ngo => NGO_ROLE,
            Self::Donor => DONOR_ROLE,
            Self::Lawyer => LAWYER_ROLE,
        };
        RoleId(H256(bytes))
    }

    /// Name of the role constant in the registry contract.
    pub fn contract_name(self) -> &'static str {
        match self {
            Self::Admin => "ADMIN_ROLE",
            Self::CaseSteward => "CASE_STEWARD_ROLE",
            Self::Ngo => "NGO_ROLE",
            Self::Donor => "DONOR_ROLE",
            Self::Lawyer => "LAWYER_ROLE",
        }
    }
}

impl fmt::Display for RoleTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.contract_name())
    }
}

/// Roles held by a session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleSet(BTreeSet<RoleTag>);

impl RoleSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, role: RoleTag) -> bool {
        self.0.insert(role)
    }

    pub fn contains(&self, role: RoleTag) -> bool {
        self.0.contains(&role)
    }

    /// True if at least one of `roles` is held.
    pub fn contains_any(&self, roles: &[RoleTag]) -> bool {
        roles.iter().any(|r| self.0.contains(r))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = RoleTag> + '_ {
        self.0.iter().copied()
    }
}

impl FromIterator<RoleTag> for RoleSet {
    fn from_iter<I: IntoIterator<Item = RoleTag>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl fmt::Display for RoleSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.iter().map(RoleTag::contract_name).collect();
        write!(f, "[{}]", names.join(", "))
    }
}
