//! Off-chain identity documents pinned before on-chain registration.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::roles::RoleTag;

/// Which identity document a pin request carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdentityKind {
    Lawyer,
    Ngo,
    Donor,
}

impl IdentityKind {
    /// Precedence used when a request carries more than one field.
    pub const PRECEDENCE: [IdentityKind; 3] =
        [IdentityKind::Lawyer, IdentityKind::Ngo, IdentityKind::Donor];

    /// Request/payload field holding the identifier.
    pub fn field(self) -> &'static str {
        match self {
            Self::Lawyer => "lsk",
            Self::Ngo => "ngoId",
            Self::Donor => "donorId",
        }
    }

    /// `type` tag of the pinned document.
    pub fn type_tag(self) -> &'static str {
        match self {
            Self::Lawyer => "lawyer",
            Self::Ngo => "ngo",
            Self::Donor => "donor",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Self::Lawyer => "Lawyer LSK",
            Self::Ngo => "NGO Identity",
            Self::Donor => "Donor Identity",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Self::Lawyer => "LSK number for lawyer (Haki)",
            Self::Ngo => "NGO ID for Haki platform",
            Self::Donor => "Donor ID for Haki platform",
        }
    }

    /// Role whose registration this identity backs.
    pub fn role(self) -> RoleTag {
        match self {
            Self::Lawyer => RoleTag::Lawyer,
            Self::Ngo => RoleTag::Ngo,
            Self::Donor => RoleTag::Donor,
        }
    }
}

impl fmt::Display for IdentityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_tag())
    }
}

/// An identifier to pin, e.g. a lawyer's LSK number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityClaim {
    pub kind: IdentityKind,
    pub value: String,
}

impl IdentityClaim {
    pub fn new(kind: IdentityKind, value: impl Into<String>) -> Self {
        Self {
            kind,
            value: value.into(),
        }
    }

    /// Body of a pin request: `{"<field>": "<value>"}`.
    pub fn request_body(&self) -> serde_json::Value {
        let mut body = serde_json::Map::new();
        body.insert(
            self.kind.field().to_string(),
            serde_json::Value::String(self.value.clone()),
        );
        serde_json::Value::Object(body)
    }
}
