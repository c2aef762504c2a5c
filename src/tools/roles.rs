//! Static role-to-permission table.

use serde::Serialize;
use tracing::{debug, info};

/// Approval rules attached to an organizational role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RolePermission {
    /// Request categories the role may submit.
    pub can_request: &'static [&'static str],
    /// Request categories the role may approve.
    pub can_approve: &'static [&'static str],
    /// Largest amount the role may approve.
    pub approval_limit: u32,
    /// Roles whose approval this role's requests need.
    pub requires_approval_from: &'static [&'static str],
}

/// Known roles, in reporting order.
pub const ROLE_TABLE: &[(&str, RolePermission)] = &[
    (
        "employee",
        RolePermission {
            can_request: &["hardware", "software", "leave", "training"],
            can_approve: &[],
            approval_limit: 0,
            requires_approval_from: &["manager"],
        },
    ),
    (
        "manager",
        RolePermission {
            can_request: &["hardware", "software", "leave", "training", "budget"],
            can_approve: &["hardware", "software", "leave", "training"],
            approval_limit: 5000,
            requires_approval_from: &["director"],
        },
    ),
    (
        "director",
        RolePermission {
            can_request: &[
                "hardware", "software", "leave", "training", "budget", "hiring",
            ],
            can_approve: &["hardware", "software", "leave", "training", "budget"],
            approval_limit: 25000,
            requires_approval_from: &["ceo"],
        },
    ),
    (
        "hr",
        RolePermission {
            can_request: &["hardware", "software", "leave", "training"],
            can_approve: &["leave", "training", "onboarding"],
            approval_limit: 10000,
            requires_approval_from: &["director"],
        },
    ),
    (
        "ceo",
        RolePermission {
            can_request: &["all"],
            can_approve: &["all"],
            approval_limit: 100_000,
            requires_approval_from: &[],
        },
    ),
];

/// Outcome of a role lookup. Unknown roles are a normal outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum RoleLookup {
    /// The role is in the table.
    Found {
        /// Role as supplied by the caller.
        role: String,
        /// Always `true`.
        found: bool,
        /// The role's rules.
        rules: RolePermission,
    },
    /// The role is unknown.
    NotFound {
        /// Role as supplied by the caller.
        role: String,
        /// Always `false`.
        found: bool,
        /// Human-readable reason.
        error: String,
        /// Known role names in table order.
        available_roles: Vec<String>,
    },
}

impl RoleLookup {
    /// Returns whether the role was known.
    #[must_use]
    pub const fn is_found(&self) -> bool {
        matches!(self, Self::Found { .. })
    }
}

/// Returns the names of all known roles in table order.
#[must_use]
pub fn role_names() -> Vec<String> {
    ROLE_TABLE.iter().map(|(name, _)| (*name).to_string()).collect()
}

/// Looks up a role case-insensitively.
#[must_use]
pub fn role_lookup(role: &str) -> RoleLookup {
    let key = role.to_lowercase();
    match ROLE_TABLE.iter().find(|(name, _)| *name == key) {
        Some((_, rules)) => {
            info!(role, "retrieved role rules");
            RoleLookup::Found {
                role: role.to_string(),
                found: true,
                rules: *rules,
            }
        }
        None => {
            debug!(role, "role not in permission table");
            RoleLookup::NotFound {
                role: role.to_string(),
                found: false,
                error: format!("Role '{role}' not found in system"),
                available_roles: role_names(),
            }
        }
    }
}
