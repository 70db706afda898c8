//! The mapping from role names to capabilities.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::Error;

/// The role with full access.
pub const ADMIN_ROLE: &str = "admin";
/// The role with read-only access.
pub const VIEWER_ROLE: &str = "viewer";

/// The actions a role is allowed to perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capabilities {
    /// May add, update and delete transactions.
    pub can_edit: bool,
    /// May read transactions and budget summaries.
    pub can_view: bool,
}

/// A fixed table of roles and their capabilities.
///
/// The policy is built once at start-up and shared read-only between requests.
#[derive(Debug, Clone, PartialEq)]
pub struct RolePolicy {
    roles: HashMap<String, Capabilities>,
}

impl RolePolicy {
    /// Create a policy from `(role, capabilities)` pairs.
    pub fn new<I, S>(roles: I) -> Self
    where
        I: IntoIterator<Item = (S, Capabilities)>,
        S: Into<String>,
    {
        Self {
            roles: roles
                .into_iter()
                .map(|(role, capabilities)| (role.into(), capabilities))
                .collect(),
        }
    }

    /// The default policy: "admin" may view and edit, "viewer" may only view.
    pub fn standard() -> Self {
        Self::new([
            (
                ADMIN_ROLE,
                Capabilities {
                    can_edit: true,
                    can_view: true,
                },
            ),
            (
                VIEWER_ROLE,
                Capabilities {
                    can_edit: false,
                    can_view: true,
                },
            ),
        ])
    }

    /// Look up the capabilities of `role`.
    ///
    /// # Errors
    /// Returns [Error::InvalidRole] if `role` is not in the policy.
    pub fn resolve_role(&self, role: &str) -> Result<Capabilities, Error> {
        self.roles
            .get(role)
            .copied()
            .ok_or_else(|| Error::InvalidRole(role.to_owned()))
    }
}

impl Default for RolePolicy {
    fn default() -> Self {
        Self::standard()
    }
}
