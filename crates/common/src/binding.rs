//! Flat role bindings
//!
//! A [`ScopeBinding`] attaches a named role to a principal at a resource
//! scope. Bindings carry no inheritance semantics of their own; they are
//! compared by value and collected in sets.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Kind of principal a binding or ACL entry refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrincipalType {
    User,
    Group,
    /// Application identities. Present on targets, never produced by grants.
    ServicePrincipal,
}

impl fmt::Display for PrincipalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PrincipalType::User => write!(f, "User"),
            PrincipalType::Group => write!(f, "Group"),
            PrincipalType::ServicePrincipal => write!(f, "ServicePrincipal"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ScopeBinding {
    /// Resource scope, e.g. `/subscriptions/<id>/resourcegroups/<rg>`
    pub scope: String,
    /// Role name as written in the grant
    pub permission_name: String,
    /// Role definition id the name resolved to
    pub permission_id: String,
    pub principal_type: PrincipalType,
    pub principal_id: String,
}

impl ScopeBinding {
    /// Two bindings denote the same assignment on the target when principal,
    ///  scope and role definition agree; the role name is informational.
    pub fn same_assignment(&self, other: &ScopeBinding) -> bool {
        self.principal_id == other.principal_id
            && self.scope == other.scope
            && self.permission_id == other.permission_id
    }
}

impl fmt::Display for ScopeBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} -> {} @ {}",
            self.principal_type, self.principal_id, self.permission_name, self.scope
        )
    }
}
