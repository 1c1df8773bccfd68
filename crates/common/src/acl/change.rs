use serde::{Deserialize, Serialize};

use super::PermissionSet;

/// Permissions to add and to remove for a single assignee on a single item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PermissionChange {
    pub added: PermissionSet,
    pub removed: PermissionSet,
}

impl Default for PermissionChange {
    fn default() -> Self {
        Self::new()
    }
}

impl PermissionChange {
    pub fn new() -> Self {
        Self {
            added: PermissionSet::empty(),
            removed: PermissionSet::empty(),
        }
    }

    pub fn adding(set: PermissionSet) -> Self {
        Self {
            added: set,
            ..Self::new()
        }
    }

    pub fn removing(set: PermissionSet) -> Self {
        Self {
            removed: set,
            ..Self::new()
        }
    }

    /// Union `other` into this change, added and removed bits independently.
    pub fn combine(&mut self, other: &PermissionChange) {
        self.added |= other.added;
        self.removed |= other.removed;
    }

    /// Net effect of this change.
    ///
    /// Returns `(removed, true)` only when nothing is added. As soon as any
    /// bit is added the result is `(added, false)` and removed bits are
    /// dropped, even bits that appear in both sets.
    // NOTE: all-or-nothing tie-break kept for compatibility with existing
    //  deployments; a per-bit resolution would be the stricter choice.
    pub fn resolve(&self) -> (PermissionSet, bool) {
        if !self.removed.is_empty() && self.added.is_empty() {
            return (self.removed, true);
        }

        (self.added, false)
    }
}

/// A [`PermissionChange`] that remembers which grants asked for it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributedPermissionChange {
    pub change: PermissionChange,
    /// Contributing grant ids in arrival order. Duplicates are kept; the
    ///  list is only used to route errors back.
    pub grant_ids: Vec<String>,
}

impl AttributedPermissionChange {
    pub fn new(change: PermissionChange, grant_id: impl Into<String>) -> Self {
        Self {
            change,
            grant_ids: vec![grant_id.into()],
        }
    }

    pub fn combine(&mut self, other: &PermissionChange, grant_id: impl Into<String>) {
        self.change.combine(other);
        self.grant_ids.push(grant_id.into());
    }

    pub fn resolve(&self) -> (PermissionSet, bool) {
        self.change.resolve()
    }
}
