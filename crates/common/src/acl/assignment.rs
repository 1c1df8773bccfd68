use std::collections::hash_map::{self, HashMap};
use std::fmt;

use serde::{Deserialize, Serialize};

use super::{AttributedPermissionChange, PermissionChange};

/// A node in the hierarchical namespace: a path inside a container of a
/// storage account.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AssignedItem {
    pub account: String,
    pub container: String,
    /// Container-relative path, `/`-separated, without a leading slash.
    pub path: String,
}

impl AssignedItem {
    pub fn new(
        account: impl Into<String>,
        container: impl Into<String>,
        path: impl Into<String>,
    ) -> Self {
        Self {
            account: account.into(),
            container: container.into(),
            path: path.into(),
        }
    }

    /// Number of path separators in [`path`](Self::path).
    pub fn depth(&self) -> usize {
        self.path.matches('/').count()
    }

    /// Whether `other` lives at or below this item.
    pub fn contains(&self, other: &AssignedItem) -> bool {
        if self.account != other.account || self.container != other.container {
            return false;
        }

        self.path.is_empty()
            || other.path == self.path
            || other
                .path
                .strip_prefix(&self.path)
                .is_some_and(|rest| rest.starts_with('/'))
    }
}

impl fmt::Display for AssignedItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.account, self.container, self.path)
    }
}

/// Principal reference as it appears in an ACL entry, e.g. `user:<id>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Assignee(String);

impl Assignee {
    pub fn user(id: &str) -> Self {
        Self(format!("user:{}", id))
    }

    pub fn group(id: &str) -> Self {
        Self(format!("group:{}", id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Assignee {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for Assignee {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AclAssignment {
    pub assignee: Assignee,
    pub item: AssignedItem,
}

impl AclAssignment {
    pub fn new(assignee: Assignee, item: AssignedItem) -> Self {
        Self { assignee, item }
    }
}

/// Pending ACL changes of a single grant, one entry per assignee and item.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AclAssignments(HashMap<AclAssignment, PermissionChange>);

impl AclAssignments {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `change`, combining with any change already held for the
    ///  same assignment.
    pub fn insert(&mut self, assignment: AclAssignment, change: PermissionChange) {
        self.0
            .entry(assignment)
            .and_modify(|existing| existing.combine(&change))
            .or_insert(change);
    }

    pub fn add_assignments(&mut self, other: &AclAssignments) {
        for (assignment, change) in other.iter() {
            self.insert(assignment.clone(), *change);
        }
    }

    pub fn get(&self, assignment: &AclAssignment) -> Option<&PermissionChange> {
        self.0.get(assignment)
    }

    pub fn iter(&self) -> hash_map::Iter<'_, AclAssignment, PermissionChange> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// ACL changes merged across grants, each remembering its grants.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttributedAclAssignments(HashMap<AclAssignment, AttributedPermissionChange>);

impl AttributedAclAssignments {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge the changes of grant `grant_id` into this set.
    pub fn add_assignments(&mut self, assignments: &AclAssignments, grant_id: &str) {
        for (assignment, change) in assignments.iter() {
            match self.0.entry(assignment.clone()) {
                hash_map::Entry::Occupied(mut existing) => {
                    existing.get_mut().combine(change, grant_id)
                }
                hash_map::Entry::Vacant(slot) => {
                    slot.insert(AttributedPermissionChange::new(*change, grant_id));
                }
            }
        }
    }

    pub fn get(&self, assignment: &AclAssignment) -> Option<&AttributedPermissionChange> {
        self.0.get(assignment)
    }

    pub fn iter(&self) -> hash_map::Iter<'_, AclAssignment, AttributedPermissionChange> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<'a> IntoIterator for &'a AttributedAclAssignments {
    type Item = (&'a AclAssignment, &'a AttributedPermissionChange);
    type IntoIter = hash_map::Iter<'a, AclAssignment, AttributedPermissionChange>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
