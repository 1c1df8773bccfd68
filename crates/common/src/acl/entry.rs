use std::fmt;

use super::{Assignee, PermissionSet};

/// Prefix marking the inherited (default) variant of an ACL entry.
pub const DEFAULT_PREFIX: &str = "default:";

/// A batch of textual ACL entries for one item.
///
/// Every entry is written twice, once as-is and once with the
/// [`DEFAULT_PREFIX`], so concrete and inherited permissions move together.
/// The batch renders as the comma-joined list understood by the recursive
/// ACL primitives:
///
/// ```text
/// user:123:rw-,default:user:123:rw-
/// group:456,default:group:456
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AclEntries(Vec<String>);

impl AclEntries {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `<assignee>:<rwx>` and its default twin.
    pub fn grant(&mut self, assignee: &Assignee, permissions: PermissionSet) {
        self.push(format!("{}:{}", assignee, permissions));
    }

    /// Append the bare `<assignee>` entry and its default twin.
    pub fn revoke(&mut self, assignee: &Assignee) {
        self.push(assignee.to_string());
    }

    fn push(&mut self, entry: String) {
        let default_entry = format!("{}{}", DEFAULT_PREFIX, entry);
        self.0.push(entry);
        self.0.push(default_entry);
    }

    pub fn entries(&self) -> &[String] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

impl fmt::Display for AclEntries {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join(","))
    }
}
