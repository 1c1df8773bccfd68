//! Hierarchical ACL data types
//!
//! - **[`PermissionSet`]**: `rwx` bitmask with canonical three-character rendering
//! - **[`PermissionChange`]**: bits to add and bits to remove, with the
//!   all-or-nothing [`resolve`](PermissionChange::resolve) rule
//! - **[`AclAssignments`]**: per-grant changes keyed by assignee and item
//! - **[`AttributedAclAssignments`]**: the same, merged across grants with
//!   the contributing grant ids kept for error attribution
//! - **[`AclEntries`]**: textual entry batches handed to the ACL primitives

mod assignment;
mod change;
mod entry;
mod permission;

pub use assignment::{AclAssignment, AclAssignments, AssignedItem, Assignee, AttributedAclAssignments};
pub use change::{AttributedPermissionChange, PermissionChange};
pub use entry::{AclEntries, DEFAULT_PREFIX};
pub use permission::{AclPermission, PermissionError, PermissionSet};
