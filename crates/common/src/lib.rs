/**
 * Permission algebra and the hierarchical ACL
 *  data types: permission sets, signed changes,
 *  assignments and textual entry batches.
 */
pub mod acl;
/**
 * Merging resolved grants into one delta,
 *  with attribution back to the grants.
 */
pub mod aggregate;
pub mod apply;
pub mod binding;
/**
 * Which permission names are applicable
 *  to which resource kinds.
 */
pub mod catalog;
/**
 * Principal and role-definition lookups,
 *  cached once per run.
 */
pub mod directory;
pub mod feedback;
pub mod grant;
pub mod import;
/**
 * Ordered, failure-tolerant application of
 *  hierarchical ACL changes.
 */
pub mod reconcile;
pub mod resolver;
pub mod resource;
pub mod sync;
/**
 * Primitives consumed from the target
 *  environment, plus an in-memory implementation.
 */
pub mod target;

pub mod prelude {
    pub use crate::acl::{
        AclEntries, AssignedItem, Assignee, AttributedAclAssignments, PermissionChange,
        PermissionSet,
    };
    pub use crate::aggregate::{AggregatedChanges, Aggregator};
    pub use crate::apply::{BindingApplier, BindingReport};
    pub use crate::binding::{PrincipalType, ScopeBinding};
    pub use crate::catalog::PermissionCatalog;
    pub use crate::directory::{DirectoryProvider, LookupCache, MemoryDirectory};
    pub use crate::feedback::{CollectingHandler, FeedbackHandler, FeedbackSink, GrantFeedback};
    pub use crate::grant::{Grant, WhatItem, WhoItem};
    pub use crate::import::import_grants;
    pub use crate::reconcile::{plan_items, AclReconciler, ItemPlan, ReconcileReport, ReconcilerConfig};
    pub use crate::resolver::{GrantResolver, ResolveError, ResolvedGrant, SoftError};
    pub use crate::resource::ResourceKind;
    pub use crate::sync::{resolve_all, AccessSync, SyncError, SyncReport};
    pub use crate::target::{AclTarget, BindingTarget, MemoryState, MemoryTarget};
}
