//! Hierarchical ACL reconciliation
//!
//! ACL changes are grouped per item and applied shallowest first, so an
//! item's recursive call never overwrites what a deeper item asked for.
//! For every item:
//!
//! 1. each assignee's change is resolved to a removal or an addition
//! 2. an apply handle is opened on the target
//! 3. removals go out through `remove_recursive`
//! 4. additions go out through `update_recursive`
//!
//! A failing item is reported against every grant that touched it and the
//! next item is processed as usual. Nothing is rolled back.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::acl::{AclEntries, AssignedItem, Assignee, AttributedAclAssignments, AttributedPermissionChange};
use crate::feedback::FeedbackSink;
use crate::target::{AclHandle, AclTarget, RecursiveOutcome, TargetError};

pub const DEFAULT_BATCH_SIZE: usize = 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcilerConfig {
    /// Directories per batch handed to `update_recursive`
    pub batch_size: usize,
    /// Upper bound on every target call
    pub timeout: Option<Duration>,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            timeout: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Open,
    Remove,
    Update,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Open => write!(f, "open"),
            Stage::Remove => write!(f, "recursive remove"),
            Stage::Update => write!(f, "recursive update"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ApplyError {
    #[error("{stage} failed: {source}")]
    PrimitiveFailed {
        stage: Stage,
        #[source]
        source: TargetError,
    },
    #[error("{stage} failed for {failures} entries (first: {first})")]
    PartialRecursiveFailure {
        stage: Stage,
        failures: usize,
        first: String,
    },
    #[error("{stage} timed out after {after:?}")]
    Timeout { stage: Stage, after: Duration },
}

/// Entry batches for one item, ready to send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemPlan {
    pub item: AssignedItem,
    pub remove: AclEntries,
    pub add: AclEntries,
    /// Every grant with a change on this item
    pub grant_ids: BTreeSet<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemStatus {
    Applied {
        removed: Option<RecursiveOutcome>,
        added: Option<RecursiveOutcome>,
    },
    Failed(ApplyError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemReport {
    pub item: AssignedItem,
    pub status: ItemStatus,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// One report per item, in application order
    pub items: Vec<ItemReport>,
}

impl ReconcileReport {
    pub fn failed(&self) -> impl Iterator<Item = &ItemReport> {
        self.items
            .iter()
            .filter(|report| matches!(report.status, ItemStatus::Failed(_)))
    }

    pub fn failed_count(&self) -> usize {
        self.failed().count()
    }

    pub fn applied_count(&self) -> usize {
        self.items.len() - self.failed_count()
    }
}

/// Group ACL changes by item, resolve each assignee's net change and order
/// the items by depth, then path.
pub fn plan_items(changes: &AttributedAclAssignments) -> Vec<ItemPlan> {
    let mut by_item: BTreeMap<&AssignedItem, BTreeMap<&Assignee, &AttributedPermissionChange>> =
        BTreeMap::new();
    for (assignment, change) in changes {
        by_item
            .entry(&assignment.item)
            .or_default()
            .insert(&assignment.assignee, change);
    }

    let mut plans: Vec<ItemPlan> = by_item
        .into_iter()
        .map(|(item, assignees)| {
            let mut plan = ItemPlan {
                item: item.clone(),
                remove: AclEntries::new(),
                add: AclEntries::new(),
                grant_ids: BTreeSet::new(),
            };

            for (assignee, change) in assignees {
                let (set, is_removal) = change.resolve();
                if is_removal {
                    plan.remove.revoke(assignee);
                } else if !set.is_empty() {
                    plan.add.grant(assignee, set);
                }
                plan.grant_ids.extend(change.grant_ids.iter().cloned());
            }

            plan
        })
        .collect();

    plans.sort_by(|a, b| {
        (a.item.depth(), &a.item.path, &a.item.account, &a.item.container).cmp(&(
            b.item.depth(),
            &b.item.path,
            &b.item.account,
            &b.item.container,
        ))
    });

    plans
}

pub struct AclReconciler<'a, T> {
    target: &'a T,
    config: ReconcilerConfig,
}

impl<'a, T: AclTarget> AclReconciler<'a, T> {
    pub fn new(target: &'a T, config: ReconcilerConfig) -> Self {
        Self { target, config }
    }

    pub async fn reconcile(
        &self,
        changes: &AttributedAclAssignments,
        sink: &FeedbackSink,
    ) -> ReconcileReport {
        let mut report = ReconcileReport::default();

        for plan in plan_items(changes) {
            tracing::info!(
                item = %plan.item,
                remove = %plan.remove,
                add = %plan.add,
                "applying ACL changes"
            );

            let status = match self.apply(&plan).await {
                Ok((removed, added)) => ItemStatus::Applied { removed, added },
                Err(err) => {
                    tracing::error!(item = %plan.item, "{}", err);
                    sink.error(
                        &format!("failed to apply ACLs on {}: {}", plan.item, err),
                        &plan.grant_ids,
                    );
                    ItemStatus::Failed(err)
                }
            };

            report.items.push(ItemReport {
                item: plan.item,
                status,
            });
        }

        tracing::info!(
            applied = report.applied_count(),
            failed = report.failed_count(),
            "ACL reconciliation finished"
        );

        report
    }

    async fn apply(
        &self,
        plan: &ItemPlan,
    ) -> Result<(Option<RecursiveOutcome>, Option<RecursiveOutcome>), ApplyError> {
        let handle = self.bounded(Stage::Open, self.target.open(&plan.item)).await?;

        let removed = if plan.remove.is_empty() {
            None
        } else {
            let entries = plan.remove.to_string();
            let outcome = self
                .bounded(Stage::Remove, handle.remove_recursive(&entries))
                .await?;
            Some(Self::check(Stage::Remove, &plan.item, outcome)?)
        };

        let added = if plan.add.is_empty() {
            None
        } else {
            let entries = plan.add.to_string();
            let outcome = self
                .bounded(
                    Stage::Update,
                    handle.update_recursive(&entries, self.config.batch_size),
                )
                .await?;
            Some(Self::check(Stage::Update, &plan.item, outcome)?)
        };

        Ok((removed, added))
    }

    fn check(
        stage: Stage,
        item: &AssignedItem,
        outcome: RecursiveOutcome,
    ) -> Result<RecursiveOutcome, ApplyError> {
        if let Some(first) = outcome.failures.first() {
            return Err(ApplyError::PartialRecursiveFailure {
                stage,
                failures: outcome.failure_count(),
                first: first.name.clone(),
            });
        }

        tracing::debug!(
            item = %item,
            stage = %stage,
            directories = outcome.directories_ok,
            files = outcome.files_ok,
            "recursive ACL call succeeded"
        );
        Ok(outcome)
    }

    async fn bounded<F, R>(&self, stage: Stage, call: F) -> Result<R, ApplyError>
    where
        F: Future<Output = Result<R, TargetError>>,
    {
        let result = match self.config.timeout {
            Some(after) => tokio::time::timeout(after, call)
                .await
                .map_err(|_| ApplyError::Timeout { stage, after })?,
            None => call.await,
        };

        result.map_err(|source| ApplyError::PrimitiveFailed { stage, source })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::acl::{AclAssignment, AclAssignments, PermissionChange, PermissionSet};

    fn item(path: &str) -> AssignedItem {
        AssignedItem::new("acct", "cont", path)
    }

    fn changes(entries: &[(&str, &str, PermissionChange, &str)]) -> AttributedAclAssignments {
        let mut merged = AttributedAclAssignments::new();
        for (assignee, path, change, grant) in entries {
            let mut one = AclAssignments::new();
            one.insert(AclAssignment::new(Assignee::from(*assignee), item(path)), *change);
            merged.add_assignments(&one, grant);
        }
        merged
    }

    #[test]
    fn test_items_ordered_by_depth_then_path() {
        let read = PermissionChange::adding(PermissionSet::READ);
        let plans = plan_items(&changes(&[
            ("user:1", "a/b", read, "ap-1"),
            ("user:1", "c", read, "ap-1"),
            ("user:1", "a", read, "ap-1"),
        ]));

        let paths: Vec<_> = plans.iter().map(|p| p.item.path.as_str()).collect();
        assert_eq!(paths, vec!["a", "c", "a/b"]);
    }

    #[test]
    fn test_plan_splits_removals_and_additions() {
        let plans = plan_items(&changes(&[
            ("user:123", "a", PermissionChange::adding(PermissionSet::READ | PermissionSet::WRITE), "ap-1"),
            ("group:456", "a", PermissionChange::removing(PermissionSet::all()), "ap-2"),
        ]));

        assert_eq!(plans.len(), 1);
        let plan = &plans[0];
        assert_eq!(plan.add.to_string(), "user:123:rw-,default:user:123:rw-");
        assert_eq!(plan.remove.to_string(), "group:456,default:group:456");
        assert_eq!(
            plan.grant_ids.iter().map(String::as_str).collect::<Vec<_>>(),
            vec!["ap-1", "ap-2"]
        );
    }

    #[test]
    fn test_mixed_change_resolves_to_addition() {
        let plans = plan_items(&changes(&[
            ("user:1", "a", PermissionChange::adding(PermissionSet::READ), "ap-1"),
            ("user:1", "a", PermissionChange::removing(PermissionSet::WRITE), "ap-2"),
        ]));

        assert_eq!(plans[0].add.to_string(), "user:1:r--,default:user:1:r--");
        assert!(plans[0].remove.is_empty());
        assert_eq!(plans[0].grant_ids.len(), 2);
    }
}
