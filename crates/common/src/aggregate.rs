//! Cross-grant aggregation
//!
//! Folds many [`ResolvedGrant`]s into one delta. Every binding and ACL
//! change remembers which grants asked for it so failures can be routed
//! back. A binding both added and removed is only added.

use std::collections::{BTreeSet, HashMap};

use crate::acl::AttributedAclAssignments;
use crate::binding::ScopeBinding;
use crate::resolver::ResolvedGrant;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AggregatedChanges {
    pub bindings_to_add: BTreeSet<ScopeBinding>,
    pub bindings_to_remove: BTreeSet<ScopeBinding>,
    /// Grants that requested each binding, whether as add or remove
    pub binding_grants: HashMap<ScopeBinding, Vec<String>>,
    pub acl_changes: AttributedAclAssignments,
}

impl AggregatedChanges {
    pub fn grants_for(&self, binding: &ScopeBinding) -> &[String] {
        self.binding_grants
            .get(binding)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings_to_add.is_empty()
            && self.bindings_to_remove.is_empty()
            && self.acl_changes.is_empty()
    }
}

#[derive(Debug, Default)]
pub struct Aggregator {
    changes: AggregatedChanges,
}

impl Aggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, resolved: &ResolvedGrant) {
        let grant_id = &resolved.grant_id;

        for binding in &resolved.bindings_to_add {
            self.changes.bindings_to_add.insert(binding.clone());
            self.attribute(binding, grant_id);
        }
        for binding in &resolved.bindings_to_remove {
            self.changes.bindings_to_remove.insert(binding.clone());
            self.attribute(binding, grant_id);
        }

        self.changes
            .acl_changes
            .add_assignments(&resolved.acl_changes, grant_id);
    }

    fn attribute(&mut self, binding: &ScopeBinding, grant_id: &str) {
        let grants = self.changes.binding_grants.entry(binding.clone()).or_default();
        if !grants.iter().any(|id| id == grant_id) {
            grants.push(grant_id.to_string());
        }
    }

    /// Close the aggregation. Bindings present in both sets stay only in
    /// the add-set.
    pub fn finish(mut self) -> AggregatedChanges {
        let adds = &self.changes.bindings_to_add;
        self.changes
            .bindings_to_remove
            .retain(|binding| !adds.contains(binding));

        tracing::info!(
            add = self.changes.bindings_to_add.len(),
            remove = self.changes.bindings_to_remove.len(),
            acl = self.changes.acl_changes.len(),
            "aggregated grant changes"
        );

        self.changes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::acl::{AclAssignment, AclAssignments, AssignedItem, Assignee, PermissionChange, PermissionSet};
    use crate::binding::PrincipalType;

    fn binding(role: &str) -> ScopeBinding {
        ScopeBinding {
            scope: "/subscriptions/sub".to_string(),
            permission_name: role.to_string(),
            permission_id: format!("id-{}", role),
            principal_type: PrincipalType::User,
            principal_id: "u-1".to_string(),
        }
    }

    fn resolved(id: &str, add: &[&str], remove: &[&str]) -> ResolvedGrant {
        ResolvedGrant {
            grant_id: id.to_string(),
            bindings_to_add: add.iter().map(|r| binding(r)).collect(),
            bindings_to_remove: remove.iter().map(|r| binding(r)).collect(),
            ..ResolvedGrant::default()
        }
    }

    fn aggregate(grants: &[ResolvedGrant]) -> AggregatedChanges {
        let mut aggregator = Aggregator::new();
        for grant in grants {
            aggregator.add(grant);
        }
        aggregator.finish()
    }

    #[test]
    fn test_add_wins_regardless_of_order() {
        let keep = resolved("ap-keep", &["Reader"], &[]);
        let drop = resolved("ap-drop", &[], &["Reader", "Owner"]);

        for order in [vec![keep.clone(), drop.clone()], vec![drop, keep]] {
            let changes = aggregate(&order);
            assert!(changes.bindings_to_add.contains(&binding("Reader")));
            assert!(!changes.bindings_to_remove.contains(&binding("Reader")));
            assert!(changes.bindings_to_remove.contains(&binding("Owner")));
        }
    }

    #[test]
    fn test_attribution_covers_add_and_remove() {
        let changes = aggregate(&[
            resolved("ap-1", &["Reader"], &[]),
            resolved("ap-2", &[], &["Reader"]),
            resolved("ap-1", &["Reader"], &[]),
        ]);

        assert_eq!(changes.grants_for(&binding("Reader")), &["ap-1", "ap-2"]);
        assert!(changes.grants_for(&binding("Owner")).is_empty());
    }

    #[test]
    fn test_acl_changes_merge_with_attribution() {
        let assignment = AclAssignment::new(Assignee::user("u-1"), AssignedItem::new("a", "c", "p"));
        let mut first = resolved("ap-1", &[], &[]);
        first.acl_changes.insert(
            assignment.clone(),
            PermissionChange::adding(PermissionSet::READ),
        );
        let mut second = resolved("ap-2", &[], &[]);
        let mut acl = AclAssignments::new();
        acl.insert(assignment.clone(), PermissionChange::removing(PermissionSet::READ));
        second.acl_changes = acl;

        let changes = aggregate(&[first, second]);
        let merged = changes.acl_changes.get(&assignment).unwrap();

        assert_eq!(merged.grant_ids, vec!["ap-1", "ap-2"]);
        assert_eq!(merged.resolve(), (PermissionSet::READ, false));
    }

    #[test]
    fn test_empty_aggregation() {
        assert!(Aggregator::new().finish().is_empty());
    }
}
