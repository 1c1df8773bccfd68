//! Grant resolution
//!
//! Turns one declarative [`Grant`] into the concrete changes it implies:
//! flat [`ScopeBinding`]s to create and delete, and hierarchical ACL
//! changes keyed by assignee and item.
//!
//! Resolution runs two passes, one over `what` and one over `delete_what`.
//! Problems that only affect a single entry, permission or principal are
//! collected as [`SoftError`]s and the rest of the grant still resolves.
//! An unknown ACL permission name fails the whole grant.
//!
//! A principal missing from the directory keeps its place with an empty id.
//! The target refuses those bindings and ACL entries, so the failure is
//! reported against the grant when the changes are applied.

use crate::acl::{
    AclAssignment, AclAssignments, Assignee, PermissionChange, PermissionError, PermissionSet,
};
use crate::binding::{PrincipalType, ScopeBinding};
use crate::catalog::PermissionCatalog;
use crate::directory::LookupCache;
use crate::grant::{Grant, WhatItem, WhoItem};
use crate::resource::{ResourceError, ResourceKind, ResourceTarget};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolveError {
    #[error("grant {grant_id}: invalid permission name: {source}")]
    InvalidPermissionName {
        grant_id: String,
        #[source]
        source: PermissionError,
    },
}

/// A problem that skips part of a grant without failing it.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SoftError {
    #[error("could not resolve {kind} {name:?}")]
    UnresolvedPrincipal { kind: PrincipalType, name: String },
    #[error("{0}")]
    MalformedResourcePath(ResourceError),
    #[error("no role definition found for {permission:?} on {full_name:?}")]
    RoleIdResolutionFailed {
        permission: String,
        full_name: String,
    },
    #[error("{0}")]
    UnknownResourceType(ResourceError),
}

impl From<ResourceError> for SoftError {
    fn from(err: ResourceError) -> Self {
        match err {
            ResourceError::UnknownResourceType(_) => SoftError::UnknownResourceType(err),
            ResourceError::MalformedResourcePath { .. } => SoftError::MalformedResourcePath(err),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedGrant {
    pub grant_id: String,
    pub bindings_to_add: Vec<ScopeBinding>,
    pub bindings_to_remove: Vec<ScopeBinding>,
    pub acl_changes: AclAssignments,
    pub soft_errors: Vec<SoftError>,
}

/// Working state of one resolution.
#[derive(Debug, Default)]
struct Resolution {
    resolved: ResolvedGrant,
    /// Add-pass removals for `deleted_who`, queued behind the removal pass
    deferred_removals: Vec<ScopeBinding>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pass {
    Add,
    Remove,
}

/// Principal ids a grant refers to, resolved once.
#[derive(Debug, Default)]
struct Principals {
    current: Vec<(PrincipalType, String)>,
    deleted: Vec<(PrincipalType, String)>,
}

impl Principals {
    fn assignees(principals: &[(PrincipalType, String)]) -> Vec<Assignee> {
        principals
            .iter()
            .filter_map(|(kind, id)| match kind {
                PrincipalType::User => Some(Assignee::user(id)),
                PrincipalType::Group => Some(Assignee::group(id)),
                PrincipalType::ServicePrincipal => None,
            })
            .collect()
    }
}

pub struct GrantResolver<'a> {
    cache: &'a LookupCache,
    catalog: &'a PermissionCatalog,
}

impl<'a> GrantResolver<'a> {
    pub fn new(cache: &'a LookupCache, catalog: &'a PermissionCatalog) -> Self {
        Self { cache, catalog }
    }

    pub fn resolve(&self, grant: &Grant) -> Result<ResolvedGrant, ResolveError> {
        let mut state = Resolution::default();
        state.resolved.grant_id = grant.id.clone();

        let soft_errors = &mut state.resolved.soft_errors;
        let principals = Principals {
            current: self.principal_ids(&grant.who, soft_errors),
            deleted: match &grant.deleted_who {
                Some(who) => self.principal_ids(who, soft_errors),
                None => Vec::new(),
            },
        };

        for what in &grant.what {
            self.resolve_item(grant, what, Pass::Add, &principals, &mut state)?;
        }
        for what in &grant.delete_what {
            self.resolve_item(grant, what, Pass::Remove, &principals, &mut state)?;
        }

        let Resolution {
            mut resolved,
            deferred_removals,
        } = state;
        resolved.bindings_to_remove.extend(deferred_removals);
        if grant.is_full_delete {
            let added = std::mem::take(&mut resolved.bindings_to_add);
            resolved.bindings_to_remove.extend(added);
        }

        for soft in &resolved.soft_errors {
            tracing::warn!(grant = %grant.id, "{}", soft);
        }
        tracing::debug!(
            grant = %grant.id,
            add = resolved.bindings_to_add.len(),
            remove = resolved.bindings_to_remove.len(),
            acl = resolved.acl_changes.len(),
            "grant resolved"
        );

        Ok(resolved)
    }

    fn principal_ids(
        &self,
        who: &WhoItem,
        soft_errors: &mut Vec<SoftError>,
    ) -> Vec<(PrincipalType, String)> {
        let users = who.users.iter().map(|name| (PrincipalType::User, name));
        let groups = who.groups.iter().map(|name| (PrincipalType::Group, name));

        users
            .chain(groups)
            .map(|(kind, name)| match self.cache.principal_id(kind, name) {
                Some(id) => (kind, id.to_string()),
                None => {
                    soft_errors.push(SoftError::UnresolvedPrincipal {
                        kind,
                        name: name.clone(),
                    });
                    (kind, String::new())
                }
            })
            .collect()
    }

    fn resolve_item(
        &self,
        grant: &Grant,
        what: &WhatItem,
        pass: Pass,
        principals: &Principals,
        state: &mut Resolution,
    ) -> Result<(), ResolveError> {
        let located = what
            .resource_type
            .parse::<ResourceKind>()
            .and_then(|kind| Ok((kind, kind.locate(&what.full_name)?)));

        let (kind, target) = match located {
            Ok(located) => located,
            Err(err) => {
                state.resolved.soft_errors.push(err.into());
                return Ok(());
            }
        };

        match target {
            ResourceTarget::Scope(scope) => {
                self.resolve_bindings(kind, &scope, what, pass, principals, state);
                Ok(())
            }
            ResourceTarget::Item(item) => {
                let set = PermissionSet::encode(&what.permissions).map_err(|source| {
                    ResolveError::InvalidPermissionName {
                        grant_id: grant.id.clone(),
                        source,
                    }
                })?;
                if set.is_empty() {
                    tracing::debug!(grant = %grant.id, item = %item, "no ACL permissions listed");
                    return Ok(());
                }

                let grants_removal = pass == Pass::Remove || grant.is_full_delete;
                let change = if grants_removal {
                    PermissionChange::removing(set)
                } else {
                    PermissionChange::adding(set)
                };

                let mut changes = AclAssignments::new();
                for assignee in Principals::assignees(&principals.current) {
                    changes.insert(AclAssignment::new(assignee, item.clone()), change);
                }
                for assignee in Principals::assignees(&principals.deleted) {
                    changes.insert(
                        AclAssignment::new(assignee, item.clone()),
                        PermissionChange::removing(set),
                    );
                }
                state.resolved.acl_changes.add_assignments(&changes);
                Ok(())
            }
        }
    }

    fn resolve_bindings(
        &self,
        kind: ResourceKind,
        scope: &str,
        what: &WhatItem,
        pass: Pass,
        principals: &Principals,
        state: &mut Resolution,
    ) {
        for permission in &what.permissions {
            if !self.catalog.is_applicable(kind, permission) {
                tracing::debug!(
                    permission = %permission,
                    kind = %kind,
                    "permission not applicable, skipping"
                );
                continue;
            }

            let Some(role_id) = self.cache.role_id(permission) else {
                state.resolved.soft_errors.push(SoftError::RoleIdResolutionFailed {
                    permission: permission.clone(),
                    full_name: what.full_name.clone(),
                });
                continue;
            };

            let binding = |(principal_type, principal_id): &(PrincipalType, String)| ScopeBinding {
                scope: scope.to_string(),
                permission_name: permission.clone(),
                permission_id: role_id.to_string(),
                principal_type: *principal_type,
                principal_id: principal_id.clone(),
            };

            let current = principals.current.iter().map(&binding);
            let deleted = principals.deleted.iter().map(&binding);
            match pass {
                Pass::Add => {
                    state.resolved.bindings_to_add.extend(current);
                    state.deferred_removals.extend(deleted);
                }
                Pass::Remove => {
                    state.resolved.bindings_to_remove.extend(current);
                    state.resolved.bindings_to_remove.extend(deleted);
                }
            }
        }
    }
}
