//! Import of existing bindings as grants
//!
//! Bindings found on the target that this system did not create are
//! grouped into one grant per resource and role, named after both:
//!
//! ```text
//! subscription-Storage-Blob-Data-Reader
//! container-raw-Reader
//! ```

use std::collections::BTreeMap;

use crate::binding::{PrincipalType, ScopeBinding};
use crate::directory::LookupCache;
use crate::grant::{Grant, WhatItem};
use crate::resource::ResourceKind;

/// Turn the unmanaged bindings of `existing` into grants.
///
/// A binding is managed when `managed` holds one for the same principal,
/// scope and role. Service principals and scopes outside the storage
/// hierarchy are ignored.
pub fn import_grants(
    existing: &[ScopeBinding],
    managed: &[ScopeBinding],
    subscription_id: &str,
    cache: &LookupCache,
) -> Vec<Grant> {
    let mut grants: BTreeMap<String, Grant> = BTreeMap::new();

    for binding in existing {
        if binding.principal_type == PrincipalType::ServicePrincipal {
            continue;
        }
        if managed.iter().any(|m| m.same_assignment(binding)) {
            tracing::debug!(binding = %binding, "skipping managed binding");
            continue;
        }

        let (kind, full_name) = match ResourceKind::from_scope(&binding.scope) {
            Some((ResourceKind::Datasource, _)) | None => {
                tracing::debug!(scope = %binding.scope, "skipping binding outside storage scopes");
                continue;
            }
            Some((ResourceKind::Subscription, _)) => {
                (ResourceKind::Subscription, subscription_id.to_string())
            }
            Some(found) => found,
        };

        let role = cache
            .role_name(&binding.permission_id)
            .unwrap_or(binding.permission_name.as_str());

        let Some(principal) = cache.principal_name(binding.principal_type, &binding.principal_id) else {
            tracing::warn!(
                principal = %binding.principal_id,
                kind = %binding.principal_type,
                "no name for principal, skipping binding"
            );
            continue;
        };

        let name = grant_name(kind, &full_name, role);
        let grant = grants.entry(name.clone()).or_insert_with(|| {
            let mut grant = Grant::new(name.clone());
            grant.name = name;
            grant.what = vec![WhatItem::new(kind.as_str(), full_name.clone(), [role])];
            grant
        });

        let names = match binding.principal_type {
            PrincipalType::Group => &mut grant.who.groups,
            _ => &mut grant.who.users,
        };
        if !names.iter().any(|n| n == principal) {
            names.push(principal.to_string());
        }
    }

    tracing::info!(grants = grants.len(), "imported existing bindings");
    grants.into_values().collect()
}

fn grant_name(kind: ResourceKind, full_name: &str, role: &str) -> String {
    let name = match kind {
        ResourceKind::Subscription => format!("{}-{}", kind, role),
        _ => {
            let leaf = full_name.rsplit('/').next().unwrap_or(full_name);
            format!("{}-{}-{}", kind, leaf, role)
        }
    };

    name.replace(' ', "-")
}
