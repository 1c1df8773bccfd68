use std::collections::HashMap;

use super::provider::DirectoryProvider;
use crate::binding::PrincipalType;

#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("failed to load principals: {0}")]
    Principals(#[source] Box<dyn std::error::Error + Send + Sync>),
    #[error("failed to load role definitions: {0}")]
    RoleDefinitions(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Per-run lookup tables for principals and role definitions.
///
/// Principal names match exactly; role names match case-insensitively.
#[derive(Debug, Clone, Default)]
pub struct LookupCache {
    ids_by_name: HashMap<(PrincipalType, String), String>,
    names_by_id: HashMap<(PrincipalType, String), String>,
    role_ids: HashMap<String, String>,
    role_names: HashMap<String, String>,
}

impl LookupCache {
    /// Query `provider` once and index everything it returns.
    pub async fn load<P: DirectoryProvider>(provider: &P) -> Result<Self, CacheError> {
        let principals = provider
            .principals()
            .await
            .map_err(|e| CacheError::Principals(Box::new(e)))?;
        let roles = provider
            .role_definitions()
            .await
            .map_err(|e| CacheError::RoleDefinitions(Box::new(e)))?;

        let mut cache = Self::default();
        for principal in principals {
            cache
                .ids_by_name
                .insert((principal.kind, principal.name.clone()), principal.id.clone());
            cache
                .names_by_id
                .insert((principal.kind, principal.id), principal.name);
        }
        for role in roles {
            cache
                .role_ids
                .insert(role.name.to_lowercase(), role.id.clone());
            cache.role_names.insert(role.id, role.name);
        }

        tracing::debug!(
            principals = cache.ids_by_name.len(),
            roles = cache.role_ids.len(),
            "lookup cache loaded"
        );

        Ok(cache)
    }

    pub fn principal_id(&self, kind: PrincipalType, name: &str) -> Option<&str> {
        self.ids_by_name
            .get(&(kind, name.to_string()))
            .map(String::as_str)
    }

    pub fn principal_name(&self, kind: PrincipalType, id: &str) -> Option<&str> {
        self.names_by_id
            .get(&(kind, id.to_string()))
            .map(String::as_str)
    }

    pub fn role_id(&self, name: &str) -> Option<&str> {
        self.role_ids.get(&name.to_lowercase()).map(String::as_str)
    }

    pub fn role_name(&self, id: &str) -> Option<&str> {
        self.role_names.get(id).map(String::as_str)
    }
}
