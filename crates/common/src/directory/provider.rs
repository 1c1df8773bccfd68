use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::binding::PrincipalType;

/// A user, group or service principal known to the directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrincipalRecord {
    pub kind: PrincipalType,
    pub id: String,
    /// Login name for users, display name for groups
    pub name: String,
}

impl PrincipalRecord {
    pub fn new(kind: PrincipalType, id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            kind,
            id: id.into(),
            name: name.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleDefinition {
    pub id: String,
    pub name: String,
}

impl RoleDefinition {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// Source of identities and role definitions.
///
/// Queried once per run to fill a [`LookupCache`](super::LookupCache).
#[async_trait]
pub trait DirectoryProvider: Send + Sync + fmt::Debug {
    type Error: std::error::Error + Send + Sync + 'static;

    async fn principals(&self) -> Result<Vec<PrincipalRecord>, Self::Error>;

    async fn role_definitions(&self) -> Result<Vec<RoleDefinition>, Self::Error>;
}
