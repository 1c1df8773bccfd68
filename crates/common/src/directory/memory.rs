use std::convert::Infallible;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::provider::{DirectoryProvider, PrincipalRecord, RoleDefinition};
use crate::binding::PrincipalType;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryEntry {
    pub id: String,
    pub name: String,
}

/// Directory held entirely in memory, typically loaded from configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryDirectory {
    #[serde(default)]
    pub users: Vec<DirectoryEntry>,
    #[serde(default)]
    pub groups: Vec<DirectoryEntry>,
    #[serde(default)]
    pub roles: Vec<RoleDefinition>,
}

impl MemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user(mut self, id: &str, name: &str) -> Self {
        self.users.push(DirectoryEntry {
            id: id.to_string(),
            name: name.to_string(),
        });
        self
    }

    pub fn with_group(mut self, id: &str, name: &str) -> Self {
        self.groups.push(DirectoryEntry {
            id: id.to_string(),
            name: name.to_string(),
        });
        self
    }

    pub fn with_role(mut self, id: &str, name: &str) -> Self {
        self.roles.push(RoleDefinition::new(id, name));
        self
    }
}

#[async_trait]
impl DirectoryProvider for MemoryDirectory {
    type Error = Infallible;

    async fn principals(&self) -> Result<Vec<PrincipalRecord>, Self::Error> {
        let users = self
            .users
            .iter()
            .map(|e| PrincipalRecord::new(PrincipalType::User, &e.id, &e.name));
        let groups = self
            .groups
            .iter()
            .map(|e| PrincipalRecord::new(PrincipalType::Group, &e.id, &e.name));

        Ok(users.chain(groups).collect())
    }

    async fn role_definitions(&self) -> Result<Vec<RoleDefinition>, Self::Error> {
        Ok(self.roles.clone())
    }
}
