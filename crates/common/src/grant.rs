//! Declarative access grants
//!
//! A [`Grant`] states who should hold which permissions on which resources.
//! Grants are read from JSON documents, either a single grant or a list:
//!
//! ```json
//! {
//!   "id": "ap-1",
//!   "who": { "users": ["alice@example.com"], "groups": ["analysts"] },
//!   "what": [
//!     { "type": "folder", "full_name": "sub/rg/acct/cont/raw", "permissions": ["Read"] }
//!   ]
//! }
//! ```

use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum GrantError {
    #[error("failed to parse grants: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Principals a grant applies to, by name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WhoItem {
    #[serde(default)]
    pub users: Vec<String>,
    #[serde(default)]
    pub groups: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WhatItem {
    /// Resource type name, parsed case-insensitively
    #[serde(rename = "type")]
    pub resource_type: String,
    pub full_name: String,
    #[serde(default)]
    pub permissions: Vec<String>,
}

impl WhatItem {
    pub fn new(
        resource_type: impl Into<String>,
        full_name: impl Into<String>,
        permissions: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            resource_type: resource_type.into(),
            full_name: full_name.into(),
            permissions: permissions.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grant {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub who: WhoItem,
    /// Principals dropped from `who` since the last run
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_who: Option<WhoItem>,
    #[serde(default)]
    pub what: Vec<WhatItem>,
    /// Resources dropped from `what` since the last run
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub delete_what: Vec<WhatItem>,
    /// The grant itself was deleted; everything it gave is revoked
    #[serde(default, alias = "delete")]
    pub is_full_delete: bool,
}

impl Grant {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    /// Parse either one grant object or an array of them.
    pub fn parse_many(input: &str) -> Result<Vec<Grant>, GrantError> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum OneOrMany {
            Many(Vec<Grant>),
            One(Box<Grant>),
        }

        Ok(match serde_json::from_str(input)? {
            OneOrMany::Many(grants) => grants,
            OneOrMany::One(grant) => vec![*grant],
        })
    }
}
