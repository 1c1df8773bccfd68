//! Resource kinds and their addressing
//!
//! Every resource a grant can name is one of a closed set of
//! [`ResourceKind`]s. A full name is a `/`-separated list of segments:
//!
//! ```text
//! <subscription>/<resource group>/<storage account>/<container>/<path...>
//! ```
//!
//! Flat kinds turn the leading segments into a role-assignment scope;
//! hierarchical kinds (folders and files) turn them into an
//! [`AssignedItem`] for ACL bookkeeping.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::acl::AssignedItem;

/// Scope path keys, in nesting order. A flat kind that needs `n` segments
/// uses the first `n` keys.
const SCOPE_KEYS: [&str; 4] = [
    "subscriptions",
    "resourcegroups",
    "providers/Microsoft.Storage/storageAccounts",
    "blobServices/default/containers",
];

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResourceError {
    #[error("unknown resource type {0:?}")]
    UnknownResourceType(String),
    #[error("malformed {kind} name {full_name:?}: expected at least {required} segments")]
    MalformedResourcePath {
        kind: ResourceKind,
        full_name: String,
        required: usize,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    /// The whole data source; scope `/`
    Datasource,
    Subscription,
    ResourceGroup,
    StorageAccount,
    Container,
    Folder,
    File,
}

/// Where a resource's permissions live on the target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceTarget {
    /// A flat role-assignment scope
    Scope(String),
    /// A node of the hierarchical ACL namespace
    Item(AssignedItem),
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 7] = [
        Self::Datasource,
        Self::Subscription,
        Self::ResourceGroup,
        Self::StorageAccount,
        Self::Container,
        Self::Folder,
        Self::File,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Datasource => "datasource",
            Self::Subscription => "subscription",
            Self::ResourceGroup => "resourcegroup",
            Self::StorageAccount => "storageaccount",
            Self::Container => "container",
            Self::Folder => "folder",
            Self::File => "file",
        }
    }

    /// Whether permissions on this kind are POSIX ACLs rather than bindings.
    pub fn is_hierarchical(self) -> bool {
        matches!(self, Self::Folder | Self::File)
    }

    /// Minimum number of full-name segments this kind needs.
    pub fn min_segments(self) -> usize {
        match self {
            Self::Datasource => 0,
            Self::Subscription => 1,
            Self::ResourceGroup => 2,
            Self::StorageAccount => 3,
            Self::Container | Self::Folder | Self::File => 4,
        }
    }

    /// Resolve a full name of this kind to its place on the target.
    pub fn locate(self, full_name: &str) -> Result<ResourceTarget, ResourceError> {
        let segments: Vec<&str> = full_name.split('/').collect();
        let required = self.min_segments();

        if segments.len() < required || segments[..required].iter().any(|s| s.is_empty()) {
            return Err(ResourceError::MalformedResourcePath {
                kind: self,
                full_name: full_name.to_string(),
                required,
            });
        }

        if self.is_hierarchical() {
            return Ok(ResourceTarget::Item(AssignedItem::new(
                segments[2],
                segments[3],
                segments[4..].join("/"),
            )));
        }

        if required == 0 {
            return Ok(ResourceTarget::Scope("/".to_string()));
        }

        let scope = SCOPE_KEYS
            .iter()
            .zip(&segments[..required])
            .map(|(key, value)| format!("/{}/{}", key, value))
            .collect::<String>();

        Ok(ResourceTarget::Scope(scope))
    }

    /// Recover the kind and full name a scope was built from.
    ///
    /// Keys must follow the scope templates in order; matching is
    /// case-insensitive since the target reports scopes in whatever casing
    /// it was given. Returns `None` for scopes outside the storage hierarchy.
    pub fn from_scope(scope: &str) -> Option<(ResourceKind, String)> {
        let segments: Vec<&str> = scope.split('/').filter(|s| !s.is_empty()).collect();
        let mut rest = segments.as_slice();
        let mut values = Vec::new();

        for key in SCOPE_KEYS {
            if rest.is_empty() {
                break;
            }
            for expected in key.split('/') {
                let (found, tail) = rest.split_first()?;
                if !found.eq_ignore_ascii_case(expected) {
                    return None;
                }
                rest = tail;
            }
            let (value, tail) = rest.split_first()?;
            values.push(*value);
            rest = tail;
        }

        if !rest.is_empty() {
            return None;
        }

        let kind = match values.len() {
            0 => Self::Datasource,
            1 => Self::Subscription,
            2 => Self::ResourceGroup,
            3 => Self::StorageAccount,
            _ => Self::Container,
        };

        Some((kind, values.join("/")))
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResourceKind {
    type Err = ResourceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| ResourceError::UnknownResourceType(s.to_string()))
    }
}
