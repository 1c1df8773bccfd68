//! Which permissions make sense on which resource kinds

use std::collections::HashMap;

use crate::acl::AclPermission;
use crate::resource::ResourceKind;

const STORAGE_ROLES: [&str; 6] = [
    "Owner",
    "Contributor",
    "Reader",
    "Storage Blob Data Owner",
    "Storage Blob Data Contributor",
    "Storage Blob Data Reader",
];

#[derive(Debug, Clone, Default)]
pub struct PermissionCatalog {
    permissions: HashMap<ResourceKind, Vec<String>>,
}

impl PermissionCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Role names on the flat storage scopes and `rwx` permissions on folders.
    /// Files and the data source itself accept nothing.
    pub fn storage_default() -> Self {
        let mut catalog = Self::new();
        for kind in [
            ResourceKind::Subscription,
            ResourceKind::ResourceGroup,
            ResourceKind::StorageAccount,
            ResourceKind::Container,
        ] {
            catalog = catalog.with_permissions(kind, STORAGE_ROLES);
        }

        catalog.with_permissions(
            ResourceKind::Folder,
            AclPermission::ALL.iter().rev().map(|p| p.name()),
        )
    }

    pub fn with_permissions<I, S>(mut self, kind: ResourceKind, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.permissions
            .entry(kind)
            .or_default()
            .extend(names.into_iter().map(Into::into));
        self
    }

    pub fn permissions(&self, kind: ResourceKind) -> &[String] {
        self.permissions
            .get(&kind)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn is_applicable(&self, kind: ResourceKind, name: &str) -> bool {
        self.permissions(kind)
            .iter()
            .any(|p| p.eq_ignore_ascii_case(name))
    }
}
