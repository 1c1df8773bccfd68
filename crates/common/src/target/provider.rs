use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::acl::AssignedItem;
use crate::binding::ScopeBinding;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum TargetError {
    /// The binding is already present; creating it again is a no-op
    #[error("already exists: {0}")]
    AlreadyExists(String),
    #[error("not found: {0}")]
    NotFound(String),
    /// The target understood the request and refused it
    #[error("rejected: {0}")]
    Rejected(String),
    #[error("target unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    Directory,
    File,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedEntry {
    pub kind: EntryKind,
    pub name: String,
}

/// Result of a recursive ACL call over an item and everything below it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecursiveOutcome {
    pub directories_ok: u64,
    pub files_ok: u64,
    pub failures: Vec<FailedEntry>,
}

impl RecursiveOutcome {
    pub fn failure_count(&self) -> usize {
        self.failures.len()
    }
}

/// Flat role-binding primitives.
#[async_trait]
pub trait BindingTarget: Send + Sync {
    /// Create `binding`. Must answer [`TargetError::AlreadyExists`] when an
    ///  equivalent binding is present.
    async fn create_binding(&self, binding: &ScopeBinding) -> Result<(), TargetError>;

    async fn delete_binding(&self, binding: &ScopeBinding) -> Result<(), TargetError>;

    /// Every binding currently present, whoever created it.
    async fn list_bindings(&self) -> Result<Vec<ScopeBinding>, TargetError>;
}

/// Hierarchical ACL primitives.
#[async_trait]
pub trait AclTarget: Send + Sync {
    type Handle: AclHandle;

    /// Open an apply handle rooted at `item`.
    async fn open(&self, item: &AssignedItem) -> Result<Self::Handle, TargetError>;
}

#[async_trait]
pub trait AclHandle: Send + Sync {
    /// Set the comma-joined `entries` on the item and all its descendants.
    async fn update_recursive(
        &self,
        entries: &str,
        batch_size: usize,
    ) -> Result<RecursiveOutcome, TargetError>;

    /// Drop the comma-joined `entries` from the item and all its descendants.
    async fn remove_recursive(&self, entries: &str) -> Result<RecursiveOutcome, TargetError>;
}
