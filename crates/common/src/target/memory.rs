use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use super::provider::{
    AclHandle, AclTarget, BindingTarget, EntryKind, FailedEntry, RecursiveOutcome, TargetError,
};
use crate::acl::{AssignedItem, DEFAULT_PREFIX};
use crate::binding::ScopeBinding;

/// A node of the in-memory namespace and its ACL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeState {
    #[serde(flatten)]
    pub item: AssignedItem,
    pub kind: EntryKind,
    /// Entry key (`user:<id>`, `default:group:<id>`, ...) to `rwx`
    #[serde(default)]
    pub acl: BTreeMap<String, String>,
}

/// Serializable contents of a [`MemoryTarget`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryState {
    #[serde(default)]
    pub bindings: Vec<ScopeBinding>,
    #[serde(default)]
    pub nodes: Vec<NodeState>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AclOp {
    Update,
    Remove,
}

/// One recursive ACL call as seen by the target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AclCall {
    pub item: AssignedItem,
    pub op: AclOp,
    pub entries: String,
    pub batch_size: Option<usize>,
}

/// In-memory binding and ACL target
#[derive(Debug, Clone, Default)]
pub struct MemoryTarget {
    inner: Arc<RwLock<MemoryTargetInner>>,
}

#[derive(Debug, Default)]
struct MemoryTargetInner {
    bindings: BTreeSet<ScopeBinding>,
    nodes: BTreeMap<AssignedItem, Node>,
    calls: Vec<AclCall>,
    /// Nodes whose ACL writes fail
    failing: BTreeSet<AssignedItem>,
    /// Items whose handles cannot be opened
    unreachable: BTreeSet<AssignedItem>,
    /// Bindings whose create or delete fails
    refused: BTreeSet<ScopeBinding>,
    latency: Option<Duration>,
}

#[derive(Debug, Clone)]
struct Node {
    kind: EntryKind,
    acl: BTreeMap<String, String>,
}

impl MemoryTarget {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_state(state: MemoryState) -> Self {
        let target = Self::new();
        {
            let mut inner = target.inner.write();
            inner.bindings = state.bindings.into_iter().collect();
            inner.nodes = state
                .nodes
                .into_iter()
                .map(|node| {
                    (
                        node.item,
                        Node {
                            kind: node.kind,
                            acl: node.acl,
                        },
                    )
                })
                .collect();
        }
        target
    }

    pub fn to_state(&self) -> MemoryState {
        let inner = self.inner.read();
        MemoryState {
            bindings: inner.bindings.iter().cloned().collect(),
            nodes: inner
                .nodes
                .iter()
                .map(|(item, node)| NodeState {
                    item: item.clone(),
                    kind: node.kind,
                    acl: node.acl.clone(),
                })
                .collect(),
        }
    }

    pub fn add_directory(&self, item: AssignedItem) {
        self.add_node(item, EntryKind::Directory);
    }

    pub fn add_file(&self, item: AssignedItem) {
        self.add_node(item, EntryKind::File);
    }

    fn add_node(&self, item: AssignedItem, kind: EntryKind) {
        self.inner.write().nodes.insert(
            item,
            Node {
                kind,
                acl: BTreeMap::new(),
            },
        );
    }

    /// Make ACL writes on `item` itself fail.
    pub fn fail_writes_on(&self, item: AssignedItem) {
        self.inner.write().failing.insert(item);
    }

    /// Make opening a handle on `item` fail.
    pub fn make_unreachable(&self, item: AssignedItem) {
        self.inner.write().unreachable.insert(item);
    }

    /// Make any create or delete of `binding` fail.
    pub fn refuse_binding(&self, binding: ScopeBinding) {
        self.inner.write().refused.insert(binding);
    }

    /// Delay every recursive ACL call by `latency`.
    pub fn set_latency(&self, latency: Duration) {
        self.inner.write().latency = Some(latency);
    }

    pub fn bindings(&self) -> Vec<ScopeBinding> {
        self.inner.read().bindings.iter().cloned().collect()
    }

    pub fn acl(&self, item: &AssignedItem) -> Option<BTreeMap<String, String>> {
        self.inner.read().nodes.get(item).map(|node| node.acl.clone())
    }

    /// Recursive ACL calls received so far, in order.
    pub fn calls(&self) -> Vec<AclCall> {
        self.inner.read().calls.clone()
    }

    async fn recursive(
        &self,
        root: &AssignedItem,
        op: AclOp,
        entries: &str,
        batch_size: Option<usize>,
    ) -> Result<RecursiveOutcome, TargetError> {
        let latency = self.inner.read().latency;
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }

        let parsed = entries
            .split(',')
            .map(parse_entry)
            .collect::<Result<Vec<_>, _>>()?;

        let mut inner = self.inner.write();
        inner.calls.push(AclCall {
            item: root.clone(),
            op,
            entries: entries.to_string(),
            batch_size,
        });

        let MemoryTargetInner { nodes, failing, .. } = &mut *inner;
        let mut outcome = RecursiveOutcome::default();
        for (item, node) in nodes.iter_mut().filter(|(item, _)| root.contains(item)) {
            if failing.contains(item) {
                outcome.failures.push(FailedEntry {
                    kind: node.kind,
                    name: item.to_string(),
                });
                continue;
            }

            for (key, permissions) in &parsed {
                // files carry no inherited entries
                if node.kind == EntryKind::File && key.starts_with(DEFAULT_PREFIX) {
                    continue;
                }
                match (op, permissions) {
                    (AclOp::Update, Some(permissions)) => {
                        node.acl.insert(key.clone(), permissions.clone());
                    }
                    (AclOp::Remove, _) => {
                        node.acl.remove(key);
                    }
                    (AclOp::Update, None) => {}
                }
            }

            match node.kind {
                EntryKind::Directory => outcome.directories_ok += 1,
                EntryKind::File => outcome.files_ok += 1,
            }
        }

        Ok(outcome)
    }
}

/// Split `[default:]<type>:<id>[:<rwx>]` into its key and permissions.
fn parse_entry(entry: &str) -> Result<(String, Option<String>), TargetError> {
    let (prefix, rest) = match entry.strip_prefix(DEFAULT_PREFIX) {
        Some(rest) => (DEFAULT_PREFIX, rest),
        None => ("", entry),
    };

    let mut parts = rest.splitn(3, ':');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(kind), Some(id), permissions) if !kind.is_empty() && !id.is_empty() => Ok((
            format!("{}{}:{}", prefix, kind, id),
            permissions.map(str::to_string),
        )),
        _ => Err(TargetError::Rejected(format!("malformed ACL entry {:?}", entry))),
    }
}

#[async_trait]
impl BindingTarget for MemoryTarget {
    async fn create_binding(&self, binding: &ScopeBinding) -> Result<(), TargetError> {
        if binding.principal_id.is_empty() {
            return Err(TargetError::Rejected(format!("no principal id in {}", binding)));
        }

        let mut inner = self.inner.write();
        if inner.refused.contains(binding) {
            return Err(TargetError::Rejected(binding.to_string()));
        }
        if inner.bindings.iter().any(|b| b.same_assignment(binding)) {
            return Err(TargetError::AlreadyExists(binding.to_string()));
        }

        inner.bindings.insert(binding.clone());
        Ok(())
    }

    async fn delete_binding(&self, binding: &ScopeBinding) -> Result<(), TargetError> {
        if binding.principal_id.is_empty() {
            return Err(TargetError::Rejected(format!("no principal id in {}", binding)));
        }

        let mut inner = self.inner.write();
        if inner.refused.contains(binding) {
            return Err(TargetError::Rejected(binding.to_string()));
        }

        inner.bindings.retain(|b| !b.same_assignment(binding));
        Ok(())
    }

    async fn list_bindings(&self) -> Result<Vec<ScopeBinding>, TargetError> {
        Ok(self.bindings())
    }
}

#[derive(Debug, Clone)]
pub struct MemoryAclHandle {
    target: MemoryTarget,
    item: AssignedItem,
}

#[async_trait]
impl AclTarget for MemoryTarget {
    type Handle = MemoryAclHandle;

    async fn open(&self, item: &AssignedItem) -> Result<Self::Handle, TargetError> {
        let inner = self.inner.read();
        if inner.unreachable.contains(item) {
            return Err(TargetError::Unavailable(item.to_string()));
        }
        if !inner.nodes.contains_key(item) {
            return Err(TargetError::NotFound(item.to_string()));
        }

        Ok(MemoryAclHandle {
            target: self.clone(),
            item: item.clone(),
        })
    }
}

#[async_trait]
impl AclHandle for MemoryAclHandle {
    async fn update_recursive(
        &self,
        entries: &str,
        batch_size: usize,
    ) -> Result<RecursiveOutcome, TargetError> {
        self.target
            .recursive(&self.item, AclOp::Update, entries, Some(batch_size))
            .await
    }

    async fn remove_recursive(&self, entries: &str) -> Result<RecursiveOutcome, TargetError> {
        self.target
            .recursive(&self.item, AclOp::Remove, entries, None)
            .await
    }
}
