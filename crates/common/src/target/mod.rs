//! Primitives consumed from the environment being reconciled
//!
//! Flat role bindings go through a [`BindingTarget`]; hierarchical ACLs go
//! through an [`AclTarget`] that opens one [`AclHandle`] per item. The
//! [`MemoryTarget`] implements both and can be saved to and loaded from
//! JSON.

mod memory;
mod provider;

pub use memory::{AclCall, AclOp, MemoryAclHandle, MemoryState, MemoryTarget, NodeState};
pub use provider::{
    AclHandle, AclTarget, BindingTarget, EntryKind, FailedEntry, RecursiveOutcome, TargetError,
};
