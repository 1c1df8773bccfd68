//! Shared fixtures for access sync integration tests
#![allow(dead_code)]

use common::acl::AssignedItem;
use common::directory::MemoryDirectory;
use common::grant::{Grant, WhatItem, WhoItem};
use common::target::MemoryTarget;

pub const ACCOUNT: &str = "acct";
pub const CONTAINER: &str = "cont";

/// Directory with two users, one group and the storage roles
pub fn directory() -> MemoryDirectory {
    MemoryDirectory::new()
        .with_user("u-alice", "alice@example.com")
        .with_user("u-bob", "bob@example.com")
        .with_group("g-analysts", "analysts")
        .with_role("role-owner", "Owner")
        .with_role("role-reader", "Reader")
        .with_role("role-blob-reader", "Storage Blob Data Reader")
}

pub fn item(path: &str) -> AssignedItem {
    AssignedItem::new(ACCOUNT, CONTAINER, path)
}

/// Full name of a folder inside the test container
pub fn folder(path: &str) -> String {
    format!("sub/rg/{}/{}/{}", ACCOUNT, CONTAINER, path)
}

pub fn container_scope() -> String {
    format!(
        "/subscriptions/sub/resourcegroups/rg/providers/Microsoft.Storage/storageAccounts/{}/blobServices/default/containers/{}",
        ACCOUNT, CONTAINER
    )
}

/// Target holding `a`, `a/b`, `a/b/f.csv` and `c`
pub fn target() -> MemoryTarget {
    let target = MemoryTarget::new();
    target.add_directory(item("a"));
    target.add_directory(item("a/b"));
    target.add_file(item("a/b/f.csv"));
    target.add_directory(item("c"));
    target
}

pub fn grant(id: &str, users: &[&str], groups: &[&str], what: Vec<WhatItem>) -> Grant {
    let mut grant = Grant::new(id);
    grant.who = WhoItem {
        users: users.iter().map(|s| s.to_string()).collect(),
        groups: groups.iter().map(|s| s.to_string()).collect(),
    };
    grant.what = what;
    grant
}

pub fn read_folder(path: &str) -> WhatItem {
    WhatItem::new("folder", folder(path), ["Read", "Execute"])
}

/// Install a test subscriber once; honours RUST_LOG.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
