//! End-to-end access sync scenarios against the in-memory target

mod common;

use std::time::Duration;

use async_trait::async_trait;
use ::common::binding::{PrincipalType, ScopeBinding};
use ::common::directory::{DirectoryProvider, PrincipalRecord, RoleDefinition};
use ::common::feedback::{CollectingHandler, FeedbackError, FeedbackHandler, GrantFeedback};
use ::common::grant::{Grant, WhatItem, WhoItem};
use ::common::reconcile::{ItemStatus, ReconcilerConfig};
use ::common::sync::{AccessSync, SyncError, SyncReport};
use ::common::target::{AclOp, MemoryTarget};

use self::common as fixtures;

fn reader_binding(principal_type: PrincipalType, id: &str) -> ScopeBinding {
    ScopeBinding {
        scope: fixtures::container_scope(),
        permission_name: "Reader".to_string(),
        permission_id: "role-reader".to_string(),
        principal_type,
        principal_id: id.to_string(),
    }
}

fn container_reader() -> WhatItem {
    WhatItem::new("container", fixtures::folder("").trim_end_matches('/'), ["Reader"])
}

async fn sync(
    target: &MemoryTarget,
    grants: &[Grant],
) -> (Result<SyncReport, SyncError>, CollectingHandler) {
    fixtures::init_tracing();
    let directory = fixtures::directory();
    let handler = CollectingHandler::new();
    let result = AccessSync::new(&directory, target).sync(grants, &handler).await;
    (result, handler)
}

#[tokio::test]
async fn test_sync_applies_bindings_and_acls() {
    let target = fixtures::target();
    let grants = vec![
        fixtures::grant(
            "ap-1",
            &["alice@example.com"],
            &[],
            vec![container_reader(), fixtures::read_folder("a")],
        ),
        fixtures::grant(
            "ap-2",
            &[],
            &["analysts"],
            vec![WhatItem::new(
                "folder",
                fixtures::folder("a/b"),
                ["Read", "Write", "Execute"],
            )],
        ),
    ];

    let (result, handler) = sync(&target, &grants).await;
    let report = result.unwrap();

    assert_eq!(report.grants, 2);
    assert_eq!(report.bindings.created, 1);
    assert_eq!(report.acls.applied_count(), 2);
    assert_eq!(
        target.bindings(),
        vec![reader_binding(PrincipalType::User, "u-alice")]
    );

    let a = target.acl(&fixtures::item("a")).unwrap();
    assert_eq!(a.get("user:u-alice").map(String::as_str), Some("r-x"));
    assert_eq!(a.get("default:user:u-alice").map(String::as_str), Some("r-x"));

    let b = target.acl(&fixtures::item("a/b")).unwrap();
    assert_eq!(b.get("user:u-alice").map(String::as_str), Some("r-x"));
    assert_eq!(b.get("group:g-analysts").map(String::as_str), Some("rwx"));

    let calls = target.calls();
    let order: Vec<_> = calls.iter().map(|c| c.item.path.as_str()).collect();
    assert_eq!(order, vec!["a", "a/b"]);
    assert!(calls.iter().all(|c| c.op == AclOp::Update && c.batch_size == Some(1)));

    assert_eq!(handler.records().len(), 2);
    assert!(handler.records().iter().all(|r| r.is_clean()));
}

#[tokio::test]
async fn test_items_applied_shallowest_first() {
    let target = fixtures::target();
    let grants = vec![fixtures::grant(
        "ap-1",
        &["alice@example.com"],
        &[],
        vec![
            fixtures::read_folder("a/b"),
            fixtures::read_folder("c"),
            fixtures::read_folder("a"),
        ],
    )];

    let (result, _) = sync(&target, &grants).await;
    result.unwrap();

    let order: Vec<_> = target.calls().into_iter().map(|c| c.item.path).collect();
    assert_eq!(order, vec!["a", "c", "a/b"]);
}

#[tokio::test]
async fn test_add_wins_over_removal_in_any_order() {
    let keep = fixtures::grant("ap-keep", &["alice@example.com"], &[], vec![container_reader()]);
    let mut drop = keep.clone();
    drop.id = "ap-drop".to_string();
    drop.is_full_delete = true;

    for grants in [vec![keep.clone(), drop.clone()], vec![drop.clone(), keep.clone()]] {
        let target = fixtures::target();
        let (result, handler) = sync(&target, &grants).await;
        let report = result.unwrap();

        assert_eq!(report.bindings.deleted, 0);
        assert_eq!(
            target.bindings(),
            vec![reader_binding(PrincipalType::User, "u-alice")]
        );
        assert!(handler.get("ap-drop").unwrap().is_clean());
    }
}

#[tokio::test]
async fn test_full_delete_revokes_bindings_and_acls() {
    let target = fixtures::target();
    let mut grant = fixtures::grant(
        "ap-1",
        &["alice@example.com"],
        &[],
        vec![container_reader(), fixtures::read_folder("a")],
    );
    sync(&target, &[grant.clone()]).await.0.unwrap();
    assert_eq!(target.bindings().len(), 1);

    grant.is_full_delete = true;
    let (result, handler) = sync(&target, &[grant]).await;
    let report = result.unwrap();

    assert_eq!(report.bindings.deleted, 1);
    assert!(target.bindings().is_empty());
    assert!(target.acl(&fixtures::item("a")).unwrap().is_empty());
    assert!(target.acl(&fixtures::item("a/b")).unwrap().is_empty());

    let last = target.calls().pop().unwrap();
    assert_eq!(last.op, AclOp::Remove);
    assert_eq!(last.entries, "user:u-alice,default:user:u-alice");
    assert!(handler.get("ap-1").unwrap().is_clean());
}

#[tokio::test]
async fn test_dropped_principal_loses_access() {
    let target = fixtures::target();
    let mut grant = fixtures::grant(
        "ap-1",
        &["alice@example.com", "bob@example.com"],
        &[],
        vec![container_reader(), fixtures::read_folder("a")],
    );
    sync(&target, &[grant.clone()]).await.0.unwrap();
    assert_eq!(target.bindings().len(), 2);

    grant.who.users = vec!["alice@example.com".to_string()];
    grant.deleted_who = Some(WhoItem {
        users: vec!["bob@example.com".to_string()],
        groups: vec![],
    });
    sync(&target, &[grant]).await.0.unwrap();

    assert_eq!(
        target.bindings(),
        vec![reader_binding(PrincipalType::User, "u-alice")]
    );
    let a = target.acl(&fixtures::item("a")).unwrap();
    assert!(a.contains_key("user:u-alice"));
    assert!(!a.contains_key("user:u-bob"));
    assert!(!a.contains_key("default:user:u-bob"));
}

#[tokio::test]
async fn test_syncing_twice_is_idempotent() {
    let target = fixtures::target();
    let grants = vec![fixtures::grant(
        "ap-1",
        &["alice@example.com"],
        &["analysts"],
        vec![container_reader()],
    )];

    sync(&target, &grants).await.0.unwrap();
    let (result, handler) = sync(&target, &grants).await;
    let report = result.unwrap();

    assert_eq!(report.bindings.created, 0);
    assert_eq!(report.bindings.existing, 2);
    assert_eq!(target.bindings().len(), 2);
    assert!(handler.get("ap-1").unwrap().is_clean());
}

#[tokio::test]
async fn test_item_failure_is_attributed_and_isolated() {
    let target = fixtures::target();
    target.fail_writes_on(fixtures::item("a/b"));
    let grants = vec![
        fixtures::grant("ap-1", &["alice@example.com"], &[], vec![fixtures::read_folder("a")]),
        fixtures::grant("ap-2", &["alice@example.com"], &[], vec![fixtures::read_folder("a")]),
        fixtures::grant("ap-3", &["bob@example.com"], &[], vec![fixtures::read_folder("c")]),
    ];

    let (result, handler) = sync(&target, &grants).await;
    let report = result.unwrap();

    assert_eq!(report.acls.failed_count(), 1);
    assert_eq!(report.acls.applied_count(), 1);
    assert!(matches!(report.acls.items[0].status, ItemStatus::Failed(_)));

    for id in ["ap-1", "ap-2"] {
        let feedback = handler.get(id).unwrap();
        assert_eq!(feedback.errors.len(), 1, "{}", id);
        assert!(feedback.errors[0].contains("acct/cont/a/b"));
    }
    assert!(handler.get("ap-3").unwrap().is_clean());
    assert!(target
        .acl(&fixtures::item("c"))
        .unwrap()
        .contains_key("user:u-bob"));
}

#[tokio::test]
async fn test_unreachable_item_does_not_stop_the_run() {
    let target = fixtures::target();
    target.make_unreachable(fixtures::item("a"));
    let grants = vec![
        fixtures::grant("ap-1", &["alice@example.com"], &[], vec![fixtures::read_folder("a")]),
        fixtures::grant("ap-2", &["alice@example.com"], &[], vec![fixtures::read_folder("c")]),
    ];

    let (result, handler) = sync(&target, &grants).await;
    result.unwrap();

    assert!(handler.get("ap-1").unwrap().errors[0].contains("open failed"));
    assert!(handler.get("ap-2").unwrap().is_clean());
    assert_eq!(target.calls().len(), 1);
}

#[tokio::test]
async fn test_timeouts_become_item_failures() {
    fixtures::init_tracing();
    let target = fixtures::target();
    target.set_latency(Duration::from_millis(200));
    let directory = fixtures::directory();
    let handler = CollectingHandler::new();
    let grants = vec![fixtures::grant(
        "ap-1",
        &["alice@example.com"],
        &[],
        vec![fixtures::read_folder("a"), fixtures::read_folder("c")],
    )];

    let report = AccessSync::new(&directory, &target)
        .with_config(ReconcilerConfig {
            batch_size: 1,
            timeout: Some(Duration::from_millis(10)),
        })
        .sync(&grants, &handler)
        .await
        .unwrap();

    assert_eq!(report.acls.failed_count(), 2);
    let feedback = handler.get("ap-1").unwrap();
    assert_eq!(feedback.errors.len(), 2);
    assert!(feedback.errors.iter().all(|e| e.contains("timed out")));
}

#[tokio::test]
async fn test_grant_level_problems_become_feedback() {
    let target = fixtures::target();
    let grants = vec![
        fixtures::grant(
            "ap-bad",
            &["alice@example.com"],
            &[],
            vec![WhatItem::new("folder", fixtures::folder("a"), ["Delete"])],
        ),
        fixtures::grant(
            "ap-soft",
            &["alice@example.com"],
            &[],
            vec![
                WhatItem::new("queue", "sub/rg/acct/q", ["Reader"]),
                WhatItem::new("container", "sub/rg/acct", ["Reader"]),
                fixtures::read_folder("c"),
            ],
        ),
    ];

    let (result, handler) = sync(&target, &grants).await;
    let report = result.unwrap();

    assert_eq!(report.rejected, vec!["ap-bad"]);
    let bad = handler.get("ap-bad").unwrap();
    assert_eq!(bad.errors.len(), 1);
    assert!(bad.errors[0].contains("Delete"));

    let soft = handler.get("ap-soft").unwrap();
    assert!(soft.errors.is_empty());
    assert_eq!(soft.warnings.len(), 2);
    assert!(target
        .acl(&fixtures::item("c"))
        .unwrap()
        .contains_key("user:u-alice"));
    assert!(target.acl(&fixtures::item("a")).unwrap().is_empty());
}

#[tokio::test]
async fn test_unresolved_principal_fails_when_applied() {
    let target = fixtures::target();
    let grants = vec![fixtures::grant(
        "ap-1",
        &["alice@example.com", "ghost@example.com"],
        &[],
        vec![container_reader(), fixtures::read_folder("c")],
    )];

    let (result, handler) = sync(&target, &grants).await;
    let report = result.unwrap();

    assert_eq!(report.bindings.created, 1);
    assert_eq!(report.bindings.failed.len(), 1);
    assert_eq!(report.bindings.failed[0].0.principal_id, "");
    assert_eq!(
        target.bindings(),
        vec![reader_binding(PrincipalType::User, "u-alice")]
    );
    assert_eq!(report.acls.failed_count(), 1);
    assert!(target.acl(&fixtures::item("c")).unwrap().is_empty());

    let feedback = handler.get("ap-1").unwrap();
    assert_eq!(feedback.warnings.len(), 1);
    assert!(feedback.warnings[0].contains("ghost@example.com"));
    assert_eq!(feedback.errors.len(), 2);
    assert!(feedback.errors[0].contains("failed to create binding"));
    assert!(feedback.errors[1].contains("acct/cont/c"));
}

/// Keeps every record but reports a failure for one grant id
#[derive(Debug)]
struct RefusingHandler {
    refused: String,
    delivered: CollectingHandler,
}

impl RefusingHandler {
    fn new(refused: &str) -> Self {
        Self {
            refused: refused.to_string(),
            delivered: CollectingHandler::new(),
        }
    }
}

#[async_trait]
impl FeedbackHandler for RefusingHandler {
    async fn add_feedback(&self, feedback: GrantFeedback) -> Result<(), FeedbackError> {
        if feedback.grant_id == self.refused {
            return Err(FeedbackError::Handler {
                grant_id: feedback.grant_id,
                message: "store unavailable".to_string(),
            });
        }
        self.delivered.add_feedback(feedback).await
    }
}

fn three_grants() -> Vec<Grant> {
    vec![
        fixtures::grant("ap-1", &["alice@example.com"], &[], vec![container_reader()]),
        fixtures::grant("ap-2", &["bob@example.com"], &[], vec![container_reader()]),
        fixtures::grant("ap-3", &[], &["analysts"], vec![container_reader()]),
    ]
}

#[tokio::test]
async fn test_feedback_failure_after_successful_run() {
    fixtures::init_tracing();
    let target = fixtures::target();
    let directory = fixtures::directory();
    let handler = RefusingHandler::new("ap-2");

    let err = AccessSync::new(&directory, &target)
        .sync(&three_grants(), &handler)
        .await
        .unwrap_err();

    match err {
        SyncError::Feedback(FeedbackError::Handler { grant_id, .. }) => {
            assert_eq!(grant_id, "ap-2")
        }
        other => panic!("unexpected error: {}", other),
    }
    let ids: Vec<_> = handler
        .delivered
        .records()
        .into_iter()
        .map(|r| r.grant_id)
        .collect();
    assert_eq!(ids, vec!["ap-1", "ap-3"]);
    assert_eq!(target.bindings().len(), 3);
}

#[derive(Debug)]
struct OfflineDirectory;

#[derive(Debug, thiserror::Error)]
#[error("directory offline")]
struct Offline;

#[async_trait]
impl DirectoryProvider for OfflineDirectory {
    type Error = Offline;

    async fn principals(&self) -> Result<Vec<PrincipalRecord>, Self::Error> {
        Err(Offline)
    }

    async fn role_definitions(&self) -> Result<Vec<RoleDefinition>, Self::Error> {
        Err(Offline)
    }
}

#[tokio::test]
async fn test_feedback_flushed_when_cache_fails() {
    let target = fixtures::target();
    let handler = CollectingHandler::new();
    let grants = vec![
        fixtures::grant("ap-1", &["alice@example.com"], &[], vec![container_reader()]),
        fixtures::grant("ap-2", &["bob@example.com"], &[], vec![container_reader()]),
    ];

    let err = AccessSync::new(&OfflineDirectory, &target)
        .sync(&grants, &handler)
        .await
        .unwrap_err();

    assert!(matches!(err, SyncError::Cache(_)));
    let ids: Vec<_> = handler.records().into_iter().map(|r| r.grant_id).collect();
    assert_eq!(ids, vec!["ap-1", "ap-2"]);
    assert!(target.bindings().is_empty());
}

#[tokio::test]
async fn test_cache_and_feedback_failures_are_combined() {
    let target = fixtures::target();
    let handler = RefusingHandler::new("ap-1");

    let err = AccessSync::new(&OfflineDirectory, &target)
        .sync(&three_grants(), &handler)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        SyncError::CacheAndFeedback {
            flush: FeedbackError::Handler { .. },
            ..
        }
    ));
    assert!(err.to_string().contains("directory offline"));
    assert!(err.to_string().contains("store unavailable"));

    let ids: Vec<_> = handler
        .delivered
        .records()
        .into_iter()
        .map(|r| r.grant_id)
        .collect();
    assert_eq!(ids, vec!["ap-2", "ap-3"]);
}
