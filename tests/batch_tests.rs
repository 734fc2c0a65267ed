//! Integration tests for batch application.

use std::sync::Arc;
use task_tree::batch::{BatchOperation, apply_batch, parse_batch};
use task_tree::document::MemoryStore;
use task_tree::store::TaskStore;

async fn setup_store() -> TaskStore {
    TaskStore::open(Arc::new(MemoryStore::new()))
        .await
        .expect("Failed to open in-memory store")
}

#[tokio::test]
async fn nested_creates_land_under_their_parent() {
    let store = setup_store().await;
    let ops = parse_batch(
        r#"[{
            "action": "create",
            "title": "Release",
            "children": [
                {"action": "create", "title": "Tag"},
                {"action": "create", "title": "Publish", "order": 1, "children": [
                    {"action": "create", "title": "Announce"}
                ]}
            ]
        },
        {"action": "create", "title": "Rest", "order": 1}]"#,
    )
    .unwrap();

    let report = apply_batch(&store, ops).await;

    assert_eq!(report.succeeded, 5);
    assert_eq!(report.failed, 0);
    assert_eq!(report.created, vec!["1", "2", "3", "4", "5"]);

    let all = store.get_all().await.unwrap();
    assert_eq!(all.len(), 2);
    let release = &all[0];
    assert_eq!(release.title, "Release");
    assert_eq!(release.children.len(), 2);
    assert_eq!(release.children[0].title, "Tag");
    assert_eq!(release.children[1].title, "Publish");
    assert_eq!(release.children[1].children[0].title, "Announce");
    assert_eq!(all[1].title, "Rest");

    // Depth shows up as indentation.
    assert!(report.lines[3].starts_with("    Created task \"Announce\""));
}

#[tokio::test]
async fn failed_create_skips_children_and_continues() {
    let store = setup_store().await;
    let ops = vec![
        BatchOperation::Create {
            title: "Lost".into(),
            description: None,
            order: None,
            parent_id: Some("404".into()),
            children: vec![BatchOperation::Create {
                title: "Never".into(),
                description: None,
                order: None,
                parent_id: None,
                children: vec![],
            }],
        },
        BatchOperation::Create {
            title: "Kept".into(),
            description: None,
            order: None,
            parent_id: None,
            children: vec![],
        },
    ];

    let report = apply_batch(&store, ops).await;

    assert_eq!(report.succeeded, 1);
    assert_eq!(report.failed, 1);
    assert_eq!(report.skipped, 1);
    assert!(report.lines[0].starts_with("Failed to create \"Lost\""));
    assert!(report.lines[0].ends_with("[TASK_NOT_FOUND]"));
    assert!(report.summary().ends_with("1 skipped"));

    let all = store.get_all().await.unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].title, "Kept");
}

#[tokio::test]
async fn mixed_operations_apply_in_order() {
    let store = setup_store().await;
    let ops = parse_batch(
        r#"{"operations": [
            {"action": "create", "title": "A"},
            {"action": "create", "title": "B", "order": 1},
            {"action": "complete", "id": "1"},
            {"action": "move", "id": "2", "order": 0},
            {"action": "update", "id": "2", "description": "moved first"},
            {"action": "delete", "id": "77"},
            {"action": "delete_completed"}
        ]}"#,
    )
    .unwrap();

    let report = apply_batch(&store, ops).await;

    assert_eq!(report.succeeded, 6);
    assert_eq!(report.failed, 1);
    assert_eq!(report.lines[5], "Task 77 not found");
    assert_eq!(report.lines[6], "Deleted 1 completed task(s)");

    let all = store.get_all().await.unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].title, "B");
    assert_eq!(all[0].description.as_deref(), Some("moved first"));
}

#[tokio::test]
async fn unbound_store_fails_every_operation() {
    let store = TaskStore::new();
    let ops = parse_batch(
        r#"[{"action": "create", "title": "A", "children": [{"action": "create", "title": "B"}]},
            {"action": "reopen", "id": "1"}]"#,
    )
    .unwrap();

    let report = apply_batch(&store, ops).await;

    assert_eq!(report.succeeded, 0);
    assert_eq!(report.failed, 2);
    assert_eq!(report.skipped, 1);
}

#[tokio::test]
async fn failed_writes_are_reported_as_unsaved() {
    let documents = MemoryStore::new();
    let store = TaskStore::open(Arc::new(documents.clone()))
        .await
        .expect("Failed to open in-memory store");
    documents.set_fail_writes(true);

    let ops = parse_batch(
        r#"[{"action": "create", "title": "A", "children": [{"action": "create", "title": "B"}]},
            {"action": "complete", "id": "1"},
            {"action": "delete", "id": "99"}]"#,
    )
    .unwrap();
    let report = apply_batch(&store, ops).await;

    assert_eq!(report.succeeded, 3);
    assert_eq!(report.failed, 1);
    assert_eq!(report.unsaved, 3);
    assert!(report.lines[0].ends_with("(not saved)"));
    assert!(report.summary().ends_with("3 not saved"));
    assert!(documents.snapshot().tasks.is_empty());

    documents.set_fail_writes(false);
    let ops = parse_batch(r#"[{"action": "reopen", "id": "1"}, {"action": "delete_completed"}]"#)
        .unwrap();
    let report = apply_batch(&store, ops).await;

    assert_eq!(report.succeeded, 2);
    assert_eq!(report.unsaved, 0);
    assert_eq!(documents.snapshot().task_count(), 2);
}
