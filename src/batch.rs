//! Batch application of task operations.
//!
//! A batch is a list of operations, each tagged by `action`. A `create` can
//! carry nested `children` operations that run right after it; nested creates
//! without an explicit `parentId` land under the task just created. Every
//! operation produces one human-readable line and a failure never aborts the
//! rest of the batch. Mutations whose write did not reach the document store
//! are counted in [`BatchReport::unsaved`].

use crate::error::StoreError;
use crate::store::TaskStore;
use crate::subscriptions::ChangeEvent;
use crate::types::{MoveTarget, NewTask, Order, Task, TaskPatch};
use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::broadcast;
use tracing::{debug, warn};

/// One operation in a batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "action",
    rename_all = "snake_case",
    rename_all_fields = "camelCase"
)]
pub enum BatchOperation {
    Create {
        title: String,
        #[serde(default)]
        description: Option<String>,
        #[serde(default)]
        order: Option<Order>,
        #[serde(default)]
        parent_id: Option<String>,
        #[serde(default)]
        children: Vec<BatchOperation>,
    },
    Update {
        id: String,
        #[serde(default)]
        title: Option<String>,
        #[serde(default)]
        description: Option<String>,
        #[serde(default)]
        completed: Option<bool>,
        #[serde(default)]
        order: Option<Order>,
    },
    Complete {
        id: String,
    },
    Reopen {
        id: String,
    },
    Delete {
        id: String,
    },
    Move {
        id: String,
        order: Order,
        #[serde(default)]
        parent_id: Option<String>,
    },
    DeleteCompleted,
}

impl BatchOperation {
    /// This operation plus every nested operation.
    pub fn total_len(&self) -> usize {
        match self {
            BatchOperation::Create { children, .. } => {
                1 + children.iter().map(BatchOperation::total_len).sum::<usize>()
            }
            _ => 1,
        }
    }
}

/// Accepted batch documents: a bare array or `{ "operations": [...] }`.
#[derive(Deserialize)]
#[serde(untagged)]
enum BatchInput {
    List(Vec<BatchOperation>),
    Wrapped { operations: Vec<BatchOperation> },
}

/// Parse a batch from JSON.
pub fn parse_batch(json: &str) -> Result<Vec<BatchOperation>, serde_json::Error> {
    Ok(match serde_json::from_str::<BatchInput>(json)? {
        BatchInput::List(ops) => ops,
        BatchInput::Wrapped { operations } => operations,
    })
}

/// Outcome of a batch.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BatchReport {
    /// One line per operation, indented by nesting depth.
    pub lines: Vec<String>,
    pub succeeded: usize,
    pub failed: usize,
    /// Nested operations not run because their parent create failed.
    pub skipped: usize,
    /// Ids of tasks created by the batch, in creation order.
    pub created: Vec<String>,
    /// Successful mutations that were kept in memory only.
    pub unsaved: usize,
}

impl BatchReport {
    fn ok(&mut self, depth: usize, line: String) {
        self.succeeded += 1;
        self.push(depth, line);
    }

    /// Record a successful mutation, flagging it when no change event followed.
    fn mutated(&mut self, depth: usize, line: String, saved: bool) {
        if saved {
            self.ok(depth, line);
        } else {
            self.unsaved += 1;
            self.ok(depth, format!("{} (not saved)", line));
        }
    }

    fn fail(&mut self, depth: usize, line: String) {
        self.failed += 1;
        self.push(depth, line);
    }

    fn push(&mut self, depth: usize, line: String) {
        self.lines.push(format!("{}{}", "  ".repeat(depth), line));
    }

    pub fn summary(&self) -> String {
        let mut summary = format!("{} succeeded, {} failed", self.succeeded, self.failed);
        if self.skipped > 0 {
            summary.push_str(&format!(", {} skipped", self.skipped));
        }
        if self.unsaved > 0 {
            summary.push_str(&format!(", {} not saved", self.unsaved));
        }
        summary
    }
}

impl fmt::Display for BatchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for line in &self.lines {
            writeln!(f, "{}", line)?;
        }
        write!(f, "{}", self.summary())
    }
}

struct Pending {
    op: BatchOperation,
    inherited_parent: Option<String>,
    depth: usize,
}

/// Apply `ops` in order, depth first through nested children.
pub async fn apply_batch(store: &TaskStore, ops: Vec<BatchOperation>) -> BatchReport {
    let mut report = BatchReport::default();
    let mut changes = store.subscribe();
    let mut stack: Vec<Pending> = ops
        .into_iter()
        .rev()
        .map(|op| Pending {
            op,
            inherited_parent: None,
            depth: 0,
        })
        .collect();

    while let Some(Pending {
        op,
        inherited_parent,
        depth,
    }) = stack.pop()
    {
        match op {
            BatchOperation::Create {
                title,
                description,
                order,
                parent_id,
                children,
            } => {
                let new = NewTask {
                    title: title.clone(),
                    description,
                    parent_id: parent_id.or(inherited_parent),
                    order,
                };
                match store.create(new).await {
                    Ok(task) => {
                        report.mutated(depth, created_line(&task), saved(&mut changes));
                        report.created.push(task.id.clone());
                        for child in children.into_iter().rev() {
                            stack.push(Pending {
                                op: child,
                                inherited_parent: Some(task.id.clone()),
                                depth: depth + 1,
                            });
                        }
                    }
                    Err(e) => {
                        report.fail(
                            depth,
                            format!("Failed to create \"{}\": {}", title, failure(&e)),
                        );
                        let skipped: usize = children.iter().map(BatchOperation::total_len).sum();
                        if skipped > 0 {
                            report.skipped += skipped;
                            report.push(
                                depth + 1,
                                format!("Skipped {} nested operation(s) under \"{}\"", skipped, title),
                            );
                        }
                    }
                }
            }
            BatchOperation::Update {
                id,
                title,
                description,
                completed,
                order,
            } => {
                let patch = TaskPatch {
                    title,
                    description: description.map(Some),
                    completed,
                    order,
                };
                let result = store.update(&id, patch).await;
                record_update(&mut report, &mut changes, depth, &id, "Updated", result);
            }
            BatchOperation::Complete { id } => {
                let result = store.update(&id, TaskPatch::completed(true)).await;
                record_update(&mut report, &mut changes, depth, &id, "Completed", result);
            }
            BatchOperation::Reopen { id } => {
                let result = store.update(&id, TaskPatch::completed(false)).await;
                record_update(&mut report, &mut changes, depth, &id, "Reopened", result);
            }
            BatchOperation::Delete { id } => match store.delete(&id).await {
                Ok(true) => report.mutated(
                    depth,
                    format!("Deleted task {}", id),
                    saved(&mut changes),
                ),
                Ok(false) => report.fail(depth, format!("Task {} not found", id)),
                Err(e) => report.fail(
                    depth,
                    format!("Failed to delete task {}: {}", id, failure(&e)),
                ),
            },
            BatchOperation::Move {
                id,
                order,
                parent_id,
            } => match store.move_task(&id, MoveTarget { order, parent_id }).await {
                Ok(Some(task)) => report.mutated(depth, moved_line(&task), saved(&mut changes)),
                Ok(None) => report.fail(depth, format!("Task {} not found", id)),
                Err(e) => report.fail(
                    depth,
                    format!("Failed to move task {}: {}", id, failure(&e)),
                ),
            },
            BatchOperation::DeleteCompleted => match store.delete_completed().await {
                Ok(0) => report.ok(depth, "Deleted 0 completed task(s)".to_string()),
                Ok(count) => report.mutated(
                    depth,
                    format!("Deleted {} completed task(s)", count),
                    saved(&mut changes),
                ),
                Err(e) => report.fail(
                    depth,
                    format!("Failed to delete completed tasks: {}", failure(&e)),
                ),
            },
        }
    }

    if report.unsaved > 0 {
        warn!(unsaved = report.unsaved, "Batch changes were not persisted");
    }
    debug!(
        succeeded = report.succeeded,
        failed = report.failed,
        skipped = report.skipped,
        "Applied batch"
    );
    report
}

/// Whether the mutation that just returned published its change event.
///
/// The store publishes before returning, so the event is already queued.
fn saved(changes: &mut broadcast::Receiver<ChangeEvent>) -> bool {
    changes.try_recv().is_ok()
}

/// Error message tagged with its machine-readable code.
fn failure(e: &StoreError) -> String {
    format!("{} [{}]", e, e.code().as_str())
}

fn created_line(task: &Task) -> String {
    match task.parent_id {
        Some(ref parent) => format!(
            "Created task \"{}\" (id {}) under {}",
            task.title, task.id, parent
        ),
        None => format!("Created task \"{}\" (id {})", task.title, task.id),
    }
}

fn moved_line(task: &Task) -> String {
    match task.parent_id {
        Some(ref parent) => format!(
            "Moved task {} to position {} under {}",
            task.id, task.order, parent
        ),
        None => format!("Moved task {} to position {} at top level", task.id, task.order),
    }
}

fn record_update(
    report: &mut BatchReport,
    changes: &mut broadcast::Receiver<ChangeEvent>,
    depth: usize,
    id: &str,
    verb: &str,
    result: Result<Option<Task>, StoreError>,
) {
    match result {
        Ok(Some(task)) => report.mutated(
            depth,
            format!("{} task {} (\"{}\")", verb, id, task.title),
            saved(changes),
        ),
        Ok(None) => report.fail(depth, format!("Task {} not found", id)),
        Err(e) => report.fail(
            depth,
            format!(
                "Failed to {} task {}: {}",
                verb.to_lowercase(),
                id,
                failure(&e)
            ),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bare_list_and_wrapped() {
        let bare = r#"[{"action": "delete", "id": "3"}, {"action": "delete_completed"}]"#;
        let ops = parse_batch(bare).unwrap();
        assert_eq!(
            ops,
            vec![
                BatchOperation::Delete { id: "3".into() },
                BatchOperation::DeleteCompleted
            ]
        );

        let wrapped = r#"{"operations": [{"action": "move", "id": "2", "order": 0, "parentId": "1"}]}"#;
        let ops = parse_batch(wrapped).unwrap();
        assert_eq!(
            ops,
            vec![BatchOperation::Move {
                id: "2".into(),
                order: 0.0,
                parent_id: Some("1".into())
            }]
        );
    }

    #[test]
    fn test_parse_nested_create() {
        let json = r#"[{
            "action": "create",
            "title": "Release",
            "children": [
                {"action": "create", "title": "Tag"},
                {"action": "create", "title": "Publish", "children": [
                    {"action": "create", "title": "Announce"}
                ]}
            ]
        }]"#;
        let ops = parse_batch(json).unwrap();
        assert_eq!(ops.len(), 1);
        assert_eq!(ops[0].total_len(), 4);
    }

    #[test]
    fn test_unknown_action_rejected() {
        assert!(parse_batch(r#"[{"action": "explode", "id": "1"}]"#).is_err());
    }

    #[test]
    fn test_report_display() {
        let mut report = BatchReport::default();
        report.ok(0, "Created task \"A\" (id 1)".into());
        report.fail(1, "Task 9 not found".into());
        report.skipped = 2;
        assert_eq!(
            report.to_string(),
            "Created task \"A\" (id 1)\n  Task 9 not found\n1 succeeded, 1 failed, 2 skipped"
        );
    }
}
