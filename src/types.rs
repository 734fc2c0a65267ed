//! Core types for the task tree.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Position of a task among its siblings. Lower sorts first.
///
/// Any JSON number is accepted and kept as given; only a move renumbers a
/// sibling list to `0..n-1`.
pub type Order = f64;

/// Writes whole orders as JSON integers so renumbered documents read `"order": 2`.
mod order_number {
    use super::Order;
    use serde::{Deserialize, Deserializer, Serializer};

    /// Largest magnitude below which every whole `f64` is an exact `i64`.
    const EXACT_INT: f64 = 9_007_199_254_740_992.0;

    pub fn serialize<S: Serializer>(order: &Order, serializer: S) -> Result<S::Ok, S::Error> {
        if order.fract() == 0.0 && order.abs() < EXACT_INT {
            serializer.serialize_i64(*order as i64)
        } else {
            serializer.serialize_f64(*order)
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Order, D::Error> {
        Order::deserialize(deserializer)
    }
}

/// A task with its nested children, as persisted and as returned to callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub completed: bool,
    #[serde(default, with = "order_number")]
    pub order: Order,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub children: Vec<Task>,
    #[serde(default)]
    pub parent_id: Option<String>,
}

impl Task {
    /// Number of tasks in this subtree, including this one.
    pub fn subtree_len(&self) -> usize {
        1 + self.children.iter().map(Task::subtree_len).sum::<usize>()
    }
}

/// Whole persisted state: top-level tasks plus the id counter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskDocument {
    #[serde(default)]
    pub tasks: Vec<Task>,
    #[serde(default = "default_next_id")]
    pub next_id: u64,
}

fn default_next_id() -> u64 {
    1
}

impl Default for TaskDocument {
    fn default() -> Self {
        Self {
            tasks: Vec::new(),
            next_id: default_next_id(),
        }
    }
}

impl TaskDocument {
    /// Total number of tasks at every depth.
    pub fn task_count(&self) -> usize {
        self.tasks.iter().map(Task::subtree_len).sum()
    }
}

/// Input for creating a task.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTask {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub parent_id: Option<String>,
    #[serde(default)]
    pub order: Option<Order>,
}

impl NewTask {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_parent(mut self, parent_id: impl Into<String>) -> Self {
        self.parent_id = Some(parent_id.into());
        self
    }

    pub fn with_order(mut self, order: Order) -> Self {
        self.order = Some(order);
        self
    }
}

/// Partial update of a task's own fields.
///
/// `description: Some(None)` clears the description. Structural fields
/// (id, timestamps, children, parent) are not patchable.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub completed: Option<bool>,
    pub order: Option<Order>,
}

impl TaskPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.completed.is_none()
            && self.order.is_none()
    }

    pub fn completed(completed: bool) -> Self {
        Self {
            completed: Some(completed),
            ..Default::default()
        }
    }
}

/// Destination of a structural move.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveTarget {
    pub order: Order,
    /// `None` moves the task to the top level.
    #[serde(default)]
    pub parent_id: Option<String>,
}

impl MoveTarget {
    pub fn top_level(order: Order) -> Self {
        Self {
            order,
            parent_id: None,
        }
    }

    pub fn under(parent_id: impl Into<String>, order: Order) -> Self {
        Self {
            order,
            parent_id: Some(parent_id.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_defaults_when_fields_missing() {
        let doc: TaskDocument = serde_json::from_str("{}").unwrap();
        assert!(doc.tasks.is_empty());
        assert_eq!(doc.next_id, 1);
    }

    #[test]
    fn test_task_json_uses_camel_case_and_rehydrates_timestamps() {
        let json = r#"{
            "id": "1",
            "title": "Write docs",
            "completed": false,
            "order": 0,
            "createdAt": "2024-05-01T10:00:00Z",
            "updatedAt": "2024-05-01T11:30:00.250Z",
            "children": [],
            "parentId": null
        }"#;
        let task: Task = serde_json::from_str(json).unwrap();
        assert_eq!(task.updated_at.timestamp_millis() % 1000, 250);
        assert!(task.parent_id.is_none());

        let value = serde_json::to_value(&task).unwrap();
        assert!(value.get("createdAt").is_some());
        assert!(value.get("parentId").is_some());
        assert!(value.get("description").is_none());
    }

    #[test]
    fn test_task_count_includes_nested() {
        let now = Utc::now();
        let leaf = |id: &str| Task {
            id: id.to_string(),
            title: id.to_string(),
            description: None,
            completed: false,
            order: 0.0,
            created_at: now,
            updated_at: now,
            children: vec![],
            parent_id: None,
        };
        let mut root = leaf("1");
        root.children.push(leaf("2"));
        root.children[0].children.push(leaf("3"));
        let doc = TaskDocument {
            tasks: vec![root, leaf("4")],
            next_id: 5,
        };
        assert_eq!(doc.task_count(), 4);
    }

    #[test]
    fn test_fractional_and_negative_orders_kept_as_given() {
        let json = r#"{
            "id": "1",
            "title": "Halfway",
            "order": 1.5,
            "createdAt": "2024-05-01T10:00:00Z",
            "updatedAt": "2024-05-01T10:00:00Z",
            "children": [{
                "id": "2",
                "title": "Before",
                "order": -2,
                "createdAt": "2024-05-01T10:00:00Z",
                "updatedAt": "2024-05-01T10:00:00Z"
            }]
        }"#;
        let task: Task = serde_json::from_str(json).unwrap();
        assert_eq!(task.order, 1.5);
        assert_eq!(task.children[0].order, -2.0);

        let value = serde_json::to_value(&task).unwrap();
        assert_eq!(value["order"], serde_json::json!(1.5));
        assert_eq!(value["children"][0]["order"], serde_json::json!(-2));
        assert!(value["children"][0]["order"].is_i64());
    }

    #[test]
    fn test_patch_is_empty() {
        assert!(TaskPatch::default().is_empty());
        assert!(!TaskPatch::completed(true).is_empty());
    }
}
