//! Hierarchical task store.
//!
//! [`TaskStore`] owns the in-memory forest, keeps sibling order, and writes
//! the whole forest to its [`DocumentStore`] after every committed mutation.
//!
//! Durability is best effort: when a write fails the mutation stays in memory,
//! a warning is logged, and no change event is published.

mod forest;

use crate::document::DocumentStore;
use crate::error::{StoreError, StoreResult};
use crate::subscriptions::{ChangeEvent, ChangeKind, ChangeNotifier};
use crate::types::{MoveTarget, NewTask, Order, Task, TaskDocument, TaskPatch};
use chrono::Utc;
use forest::{Forest, Node};
use std::sync::Arc;
use tokio::sync::{Mutex, broadcast};
use tracing::{debug, info, warn};

/// Handle to the task store. Clones share the same forest.
#[derive(Clone)]
pub struct TaskStore {
    state: Arc<Mutex<Option<Bound>>>,
    notifier: ChangeNotifier,
}

/// State of a store bound to its document store.
struct Bound {
    documents: Arc<dyn DocumentStore>,
    forest: Forest,
    next_id: u64,
}

impl Bound {
    fn document(&self) -> TaskDocument {
        TaskDocument {
            tasks: self.forest.to_tasks(),
            next_id: self.next_id,
        }
    }

    /// Write the forest and publish `event` if the write went through.
    async fn commit(&self, notifier: &ChangeNotifier, event: ChangeEvent) {
        match self.documents.write(&self.document()).await {
            Ok(()) => notifier.publish(event),
            Err(e) => warn!(
                store = %self.documents.describe(),
                change = event.kind.as_str(),
                "Failed to persist tasks, keeping in-memory state: {}",
                e
            ),
        }
    }
}

impl TaskStore {
    /// Create an unbound store. Every operation fails with
    /// [`StoreError::Uninitialized`] until [`TaskStore::bind`] succeeds.
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(None)),
            notifier: ChangeNotifier::new(),
        }
    }

    /// Create a store and bind it in one step.
    pub async fn open(documents: Arc<dyn DocumentStore>) -> StoreResult<Self> {
        let store = Self::new();
        store.bind(documents).await?;
        Ok(store)
    }

    /// Bind to a document store, loading its forest. Rebinding replaces the
    /// collaborator and reloads.
    pub async fn bind(&self, documents: Arc<dyn DocumentStore>) -> StoreResult<()> {
        let doc = documents.read().await?;
        let forest = Forest::from_tasks(doc.tasks)?;
        let next_id = next_id_floor(doc.next_id, &forest);

        info!(
            store = %documents.describe(),
            tasks = forest.len(),
            next_id,
            "Task store bound"
        );

        *self.state.lock().await = Some(Bound {
            documents,
            forest,
            next_id,
        });
        Ok(())
    }

    pub async fn is_bound(&self) -> bool {
        self.state.lock().await.is_some()
    }

    /// Receive a [`ChangeEvent`] after each persisted mutation.
    pub fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.notifier.subscribe()
    }

    /// The whole forest, sorted by `order` at every level.
    pub async fn get_all(&self) -> StoreResult<Vec<Task>> {
        let state = self.state.lock().await;
        let bound = state.as_ref().ok_or(StoreError::Uninitialized)?;
        Ok(bound.forest.sorted_roots())
    }

    /// Find a task anywhere in the forest.
    pub async fn get_by_id(&self, id: &str) -> StoreResult<Option<Task>> {
        let state = self.state.lock().await;
        let bound = state.as_ref().ok_or(StoreError::Uninitialized)?;
        Ok(bound.forest.snapshot(id))
    }

    /// Create a task at the top level or under an existing parent.
    ///
    /// The new task is appended to its sibling list, which is then
    /// stable-sorted by `order`; equal orders keep insertion order.
    pub async fn create(&self, new: NewTask) -> StoreResult<Task> {
        if new.title.trim().is_empty() {
            return Err(StoreError::missing_field("title"));
        }
        if let Some(order) = new.order {
            check_order(order)?;
        }

        let mut state = self.state.lock().await;
        let bound = state.as_mut().ok_or(StoreError::Uninitialized)?;

        if let Some(ref parent_id) = new.parent_id
            && !bound.forest.contains(parent_id)
        {
            return Err(StoreError::ParentNotFound(parent_id.clone()));
        }

        let id = bound.next_id.to_string();
        bound.next_id += 1;

        let parent = new.parent_id.as_deref();
        let mut node = Node::new(
            id.clone(),
            new.title,
            new.description,
            new.order.unwrap_or(0.0),
        );
        node.parent = new.parent_id.clone();
        let task = node.to_task(Vec::new());
        bound.forest.insert(node, parent);
        bound.forest.sort_siblings(parent);

        debug!(task_id = %id, parent_id = ?parent, "Created task");

        bound
            .commit(&self.notifier, ChangeEvent::for_task(ChangeKind::Created, &id))
            .await;
        Ok(task)
    }

    /// Merge `patch` into a task's own fields.
    ///
    /// `order` is stored as given; the sibling list is neither resorted nor
    /// renormalized. Use [`TaskStore::move_task`] for structural moves.
    pub async fn update(&self, id: &str, patch: TaskPatch) -> StoreResult<Option<Task>> {
        let mut state = self.state.lock().await;
        let bound = state.as_mut().ok_or(StoreError::Uninitialized)?;

        let Some(node) = bound.forest.get_mut(id) else {
            return Ok(None);
        };

        if let Some(ref title) = patch.title
            && title.trim().is_empty()
        {
            return Err(StoreError::invalid_value("title", "title must not be empty"));
        }
        if let Some(order) = patch.order {
            check_order(order)?;
        }

        if let Some(title) = patch.title {
            node.title = title;
        }
        if let Some(description) = patch.description {
            node.description = description;
        }
        if let Some(completed) = patch.completed {
            node.completed = completed;
        }
        if let Some(order) = patch.order {
            node.order = order;
        }
        node.updated_at = Utc::now();

        debug!(task_id = %id, "Updated task");

        let task = bound.forest.snapshot(id);
        bound
            .commit(&self.notifier, ChangeEvent::for_task(ChangeKind::Updated, id))
            .await;
        Ok(task)
    }

    /// Delete a task and its subtree. Remaining siblings keep their orders.
    pub async fn delete(&self, id: &str) -> StoreResult<bool> {
        let mut state = self.state.lock().await;
        let bound = state.as_mut().ok_or(StoreError::Uninitialized)?;

        let Some(removed) = bound.forest.remove_subtree(id) else {
            return Ok(false);
        };

        debug!(task_id = %id, removed, "Deleted task subtree");

        bound
            .commit(&self.notifier, ChangeEvent::for_task(ChangeKind::Deleted, id))
            .await;
        Ok(true)
    }

    /// Delete every completed task together with its subtree.
    ///
    /// Returns the number of tasks that were themselves completed. Incomplete
    /// descendants of a completed task are removed too but not counted.
    pub async fn delete_completed(&self) -> StoreResult<usize> {
        let mut state = self.state.lock().await;
        let bound = state.as_mut().ok_or(StoreError::Uninitialized)?;

        let completed = bound.forest.completed_ids();
        if completed.is_empty() {
            return Ok(0);
        }

        let mut removed = 0;
        for id in &completed {
            // Already gone if an ancestor was completed too.
            removed += bound.forest.remove_subtree(id).unwrap_or(0);
        }

        debug!(completed = completed.len(), removed, "Cleared completed tasks");

        bound
            .commit(
                &self.notifier,
                ChangeEvent::forest(ChangeKind::CompletedCleared),
            )
            .await;
        Ok(completed.len())
    }

    /// Reorder and optionally reparent a task.
    ///
    /// The requested order is clamped into the destination list. An unknown
    /// destination parent falls back to the top level. Both the destination
    /// and the source sibling lists end up with contiguous orders.
    pub async fn move_task(&self, id: &str, target: MoveTarget) -> StoreResult<Option<Task>> {
        check_order(target.order)?;

        let mut state = self.state.lock().await;
        let bound = state.as_mut().ok_or(StoreError::Uninitialized)?;
        let forest = &mut bound.forest;

        if !forest.contains(id) {
            return Ok(None);
        }

        if let Some(ref parent_id) = target.parent_id
            && forest.is_self_or_descendant(parent_id, id)
        {
            return Err(StoreError::InvalidMove {
                id: id.to_string(),
                parent_id: parent_id.clone(),
            });
        }

        let source = forest.detach(id).flatten();

        let destination = match target.parent_id {
            None => None,
            Some(parent_id) if forest.contains(&parent_id) => Some(parent_id),
            Some(parent_id) => {
                warn!(
                    task_id = %id,
                    parent_id = %parent_id,
                    "Move target parent not found, moving to top level"
                );
                None
            }
        };

        // Positions refer to the visible, order-sorted list.
        forest.sort_siblings(destination.as_deref());
        let len = forest.siblings(destination.as_deref()).len();
        // Fractional positions round down.
        let index = target.order.clamp(0.0, len as Order) as usize;
        forest.attach_at(id, destination.as_deref(), index);

        if let Some(node) = forest.get_mut(id) {
            node.updated_at = Utc::now();
        }

        forest.renormalize(destination.as_deref());
        if source != destination {
            forest.sort_siblings(source.as_deref());
            forest.renormalize(source.as_deref());
        }

        debug!(
            task_id = %id,
            from = ?source,
            to = ?destination,
            index,
            "Moved task"
        );

        let task = forest.snapshot(id);
        bound
            .commit(&self.notifier, ChangeEvent::for_task(ChangeKind::Moved, id))
            .await;
        Ok(task)
    }

    /// The persisted shape of the current forest.
    pub async fn export(&self) -> StoreResult<TaskDocument> {
        let state = self.state.lock().await;
        let bound = state.as_ref().ok_or(StoreError::Uninitialized)?;
        Ok(bound.document())
    }

    /// Replace the whole forest with `doc`. Returns the number of tasks
    /// imported.
    ///
    /// Rejects duplicate ids and empty titles. `nextId` is raised above every
    /// numeric id in the document so new ids never collide.
    pub async fn import(&self, doc: TaskDocument) -> StoreResult<usize> {
        let forest = validate_forest(doc.tasks)?;
        let next_id = next_id_floor(doc.next_id, &forest);

        let mut state = self.state.lock().await;
        let bound = state.as_mut().ok_or(StoreError::Uninitialized)?;

        let count = forest.len();
        bound.forest = forest;
        bound.next_id = next_id;

        info!(tasks = count, next_id, "Imported task document");

        bound
            .commit(&self.notifier, ChangeEvent::forest(ChangeKind::Replaced))
            .await;
        Ok(count)
    }
}

impl Default for TaskStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse a document's tasks into a forest, rejecting empty titles.
pub fn validate_document(tasks: Vec<Task>) -> StoreResult<usize> {
    validate_forest(tasks).map(|forest| forest.len())
}

fn validate_forest(tasks: Vec<Task>) -> StoreResult<Forest> {
    let forest = Forest::from_tasks(tasks)?;
    if let Some(node) = forest.nodes().find(|n| n.title.trim().is_empty()) {
        return Err(StoreError::invalid_value(
            "title",
            format!("task {} has an empty title", node.id),
        ));
    }
    Ok(forest)
}

/// NaN and infinities cannot be written back as JSON numbers.
fn check_order(order: Order) -> StoreResult<()> {
    if order.is_finite() {
        Ok(())
    } else {
        Err(StoreError::invalid_value(
            "order",
            format!("order must be a finite number, got {}", order),
        ))
    }
}

/// Smallest safe `nextId`: never below the stored counter, always above any
/// numeric id already present.
fn next_id_floor(stored: u64, forest: &Forest) -> u64 {
    let above_existing = forest.max_numeric_id().map_or(1, |max| max + 1);
    stored.max(above_existing).max(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::MemoryStore;

    async fn open_memory() -> (TaskStore, MemoryStore) {
        let documents = MemoryStore::new();
        let store = TaskStore::open(Arc::new(documents.clone())).await.unwrap();
        (store, documents)
    }

    #[tokio::test]
    async fn test_ids_are_sequential_and_never_reused() {
        let (store, _) = open_memory().await;
        let a = store.create(NewTask::new("A")).await.unwrap();
        let b = store.create(NewTask::new("B")).await.unwrap();
        assert_eq!(a.id, "1");
        assert_eq!(b.id, "2");

        assert!(store.delete(&b.id).await.unwrap());
        let c = store.create(NewTask::new("C")).await.unwrap();
        assert_eq!(c.id, "3");
    }

    #[tokio::test]
    async fn test_bind_raises_stale_next_id_above_existing_ids() {
        let seed = MemoryStore::new();
        let seeded = TaskStore::open(Arc::new(seed.clone())).await.unwrap();
        for title in ["a", "b", "c"] {
            seeded.create(NewTask::new(title)).await.unwrap();
        }
        let mut doc = seed.snapshot();
        doc.next_id = 2;

        let store = TaskStore::open(Arc::new(MemoryStore::with_document(doc)))
            .await
            .unwrap();
        let created = store.create(NewTask::new("d")).await.unwrap();
        assert_eq!(created.id, "4");
    }

    #[test]
    fn test_next_id_floor_of_empty_forest() {
        let forest = Forest::default();
        assert_eq!(next_id_floor(0, &forest), 1);
        assert_eq!(next_id_floor(5, &forest), 5);
    }

    #[tokio::test]
    async fn test_create_persists_before_returning() {
        let (store, documents) = open_memory().await;
        store.create(NewTask::new("Persist me")).await.unwrap();

        let doc = documents.snapshot();
        assert_eq!(doc.tasks.len(), 1);
        assert_eq!(doc.next_id, 2);
        assert_eq!(documents.write_count(), 1);
    }

    #[tokio::test]
    async fn test_unknown_ids_do_not_write() {
        let (store, documents) = open_memory().await;
        assert!(store.get_by_id("404").await.unwrap().is_none());
        assert!(
            store
                .update("404", TaskPatch::completed(true))
                .await
                .unwrap()
                .is_none()
        );
        assert!(!store.delete("404").await.unwrap());
        assert!(
            store
                .move_task("404", MoveTarget::top_level(0.0))
                .await
                .unwrap()
                .is_none()
        );
        assert_eq!(store.delete_completed().await.unwrap(), 0);
        assert_eq!(documents.write_count(), 0);
    }

    #[tokio::test]
    async fn test_non_finite_orders_rejected() {
        let (store, documents) = open_memory().await;
        let task = store.create(NewTask::new("A")).await.unwrap();
        let writes = documents.write_count();

        assert!(store.create(NewTask::new("B").with_order(f64::NAN)).await.is_err());
        let patch = TaskPatch {
            order: Some(f64::INFINITY),
            ..Default::default()
        };
        assert!(store.update(&task.id, patch).await.is_err());
        assert!(
            store
                .move_task(&task.id, MoveTarget::top_level(f64::NEG_INFINITY))
                .await
                .is_err()
        );
        assert_eq!(documents.write_count(), writes);
    }

    #[tokio::test]
    async fn test_validate_document_rejects_blank_titles() {
        let (store, _) = open_memory().await;
        store.create(NewTask::new("fine")).await.unwrap();
        let mut doc = store.export().await.unwrap();
        doc.tasks[0].title = "   ".into();

        assert!(validate_document(doc.tasks.clone()).is_err());
        assert!(matches!(
            store.import(doc).await,
            Err(StoreError::Validation { .. })
        ));
    }
}
