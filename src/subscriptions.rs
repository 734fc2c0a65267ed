//! Change notification for the task store.
//!
//! After a mutation has been written to the document store, the task store
//! publishes a [`ChangeEvent`] on a broadcast channel. Consumers such as a tree
//! view call [`ChangeNotifier::subscribe`] and re-read the store
//! when an event arrives. Events are only published for successful writes.

use tokio::sync::broadcast;

/// Buffered events per subscriber before slow receivers start lagging.
const CHANNEL_CAPACITY: usize = 64;

/// Category of a committed mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeKind {
    /// A task was created.
    Created,
    /// A task's own fields were updated.
    Updated,
    /// A task and its subtree were deleted.
    Deleted,
    /// A task was reordered or reparented.
    Moved,
    /// Completed tasks were swept.
    CompletedCleared,
    /// The whole forest was replaced (import).
    Replaced,
}

impl ChangeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeKind::Created => "created",
            ChangeKind::Updated => "updated",
            ChangeKind::Deleted => "deleted",
            ChangeKind::Moved => "moved",
            ChangeKind::CompletedCleared => "completed_cleared",
            ChangeKind::Replaced => "replaced",
        }
    }
}

/// A committed, persisted mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    pub kind: ChangeKind,
    /// The task the mutation targeted, if it targeted a single task.
    pub task_id: Option<String>,
}

impl ChangeEvent {
    pub fn for_task(kind: ChangeKind, task_id: impl Into<String>) -> Self {
        Self {
            kind,
            task_id: Some(task_id.into()),
        }
    }

    pub fn forest(kind: ChangeKind) -> Self {
        Self {
            kind,
            task_id: None,
        }
    }
}

/// Fan-out of change events to any number of subscribers.
#[derive(Debug, Clone)]
pub struct ChangeNotifier {
    sender: broadcast::Sender<ChangeEvent>,
}

impl ChangeNotifier {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { sender }
    }

    /// Register a new subscriber. It sees events published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.sender.subscribe()
    }

    /// Number of live subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Publish an event. Having no subscribers is not an error.
    pub fn publish(&self, event: ChangeEvent) {
        let _ = self.sender.send(event);
    }
}

impl Default for ChangeNotifier {
    fn default() -> Self {
        Self::new()
    }
}
