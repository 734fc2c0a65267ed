//! In-memory document store.

use super::DocumentStore;
use crate::error::DocumentError;
use crate::types::TaskDocument;
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Document store that keeps the document in memory.
///
/// Clones share the same document, so a test can hand one clone to the task
/// store and inspect what was written through another.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Inner>,
}

#[derive(Default)]
struct Inner {
    doc: Mutex<TaskDocument>,
    fail_writes: AtomicBool,
    writes: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing document.
    pub fn with_document(doc: TaskDocument) -> Self {
        let store = Self::default();
        *store.inner.doc.lock().unwrap() = doc;
        store
    }

    /// Make subsequent writes fail with [`DocumentError::WriteRejected`].
    pub fn set_fail_writes(&self, fail: bool) {
        self.inner.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// The last successfully written (or initial) document.
    pub fn snapshot(&self) -> TaskDocument {
        self.inner.doc.lock().unwrap().clone()
    }

    /// Number of successful writes.
    pub fn write_count(&self) -> usize {
        self.inner.writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn read(&self) -> Result<TaskDocument, DocumentError> {
        Ok(self.snapshot())
    }

    async fn write(&self, doc: &TaskDocument) -> Result<(), DocumentError> {
        if self.inner.fail_writes.load(Ordering::SeqCst) {
            return Err(DocumentError::WriteRejected);
        }
        *self.inner.doc.lock().unwrap() = doc.clone();
        self.inner.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_clones_share_document() {
        let store = MemoryStore::new();
        let handle = store.clone();

        let doc = TaskDocument {
            tasks: vec![],
            next_id: 42,
        };
        store.write(&doc).await.unwrap();

        assert_eq!(handle.snapshot().next_id, 42);
        assert_eq!(handle.write_count(), 1);
    }

    #[tokio::test]
    async fn test_failing_writes_keep_previous_document() {
        let store = MemoryStore::with_document(TaskDocument {
            tasks: vec![],
            next_id: 7,
        });
        store.set_fail_writes(true);

        let result = store.write(&TaskDocument::default()).await;
        assert!(matches!(result, Err(DocumentError::WriteRejected)));
        assert_eq!(store.read().await.unwrap().next_id, 7);
        assert_eq!(store.write_count(), 0);
    }
}
