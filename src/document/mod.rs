//! Document-store backends for the task forest.
//!
//! The store reads the whole [`TaskDocument`] once when it is bound and writes
//! the whole document back after every committed mutation.

mod file;
mod memory;

pub use file::{JsonFileStore, decode_document, encode_document};
pub use memory::MemoryStore;

use crate::error::DocumentError;
use crate::types::TaskDocument;
use async_trait::async_trait;

/// Persistence collaborator for [`crate::store::TaskStore`].
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Load the persisted document. An absent document reads as empty.
    async fn read(&self) -> Result<TaskDocument, DocumentError>;

    /// Replace the persisted document.
    async fn write(&self, doc: &TaskDocument) -> Result<(), DocumentError>;

    /// Short human-readable location, used in log lines.
    fn describe(&self) -> String;
}
