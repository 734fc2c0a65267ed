//! task-tree library
//!
//! A hierarchical task store persisted as a single JSON document. The
//! binary is a thin CLI over [`store::TaskStore`]; everything here is
//! exported for testing and embedding.

pub mod batch;
pub mod cli;
pub mod config;
pub mod document;
pub mod error;
pub mod format;
pub mod logging;
pub mod store;
pub mod subscriptions;
pub mod types;
