//! NodeStore Trait - Database Abstraction Layer
//!
//! This module defines the `NodeStore` and `StoreTx` traits that separate the
//! tree services (validation, ordering, move coordination) from the SQL that
//! persists nodes.
//!
//! # Architecture
//!
//! - **Abstraction Point**: Between `KnowledgeTreeService` and the libsql backend
//! - **Reads outside transactions**: whole-tree and single-node reads for the
//!   tree builder and `GetNode`
//! - **Writes inside transactions**: every mutation obtains a `StoreTx` from
//!   `begin()`; the transaction holds the write lock from its first statement,
//!   so read-decide-write sequences cannot interleave with another writer
//!
//! # Design Decisions
//!
//! 1. **Async-First**: All methods are async
//! 2. **Scoped by knowledge base**: every method takes the knowledge base id and
//!    never touches rows of another knowledge base
//! 3. **Explicit root group**: `parent_id: None` addresses the root sibling group
//! 4. **Consuming finish**: `commit`/`rollback` take `Box<Self>` so a finished
//!    transaction cannot be used again; dropping an unfinished one rolls it back
//!
//! # Examples
//!
//! ```rust,no_run
//! use knowtree_core::db::{DatabaseService, NodeStore, TursoStore};
//! use std::path::PathBuf;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let db = Arc::new(DatabaseService::new(PathBuf::from("./data/knowtree.db")).await?);
//!     let store: Arc<dyn NodeStore> = Arc::new(TursoStore::new(db));
//!
//!     let nodes = store.list_nodes("kb-1").await?;
//!     println!("{} nodes", nodes.len());
//!     Ok(())
//! }
//! ```

use crate::db::error::DatabaseError;
use crate::db::ordering::SiblingKey;
use crate::models::{Node, NodeUpdate};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Persistence operations for knowledge base trees
///
/// Implementations must be `Send + Sync` so a single store can be shared
/// across request handlers.
#[async_trait]
pub trait NodeStore: Send + Sync {
    /// Open a write transaction holding the store's write lock
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError::Busy` if the lock could not be taken within the
    /// busy timeout.
    async fn begin(&self) -> Result<Box<dyn StoreTx>, DatabaseError>;

    /// Get one node of a knowledge base
    ///
    /// - `Ok(Some(node))` if the node exists in that knowledge base
    /// - `Ok(None)` otherwise (including when it exists in another knowledge base)
    async fn get_node(&self, kb_id: &str, id: &str) -> Result<Option<Node>, DatabaseError>;

    /// Every node of a knowledge base in one pass, unordered
    async fn list_nodes(&self, kb_id: &str) -> Result<Vec<Node>, DatabaseError>;

    /// Members of one sibling group ordered by `(sort_key, id)`
    async fn list_siblings(
        &self,
        kb_id: &str,
        parent_id: Option<&str>,
    ) -> Result<Vec<Node>, DatabaseError>;
}

/// One open write transaction
///
/// All reads observe the transaction's own writes.
#[async_trait]
pub trait StoreTx: Send {
    async fn get_node(&mut self, kb_id: &str, id: &str) -> Result<Option<Node>, DatabaseError>;

    /// Ids of the direct children of `parent_id`
    async fn child_ids(&mut self, kb_id: &str, parent_id: &str)
        -> Result<Vec<String>, DatabaseError>;

    /// Keys of one sibling group ordered by `(sort_key, id)`
    async fn sibling_keys(
        &mut self,
        kb_id: &str,
        parent_id: Option<&str>,
    ) -> Result<Vec<SiblingKey>, DatabaseError>;

    /// Largest key in a sibling group, `None` when the group is empty
    async fn max_sort_key(
        &mut self,
        kb_id: &str,
        parent_id: Option<&str>,
    ) -> Result<Option<i64>, DatabaseError>;

    async fn insert_node(&mut self, node: &Node) -> Result<(), DatabaseError>;

    /// Replace title and content; `false` when no such node
    async fn update_text(
        &mut self,
        kb_id: &str,
        id: &str,
        update: &NodeUpdate,
        at: DateTime<Utc>,
    ) -> Result<bool, DatabaseError>;

    /// Set parent and key together; `false` when no such node
    async fn set_placement(
        &mut self,
        kb_id: &str,
        id: &str,
        parent_id: Option<&str>,
        sort_key: i64,
        at: DateTime<Utc>,
    ) -> Result<bool, DatabaseError>;

    /// Set only the key (rebalance writes); `false` when no such node
    async fn set_sort_key(
        &mut self,
        kb_id: &str,
        id: &str,
        sort_key: i64,
        at: DateTime<Utc>,
    ) -> Result<bool, DatabaseError>;

    /// Delete one row; `false` when no such node
    async fn delete_node(&mut self, kb_id: &str, id: &str) -> Result<bool, DatabaseError>;

    async fn commit(self: Box<Self>) -> Result<(), DatabaseError>;

    async fn rollback(self: Box<Self>) -> Result<(), DatabaseError>;
}
