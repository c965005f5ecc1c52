//! Knowledge Tree Service - Core Tree Operations
//!
//! This module provides the operations a request layer invokes on the folder
//! and file tree of a knowledge base:
//!
//! - Create, read, update and cascade delete of nodes
//! - Full tree assembly for a knowledge base
//! - Moving nodes before/after siblings or inside folders
//!
//! # Architecture
//!
//! `KnowledgeTreeService` holds no mutable state of its own; the store is the
//! only shared state. Every mutation runs in one store transaction. Reads and
//! writes are gated by a `PermissionOracle` for the user the service was
//! scoped to with `with_user`.
//!
//! # Examples
//!
//! ```no_run
//! use knowtree_core::db::{DatabaseService, TursoStore};
//! use knowtree_core::models::{NewNode, Position};
//! use knowtree_core::services::KnowledgeTreeService;
//! use std::path::PathBuf;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let db = Arc::new(DatabaseService::new(PathBuf::from("./data/knowtree.db")).await?);
//!     let service = KnowledgeTreeService::new(Arc::new(TursoStore::new(db))).with_user("alice");
//!
//!     let docs = service.create_node(NewNode::folder("kb-1", None, "Docs")).await?;
//!     let readme = service.create_node(NewNode::file("kb-1", None, "README", "# Hi")).await?;
//!     let forest = service
//!         .move_node("kb-1", &readme.id, &docs.id, Position::Inside)
//!         .await?;
//!     println!("{}", serde_json::to_string_pretty(&forest)?);
//!     Ok(())
//! }
//! ```

use crate::config::{TreeConfig, DEFAULT_MAX_MOVE_ATTEMPTS};
use crate::db::{Anchor, NodeStore, Placement, SortKeyCalculator, StoreTx};
use crate::models::{Forest, NewNode, Node, NodeUpdate, Position};
use crate::services::error::TreeServiceError;
use crate::services::hierarchy;
use crate::services::move_coordinator::MoveCoordinator;
use crate::services::permissions::{AccessLevel, AllowAll, PermissionOracle};
use crate::services::tree_builder::build_forest;
use chrono::Utc;
use std::sync::Arc;

/// Tree operations for all knowledge bases of one store
#[derive(Clone)]
pub struct KnowledgeTreeService {
    store: Arc<dyn NodeStore>,

    oracle: Arc<dyn PermissionOracle>,

    calculator: SortKeyCalculator,

    max_move_attempts: u32,

    /// Authenticated identity every operation is checked against
    ///
    /// `None` until `with_user` is called; an unscoped service rejects every
    /// operation with `Unauthenticated`.
    user_id: Option<String>,
}

impl KnowledgeTreeService {
    /// Create a service over `store` with default ordering settings and the
    /// `AllowAll` oracle
    pub fn new(store: Arc<dyn NodeStore>) -> Self {
        Self {
            store,
            oracle: Arc::new(AllowAll),
            calculator: SortKeyCalculator::default(),
            max_move_attempts: DEFAULT_MAX_MOVE_ATTEMPTS,
            user_id: None,
        }
    }

    pub fn with_oracle(mut self, oracle: Arc<dyn PermissionOracle>) -> Self {
        self.oracle = oracle;
        self
    }

    /// Apply rebalance stride and move retry budget from configuration
    pub fn with_config(mut self, config: &TreeConfig) -> Self {
        self.calculator = SortKeyCalculator::new(config.rebalance_stride);
        self.max_move_attempts = config.max_move_attempts.max(1);
        self
    }

    /// Create a copy scoped to an authenticated user
    ///
    /// The store and oracle are shared with `self`.
    pub fn with_user(&self, user_id: impl Into<String>) -> Self {
        let mut cloned = self.clone();
        cloned.user_id = Some(user_id.into());
        cloned
    }

    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }

    async fn authorize(&self, kb_id: &str, level: AccessLevel) -> Result<(), TreeServiceError> {
        let user_id = self
            .user_id
            .as_deref()
            .ok_or(TreeServiceError::Unauthenticated)?;

        if kb_id.is_empty() {
            return Err(TreeServiceError::invalid_argument(
                "knowledge base id must not be empty",
            ));
        }

        if self.oracle.has_permission(kb_id, user_id, level).await? {
            Ok(())
        } else {
            Err(TreeServiceError::permission_denied(kb_id, user_id, level.as_str()))
        }
    }

    /// Create a folder or file
    ///
    /// Without an explicit `sort_key` the node is appended to its sibling
    /// group (`max + 1`, or `1` for an empty group). When the group has no key
    /// left above its maximum it is rebalanced in the same transaction.
    ///
    /// # Errors
    ///
    /// - `InvalidArgument` for a blank title, an empty parent id, a parent
    ///   that is not a folder, or an explicit `sort_key` already used by a
    ///   sibling
    /// - `NodeNotFound` if the parent does not exist in the knowledge base
    pub async fn create_node(&self, new_node: NewNode) -> Result<Node, TreeServiceError> {
        self.authorize(&new_node.knowledge_base_id, AccessLevel::Write)
            .await?;
        new_node.validate()?;

        let mut tx = self.store.begin().await?;
        let result = self.insert(tx.as_mut(), new_node).await;
        let node = Self::finish(tx, result).await?;

        tracing::info!(
            "Created {} node {} in knowledge base {} (sort key {})",
            node.kind,
            node.id,
            node.knowledge_base_id,
            node.sort_key
        );
        Ok(node)
    }

    async fn insert(
        &self,
        tx: &mut dyn StoreTx,
        new_node: NewNode,
    ) -> Result<Node, TreeServiceError> {
        let kb_id = new_node.knowledge_base_id.clone();

        if let Some(parent_id) = new_node.parent_id.as_deref() {
            let parent = tx
                .get_node(&kb_id, parent_id)
                .await?
                .ok_or_else(|| TreeServiceError::node_not_found(parent_id))?;
            if !parent.is_folder() {
                return Err(TreeServiceError::invalid_argument(format!(
                    "parent {} is a {} and cannot contain children",
                    parent.id, parent.kind
                )));
            }
        }

        let parent_id = new_node.parent_id.clone();
        let siblings = tx.sibling_keys(&kb_id, parent_id.as_deref()).await?;
        let requested = new_node.sort_key;
        let mut node = Node::from_new(new_node, 0);

        node.sort_key = match requested {
            Some(key) => {
                if let Some(taken) = siblings.iter().find(|s| s.sort_key == key) {
                    return Err(TreeServiceError::invalid_argument(format!(
                        "sort key {} is already used by sibling {}",
                        key, taken.id
                    )));
                }
                key
            }
            None => {
                let placement = self.calculator.place(&siblings, &node.id, Anchor::End)?;
                if let Placement::Rebalanced { siblings: respaced, .. } = &placement {
                    tracing::warn!(
                        "Sort keys exhausted in group {} of knowledge base {}; rebalancing {} siblings",
                        parent_id.as_deref().unwrap_or("<root>"),
                        kb_id,
                        respaced.len()
                    );
                    for sibling in respaced {
                        let unchanged = siblings
                            .iter()
                            .any(|s| s.id == sibling.id && s.sort_key == sibling.sort_key);
                        if unchanged {
                            continue;
                        }
                        if !tx
                            .set_sort_key(&kb_id, &sibling.id, sibling.sort_key, node.created_at)
                            .await?
                        {
                            return Err(TreeServiceError::conflict(format!(
                                "sibling {} disappeared during rebalance",
                                sibling.id
                            )));
                        }
                    }
                }
                placement.key()
            }
        };
        tracing::debug!("Computed sort key {} for new node", node.sort_key);

        tx.insert_node(&node).await?;
        Ok(node)
    }

    /// Ordered forest of a knowledge base; empty for an unknown knowledge base
    pub async fn get_tree(&self, kb_id: &str) -> Result<Forest, TreeServiceError> {
        self.authorize(kb_id, AccessLevel::Read).await?;
        let nodes = self.store.list_nodes(kb_id).await?;
        Ok(build_forest(nodes))
    }

    pub async fn get_node(&self, kb_id: &str, node_id: &str) -> Result<Node, TreeServiceError> {
        self.authorize(kb_id, AccessLevel::Read).await?;
        self.store
            .get_node(kb_id, node_id)
            .await?
            .ok_or_else(|| TreeServiceError::node_not_found(node_id))
    }

    /// Direct children of `parent_id` (roots for `None`), ordered by key
    pub async fn get_siblings(
        &self,
        kb_id: &str,
        parent_id: Option<&str>,
    ) -> Result<Vec<Node>, TreeServiceError> {
        self.authorize(kb_id, AccessLevel::Read).await?;
        Ok(self.store.list_siblings(kb_id, parent_id).await?)
    }

    /// Replace title and content of a node
    pub async fn update_node(
        &self,
        kb_id: &str,
        node_id: &str,
        update: NodeUpdate,
    ) -> Result<Node, TreeServiceError> {
        self.authorize(kb_id, AccessLevel::Write).await?;
        update.validate()?;

        let mut tx = self.store.begin().await?;
        let result = Self::apply_update(tx.as_mut(), kb_id, node_id, &update).await;
        let node = Self::finish(tx, result).await?;

        tracing::info!("Updated node {} in knowledge base {}", node_id, kb_id);
        Ok(node)
    }

    async fn apply_update(
        tx: &mut dyn StoreTx,
        kb_id: &str,
        node_id: &str,
        update: &NodeUpdate,
    ) -> Result<Node, TreeServiceError> {
        if !tx.update_text(kb_id, node_id, update, Utc::now()).await? {
            return Err(TreeServiceError::node_not_found(node_id));
        }
        tx.get_node(kb_id, node_id)
            .await?
            .ok_or_else(|| TreeServiceError::node_not_found(node_id))
    }

    /// Delete a node and its whole subtree atomically
    ///
    /// Returns the number of deleted nodes.
    pub async fn delete_node(&self, kb_id: &str, node_id: &str) -> Result<usize, TreeServiceError> {
        self.authorize(kb_id, AccessLevel::Write).await?;

        let mut tx = self.store.begin().await?;
        let result = Self::cascade_delete(tx.as_mut(), kb_id, node_id).await;
        let deleted = Self::finish(tx, result).await?;

        tracing::info!(
            "Deleted node {} and {} descendants from knowledge base {}",
            node_id,
            deleted - 1,
            kb_id
        );
        Ok(deleted)
    }

    async fn cascade_delete(
        tx: &mut dyn StoreTx,
        kb_id: &str,
        node_id: &str,
    ) -> Result<usize, TreeServiceError> {
        if tx.get_node(kb_id, node_id).await?.is_none() {
            return Err(TreeServiceError::node_not_found(node_id));
        }

        let descendants = hierarchy::collect_descendants(tx, kb_id, node_id).await?;

        // Deepest first, so no committed state ever has a dangling child.
        for id in descendants.iter().rev() {
            tx.delete_node(kb_id, id).await?;
        }
        tx.delete_node(kb_id, node_id).await?;

        Ok(descendants.len() + 1)
    }

    /// Move a node and return the refreshed forest
    ///
    /// Lock conflicts restart the whole move (re-read, recompute) up to the
    /// configured number of attempts.
    ///
    /// # Errors
    ///
    /// - `SelfMove` when `node_id == target_id`
    /// - `NodeNotFound` when node or target is missing
    /// - `CycleRejected` when the target is inside the node's subtree
    /// - `InvalidArgument` when moving inside a file
    /// - `Conflict` when every attempt hit lock contention
    pub async fn move_node(
        &self,
        kb_id: &str,
        node_id: &str,
        target_id: &str,
        position: Position,
    ) -> Result<Forest, TreeServiceError> {
        self.authorize(kb_id, AccessLevel::Write).await?;

        let coordinator = MoveCoordinator::new(self.calculator);
        let mut attempt = 1;
        let outcome = loop {
            match coordinator
                .execute(self.store.as_ref(), kb_id, node_id, target_id, position)
                .await
            {
                Ok(outcome) => break outcome,
                Err(err) if err.is_retryable() && attempt < self.max_move_attempts => {
                    tracing::warn!(
                        "Move of {} conflicted (attempt {}/{}): {}",
                        node_id,
                        attempt,
                        self.max_move_attempts,
                        err
                    );
                    attempt += 1;
                    tokio::task::yield_now().await;
                }
                Err(err) => return Err(err),
            }
        };

        tracing::info!(
            "Moved node {} {} {} -> parent {}, sort key {}{}",
            node_id,
            position,
            target_id,
            outcome.parent_id.as_deref().unwrap_or("<root>"),
            outcome.sort_key,
            if outcome.rebalanced > 0 {
                format!(" ({} siblings rebalanced)", outcome.rebalanced)
            } else {
                String::new()
            }
        );

        let nodes = self.store.list_nodes(kb_id).await?;
        Ok(build_forest(nodes))
    }

    /// Commit on success, roll back on failure
    async fn finish<T>(
        tx: Box<dyn StoreTx>,
        result: Result<T, TreeServiceError>,
    ) -> Result<T, TreeServiceError> {
        match result {
            Ok(value) => {
                tx.commit().await?;
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback_err) = tx.rollback().await {
                    tracing::warn!("Rollback failed: {}", rollback_err);
                }
                Err(err)
            }
        }
    }
}

#[cfg(test)]
#[path = "tree_service_test.rs"]
mod tree_service_test;
