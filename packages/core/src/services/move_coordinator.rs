//! Move Coordinator
//!
//! Moves one node `before`/`after` a sibling or `inside` a folder. Validation
//! and every write (reparent, sort key, rebalance of the destination group)
//! happen inside one write transaction, so a half-applied move is never
//! visible and two concurrent moves cannot compute keys from the same stale
//! sibling snapshot.
//!
//! Validation order:
//! 1. Self-move (no storage access)
//! 2. Node and target exist in the knowledge base
//! 3. Target is not inside the node's subtree
//! 4. `inside` targets are folders

use crate::db::{Anchor, NodeStore, Placement, SortKeyCalculator, StoreTx};
use crate::models::Position;
use crate::services::error::TreeServiceError;
use crate::services::hierarchy;
use chrono::Utc;

/// Where a committed move put the node
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveOutcome {
    pub parent_id: Option<String>,
    pub sort_key: i64,
    /// Number of siblings whose key was rewritten by a rebalance
    pub rebalanced: usize,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct MoveCoordinator {
    calculator: SortKeyCalculator,
}

impl MoveCoordinator {
    pub fn new(calculator: SortKeyCalculator) -> Self {
        Self { calculator }
    }

    /// Run one move attempt in its own transaction
    ///
    /// Any error rolls the transaction back before it is returned.
    pub async fn execute(
        &self,
        store: &dyn NodeStore,
        kb_id: &str,
        node_id: &str,
        target_id: &str,
        position: Position,
    ) -> Result<MoveOutcome, TreeServiceError> {
        if node_id == target_id {
            return Err(TreeServiceError::self_move(node_id));
        }

        let mut tx = store.begin().await?;

        match self
            .apply(tx.as_mut(), kb_id, node_id, target_id, position)
            .await
        {
            Ok(outcome) => {
                tx.commit().await?;
                Ok(outcome)
            }
            Err(err) => {
                if let Err(rollback_err) = tx.rollback().await {
                    tracing::warn!("Rollback after failed move of {} failed: {}", node_id, rollback_err);
                }
                Err(err)
            }
        }
    }

    async fn apply(
        &self,
        tx: &mut dyn StoreTx,
        kb_id: &str,
        node_id: &str,
        target_id: &str,
        position: Position,
    ) -> Result<MoveOutcome, TreeServiceError> {
        let node = tx
            .get_node(kb_id, node_id)
            .await?
            .ok_or_else(|| TreeServiceError::node_not_found(node_id))?;
        let target = tx
            .get_node(kb_id, target_id)
            .await?
            .ok_or_else(|| TreeServiceError::node_not_found(target_id))?;

        if hierarchy::is_descendant(tx, kb_id, &node.id, &target.id).await? {
            return Err(TreeServiceError::cycle_rejected(&node.id, &target.id));
        }

        let (parent_id, anchor) = match position {
            Position::Inside => {
                if !target.is_folder() {
                    return Err(TreeServiceError::invalid_argument(format!(
                        "cannot move inside {} node {}",
                        target.kind, target.id
                    )));
                }
                (Some(target.id.clone()), Anchor::End)
            }
            Position::Before => (target.parent_id.clone(), Anchor::Before(&target.id)),
            Position::After => (target.parent_id.clone(), Anchor::After(&target.id)),
        };

        let siblings = tx.sibling_keys(kb_id, parent_id.as_deref()).await?;
        let placement = self.calculator.place(&siblings, &node.id, anchor)?;
        let now = Utc::now();

        let mut rebalanced = 0;
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
                if !tx.set_sort_key(kb_id, &sibling.id, sibling.sort_key, now).await? {
                    return Err(TreeServiceError::conflict(format!(
                        "sibling {} disappeared during rebalance",
                        sibling.id
                    )));
                }
                rebalanced += 1;
            }
        }

        let sort_key = placement.key();
        tracing::debug!(
            "Placing {} {} {} with sort key {}",
            node.id,
            position,
            target.id,
            sort_key
        );

        if !tx
            .set_placement(kb_id, &node.id, parent_id.as_deref(), sort_key, now)
            .await?
        {
            return Err(TreeServiceError::node_not_found(&node.id));
        }

        Ok(MoveOutcome {
            parent_id,
            sort_key,
            rebalanced,
        })
    }
}
