//! Descendant closure over parent links
//!
//! Both cascade delete and the move cycle check need the full set of nodes
//! below a given node. Depth is unbounded, so the closure is expanded one
//! frontier at a time inside the caller's transaction instead of recursing.

use crate::db::{DatabaseError, StoreTx};
use std::collections::HashSet;

/// Every descendant of `root_id` in breadth-first order, excluding `root_id`
///
/// Each id is visited at most once, so corrupt data containing a parent cycle
/// terminates after every node of the cycle has been seen.
pub async fn collect_descendants(
    tx: &mut dyn StoreTx,
    kb_id: &str,
    root_id: &str,
) -> Result<Vec<String>, DatabaseError> {
    let mut visited: HashSet<String> = HashSet::new();
    visited.insert(root_id.to_string());

    let mut descendants = Vec::new();
    let mut frontier = vec![root_id.to_string()];

    while !frontier.is_empty() {
        let mut next = Vec::new();
        for parent_id in &frontier {
            for child_id in tx.child_ids(kb_id, parent_id).await? {
                if visited.insert(child_id.clone()) {
                    descendants.push(child_id.clone());
                    next.push(child_id);
                }
            }
        }
        frontier = next;
    }

    Ok(descendants)
}

/// Whether `candidate_id` lies strictly below `ancestor_id`
///
/// Stops expanding as soon as the candidate is found.
pub async fn is_descendant(
    tx: &mut dyn StoreTx,
    kb_id: &str,
    ancestor_id: &str,
    candidate_id: &str,
) -> Result<bool, DatabaseError> {
    let mut visited: HashSet<String> = HashSet::new();
    visited.insert(ancestor_id.to_string());

    let mut frontier = vec![ancestor_id.to_string()];

    while !frontier.is_empty() {
        let mut next = Vec::new();
        for parent_id in &frontier {
            for child_id in tx.child_ids(kb_id, parent_id).await? {
                if child_id == candidate_id {
                    return Ok(true);
                }
                if visited.insert(child_id.clone()) {
                    next.push(child_id);
                }
            }
        }
        frontier = next;
    }

    Ok(false)
}
