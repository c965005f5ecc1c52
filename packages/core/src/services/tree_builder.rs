//! Assemble the flat node list of a knowledge base into an ordered forest
//!
//! Parent links are only checked when written, so the builder has to cope with
//! whatever is stored: nodes whose parent is missing are dropped, and so are
//! nodes caught in a parent cycle (they are unreachable from any root).

use crate::models::{Forest, Node, TreeNode};
use std::collections::{HashMap, HashSet};

/// Build the ordered forest of one knowledge base
///
/// Every reachable node appears exactly once. Roots and every child list are
/// sorted by `(sort_key, id)`. Runs without recursion, so depth is bounded only
/// by the number of nodes.
pub fn build_forest(nodes: Vec<Node>) -> Forest {
    let total = nodes.len();

    let mut by_id: HashMap<String, Node> = HashMap::with_capacity(total);
    for node in nodes {
        by_id.insert(node.id.clone(), node);
    }

    let mut roots: Vec<String> = Vec::new();
    let mut children_of: HashMap<String, Vec<String>> = HashMap::new();
    for node in by_id.values() {
        match &node.parent_id {
            None => roots.push(node.id.clone()),
            Some(parent_id) => children_of
                .entry(parent_id.clone())
                .or_default()
                .push(node.id.clone()),
        }
    }

    let order = |ids: &mut Vec<String>, by_id: &HashMap<String, Node>| {
        ids.sort_by(|a, b| {
            let (ka, kb) = (by_id[a].sort_key, by_id[b].sort_key);
            ka.cmp(&kb).then_with(|| a.cmp(b))
        });
    };

    order(&mut roots, &by_id);
    for ids in children_of.values_mut() {
        order(ids, &by_id);
    }

    // Breadth-first from the roots fixes which nodes are reachable.
    let mut visited: HashSet<String> = HashSet::with_capacity(total);
    let mut reachable: Vec<String> = Vec::with_capacity(total);
    for root in &roots {
        visited.insert(root.clone());
        reachable.push(root.clone());
    }
    let mut cursor = 0;
    while cursor < reachable.len() {
        let id = reachable[cursor].clone();
        cursor += 1;
        if let Some(children) = children_of.get(&id) {
            for child in children {
                if visited.insert(child.clone()) {
                    reachable.push(child.clone());
                }
            }
        }
    }

    let dropped = total - reachable.len();
    if dropped > 0 {
        for node in by_id.values().filter(|n| !visited.contains(&n.id)) {
            tracing::warn!(
                "Dropping node {} from tree: parent {} is missing or unreachable",
                node.id,
                node.parent_id.as_deref().unwrap_or("<none>")
            );
        }
    }

    // Children are always later in BFS order than their parent, so walking it
    // backwards finishes every subtree before its parent needs it.
    let mut built: HashMap<String, TreeNode> = HashMap::with_capacity(reachable.len());
    for id in reachable.iter().rev() {
        let Some(node) = by_id.remove(id) else {
            continue;
        };
        let children = children_of
            .remove(id)
            .unwrap_or_default()
            .into_iter()
            .filter_map(|child| built.remove(&child))
            .collect();
        built.insert(id.clone(), TreeNode { node, children });
    }

    roots
        .into_iter()
        .filter_map(|id| built.remove(&id))
        .collect()
}
