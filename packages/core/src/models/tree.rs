//! Nested tree view of a knowledge base
//!
//! `TreeNode` pairs a stored `Node` with its ordered children. A `Forest` is
//! the ordered list of root trees of one knowledge base.

use super::node::Node;
use serde::{Deserialize, Serialize};

/// A node together with its ordered children.
///
/// Serializes flat: the node's fields plus a `children` array, which is
/// omitted when empty (always the case for files).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeNode {
    #[serde(flatten)]
    pub node: Node,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<TreeNode>,
}

impl TreeNode {
    pub fn leaf(node: Node) -> Self {
        Self {
            node,
            children: Vec::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.node.id
    }
}

/// Ordered root trees of one knowledge base.
pub type Forest = Vec<TreeNode>;

/// Depth-first pre-order walk over a forest without call-stack recursion.
pub fn walk_forest<'a>(forest: &'a [TreeNode]) -> impl Iterator<Item = &'a TreeNode> + 'a {
    let mut stack: Vec<&'a TreeNode> = forest.iter().rev().collect();
    std::iter::from_fn(move || {
        let next = stack.pop()?;
        stack.extend(next.children.iter().rev());
        Some(next)
    })
}

/// Find a node anywhere in the forest.
pub fn find_in_forest<'a>(forest: &'a [TreeNode], id: &str) -> Option<&'a TreeNode> {
    walk_forest(forest).find(|tree| tree.id() == id)
}

/// Total number of nodes in the forest.
pub fn forest_len(forest: &[TreeNode]) -> usize {
    walk_forest(forest).count()
}
