//! Data Models
//!
//! This module contains the data structures used throughout Knowtree:
//!
//! - `Node` - A folder or file inside one knowledge base
//! - `NewNode` / `NodeUpdate` / `Position` - Request types for tree operations
//! - `TreeNode` / `Forest` - Nested tree view returned to callers

mod node;
mod tree;

pub use node::{NewNode, Node, NodeKind, NodeUpdate, Position, ValidationError};
pub use tree::{find_in_forest, forest_len, walk_forest, Forest, TreeNode};
