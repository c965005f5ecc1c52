//! Knowtree Core Business Logic Layer
//!
//! This crate manages the folder/file tree of each knowledge base: nodes stored
//! in an embedded libsql database, ordered sibling groups, and validated moves.
//!
//! # Architecture
//!
//! - **One table**: every node of every knowledge base lives in `knowledge_nodes`
//! - **Sparse integer keys**: sibling order uses gaps between keys; exhausted
//!   gaps trigger a rebalance of one sibling group
//! - **Atomic mutations**: each mutation runs in a single `BEGIN IMMEDIATE`
//!   transaction
//! - **Tolerant reads**: the tree builder drops orphans instead of failing
//!
//! # Modules
//!
//! - [`models`] - Data structures (Node, NewNode, TreeNode, Position)
//! - [`db`] - Database layer with libsql integration and sort key arithmetic
//! - [`services`] - Business services (KnowledgeTreeService, MoveCoordinator)
//! - [`config`] - Runtime configuration from defaults and environment

pub mod config;
pub mod db;
pub mod models;
pub mod services;

// Re-export commonly used types
pub use config::TreeConfig;
pub use db::{DatabaseService, NodeStore, TursoStore};
pub use models::*;
pub use services::*;
