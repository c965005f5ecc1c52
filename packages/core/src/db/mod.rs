//! Database Layer
//!
//! This module handles all database interactions using libsql:
//!
//! - Database initialization and connection management
//! - The `knowledge_nodes` table and its sibling-group index
//! - `NodeStore`/`StoreTx` abstraction used by the tree services
//! - Sort key arithmetic for ordered sibling groups
//!
//! # Architecture
//!
//! Every knowledge base lives in one embedded SQLite file opened through
//! libsql. Mutations run inside `BEGIN IMMEDIATE` transactions so that
//! read-decide-write sequences (move validation, sort key placement) see a
//! stable snapshot and commit atomically.

mod database;
mod error;
mod node_store;
mod ordering;
mod turso_store;

pub use database::{DatabaseService, DEFAULT_BUSY_TIMEOUT_MS};
pub use error::DatabaseError;
pub use node_store::{NodeStore, StoreTx};
pub use ordering::{
    Anchor, OrderingError, Placement, SiblingKey, SortKeyCalculator, DEFAULT_REBALANCE_STRIDE,
};
pub use turso_store::{TursoStore, TursoTx};
