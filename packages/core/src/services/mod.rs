//! Business Services
//!
//! This module contains the tree services:
//!
//! - `KnowledgeTreeService` - Create/read/update/delete, tree assembly and moves
//! - `MoveCoordinator` - Validated, atomic repositioning of one node
//! - `build_forest` - Flat node list to ordered forest
//! - `PermissionOracle` - Access checks supplied by the host application
//!
//! Services coordinate between the database layer and callers, enforcing the
//! tree invariants (no cycles, files never contain children, ordered siblings).

pub mod error;
pub mod hierarchy;
pub mod move_coordinator;
pub mod permissions;
pub mod tree_builder;
pub mod tree_service;

pub use error::{ErrorKind, TreeServiceError};
pub use move_coordinator::{MoveCoordinator, MoveOutcome};
pub use permissions::{AccessLevel, AllowAll, PermissionOracle};
pub use tree_builder::build_forest;
pub use tree_service::KnowledgeTreeService;
