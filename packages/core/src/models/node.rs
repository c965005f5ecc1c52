//! Node Data Structures
//!
//! This module defines the `Node` struct stored in a knowledge base's tree,
//! together with the request types used to create, update and move nodes.
//!
//! # Architecture
//!
//! - **Knowledge-base scoped**: every node carries the id of the knowledge base
//!   that owns it; a node never moves across knowledge bases
//! - **Explicit root parentage**: `parent_id = None` means the node is a root
//! - **Sparse sibling order**: `sort_key` orders siblings, gaps are allowed
//!
//! # Examples
//!
//! ```rust
//! use knowtree_core::models::{NewNode, NodeKind};
//!
//! let folder = NewNode::folder("kb-1", None, "Research");
//! assert_eq!(folder.kind, NodeKind::Folder);
//!
//! let note = NewNode::file("kb-1", Some("folder-id".to_string()), "Notes", "# Notes");
//! assert_eq!(note.parent_id.as_deref(), Some("folder-id"));
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

/// Validation errors for node requests
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid node kind: {0}")]
    InvalidKind(String),

    #[error("Invalid move position: {0}")]
    InvalidPosition(String),

    #[error("Invalid node ID: {0}")]
    InvalidId(String),

    #[error("Invalid parent reference: {0}")]
    InvalidParent(String),
}

/// Kind of a tree element. Fixed at creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Folder,
    File,
}

impl NodeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::Folder => "folder",
            NodeKind::File => "file",
        }
    }

    /// Only folders may receive children.
    pub fn is_container(&self) -> bool {
        matches!(self, NodeKind::Folder)
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NodeKind {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "folder" => Ok(NodeKind::Folder),
            "file" => Ok(NodeKind::File),
            other => Err(ValidationError::InvalidKind(other.to_string())),
        }
    }
}

/// Where a moved node lands relative to the move target.
///
/// - `Before` / `After`: the target is a sibling reference; the moved node
///   joins the target's sibling group on the given side
/// - `Inside`: the target is the new parent folder; the moved node is appended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Position {
    Before,
    After,
    Inside,
}

impl Position {
    pub fn as_str(&self) -> &'static str {
        match self {
            Position::Before => "before",
            Position::After => "after",
            Position::Inside => "inside",
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Position {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "before" => Ok(Position::Before),
            "after" => Ok(Position::After),
            "inside" => Ok(Position::Inside),
            other => Err(ValidationError::InvalidPosition(other.to_string())),
        }
    }
}

/// One folder or file in a knowledge base tree.
///
/// # Fields
///
/// - `id`: Unique identifier (UUID v4), immutable
/// - `knowledge_base_id`: Owning knowledge base, immutable
/// - `parent_id`: Parent folder, `None` for root nodes
/// - `kind`: `folder` or `file`, immutable
/// - `title`: Display name
/// - `content`: Body text (meaningful for files only)
/// - `sort_key`: Sibling order; only relative order matters
/// - `created_at` / `updated_at`: Timestamps, `updated_at` refreshed on every mutation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub id: String,

    pub knowledge_base_id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,

    pub kind: NodeKind,

    pub title: String,

    #[serde(default)]
    pub content: String,

    pub sort_key: i64,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

impl Node {
    /// Materialize a creation request into a node with a fresh id.
    ///
    /// The caller supplies the resolved sort key; `NewNode::sort_key` is only a
    /// request and may be `None`.
    pub fn from_new(new: NewNode, sort_key: i64) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            knowledge_base_id: new.knowledge_base_id,
            parent_id: new.parent_id,
            kind: new.kind,
            title: new.title,
            content: new.content,
            sort_key,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }

    pub fn is_folder(&self) -> bool {
        self.kind.is_container()
    }
}

/// Request to create a node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewNode {
    pub knowledge_base_id: String,

    #[serde(default)]
    pub parent_id: Option<String>,

    pub kind: NodeKind,

    pub title: String,

    #[serde(default)]
    pub content: String,

    /// Explicit sort key; computed as one past the sibling maximum when absent
    #[serde(default)]
    pub sort_key: Option<i64>,
}

impl NewNode {
    pub fn folder(
        knowledge_base_id: impl Into<String>,
        parent_id: Option<String>,
        title: impl Into<String>,
    ) -> Self {
        Self {
            knowledge_base_id: knowledge_base_id.into(),
            parent_id,
            kind: NodeKind::Folder,
            title: title.into(),
            content: String::new(),
            sort_key: None,
        }
    }

    pub fn file(
        knowledge_base_id: impl Into<String>,
        parent_id: Option<String>,
        title: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            knowledge_base_id: knowledge_base_id.into(),
            parent_id,
            kind: NodeKind::File,
            title: title.into(),
            content: content.into(),
            sort_key: None,
        }
    }

    pub fn with_sort_key(mut self, sort_key: i64) -> Self {
        self.sort_key = Some(sort_key);
        self
    }

    /// Validate ids and title before any storage access
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` if:
    /// - `knowledge_base_id` is empty
    /// - `parent_id` is `Some("")` (roots use `None`, never an empty id)
    /// - `title` is blank
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.knowledge_base_id.is_empty() {
            return Err(ValidationError::MissingField("knowledge_base_id".to_string()));
        }

        if let Some(parent_id) = &self.parent_id {
            if parent_id.is_empty() {
                return Err(ValidationError::InvalidParent(
                    "parent id must not be empty; use no parent for root nodes".to_string(),
                ));
            }
        }

        if self.title.trim().is_empty() {
            return Err(ValidationError::MissingField("title".to_string()));
        }

        Ok(())
    }
}

/// Title/content update. Both fields are replaced, matching a form submit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeUpdate {
    pub title: String,
    #[serde(default)]
    pub content: String,
}

impl NodeUpdate {
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.title.trim().is_empty() {
            return Err(ValidationError::MissingField("title".to_string()));
        }
        Ok(())
    }
}
