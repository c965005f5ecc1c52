//! TursoStore - NodeStore Implementation for the libsql Backend
//!
//! This module implements `NodeStore` and `StoreTx` on top of `DatabaseService`.
//!
//! # Design Principles
//!
//! 1. **One SQL helper per statement**: used both by plain reads and inside
//!    transactions, so both paths share row conversion
//! 2. **Row Conversion**: `libsql::Row` → `Node` in one place
//! 3. **`BEGIN IMMEDIATE`**: transactions take the write lock before the first
//!    read; contention surfaces as `DatabaseError::Busy`
//! 4. **Root group via `IS`**: `parent_id IS ?` matches `NULL` when binding
//!    `None`, so one statement serves roots and folder children alike

use crate::db::error::DatabaseError;
use crate::db::node_store::{NodeStore, StoreTx};
use crate::db::ordering::SiblingKey;
use crate::db::DatabaseService;
use crate::models::{Node, NodeKind, NodeUpdate};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use libsql::{params, Connection, Row};
use std::sync::Arc;

const NODE_COLUMNS: &str =
    "id, kb_id, parent_id, node_type, title, content, sort_order, created_at, updated_at";

/// TursoStore implements NodeStore for the libsql backend
pub struct TursoStore {
    db: Arc<DatabaseService>,
}

impl TursoStore {
    /// Create a new TursoStore wrapper
    ///
    /// ```rust,no_run
    /// # use knowtree_core::db::{TursoStore, DatabaseService};
    /// # use std::sync::Arc;
    /// # use std::path::PathBuf;
    /// # #[tokio::main]
    /// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
    /// let db = Arc::new(DatabaseService::new(PathBuf::from("./test.db")).await?);
    /// let store = TursoStore::new(db);
    /// # Ok(())
    /// # }
    /// ```
    pub fn new(db: Arc<DatabaseService>) -> Self {
        Self { db }
    }

    pub fn database(&self) -> &Arc<DatabaseService> {
        &self.db
    }
}

/// Parse timestamp from database - handles both RFC3339 and SQLite formats
///
/// Rows written by this crate use RFC3339; rows written by hand or by SQLite's
/// CURRENT_TIMESTAMP use "YYYY-MM-DD HH:MM:SS".
fn parse_timestamp(s: &str) -> Result<DateTime<Utc>, DatabaseError> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }

    if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return Ok(naive.and_utc());
    }

    Err(DatabaseError::corrupt_row(format!(
        "Unable to parse timestamp '{}' as RFC3339 or SQLite format",
        s
    )))
}

/// Convert a row selected with `NODE_COLUMNS` into a Node
fn row_to_node(row: &Row) -> Result<Node, DatabaseError> {
    let column = |name: &str, e: libsql::Error| {
        DatabaseError::corrupt_row(format!("Failed to get {}: {}", name, e))
    };

    let id: String = row.get(0).map_err(|e| column("id", e))?;
    let knowledge_base_id: String = row.get(1).map_err(|e| column("kb_id", e))?;
    let parent_id: Option<String> = row.get(2).map_err(|e| column("parent_id", e))?;
    let node_type: String = row.get(3).map_err(|e| column("node_type", e))?;
    let title: String = row.get(4).map_err(|e| column("title", e))?;
    let content: String = row.get(5).map_err(|e| column("content", e))?;
    let sort_key: i64 = row.get(6).map_err(|e| column("sort_order", e))?;
    let created_at: String = row.get(7).map_err(|e| column("created_at", e))?;
    let updated_at: String = row.get(8).map_err(|e| column("updated_at", e))?;

    let kind: NodeKind = node_type
        .parse()
        .map_err(|e| DatabaseError::corrupt_row(format!("Node {}: {}", id, e)))?;

    Ok(Node {
        created_at: parse_timestamp(&created_at)?,
        updated_at: parse_timestamp(&updated_at)?,
        id,
        knowledge_base_id,
        parent_id,
        kind,
        title,
        content,
        sort_key,
    })
}

async fn collect_nodes(mut rows: libsql::Rows) -> Result<Vec<Node>, DatabaseError> {
    let mut nodes = Vec::new();
    while let Some(row) = rows
        .next()
        .await
        .map_err(|e| DatabaseError::from_libsql("Failed to read node row", e))?
    {
        nodes.push(row_to_node(&row)?);
    }
    Ok(nodes)
}

async fn fetch_node(conn: &Connection, kb_id: &str, id: &str) -> Result<Option<Node>, DatabaseError> {
    let mut rows = conn
        .query(
            &format!(
                "SELECT {} FROM knowledge_nodes WHERE kb_id = ? AND id = ?",
                NODE_COLUMNS
            ),
            params![kb_id, id],
        )
        .await
        .map_err(|e| DatabaseError::from_libsql("Failed to execute get_node query", e))?;

    match rows
        .next()
        .await
        .map_err(|e| DatabaseError::from_libsql("Failed to read get_node row", e))?
    {
        Some(row) => Ok(Some(row_to_node(&row)?)),
        None => Ok(None),
    }
}

async fn fetch_siblings(
    conn: &Connection,
    kb_id: &str,
    parent_id: Option<&str>,
) -> Result<Vec<Node>, DatabaseError> {
    let rows = conn
        .query(
            &format!(
                "SELECT {} FROM knowledge_nodes WHERE kb_id = ? AND parent_id IS ?
                 ORDER BY sort_order ASC, id ASC",
                NODE_COLUMNS
            ),
            params![kb_id, parent_id],
        )
        .await
        .map_err(|e| DatabaseError::from_libsql("Failed to execute siblings query", e))?;

    collect_nodes(rows).await
}

#[async_trait]
impl NodeStore for TursoStore {
    async fn begin(&self) -> Result<Box<dyn StoreTx>, DatabaseError> {
        let conn = self.db.connect_with_timeout().await?;

        conn.execute("BEGIN IMMEDIATE", ())
            .await
            .map_err(|e| DatabaseError::from_libsql("Failed to begin transaction", e))?;

        tracing::debug!("Began write transaction");

        Ok(Box::new(TursoTx { conn }))
    }

    async fn get_node(&self, kb_id: &str, id: &str) -> Result<Option<Node>, DatabaseError> {
        let conn = self.db.connect_with_timeout().await?;
        fetch_node(&conn, kb_id, id).await
    }

    async fn list_nodes(&self, kb_id: &str) -> Result<Vec<Node>, DatabaseError> {
        let conn = self.db.connect_with_timeout().await?;

        let rows = conn
            .query(
                &format!(
                    "SELECT {} FROM knowledge_nodes WHERE kb_id = ?",
                    NODE_COLUMNS
                ),
                params![kb_id],
            )
            .await
            .map_err(|e| DatabaseError::from_libsql("Failed to execute list_nodes query", e))?;

        collect_nodes(rows).await
    }

    async fn list_siblings(
        &self,
        kb_id: &str,
        parent_id: Option<&str>,
    ) -> Result<Vec<Node>, DatabaseError> {
        let conn = self.db.connect_with_timeout().await?;
        fetch_siblings(&conn, kb_id, parent_id).await
    }
}

/// Write transaction on a dedicated connection
///
/// Dropping it without `commit` closes the connection, which makes SQLite roll
/// the transaction back.
pub struct TursoTx {
    conn: Connection,
}

#[async_trait]
impl StoreTx for TursoTx {
    async fn get_node(&mut self, kb_id: &str, id: &str) -> Result<Option<Node>, DatabaseError> {
        fetch_node(&self.conn, kb_id, id).await
    }

    async fn child_ids(
        &mut self,
        kb_id: &str,
        parent_id: &str,
    ) -> Result<Vec<String>, DatabaseError> {
        let mut rows = self
            .conn
            .query(
                "SELECT id FROM knowledge_nodes WHERE kb_id = ? AND parent_id = ?",
                params![kb_id, parent_id],
            )
            .await
            .map_err(|e| DatabaseError::from_libsql("Failed to execute child_ids query", e))?;

        let mut ids = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| DatabaseError::from_libsql("Failed to read child id", e))?
        {
            let id: String = row
                .get(0)
                .map_err(|e| DatabaseError::corrupt_row(format!("Failed to get id: {}", e)))?;
            ids.push(id);
        }
        Ok(ids)
    }

    async fn sibling_keys(
        &mut self,
        kb_id: &str,
        parent_id: Option<&str>,
    ) -> Result<Vec<SiblingKey>, DatabaseError> {
        let mut rows = self
            .conn
            .query(
                "SELECT id, sort_order FROM knowledge_nodes WHERE kb_id = ? AND parent_id IS ?
                 ORDER BY sort_order ASC, id ASC",
                params![kb_id, parent_id],
            )
            .await
            .map_err(|e| DatabaseError::from_libsql("Failed to execute sibling_keys query", e))?;

        let mut keys = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| DatabaseError::from_libsql("Failed to read sibling key", e))?
        {
            let id: String = row
                .get(0)
                .map_err(|e| DatabaseError::corrupt_row(format!("Failed to get id: {}", e)))?;
            let sort_key: i64 = row.get(1).map_err(|e| {
                DatabaseError::corrupt_row(format!("Failed to get sort_order: {}", e))
            })?;
            keys.push(SiblingKey::new(id, sort_key));
        }
        Ok(keys)
    }

    async fn max_sort_key(
        &mut self,
        kb_id: &str,
        parent_id: Option<&str>,
    ) -> Result<Option<i64>, DatabaseError> {
        let mut rows = self
            .conn
            .query(
                "SELECT MAX(sort_order) FROM knowledge_nodes WHERE kb_id = ? AND parent_id IS ?",
                params![kb_id, parent_id],
            )
            .await
            .map_err(|e| DatabaseError::from_libsql("Failed to execute max_sort_key query", e))?;

        match rows
            .next()
            .await
            .map_err(|e| DatabaseError::from_libsql("Failed to read max_sort_key row", e))?
        {
            Some(row) => row.get::<Option<i64>>(0).map_err(|e| {
                DatabaseError::corrupt_row(format!("Failed to get max sort_order: {}", e))
            }),
            None => Ok(None),
        }
    }

    async fn insert_node(&mut self, node: &Node) -> Result<(), DatabaseError> {
        self.conn
            .execute(
                &format!(
                    "INSERT INTO knowledge_nodes ({}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
                    NODE_COLUMNS
                ),
                params![
                    node.id.as_str(),
                    node.knowledge_base_id.as_str(),
                    node.parent_id.as_deref(),
                    node.kind.as_str(),
                    node.title.as_str(),
                    node.content.as_str(),
                    node.sort_key,
                    node.created_at.to_rfc3339(),
                    node.updated_at.to_rfc3339(),
                ],
            )
            .await
            .map_err(|e| DatabaseError::from_libsql("Failed to insert node", e))?;
        Ok(())
    }

    async fn update_text(
        &mut self,
        kb_id: &str,
        id: &str,
        update: &NodeUpdate,
        at: DateTime<Utc>,
    ) -> Result<bool, DatabaseError> {
        let rows_affected = self
            .conn
            .execute(
                "UPDATE knowledge_nodes SET title = ?, content = ?, updated_at = ?
                 WHERE kb_id = ? AND id = ?",
                params![
                    update.title.as_str(),
                    update.content.as_str(),
                    at.to_rfc3339(),
                    kb_id,
                    id,
                ],
            )
            .await
            .map_err(|e| DatabaseError::from_libsql("Failed to update node", e))?;
        Ok(rows_affected > 0)
    }

    async fn set_placement(
        &mut self,
        kb_id: &str,
        id: &str,
        parent_id: Option<&str>,
        sort_key: i64,
        at: DateTime<Utc>,
    ) -> Result<bool, DatabaseError> {
        let rows_affected = self
            .conn
            .execute(
                "UPDATE knowledge_nodes SET parent_id = ?, sort_order = ?, updated_at = ?
                 WHERE kb_id = ? AND id = ?",
                params![parent_id, sort_key, at.to_rfc3339(), kb_id, id],
            )
            .await
            .map_err(|e| DatabaseError::from_libsql("Failed to move node", e))?;
        Ok(rows_affected > 0)
    }

    async fn set_sort_key(
        &mut self,
        kb_id: &str,
        id: &str,
        sort_key: i64,
        at: DateTime<Utc>,
    ) -> Result<bool, DatabaseError> {
        let rows_affected = self
            .conn
            .execute(
                "UPDATE knowledge_nodes SET sort_order = ?, updated_at = ?
                 WHERE kb_id = ? AND id = ?",
                params![sort_key, at.to_rfc3339(), kb_id, id],
            )
            .await
            .map_err(|e| DatabaseError::from_libsql("Failed to reorder node", e))?;
        Ok(rows_affected > 0)
    }

    async fn delete_node(&mut self, kb_id: &str, id: &str) -> Result<bool, DatabaseError> {
        let rows_affected = self
            .conn
            .execute(
                "DELETE FROM knowledge_nodes WHERE kb_id = ? AND id = ?",
                params![kb_id, id],
            )
            .await
            .map_err(|e| DatabaseError::from_libsql("Failed to delete node", e))?;
        Ok(rows_affected > 0)
    }

    async fn commit(self: Box<Self>) -> Result<(), DatabaseError> {
        if let Err(e) = self.conn.execute("COMMIT", ()).await {
            let _rollback = self.conn.execute("ROLLBACK", ()).await;
            return Err(DatabaseError::from_libsql("Failed to commit transaction", e));
        }
        tracing::debug!("Committed write transaction");
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), DatabaseError> {
        self.conn
            .execute("ROLLBACK", ())
            .await
            .map_err(|e| DatabaseError::from_libsql("Failed to roll back transaction", e))?;
        tracing::debug!("Rolled back write transaction");
        Ok(())
    }
}
