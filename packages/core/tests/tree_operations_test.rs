//! Integration tests for the knowledge tree public API
//!
//! Tests cover:
//! - Wire shape of nodes and forests (camelCase, omitted empty children)
//! - Persistence across service restarts
//! - Deep trees (cascade delete and cycle checks without recursion limits)
//! - Position parsing at the request boundary

use knowtree_core::db::{DatabaseService, TursoStore};
use knowtree_core::models::{forest_len, NewNode, NodeUpdate, Position};
use knowtree_core::services::{ErrorKind, KnowledgeTreeService};
use knowtree_core::TreeConfig;
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;

async fn open_service(db_path: PathBuf) -> KnowledgeTreeService {
    let config = TreeConfig {
        database_path: db_path,
        ..TreeConfig::default()
    };
    let db = Arc::new(DatabaseService::from_config(&config).await.unwrap());
    KnowledgeTreeService::new(Arc::new(TursoStore::new(db)))
        .with_config(&config)
        .with_user("integration")
}

#[tokio::test]
async fn test_forest_serializes_as_nested_camel_case() {
    let temp_dir = TempDir::new().unwrap();
    let service = open_service(temp_dir.path().join("tree.db")).await;

    let folder = service
        .create_node(NewNode::folder("kb", None, "Guides"))
        .await
        .unwrap();
    service
        .create_node(NewNode::file("kb", Some(folder.id.clone()), "Setup", "steps"))
        .await
        .unwrap();

    let forest = service.get_tree("kb").await.unwrap();
    let value = serde_json::to_value(&forest).unwrap();

    let root = &value[0];
    assert_eq!(root["knowledgeBaseId"], json!("kb"));
    assert_eq!(root["kind"], json!("folder"));
    assert!(root.get("parentId").is_none());
    assert_eq!(root["sortKey"], json!(1));

    let child = &root["children"][0];
    assert_eq!(child["kind"], json!("file"));
    assert_eq!(child["title"], json!("Setup"));
    assert_eq!(child["parentId"], json!(folder.id));
    assert!(child.get("children").is_none());
}

#[tokio::test]
async fn test_new_node_deserializes_from_request_body() {
    let body = json!({
        "knowledgeBaseId": "kb",
        "kind": "file",
        "title": "Notes"
    });
    let new_node: NewNode = serde_json::from_value(body).unwrap();
    assert!(new_node.parent_id.is_none());
    assert!(new_node.sort_key.is_none());
    assert_eq!(new_node.content, "");

    let bad_kind = json!({ "knowledgeBaseId": "kb", "kind": "link", "title": "x" });
    assert!(serde_json::from_value::<NewNode>(bad_kind).is_err());
}

#[tokio::test]
async fn test_tree_survives_restart() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("tree.db");

    let (folder_id, file_id) = {
        let service = open_service(db_path.clone()).await;
        let folder = service
            .create_node(NewNode::folder("kb", None, "Archive"))
            .await
            .unwrap();
        let file = service
            .create_node(NewNode::file("kb", None, "old", "text"))
            .await
            .unwrap();
        service
            .move_node("kb", &file.id, &folder.id, Position::Inside)
            .await
            .unwrap();
        service
            .update_node("kb", &file.id, NodeUpdate::new("older", "more text"))
            .await
            .unwrap();
        (folder.id, file.id)
    };

    let service = open_service(db_path).await;
    let forest = service.get_tree("kb").await.unwrap();
    assert_eq!(forest.len(), 1);
    assert_eq!(forest[0].id(), folder_id);
    assert_eq!(forest[0].children[0].id(), file_id);
    assert_eq!(forest[0].children[0].node.title, "older");
}

#[tokio::test]
async fn test_deep_chain_cycle_check_and_delete() {
    let temp_dir = TempDir::new().unwrap();
    let service = open_service(temp_dir.path().join("tree.db")).await;

    let top = service
        .create_node(NewNode::folder("kb", None, "level-0"))
        .await
        .unwrap();
    let mut deepest = top.id.clone();
    for depth in 1..300 {
        let node = service
            .create_node(NewNode::folder(
                "kb",
                Some(deepest.clone()),
                format!("level-{}", depth),
            ))
            .await
            .unwrap();
        deepest = node.id;
    }

    let err = service
        .move_node("kb", &top.id, &deepest, Position::Inside)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::CycleRejected);

    assert_eq!(forest_len(&service.get_tree("kb").await.unwrap()), 300);

    let deleted = service.delete_node("kb", &top.id).await.unwrap();
    assert_eq!(deleted, 300);
    assert!(service.get_tree("kb").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_knowledge_bases_are_isolated() {
    let temp_dir = TempDir::new().unwrap();
    let service = open_service(temp_dir.path().join("tree.db")).await;

    let a = service
        .create_node(NewNode::folder("kb-a", None, "A"))
        .await
        .unwrap();
    let b = service
        .create_node(NewNode::folder("kb-b", None, "B"))
        .await
        .unwrap();

    let err = service
        .move_node("kb-a", &a.id, &b.id, Position::Inside)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    assert_eq!(service.get_tree("kb-a").await.unwrap().len(), 1);
    assert_eq!(service.get_tree("kb-b").await.unwrap().len(), 1);
}

#[test]
fn test_position_parsing() {
    assert_eq!("before".parse::<Position>().unwrap(), Position::Before);
    assert_eq!("after".parse::<Position>().unwrap(), Position::After);
    assert_eq!("inside".parse::<Position>().unwrap(), Position::Inside);
    assert!("Inside".parse::<Position>().is_err());
    assert!("".parse::<Position>().is_err());
}
