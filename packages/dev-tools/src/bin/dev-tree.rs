//! Knowledge Tree Inspection Binary
//!
//! Prints the ordered forest of one knowledge base as JSON. Useful for checking
//! the effect of moves and rebalances against a real database file.
//!
//! # Usage
//!
//! ```bash
//! # Inspect a knowledge base in the default database
//! KNOWTREE_KB=kb-1 cargo run --bin dev-tree
//!
//! # Seed a small demo tree first
//! KNOWTREE_KB=demo KNOWTREE_SEED=1 cargo run --bin dev-tree
//! ```
//!
//! # Environment Variables
//!
//! - `KNOWTREE_KB`: Knowledge base to print (required)
//! - `KNOWTREE_SEED`: When set, create a demo folder with two files first
//! - `KNOWTREE_DB_PATH`, `KNOWTREE_REBALANCE_STRIDE`, `KNOWTREE_MAX_MOVE_ATTEMPTS`,
//!   `KNOWTREE_BUSY_TIMEOUT_MS`: see `TreeConfig`
//! - `RUST_LOG`: Logging level (e.g., "info", "debug", "trace")
//!
//! **DEVELOPMENT ONLY**: every permission check is granted.

use std::env;
use std::sync::Arc;

use knowtree_core::models::{forest_len, NewNode, Position};
use knowtree_core::{DatabaseService, KnowledgeTreeService, TreeConfig, TursoStore};

const DEV_USER: &str = "dev-tree";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let kb_id = env::var("KNOWTREE_KB")
        .map_err(|_| anyhow::anyhow!("KNOWTREE_KB must name the knowledge base to print"))?;

    let config = TreeConfig::from_env().map_err(|e| anyhow::anyhow!("Invalid configuration: {}", e))?;
    tracing::info!("Database: {}", config.database_path.display());

    let db = Arc::new(DatabaseService::from_config(&config).await?);
    let service = KnowledgeTreeService::new(Arc::new(TursoStore::new(db)))
        .with_config(&config)
        .with_user(DEV_USER);

    if env::var("KNOWTREE_SEED").is_ok() {
        seed(&service, &kb_id).await?;
    }

    let forest = service.get_tree(&kb_id).await?;
    tracing::info!("{} nodes in knowledge base {}", forest_len(&forest), kb_id);

    println!("{}", serde_json::to_string_pretty(&forest)?);
    Ok(())
}

async fn seed(service: &KnowledgeTreeService, kb_id: &str) -> anyhow::Result<()> {
    let folder = service
        .create_node(NewNode::folder(kb_id, None, "Getting started"))
        .await?;
    let intro = service
        .create_node(NewNode::file(kb_id, None, "Introduction", "Welcome."))
        .await?;
    service
        .create_node(NewNode::file(
            kb_id,
            Some(folder.id.clone()),
            "Install",
            "Download and run the installer.",
        ))
        .await?;
    service
        .move_node(kb_id, &intro.id, &folder.id, Position::Inside)
        .await?;

    tracing::info!("Seeded demo tree under folder {}", folder.id);
    Ok(())
}
