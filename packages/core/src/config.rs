//! Runtime configuration for the knowledge tree services
//!
//! Values come from `TreeConfig::default()` and can be overridden through
//! environment variables:
//!
//! - `KNOWTREE_DB_PATH` - database file (default `~/.knowtree/database/knowtree.db`)
//! - `KNOWTREE_REBALANCE_STRIDE` - key spacing after a rebalance (default 100)
//! - `KNOWTREE_MAX_MOVE_ATTEMPTS` - move attempts on lock conflicts (default 3)
//! - `KNOWTREE_BUSY_TIMEOUT_MS` - SQLite busy timeout (default 5000)

use crate::db::{DEFAULT_BUSY_TIMEOUT_MS, DEFAULT_REBALANCE_STRIDE};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const ENV_DB_PATH: &str = "KNOWTREE_DB_PATH";
pub const ENV_REBALANCE_STRIDE: &str = "KNOWTREE_REBALANCE_STRIDE";
pub const ENV_MAX_MOVE_ATTEMPTS: &str = "KNOWTREE_MAX_MOVE_ATTEMPTS";
pub const ENV_BUSY_TIMEOUT_MS: &str = "KNOWTREE_BUSY_TIMEOUT_MS";

/// Default number of attempts for a move that keeps hitting lock conflicts
pub const DEFAULT_MAX_MOVE_ATTEMPTS: u32 = 3;

/// Configuration for the tree store and services
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeConfig {
    /// Database file location
    pub database_path: PathBuf,

    /// Spacing between sort keys after a sibling group is rebalanced
    pub rebalance_stride: i64,

    /// How many times a move is attempted when the write lock is contended
    pub max_move_attempts: u32,

    /// How long a connection waits for a lock before reporting busy
    pub busy_timeout_ms: u64,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            rebalance_stride: DEFAULT_REBALANCE_STRIDE,
            max_move_attempts: DEFAULT_MAX_MOVE_ATTEMPTS,
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
        }
    }
}

impl TreeConfig {
    /// Defaults overridden by `KNOWTREE_*` environment variables, validated
    pub fn from_env() -> Result<Self, String> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as `from_env`, reading variables through `lookup`
    pub fn from_lookup<F>(lookup: F) -> Result<Self, String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(path) = lookup(ENV_DB_PATH).filter(|p| !p.trim().is_empty()) {
            tracing::info!("Using database path from {}: {}", ENV_DB_PATH, path);
            config.database_path = PathBuf::from(path);
        }
        if let Some(value) = lookup(ENV_REBALANCE_STRIDE) {
            config.rebalance_stride = parse_var(ENV_REBALANCE_STRIDE, &value)?;
        }
        if let Some(value) = lookup(ENV_MAX_MOVE_ATTEMPTS) {
            config.max_move_attempts = parse_var(ENV_MAX_MOVE_ATTEMPTS, &value)?;
        }
        if let Some(value) = lookup(ENV_BUSY_TIMEOUT_MS) {
            config.busy_timeout_ms = parse_var(ENV_BUSY_TIMEOUT_MS, &value)?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.database_path.as_os_str().is_empty() {
            return Err("database_path cannot be empty".to_string());
        }

        if self.rebalance_stride < 2 {
            return Err("rebalance_stride must be at least 2".to_string());
        }

        if self.max_move_attempts == 0 {
            return Err("max_move_attempts must be greater than 0".to_string());
        }

        Ok(())
    }
}

fn parse_var<T: std::str::FromStr>(name: &str, value: &str) -> Result<T, String> {
    value
        .trim()
        .parse()
        .map_err(|_| format!("{} has an invalid value: '{}'", name, value))
}

/// `~/.knowtree/database/knowtree.db`, or a relative path when there is no home
fn default_database_path() -> PathBuf {
    dirs::home_dir()
        .map(|home| home.join(".knowtree"))
        .unwrap_or_else(|| PathBuf::from(".knowtree"))
        .join("database")
        .join("knowtree.db")
}
