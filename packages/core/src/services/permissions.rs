//! Permission checks for knowledge base access
//!
//! The tree services never decide access themselves. They ask a
//! `PermissionOracle` supplied by the host application before touching storage.

use crate::services::error::TreeServiceError;
use async_trait::async_trait;
use std::fmt;

/// Access level required by an operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccessLevel {
    Read,
    Write,
}

impl AccessLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccessLevel::Read => "read",
            AccessLevel::Write => "write",
        }
    }
}

impl fmt::Display for AccessLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Answers whether a user may access a knowledge base at a given level
#[async_trait]
pub trait PermissionOracle: Send + Sync {
    async fn has_permission(
        &self,
        kb_id: &str,
        user_id: &str,
        level: AccessLevel,
    ) -> Result<bool, TreeServiceError>;
}

/// Grants everything to every authenticated user.
///
/// Suitable for single-user embeddings and tests; multi-user hosts should
/// provide a real policy.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

#[async_trait]
impl PermissionOracle for AllowAll {
    async fn has_permission(
        &self,
        _kb_id: &str,
        _user_id: &str,
        _level: AccessLevel,
    ) -> Result<bool, TreeServiceError> {
        Ok(true)
    }
}
