//! Resource tree node domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::user::User;

/// `pid` value carried by top-level nodes.
pub const ROOT_PID: i64 = 0;

/// Level of a top-level node.
pub const ROOT_LEVEL: i64 = 1;

/// A node of the organizational resource tree (team, project,
/// environment, ...).
///
/// Leaf nodes are the units cloud resources are bound to; internal
/// nodes only group other nodes. The children of a node are never
/// stored on it; see the tree views built by `cloudops-tree`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TreeNode {
    pub id: i64,
    pub pid: i64,
    pub level: i64,
    pub title: String,
    pub description: String,
    pub is_leaf: bool,
    /// Operations owners. Empty when loaded without preload.
    pub ops_admins: Vec<User>,
    /// Development owners. Empty when loaded without preload.
    pub rd_admins: Vec<User>,
    /// Development members. Empty when loaded without preload.
    pub rd_members: Vec<User>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTreeNode {
    pub pid: i64,
    pub level: i64,
    pub title: String,
    pub description: String,
    pub is_leaf: bool,
}

/// Full replacement of a node's mutable fields.
///
/// `pid` and `level` are fixed at creation. User references are
/// already resolved to IDs.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UpdateTreeNode {
    pub title: String,
    pub description: String,
    pub is_leaf: bool,
    pub ops_admin_ids: Vec<i64>,
    pub rd_admin_ids: Vec<i64>,
    pub rd_member_ids: Vec<i64>,
}
