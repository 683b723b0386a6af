//! Repository trait definitions for data access abstraction.
//!
//! All repository operations are async. Lookups by ID return
//! [`CloudOpsError::NotFound`](crate::error::CloudOpsError::NotFound)
//! when the record does not exist.

use crate::error::CloudOpsResult;
use crate::models::{
    api::{Api, CreateApi},
    menu::{CreateMenu, Menu},
    resource::{CloudResource, CreateResource, ResourceKind, UpdateResource},
    role::{CreateRole, Role, RoleStatus, UpdateRole},
    tree_node::{CreateTreeNode, TreeNode, UpdateTreeNode},
    user::{CreateUser, User},
};

/// Pagination parameters for list queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub offset: u64,
    pub limit: u64,
}

impl Pagination {
    /// Convert a 1-based page number and page size into an offset window.
    pub fn from_page(page: u64, size: u64) -> Self {
        Self {
            offset: page.saturating_sub(1).saturating_mul(size),
            limit: size,
        }
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            offset: 0,
            limit: 50,
        }
    }
}

/// A paginated result set.
#[derive(Debug, Clone)]
pub struct PaginatedResult<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub offset: u64,
    pub limit: u64,
}

// ---------------------------------------------------------------------------
// Resource tree
// ---------------------------------------------------------------------------

pub trait TreeNodeRepository: Send + Sync {
    /// All nodes ordered by ID, with role users resolved.
    fn get_all(&self) -> impl Future<Output = CloudOpsResult<Vec<TreeNode>>> + Send;
    /// All nodes ordered by ID, role user lists left empty.
    fn get_all_no_preload(&self) -> impl Future<Output = CloudOpsResult<Vec<TreeNode>>> + Send;
    fn get_by_id(&self, id: i64) -> impl Future<Output = CloudOpsResult<TreeNode>> + Send;
    fn get_by_id_no_preload(&self, id: i64)
    -> impl Future<Output = CloudOpsResult<TreeNode>> + Send;
    /// Direct children of `pid`.
    fn get_by_pid(&self, pid: i64) -> impl Future<Output = CloudOpsResult<Vec<TreeNode>>> + Send;
    fn get_by_level(&self, level: i64)
    -> impl Future<Output = CloudOpsResult<Vec<TreeNode>>> + Send;
    fn create(&self, input: CreateTreeNode)
    -> impl Future<Output = CloudOpsResult<TreeNode>> + Send;
    fn update(
        &self,
        id: i64,
        input: UpdateTreeNode,
    ) -> impl Future<Output = CloudOpsResult<TreeNode>> + Send;
    /// Delete the node together with any binding edges still pointing
    /// at it.
    fn delete(&self, id: i64) -> impl Future<Output = CloudOpsResult<()>> + Send;
    fn has_children(&self, id: i64) -> impl Future<Output = CloudOpsResult<bool>> + Send;
}

pub trait ResourceRepository: Send + Sync {
    /// All resources of `kind` ordered by ID, with bound node IDs.
    fn get_all(
        &self,
        kind: ResourceKind,
    ) -> impl Future<Output = CloudOpsResult<Vec<CloudResource>>> + Send;
    fn get_by_id(
        &self,
        kind: ResourceKind,
        id: i64,
    ) -> impl Future<Output = CloudOpsResult<CloudResource>> + Send;
    /// Fetch without resolving bindings (`bind_nodes` is empty).
    fn get_by_id_no_preload(
        &self,
        kind: ResourceKind,
        id: i64,
    ) -> impl Future<Output = CloudOpsResult<CloudResource>> + Send;
    fn create(
        &self,
        input: CreateResource,
        hash: String,
    ) -> impl Future<Output = CloudOpsResult<CloudResource>> + Send;
    /// Partial update. `hash` replaces the stored fingerprint when set.
    fn update(
        &self,
        kind: ResourceKind,
        id: i64,
        input: UpdateResource,
        hash: Option<String>,
    ) -> impl Future<Output = CloudOpsResult<CloudResource>> + Send;
    fn delete(&self, kind: ResourceKind, id: i64)
    -> impl Future<Output = CloudOpsResult<()>> + Send;

    /// Ensure a `bound_to` edge exists between the resource and the
    /// node. Returns `true` if the edge was created, `false` if it was
    /// already present.
    fn add_bind_node(
        &self,
        resource_id: i64,
        node_id: i64,
    ) -> impl Future<Output = CloudOpsResult<bool>> + Send;

    /// Ensure no `bound_to` edge exists between the resource and the
    /// node. Returns `true` if an edge was removed.
    fn remove_bind_node(
        &self,
        resource_id: i64,
        node_id: i64,
    ) -> impl Future<Output = CloudOpsResult<bool>> + Send;

    /// Number of resources (of any kind) bound to a node.
    fn count_bound_to_node(&self, node_id: i64)
    -> impl Future<Output = CloudOpsResult<u64>> + Send;
}

pub trait UserRepository: Send + Sync {
    fn create(&self, input: CreateUser) -> impl Future<Output = CloudOpsResult<User>> + Send;
    fn get_by_id(&self, id: i64) -> impl Future<Output = CloudOpsResult<User>> + Send;
    fn get_by_username(&self, username: &str)
    -> impl Future<Output = CloudOpsResult<User>> + Send;
}

// ---------------------------------------------------------------------------
// System management
// ---------------------------------------------------------------------------

pub trait RoleRepository: Send + Sync {
    fn create(&self, input: CreateRole) -> impl Future<Output = CloudOpsResult<Role>> + Send;
    fn get_by_id(&self, id: i64) -> impl Future<Output = CloudOpsResult<Role>> + Send;
    fn update(&self, id: i64, input: UpdateRole)
    -> impl Future<Output = CloudOpsResult<Role>> + Send;
    fn set_status(
        &self,
        id: i64,
        status: RoleStatus,
    ) -> impl Future<Output = CloudOpsResult<Role>> + Send;
    fn delete(&self, id: i64) -> impl Future<Output = CloudOpsResult<()>> + Send;
    fn list(&self) -> impl Future<Output = CloudOpsResult<Vec<Role>>> + Send;
}

pub trait MenuRepository: Send + Sync {
    fn create(&self, input: CreateMenu) -> impl Future<Output = CloudOpsResult<Menu>> + Send;
    fn get_by_id(&self, id: i64) -> impl Future<Output = CloudOpsResult<Menu>> + Send;
    fn list(&self) -> impl Future<Output = CloudOpsResult<Vec<Menu>>> + Send;
}

pub trait ApiRepository: Send + Sync {
    fn create(&self, input: CreateApi) -> impl Future<Output = CloudOpsResult<Api>> + Send;
    fn get_by_id(&self, id: i64) -> impl Future<Output = CloudOpsResult<Api>> + Send;
    fn list(&self) -> impl Future<Output = CloudOpsResult<Vec<Api>>> + Send;
    fn delete(&self, id: i64) -> impl Future<Output = CloudOpsResult<()>> + Send;
    fn has_children(&self, id: i64) -> impl Future<Output = CloudOpsResult<bool>> + Send;
}
