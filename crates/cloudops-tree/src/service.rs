//! Tree service: node lifecycle, resource bindings and scoped
//! resource queries.

use std::collections::HashSet;

use cloudops_core::error::{CloudOpsError, CloudOpsResult, InvariantViolation};
use cloudops_core::models::resource::{
    CloudResource, CreateResource, ResourceKind, UpdateResource,
};
use cloudops_core::models::tree_node::{
    CreateTreeNode, ROOT_LEVEL, ROOT_PID, TreeNode, UpdateTreeNode,
};
use cloudops_core::repository::{
    PaginatedResult, Pagination, ResourceRepository, TreeNodeRepository, UserRepository,
};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::config::TreeConfig;
use crate::forest::{SelectedNode, TreeView, build_forest, select_nodes};
use crate::hash::resource_hash;
use crate::resolver::leaf_descendants;
use crate::scope::{bound_within, paginate};

/// Input for a node update. Role members are given by username.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateTreeNodeInput {
    pub title: String,
    pub description: String,
    pub is_leaf: bool,
    pub ops_admins: Vec<String>,
    pub rd_admins: Vec<String>,
    pub rd_members: Vec<String>,
}

/// Outcome of a bind or unbind request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BindingChange {
    /// The edge set changed.
    Applied,
    /// The edge was already in the requested state.
    Unchanged,
}

impl From<bool> for BindingChange {
    fn from(changed: bool) -> Self {
        if changed { Self::Applied } else { Self::Unchanged }
    }
}

/// Resource tree service.
///
/// Generic over repository implementations so that the tree layer
/// has no dependency on the database crate.
pub struct TreeService<N: TreeNodeRepository, R: ResourceRepository, U: UserRepository> {
    node_repo: N,
    resource_repo: R,
    user_repo: U,
    config: TreeConfig,
}

impl<N, R, U> TreeService<N, R, U>
where
    N: TreeNodeRepository,
    R: ResourceRepository,
    U: UserRepository,
{
    pub fn new(node_repo: N, resource_repo: R, user_repo: U, config: TreeConfig) -> Self {
        Self {
            node_repo,
            resource_repo,
            user_repo,
            config,
        }
    }

    // -----------------------------------------------------------------------
    // Node queries
    // -----------------------------------------------------------------------

    /// The whole tree as ordered roots with children attached.
    pub async fn get_tree(&self) -> CloudOpsResult<Vec<TreeView<TreeNode>>> {
        let nodes = self.node_repo.get_all().await?;
        Ok(build_forest(nodes))
    }

    /// Nodes at `level` (0 = any) no deeper than `level_lt` (0 = any).
    pub async fn select_nodes(
        &self,
        level: i64,
        level_lt: i64,
    ) -> CloudOpsResult<Vec<SelectedNode>> {
        let nodes = self.node_repo.get_all().await?;
        Ok(select_nodes(nodes, level, level_lt))
    }

    pub async fn top_nodes(&self) -> CloudOpsResult<Vec<TreeNode>> {
        self.node_repo.get_by_level(ROOT_LEVEL).await
    }

    pub async fn leaf_nodes(&self) -> CloudOpsResult<Vec<TreeNode>> {
        let nodes = self.node_repo.get_all().await?;
        Ok(nodes.into_iter().filter(|n| n.is_leaf).collect())
    }

    pub async fn children_of(&self, pid: i64) -> CloudOpsResult<Vec<TreeNode>> {
        self.node_repo.get_by_pid(pid).await
    }

    pub async fn get_node(&self, id: i64) -> CloudOpsResult<TreeNode> {
        self.node_repo.get_by_id(id).await
    }

    /// Leaf IDs under `root_id`; empty when the node does not exist.
    pub async fn leaf_descendants(&self, root_id: i64) -> CloudOpsResult<HashSet<i64>> {
        let nodes = self.node_repo.get_all_no_preload().await?;
        Ok(leaf_descendants(&nodes, root_id))
    }

    // -----------------------------------------------------------------------
    // Node lifecycle
    // -----------------------------------------------------------------------

    /// Create a node after checking its position in the tree.
    pub async fn create_node(&self, input: CreateTreeNode) -> CloudOpsResult<TreeNode> {
        if let Err(e) = self.check_placement(&input).await {
            warn!(pid = input.pid, level = input.level, error = %e, "Node creation rejected");
            return Err(e);
        }

        let node = self
            .node_repo
            .create(input)
            .await
            .inspect_err(|e| error!(error = %e, "Failed to store tree node"))?;
        info!(node_id = node.id, pid = node.pid, level = node.level, "Tree node created");
        Ok(node)
    }

    async fn check_placement(&self, input: &CreateTreeNode) -> CloudOpsResult<()> {
        if input.pid == ROOT_PID {
            if input.level != ROOT_LEVEL {
                return Err(CloudOpsError::validation(format!(
                    "top-level node must have level {ROOT_LEVEL}, got {}",
                    input.level
                )));
            }
            return Ok(());
        }
        if input.level < ROOT_LEVEL {
            return Err(CloudOpsError::validation(format!(
                "node level must be at least {ROOT_LEVEL}, got {}",
                input.level
            )));
        }

        let parent = self.node_repo.get_by_id_no_preload(input.pid).await?;
        if let Some(max) = self.config.max_level.filter(|max| input.level > *max) {
            return Err(InvariantViolation::DepthLimitExceeded {
                level: input.level,
                max,
            }
            .into());
        }
        let max = parent.level + 1;
        if input.level > max {
            return Err(InvariantViolation::LevelExceeded {
                level: input.level,
                max,
            }
            .into());
        }
        if parent.is_leaf {
            return Err(InvariantViolation::ParentIsLeaf {
                parent_id: parent.id,
            }
            .into());
        }
        Ok(())
    }

    /// Replace a node's mutable fields.
    ///
    /// Every username is resolved before anything is written; an
    /// unknown user aborts the update.
    pub async fn update_node(
        &self,
        id: i64,
        input: UpdateTreeNodeInput,
    ) -> CloudOpsResult<TreeNode> {
        let node = self.node_repo.get_by_id_no_preload(id).await?;
        if input.is_leaf && !node.is_leaf && self.node_repo.has_children(id).await? {
            warn!(node_id = id, "Refusing to mark a parent node as leaf");
            return Err(InvariantViolation::HasChildren { node_id: id }.into());
        }

        let update = UpdateTreeNode {
            ops_admin_ids: self.resolve_users(&input.ops_admins).await?,
            rd_admin_ids: self.resolve_users(&input.rd_admins).await?,
            rd_member_ids: self.resolve_users(&input.rd_members).await?,
            title: input.title,
            description: input.description,
            is_leaf: input.is_leaf,
        };

        let node = self
            .node_repo
            .update(id, update)
            .await
            .inspect_err(|e| error!(node_id = id, error = %e, "Failed to update tree node"))?;
        info!(node_id = id, "Tree node updated");
        Ok(node)
    }

    async fn resolve_users(&self, usernames: &[String]) -> CloudOpsResult<Vec<i64>> {
        let mut ids = Vec::with_capacity(usernames.len());
        for username in usernames {
            let user = self.user_repo.get_by_username(username).await?;
            if !ids.contains(&user.id) {
                ids.push(user.id);
            }
        }
        Ok(ids)
    }

    /// Delete a childless node.
    ///
    /// With `block_delete_bound_nodes` set, a node that still has bound
    /// resources is rejected; otherwise its bindings go with it.
    pub async fn delete_node(&self, id: i64) -> CloudOpsResult<()> {
        self.node_repo.get_by_id_no_preload(id).await?;

        if self.node_repo.has_children(id).await? {
            warn!(node_id = id, "Refusing to delete node with children");
            return Err(InvariantViolation::HasChildren { node_id: id }.into());
        }

        let bindings = self.resource_repo.count_bound_to_node(id).await?;
        if bindings > 0 {
            if self.config.block_delete_bound_nodes {
                warn!(node_id = id, bindings, "Refusing to delete node with bound resources");
                return Err(InvariantViolation::NodeBound {
                    node_id: id,
                    bindings,
                }
                .into());
            }
            info!(node_id = id, bindings, "Dropping bindings of deleted node");
        }

        self.node_repo
            .delete(id)
            .await
            .inspect_err(|e| error!(node_id = id, error = %e, "Failed to delete tree node"))?;
        info!(node_id = id, "Tree node deleted");
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Resources
    // -----------------------------------------------------------------------

    pub async fn list_resources(&self, kind: ResourceKind) -> CloudOpsResult<Vec<CloudResource>> {
        self.resource_repo.get_all(kind).await
    }

    /// Resources of `kind` not bound to any node.
    pub async fn list_unbound_resources(
        &self,
        kind: ResourceKind,
    ) -> CloudOpsResult<Vec<CloudResource>> {
        let resources = self.resource_repo.get_all(kind).await?;
        Ok(resources.into_iter().filter(|r| !r.is_bound()).collect())
    }

    pub async fn get_resource(&self, kind: ResourceKind, id: i64) -> CloudOpsResult<CloudResource> {
        self.resource_repo.get_by_id(kind, id).await
    }

    /// One page of the resources of `kind` bound anywhere under
    /// `root_id`, in store order.
    pub async fn resources_in_subtree(
        &self,
        root_id: i64,
        kind: ResourceKind,
        page: u64,
        size: u64,
    ) -> CloudOpsResult<PaginatedResult<CloudResource>> {
        let leaves = self.leaf_descendants(root_id).await?;
        let resources = self.resource_repo.get_all(kind).await?;
        let matched = bound_within(resources, &leaves);
        Ok(paginate(matched, Pagination::from_page(page, size)))
    }

    pub async fn create_resource(&self, input: CreateResource) -> CloudOpsResult<CloudResource> {
        let hash = resource_hash(&input.instance_name, &input.ip_addr);
        let kind = input.kind;
        let resource = self
            .resource_repo
            .create(input, hash)
            .await
            .inspect_err(|e| error!(%kind, error = %e, "Failed to store resource"))?;
        info!(%kind, resource_id = resource.id, "Resource created");
        Ok(resource)
    }

    /// Partial update. The stored hash follows the identifying fields.
    pub async fn update_resource(
        &self,
        kind: ResourceKind,
        id: i64,
        input: UpdateResource,
    ) -> CloudOpsResult<CloudResource> {
        let current = self.resource_repo.get_by_id_no_preload(kind, id).await?;

        let instance_name = input
            .instance_name
            .as_deref()
            .unwrap_or(&current.instance_name);
        let ip_addr = input.ip_addr.as_deref().unwrap_or(&current.ip_addr);
        let hash = Some(resource_hash(instance_name, ip_addr)).filter(|h| *h != current.hash);

        let resource = self
            .resource_repo
            .update(kind, id, input, hash)
            .await
            .inspect_err(|e| {
                error!(%kind, resource_id = id, error = %e, "Failed to update resource")
            })?;
        info!(%kind, resource_id = id, "Resource updated");
        Ok(resource)
    }

    /// Delete a resource that is bound to no node.
    pub async fn delete_resource(&self, kind: ResourceKind, id: i64) -> CloudOpsResult<()> {
        let resource = self.resource_repo.get_by_id(kind, id).await?;
        if resource.is_bound() {
            warn!(
                %kind,
                resource_id = id,
                nodes = ?resource.bind_nodes,
                "Refusing to delete bound resource"
            );
            return Err(InvariantViolation::ResourceBound {
                resource_id: id,
                nodes: resource.bind_nodes.len(),
            }
            .into());
        }

        self.resource_repo
            .delete(kind, id)
            .await
            .inspect_err(|e| {
                error!(%kind, resource_id = id, error = %e, "Failed to delete resource")
            })?;
        info!(%kind, resource_id = id, "Resource deleted");
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Bindings
    // -----------------------------------------------------------------------

    /// Ensure the resource is bound to the node.
    pub async fn bind_resource(
        &self,
        kind: ResourceKind,
        resource_id: i64,
        node_id: i64,
    ) -> CloudOpsResult<BindingChange> {
        self.resource_repo
            .get_by_id_no_preload(kind, resource_id)
            .await?;
        let node = self.node_repo.get_by_id_no_preload(node_id).await?;
        if !node.is_leaf {
            warn!(%kind, resource_id, node_id, "Binding resource to a non-leaf node");
        }

        let change = BindingChange::from(
            self.resource_repo
                .add_bind_node(resource_id, node_id)
                .await?,
        );
        info!(%kind, resource_id, node_id, ?change, "Resource bound");
        Ok(change)
    }

    /// Ensure the resource is not bound to the node.
    pub async fn unbind_resource(
        &self,
        kind: ResourceKind,
        resource_id: i64,
        node_id: i64,
    ) -> CloudOpsResult<BindingChange> {
        self.resource_repo
            .get_by_id_no_preload(kind, resource_id)
            .await?;
        self.node_repo.get_by_id_no_preload(node_id).await?;

        let change = BindingChange::from(
            self.resource_repo
                .remove_bind_node(resource_id, node_id)
                .await?,
        );
        info!(%kind, resource_id, node_id, ?change, "Resource unbound");
        Ok(change)
    }
}
