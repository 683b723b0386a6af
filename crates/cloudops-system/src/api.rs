//! API and menu tree service.

use cloudops_core::error::{CloudOpsError, CloudOpsResult, InvariantViolation};
use cloudops_core::models::api::{Api, ApiKind, CreateApi};
use cloudops_core::models::menu::Menu;
use cloudops_core::models::tree_node::ROOT_PID;
use cloudops_core::repository::{ApiRepository, MenuRepository};
use cloudops_tree::forest::{TreeView, build_forest};
use tracing::{info, warn};

/// Serves the API permission tree and the menu tree, and guards API
/// entry creation and deletion.
pub struct ApiService<A: ApiRepository, M: MenuRepository> {
    api_repo: A,
    menu_repo: M,
}

impl<A, M> ApiService<A, M>
where
    A: ApiRepository,
    M: MenuRepository,
{
    pub fn new(api_repo: A, menu_repo: M) -> Self {
        Self {
            api_repo,
            menu_repo,
        }
    }

    pub async fn list_api_tree(&self) -> CloudOpsResult<Vec<TreeView<Api>>> {
        let apis = self.api_repo.list().await?;
        Ok(build_forest(apis))
    }

    pub async fn list_menu_tree(&self) -> CloudOpsResult<Vec<TreeView<Menu>>> {
        let menus = self.menu_repo.list().await?;
        Ok(build_forest(menus))
    }

    /// Create an API entry. A non-root entry must sit under a group.
    pub async fn create_api(&self, input: CreateApi) -> CloudOpsResult<Api> {
        if input.pid != ROOT_PID {
            let parent = self.api_repo.get_by_id(input.pid).await?;
            if parent.kind != ApiKind::Group {
                warn!(pid = input.pid, "API parent is not a group");
                return Err(CloudOpsError::validation(format!(
                    "API parent {} is not a group",
                    input.pid
                )));
            }
        }

        let api = self.api_repo.create(input).await?;
        info!(api_id = api.id, title = %api.title, "API created");
        Ok(api)
    }

    /// Delete an API entry that has no child entries.
    pub async fn delete_api(&self, id: i64) -> CloudOpsResult<()> {
        self.api_repo.get_by_id(id).await?;
        if self.api_repo.has_children(id).await? {
            warn!(api_id = id, "Refusing to delete API group with children");
            return Err(InvariantViolation::HasChildren { node_id: id }.into());
        }

        self.api_repo.delete(id).await?;
        info!(api_id = id, "API deleted");
        Ok(())
    }
}
