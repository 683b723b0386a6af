//! Role management service.

use cloudops_core::error::CloudOpsResult;
use cloudops_core::models::role::{CreateRole, Role, RoleStatus, UpdateRole};
use cloudops_core::repository::{ApiRepository, MenuRepository, RoleRepository};
use tracing::{info, warn};

/// Role service.
///
/// Granted menus and APIs are checked to exist before a role is
/// written, so a role never references a missing entry at the time
/// it is saved.
pub struct RoleService<R: RoleRepository, M: MenuRepository, A: ApiRepository> {
    role_repo: R,
    menu_repo: M,
    api_repo: A,
}

impl<R, M, A> RoleService<R, M, A>
where
    R: RoleRepository,
    M: MenuRepository,
    A: ApiRepository,
{
    pub fn new(role_repo: R, menu_repo: M, api_repo: A) -> Self {
        Self {
            role_repo,
            menu_repo,
            api_repo,
        }
    }

    pub async fn list_roles(&self) -> CloudOpsResult<Vec<Role>> {
        self.role_repo.list().await
    }

    pub async fn create_role(&self, input: CreateRole) -> CloudOpsResult<Role> {
        self.check_grants(&input.menu_ids, &input.api_ids).await?;

        let role = self.role_repo.create(input).await?;
        info!(role_id = role.id, name = %role.name, "Role created");
        Ok(role)
    }

    /// Partial update. Only the grant lists that are present are
    /// checked and replaced.
    pub async fn update_role(&self, id: i64, input: UpdateRole) -> CloudOpsResult<Role> {
        self.role_repo.get_by_id(id).await?;
        self.check_grants(
            input.menu_ids.as_deref().unwrap_or_default(),
            input.api_ids.as_deref().unwrap_or_default(),
        )
        .await?;

        let role = self.role_repo.update(id, input).await?;
        info!(role_id = id, "Role updated");
        Ok(role)
    }

    pub async fn set_role_status(&self, id: i64, status: RoleStatus) -> CloudOpsResult<Role> {
        let role = self.role_repo.set_status(id, status).await?;
        info!(role_id = id, ?status, "Role status changed");
        Ok(role)
    }

    pub async fn delete_role(&self, id: i64) -> CloudOpsResult<()> {
        self.role_repo.get_by_id(id).await?;
        self.role_repo.delete(id).await?;
        info!(role_id = id, "Role deleted");
        Ok(())
    }

    async fn check_grants(&self, menu_ids: &[i64], api_ids: &[i64]) -> CloudOpsResult<()> {
        for &menu_id in menu_ids {
            if let Err(e) = self.menu_repo.get_by_id(menu_id).await {
                warn!(menu_id, error = %e, "Role grants an unknown menu");
                return Err(e);
            }
        }
        for &api_id in api_ids {
            if let Err(e) = self.api_repo.get_by_id(api_id).await {
                warn!(api_id, error = %e, "Role grants an unknown API");
                return Err(e);
            }
        }
        Ok(())
    }
}
