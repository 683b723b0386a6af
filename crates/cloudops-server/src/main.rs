//! CloudOps Server: application entry point.

mod config;

use std::process::ExitCode;

use cloudops_core::error::CloudOpsResult;
use cloudops_core::models::resource::ResourceKind;
use cloudops_db::repository::{
    SurrealApiRepository, SurrealMenuRepository, SurrealResourceRepository,
    SurrealRoleRepository, SurrealTreeNodeRepository, SurrealUserRepository,
};
use cloudops_system::{ApiService, RoleService};
use cloudops_tree::TreeService;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::config::{DEFAULT_LOG_FILTER, ServerConfig};

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    let config = ServerConfig::from_env();
    let filter = config
        .as_ref()
        .ok()
        .and_then(|c| EnvFilter::try_new(&c.log_filter).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_LOG_FILTER));
    tracing_subscriber::fmt().with_env_filter(filter).json().init();

    info!("Starting CloudOps server...");

    let result = match config {
        Ok(config) => run(config).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(()) => {
            info!("CloudOps server stopped.");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, "CloudOps server failed");
            ExitCode::FAILURE
        }
    }
}

async fn run(config: ServerConfig) -> CloudOpsResult<()> {
    let db = cloudops_db::connect(&config.db).await?;

    let tree = TreeService::new(
        SurrealTreeNodeRepository::new(db.clone()),
        SurrealResourceRepository::new(db.clone()),
        SurrealUserRepository::new(db.clone()),
        config.tree,
    );
    let roles = RoleService::new(
        SurrealRoleRepository::new(db.clone()),
        SurrealMenuRepository::new(db.clone()),
        SurrealApiRepository::new(db.clone()),
    );
    let apis = ApiService::new(
        SurrealApiRepository::new(db.clone()),
        SurrealMenuRepository::new(db),
    );

    let nodes = tree.select_nodes(0, 0).await?.len();
    let leaves = tree.leaf_nodes().await?.len();
    info!(nodes, leaves, "Resource tree loaded");

    for kind in ResourceKind::ALL {
        let total = tree.list_resources(kind).await?.len();
        let unbound = tree.list_unbound_resources(kind).await?.len();
        info!(%kind, total, unbound, "Resources loaded");
    }

    let role_count = roles.list_roles().await?.len();
    let api_groups = apis.list_api_tree().await?.len();
    let menu_roots = apis.list_menu_tree().await?.len();
    info!(roles = role_count, api_groups, menu_roots, "System tables loaded");

    Ok(())
}
