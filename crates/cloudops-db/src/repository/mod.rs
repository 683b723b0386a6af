//! SurrealDB repository implementations.

use surrealdb_types::SurrealValue;

mod api;
mod menu;
mod resource;
mod role;
mod tree_node;
mod user;

pub use api::SurrealApiRepository;
pub use menu::SurrealMenuRepository;
pub use resource::SurrealResourceRepository;
pub use role::SurrealRoleRepository;
pub use tree_node::SurrealTreeNodeRepository;
pub use user::SurrealUserRepository;

/// Row struct for `count() ... GROUP ALL` queries.
#[derive(Debug, SurrealValue)]
pub(crate) struct CountRow {
    pub(crate) total: u64,
}
