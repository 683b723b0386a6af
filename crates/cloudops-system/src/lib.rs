//! CloudOps System: role grants and the API/menu permission trees.

pub mod api;
pub mod role;

pub use api::ApiService;
pub use role::RoleService;
