//! Resource tree configuration.

/// Configuration for the tree service.
#[derive(Debug, Clone)]
pub struct TreeConfig {
    /// Reject deleting a node while resources are still bound to it
    /// (default: true). When false the node's binding edges are
    /// dropped together with it.
    pub block_delete_bound_nodes: bool,
    /// Deepest level a node may be created at. `None` leaves depth
    /// bounded only by the parent rule.
    pub max_level: Option<i64>,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            block_delete_bound_nodes: true,
            max_level: None,
        }
    }
}
