//! CloudOps Tree: resource tree assembly, descendant resolution,
//! scoped resource aggregation and the node/binding service.

pub mod config;
pub mod forest;
pub mod hash;
pub mod resolver;
pub mod scope;
pub mod service;

pub use config::TreeConfig;
pub use forest::{Hierarchical, SelectedNode, TreeView, build_forest, select_nodes};
pub use resolver::leaf_descendants;
pub use service::{BindingChange, TreeService, UpdateTreeNodeInput};
