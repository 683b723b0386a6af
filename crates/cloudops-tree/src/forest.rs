//! Forest assembly and node selection views.
//!
//! Stored entities never carry their children. Parent/child structure
//! is rebuilt from the flat record set on every read and returned as
//! [`TreeView`] values that wrap the entity with the derived fields.

use std::collections::HashMap;

use cloudops_core::models::api::Api;
use cloudops_core::models::menu::Menu;
use cloudops_core::models::tree_node::{ROOT_PID, TreeNode};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// An entity that sits in a parent/child hierarchy keyed by integer
/// IDs, with [`ROOT_PID`] marking top-level items.
pub trait Hierarchical {
    fn id(&self) -> i64;
    fn pid(&self) -> i64;
}

impl Hierarchical for TreeNode {
    fn id(&self) -> i64 {
        self.id
    }
    fn pid(&self) -> i64 {
        self.pid
    }
}

impl Hierarchical for Api {
    fn id(&self) -> i64 {
        self.id
    }
    fn pid(&self) -> i64 {
        self.pid
    }
}

impl Hierarchical for Menu {
    fn id(&self) -> i64 {
        self.id
    }
    fn pid(&self) -> i64 {
        self.pid
    }
}

/// An item together with its direct children.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeView<T> {
    #[serde(flatten)]
    pub item: T,
    /// The item ID rendered as a string.
    pub key: String,
    pub children: Vec<TreeView<T>>,
}

impl<T> TreeView<T> {
    /// Number of items in this subtree, itself included.
    pub fn subtree_size(&self) -> usize {
        1 + self
            .children
            .iter()
            .map(TreeView::subtree_size)
            .sum::<usize>()
    }
}

/// Assemble a flat item list into its ordered roots with children
/// attached.
///
/// Roots and siblings keep their input order. Items whose parent
/// chain never reaches a root (missing parents or cycles) are left
/// out of the result.
pub fn build_forest<T: Hierarchical>(items: Vec<T>) -> Vec<TreeView<T>> {
    let total = items.len();
    let mut roots = Vec::new();
    let mut children: HashMap<i64, Vec<T>> = HashMap::new();

    for item in items {
        if item.pid() == ROOT_PID {
            roots.push(item);
        } else {
            children.entry(item.pid()).or_default().push(item);
        }
    }

    let forest: Vec<TreeView<T>> = roots
        .into_iter()
        .map(|root| attach(root, &mut children))
        .collect();

    let placed: usize = forest.iter().map(TreeView::subtree_size).sum();
    if placed < total {
        let mut unreached: Vec<i64> = children.values().flatten().map(|item| item.id()).collect();
        unreached.sort_unstable();
        warn!(
            dropped = total - placed,
            ids = ?unreached,
            "Items not reachable from any root were left out of the tree"
        );
    }

    forest
}

fn attach<T: Hierarchical>(item: T, children: &mut HashMap<i64, Vec<T>>) -> TreeView<T> {
    // Removing the entry means each child list is consumed at most once.
    let kids = children.remove(&item.id()).unwrap_or_default();
    TreeView {
        key: item.id().to_string(),
        children: kids.into_iter().map(|kid| attach(kid, children)).collect(),
        item,
    }
}

/// A tree node offered as a selectable option.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectedNode {
    #[serde(flatten)]
    pub node: TreeNode,
    /// The node ID.
    pub value: i64,
}

/// Keep nodes at `level` (any level when 0) and no deeper than
/// `level_lt` (unbounded when 0).
pub fn select_nodes(nodes: Vec<TreeNode>, level: i64, level_lt: i64) -> Vec<SelectedNode> {
    nodes
        .into_iter()
        .filter(|n| level == 0 || n.level == level)
        .filter(|n| level_lt == 0 || n.level <= level_lt)
        .map(|node| SelectedNode {
            value: node.id,
            node,
        })
        .collect()
}
