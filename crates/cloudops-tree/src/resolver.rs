//! Descendant leaf resolution.

use std::collections::{HashMap, HashSet};

use cloudops_core::models::tree_node::TreeNode;

/// IDs of the leaf nodes reachable from `root_id`, including the root
/// itself when it is a leaf.
///
/// Returns an empty set when `root_id` is not among `nodes`. The walk
/// tracks visited IDs, so corrupt parent links cannot loop it.
pub fn leaf_descendants(nodes: &[TreeNode], root_id: i64) -> HashSet<i64> {
    let mut by_id: HashMap<i64, &TreeNode> = HashMap::with_capacity(nodes.len());
    let mut children: HashMap<i64, Vec<i64>> = HashMap::new();
    for node in nodes {
        by_id.insert(node.id, node);
        children.entry(node.pid).or_default().push(node.id);
    }

    let mut leaves = HashSet::new();
    if !by_id.contains_key(&root_id) {
        return leaves;
    }

    let mut visited = HashSet::new();
    let mut stack = vec![root_id];
    while let Some(id) = stack.pop() {
        if !visited.insert(id) {
            continue;
        }
        let Some(node) = by_id.get(&id) else {
            continue;
        };
        if node.is_leaf {
            leaves.insert(id);
            continue;
        }
        if let Some(kids) = children.get(&id) {
            stack.extend(kids.iter().copied());
        }
    }

    leaves
}
