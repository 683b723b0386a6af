//! Subtree-scoped resource filtering and page windows.

use std::collections::HashSet;

use cloudops_core::models::resource::CloudResource;
use cloudops_core::repository::{PaginatedResult, Pagination};

/// Keep the resources bound to at least one node in `leaves`,
/// preserving input order.
pub fn bound_within(resources: Vec<CloudResource>, leaves: &HashSet<i64>) -> Vec<CloudResource> {
    resources
        .into_iter()
        .filter(|r| r.bind_nodes.iter().any(|id| leaves.contains(id)))
        .collect()
}

/// Cut one page out of `items`.
///
/// An offset past the end yields an empty page; the upper bound is
/// clamped to the item count. `total` is the full item count.
pub fn paginate<T>(items: Vec<T>, page: Pagination) -> PaginatedResult<T> {
    let total = items.len() as u64;
    let offset = usize::try_from(page.offset).unwrap_or(usize::MAX);
    let limit = usize::try_from(page.limit).unwrap_or(usize::MAX);

    let items = if offset >= items.len() {
        Vec::new()
    } else {
        items.into_iter().skip(offset).take(limit).collect()
    };

    PaginatedResult {
        items,
        total,
        offset: page.offset,
        limit: page.limit,
    }
}
