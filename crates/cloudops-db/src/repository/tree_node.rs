//! SurrealDB implementation of [`TreeNodeRepository`].

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use cloudops_core::error::CloudOpsResult;
use cloudops_core::models::tree_node::{CreateTreeNode, TreeNode, UpdateTreeNode};
use cloudops_core::models::user::User;
use cloudops_core::repository::TreeNodeRepository;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;

use crate::error::DbError;
use crate::repository::CountRow;
use crate::repository::user::users_by_ids;
use crate::sequence::next_id;

#[derive(Debug, SurrealValue)]
struct TreeNodeRow {
    record_id: i64,
    pid: i64,
    level: i64,
    title: String,
    description: String,
    is_leaf: bool,
    ops_admin_ids: Vec<i64>,
    rd_admin_ids: Vec<i64>,
    rd_member_ids: Vec<i64>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TreeNodeRow {
    fn user_ids(&self) -> impl Iterator<Item = i64> + '_ {
        self.ops_admin_ids
            .iter()
            .chain(&self.rd_admin_ids)
            .chain(&self.rd_member_ids)
            .copied()
    }

    /// Convert into a node, resolving role user IDs through `users`.
    /// Pass an empty map to skip preloading.
    fn into_node(self, users: &HashMap<i64, User>) -> TreeNode {
        let resolve = |ids: &[i64]| -> Vec<User> {
            ids.iter().filter_map(|id| users.get(id).cloned()).collect()
        };
        TreeNode {
            id: self.record_id,
            pid: self.pid,
            level: self.level,
            title: self.title,
            description: self.description,
            is_leaf: self.is_leaf,
            ops_admins: resolve(&self.ops_admin_ids),
            rd_admins: resolve(&self.rd_admin_ids),
            rd_members: resolve(&self.rd_member_ids),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// SurrealDB implementation of the tree node repository.
#[derive(Clone)]
pub struct SurrealTreeNodeRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealTreeNodeRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }

    async fn select_rows(
        &self,
        filter: &'static str,
        param: Option<(&'static str, i64)>,
    ) -> Result<Vec<TreeNodeRow>, DbError> {
        let query = format!(
            "SELECT record::id(id) AS record_id, * FROM tree_node {filter} ORDER BY id ASC"
        );
        let mut builder = self.db.query(query);
        if let Some(param) = param {
            builder = builder.bind(param);
        }
        let mut result = builder.await?;
        Ok(result.take(0)?)
    }

    async fn select_one(&self, id: i64) -> Result<TreeNodeRow, DbError> {
        let mut result = self
            .db
            .query("SELECT record::id(id) AS record_id, * FROM type::record('tree_node', $id)")
            .bind(("id", id))
            .await?;

        let rows: Vec<TreeNodeRow> = result.take(0)?;
        rows.into_iter()
            .next()
            .ok_or_else(|| DbError::not_found("tree_node", id))
    }

    async fn preload(&self, rows: Vec<TreeNodeRow>) -> Result<Vec<TreeNode>, DbError> {
        let mut ids: Vec<i64> = rows.iter().flat_map(TreeNodeRow::user_ids).collect();
        ids.sort_unstable();
        ids.dedup();

        let users = users_by_ids(&self.db, ids).await?;
        Ok(rows.into_iter().map(|row| row.into_node(&users)).collect())
    }
}

fn without_users(rows: Vec<TreeNodeRow>) -> Vec<TreeNode> {
    let none = HashMap::new();
    rows.into_iter().map(|row| row.into_node(&none)).collect()
}

impl<C: Connection> TreeNodeRepository for SurrealTreeNodeRepository<C> {
    async fn get_all(&self) -> CloudOpsResult<Vec<TreeNode>> {
        let rows = self.select_rows("", None).await?;
        Ok(self.preload(rows).await?)
    }

    async fn get_all_no_preload(&self) -> CloudOpsResult<Vec<TreeNode>> {
        let rows = self.select_rows("", None).await?;
        Ok(without_users(rows))
    }

    async fn get_by_id(&self, id: i64) -> CloudOpsResult<TreeNode> {
        let row = self.select_one(id).await?;
        let mut nodes = self.preload(vec![row]).await?;
        nodes
            .pop()
            .ok_or_else(|| DbError::not_found("tree_node", id).into())
    }

    async fn get_by_id_no_preload(&self, id: i64) -> CloudOpsResult<TreeNode> {
        let row = self.select_one(id).await?;
        Ok(row.into_node(&HashMap::new()))
    }

    async fn get_by_pid(&self, pid: i64) -> CloudOpsResult<Vec<TreeNode>> {
        let rows = self
            .select_rows("WHERE pid = $pid", Some(("pid", pid)))
            .await?;
        Ok(self.preload(rows).await?)
    }

    async fn get_by_level(&self, level: i64) -> CloudOpsResult<Vec<TreeNode>> {
        let rows = self
            .select_rows("WHERE level = $level", Some(("level", level)))
            .await?;
        Ok(self.preload(rows).await?)
    }

    async fn create(&self, input: CreateTreeNode) -> CloudOpsResult<TreeNode> {
        let id = next_id(&self.db, "tree_node").await?;

        let result = self
            .db
            .query(
                "CREATE type::record('tree_node', $id) SET \
                 pid = $pid, level = $level, title = $title, \
                 description = $description, is_leaf = $is_leaf; \
                 SELECT record::id(id) AS record_id, * FROM type::record('tree_node', $id);",
            )
            .bind(("id", id))
            .bind(("pid", input.pid))
            .bind(("level", input.level))
            .bind(("title", input.title))
            .bind(("description", input.description))
            .bind(("is_leaf", input.is_leaf))
            .await
            .map_err(DbError::from)?;
        let mut result = result.check().map_err(|e| DbError::Query(e.to_string()))?;

        let rows: Vec<TreeNodeRow> = result.take(1).map_err(DbError::from)?;
        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| DbError::not_found("tree_node", id))?;

        Ok(row.into_node(&HashMap::new()))
    }

    async fn update(&self, id: i64, input: UpdateTreeNode) -> CloudOpsResult<TreeNode> {
        let result = self
            .db
            .query(
                "UPDATE type::record('tree_node', $id) SET \
                 title = $title, description = $description, is_leaf = $is_leaf, \
                 ops_admin_ids = $ops_admin_ids, rd_admin_ids = $rd_admin_ids, \
                 rd_member_ids = $rd_member_ids, updated_at = time::now(); \
                 SELECT record::id(id) AS record_id, * FROM type::record('tree_node', $id);",
            )
            .bind(("id", id))
            .bind(("title", input.title))
            .bind(("description", input.description))
            .bind(("is_leaf", input.is_leaf))
            .bind(("ops_admin_ids", input.ops_admin_ids))
            .bind(("rd_admin_ids", input.rd_admin_ids))
            .bind(("rd_member_ids", input.rd_member_ids))
            .await
            .map_err(DbError::from)?;
        let mut result = result.check().map_err(|e| DbError::Query(e.to_string()))?;

        let rows: Vec<TreeNodeRow> = result.take(1).map_err(DbError::from)?;
        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| DbError::not_found("tree_node", id))?;

        let mut nodes = self.preload(vec![row]).await?;
        nodes
            .pop()
            .ok_or_else(|| DbError::not_found("tree_node", id).into())
    }

    async fn delete(&self, id: i64) -> CloudOpsResult<()> {
        self.db
            .query(
                "DELETE bound_to WHERE out = type::record('tree_node', $id); \
                 DELETE type::record('tree_node', $id);",
            )
            .bind(("id", id))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::Query(e.to_string()))?;

        Ok(())
    }

    async fn has_children(&self, id: i64) -> CloudOpsResult<bool> {
        let mut result = self
            .db
            .query("SELECT count() AS total FROM tree_node WHERE pid = $pid GROUP ALL")
            .bind(("pid", id))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<CountRow> = result.take(0).map_err(DbError::from)?;
        Ok(rows.first().map(|r| r.total).unwrap_or(0) > 0)
    }
}
