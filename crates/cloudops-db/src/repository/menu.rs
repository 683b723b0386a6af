//! SurrealDB implementation of [`MenuRepository`].

use chrono::{DateTime, Utc};
use cloudops_core::error::CloudOpsResult;
use cloudops_core::models::menu::{CreateMenu, Menu};
use cloudops_core::repository::MenuRepository;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;

use crate::error::DbError;
use crate::sequence::next_id;

#[derive(Debug, SurrealValue)]
struct MenuRow {
    record_id: i64,
    pid: i64,
    name: String,
    title: String,
    path: String,
    component: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl MenuRow {
    fn into_menu(self) -> Menu {
        Menu {
            id: self.record_id,
            pid: self.pid,
            name: self.name,
            title: self.title,
            path: self.path,
            component: self.component,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// SurrealDB implementation of the Menu repository.
#[derive(Clone)]
pub struct SurrealMenuRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealMenuRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> MenuRepository for SurrealMenuRepository<C> {
    async fn create(&self, input: CreateMenu) -> CloudOpsResult<Menu> {
        let id = next_id(&self.db, "menu").await?;

        let result = self
            .db
            .query(
                "CREATE type::record('menu', $id) SET \
                 pid = $pid, name = $name, title = $title, path = $path, \
                 component = $component; \
                 SELECT record::id(id) AS record_id, * FROM type::record('menu', $id);",
            )
            .bind(("id", id))
            .bind(("pid", input.pid))
            .bind(("name", input.name))
            .bind(("title", input.title))
            .bind(("path", input.path))
            .bind(("component", input.component))
            .await
            .map_err(DbError::from)?;
        let mut result = result.check().map_err(|e| DbError::Query(e.to_string()))?;

        let rows: Vec<MenuRow> = result.take(1).map_err(DbError::from)?;
        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| DbError::not_found("menu", id))?;

        Ok(row.into_menu())
    }

    async fn get_by_id(&self, id: i64) -> CloudOpsResult<Menu> {
        let mut result = self
            .db
            .query("SELECT record::id(id) AS record_id, * FROM type::record('menu', $id)")
            .bind(("id", id))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<MenuRow> = result.take(0).map_err(DbError::from)?;
        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| DbError::not_found("menu", id))?;

        Ok(row.into_menu())
    }

    async fn list(&self) -> CloudOpsResult<Vec<Menu>> {
        let mut result = self
            .db
            .query("SELECT record::id(id) AS record_id, * FROM menu ORDER BY id ASC")
            .await
            .map_err(DbError::from)?;

        let rows: Vec<MenuRow> = result.take(0).map_err(DbError::from)?;
        Ok(rows.into_iter().map(MenuRow::into_menu).collect())
    }
}
