//! SurrealDB implementation of [`RoleRepository`].

use chrono::{DateTime, Utc};
use cloudops_core::error::CloudOpsResult;
use cloudops_core::models::role::{CreateRole, Role, RoleStatus, UpdateRole};
use cloudops_core::repository::RoleRepository;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;

use crate::error::DbError;
use crate::sequence::next_id;

#[derive(Debug, SurrealValue)]
struct RoleRow {
    record_id: i64,
    name: String,
    description: String,
    status: String,
    menu_ids: Vec<i64>,
    api_ids: Vec<i64>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

fn parse_status(s: &str) -> Result<RoleStatus, DbError> {
    match s {
        "Enabled" => Ok(RoleStatus::Enabled),
        "Disabled" => Ok(RoleStatus::Disabled),
        other => Err(DbError::Decode(format!("unknown role status: {other}"))),
    }
}

fn status_to_string(s: RoleStatus) -> &'static str {
    match s {
        RoleStatus::Enabled => "Enabled",
        RoleStatus::Disabled => "Disabled",
    }
}

impl RoleRow {
    fn try_into_role(self) -> Result<Role, DbError> {
        Ok(Role {
            id: self.record_id,
            name: self.name,
            description: self.description,
            status: parse_status(&self.status)?,
            menu_ids: self.menu_ids,
            api_ids: self.api_ids,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// SurrealDB implementation of the Role repository.
#[derive(Clone)]
pub struct SurrealRoleRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealRoleRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> RoleRepository for SurrealRoleRepository<C> {
    async fn create(&self, input: CreateRole) -> CloudOpsResult<Role> {
        let id = next_id(&self.db, "role").await?;

        let result = self
            .db
            .query(
                "CREATE type::record('role', $id) SET \
                 name = $name, description = $description, status = $status, \
                 menu_ids = $menu_ids, api_ids = $api_ids; \
                 SELECT record::id(id) AS record_id, * FROM type::record('role', $id);",
            )
            .bind(("id", id))
            .bind(("name", input.name))
            .bind(("description", input.description))
            .bind(("status", status_to_string(RoleStatus::Enabled)))
            .bind(("menu_ids", input.menu_ids))
            .bind(("api_ids", input.api_ids))
            .await
            .map_err(DbError::from)?;
        let mut result = result.check().map_err(|e| DbError::Query(e.to_string()))?;

        let rows: Vec<RoleRow> = result.take(1).map_err(DbError::from)?;
        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| DbError::not_found("role", id))?;

        row.try_into_role().map_err(Into::into)
    }

    async fn get_by_id(&self, id: i64) -> CloudOpsResult<Role> {
        let mut result = self
            .db
            .query("SELECT record::id(id) AS record_id, * FROM type::record('role', $id)")
            .bind(("id", id))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<RoleRow> = result.take(0).map_err(DbError::from)?;
        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| DbError::not_found("role", id))?;

        row.try_into_role().map_err(Into::into)
    }

    async fn update(&self, id: i64, input: UpdateRole) -> CloudOpsResult<Role> {
        let mut sets = Vec::new();
        if input.name.is_some() {
            sets.push("name = $name");
        }
        if input.description.is_some() {
            sets.push("description = $description");
        }
        if input.menu_ids.is_some() {
            sets.push("menu_ids = $menu_ids");
        }
        if input.api_ids.is_some() {
            sets.push("api_ids = $api_ids");
        }
        sets.push("updated_at = time::now()");

        let query = format!(
            "UPDATE type::record('role', $id) SET {}; \
             SELECT record::id(id) AS record_id, * FROM type::record('role', $id);",
            sets.join(", ")
        );

        let mut builder = self.db.query(&query).bind(("id", id));
        if let Some(name) = input.name {
            builder = builder.bind(("name", name));
        }
        if let Some(description) = input.description {
            builder = builder.bind(("description", description));
        }
        if let Some(menu_ids) = input.menu_ids {
            builder = builder.bind(("menu_ids", menu_ids));
        }
        if let Some(api_ids) = input.api_ids {
            builder = builder.bind(("api_ids", api_ids));
        }

        let result = builder.await.map_err(DbError::from)?;
        let mut result = result.check().map_err(|e| DbError::Query(e.to_string()))?;

        let rows: Vec<RoleRow> = result.take(1).map_err(DbError::from)?;
        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| DbError::not_found("role", id))?;

        row.try_into_role().map_err(Into::into)
    }

    async fn set_status(&self, id: i64, status: RoleStatus) -> CloudOpsResult<Role> {
        let result = self
            .db
            .query(
                "UPDATE type::record('role', $id) SET status = $status, \
                 updated_at = time::now(); \
                 SELECT record::id(id) AS record_id, * FROM type::record('role', $id);",
            )
            .bind(("id", id))
            .bind(("status", status_to_string(status)))
            .await
            .map_err(DbError::from)?;
        let mut result = result.check().map_err(|e| DbError::Query(e.to_string()))?;

        let rows: Vec<RoleRow> = result.take(1).map_err(DbError::from)?;
        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| DbError::not_found("role", id))?;

        row.try_into_role().map_err(Into::into)
    }

    async fn delete(&self, id: i64) -> CloudOpsResult<()> {
        self.db
            .query("DELETE type::record('role', $id)")
            .bind(("id", id))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::Query(e.to_string()))?;

        Ok(())
    }

    async fn list(&self) -> CloudOpsResult<Vec<Role>> {
        let mut result = self
            .db
            .query("SELECT record::id(id) AS record_id, * FROM role ORDER BY id ASC")
            .await
            .map_err(DbError::from)?;

        let rows: Vec<RoleRow> = result.take(0).map_err(DbError::from)?;
        rows.into_iter()
            .map(RoleRow::try_into_role)
            .collect::<Result<Vec<_>, DbError>>()
            .map_err(Into::into)
    }
}
