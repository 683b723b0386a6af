//! SurrealDB implementation of [`ApiRepository`].

use chrono::{DateTime, Utc};
use cloudops_core::error::CloudOpsResult;
use cloudops_core::models::api::{Api, ApiKind, CreateApi};
use cloudops_core::repository::ApiRepository;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;

use crate::error::DbError;
use crate::repository::CountRow;
use crate::sequence::next_id;

#[derive(Debug, SurrealValue)]
struct ApiRow {
    record_id: i64,
    pid: i64,
    path: String,
    method: String,
    title: String,
    kind: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

fn parse_kind(s: &str) -> Result<ApiKind, DbError> {
    match s {
        "Group" => Ok(ApiKind::Group),
        "Endpoint" => Ok(ApiKind::Endpoint),
        other => Err(DbError::Decode(format!("unknown api kind: {other}"))),
    }
}

fn kind_to_string(k: ApiKind) -> &'static str {
    match k {
        ApiKind::Group => "Group",
        ApiKind::Endpoint => "Endpoint",
    }
}

impl ApiRow {
    fn try_into_api(self) -> Result<Api, DbError> {
        Ok(Api {
            id: self.record_id,
            pid: self.pid,
            path: self.path,
            method: self.method,
            title: self.title,
            kind: parse_kind(&self.kind)?,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// SurrealDB implementation of the API permission repository.
#[derive(Clone)]
pub struct SurrealApiRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealApiRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> ApiRepository for SurrealApiRepository<C> {
    async fn create(&self, input: CreateApi) -> CloudOpsResult<Api> {
        let id = next_id(&self.db, "api").await?;

        let result = self
            .db
            .query(
                "CREATE type::record('api', $id) SET \
                 pid = $pid, path = $path, method = $method, title = $title, \
                 kind = $kind; \
                 SELECT record::id(id) AS record_id, * FROM type::record('api', $id);",
            )
            .bind(("id", id))
            .bind(("pid", input.pid))
            .bind(("path", input.path))
            .bind(("method", input.method))
            .bind(("title", input.title))
            .bind(("kind", kind_to_string(input.kind)))
            .await
            .map_err(DbError::from)?;
        let mut result = result.check().map_err(|e| DbError::Query(e.to_string()))?;

        let rows: Vec<ApiRow> = result.take(1).map_err(DbError::from)?;
        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| DbError::not_found("api", id))?;

        row.try_into_api().map_err(Into::into)
    }

    async fn get_by_id(&self, id: i64) -> CloudOpsResult<Api> {
        let mut result = self
            .db
            .query("SELECT record::id(id) AS record_id, * FROM type::record('api', $id)")
            .bind(("id", id))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<ApiRow> = result.take(0).map_err(DbError::from)?;
        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| DbError::not_found("api", id))?;

        row.try_into_api().map_err(Into::into)
    }

    async fn list(&self) -> CloudOpsResult<Vec<Api>> {
        let mut result = self
            .db
            .query("SELECT record::id(id) AS record_id, * FROM api ORDER BY id ASC")
            .await
            .map_err(DbError::from)?;

        let rows: Vec<ApiRow> = result.take(0).map_err(DbError::from)?;
        rows.into_iter()
            .map(ApiRow::try_into_api)
            .collect::<Result<Vec<_>, DbError>>()
            .map_err(Into::into)
    }

    async fn delete(&self, id: i64) -> CloudOpsResult<()> {
        self.db
            .query("DELETE type::record('api', $id)")
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
            .query("SELECT count() AS total FROM api WHERE pid = $pid GROUP ALL")
            .bind(("pid", id))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<CountRow> = result.take(0).map_err(DbError::from)?;
        Ok(rows.first().map(|r| r.total).unwrap_or(0) > 0)
    }
}
