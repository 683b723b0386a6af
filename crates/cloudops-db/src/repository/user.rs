//! SurrealDB implementation of [`UserRepository`].

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use cloudops_core::error::CloudOpsResult;
use cloudops_core::models::user::{CreateUser, User};
use cloudops_core::repository::UserRepository;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;

use crate::error::DbError;
use crate::sequence::next_id;

#[derive(Debug, SurrealValue)]
struct UserRow {
    record_id: i64,
    username: String,
    real_name: String,
    email: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl UserRow {
    fn into_user(self) -> User {
        User {
            id: self.record_id,
            username: self.username,
            real_name: self.real_name,
            email: self.email,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// Fetch the users with the given IDs, keyed by ID. Unknown IDs are
/// skipped.
pub(crate) async fn users_by_ids<C: Connection>(
    db: &Surreal<C>,
    ids: Vec<i64>,
) -> Result<HashMap<i64, User>, DbError> {
    if ids.is_empty() {
        return Ok(HashMap::new());
    }

    let mut result = db
        .query("SELECT record::id(id) AS record_id, * FROM user WHERE record::id(id) IN $ids")
        .bind(("ids", ids))
        .await?;
    let rows: Vec<UserRow> = result.take(0)?;

    Ok(rows
        .into_iter()
        .map(|row| (row.record_id, row.into_user()))
        .collect())
}

/// SurrealDB implementation of the User repository.
#[derive(Clone)]
pub struct SurrealUserRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealUserRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> UserRepository for SurrealUserRepository<C> {
    async fn create(&self, input: CreateUser) -> CloudOpsResult<User> {
        let id = next_id(&self.db, "user").await?;

        let result = self
            .db
            .query(
                "CREATE type::record('user', $id) SET \
                 username = $username, real_name = $real_name, email = $email; \
                 SELECT record::id(id) AS record_id, * FROM type::record('user', $id);",
            )
            .bind(("id", id))
            .bind(("username", input.username))
            .bind(("real_name", input.real_name))
            .bind(("email", input.email))
            .await
            .map_err(DbError::from)?;
        let mut result = result.check().map_err(|e| DbError::Query(e.to_string()))?;

        let rows: Vec<UserRow> = result.take(1).map_err(DbError::from)?;
        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| DbError::not_found("user", id))?;

        Ok(row.into_user())
    }

    async fn get_by_id(&self, id: i64) -> CloudOpsResult<User> {
        let mut result = self
            .db
            .query("SELECT record::id(id) AS record_id, * FROM type::record('user', $id)")
            .bind(("id", id))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<UserRow> = result.take(0).map_err(DbError::from)?;
        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| DbError::not_found("user", id))?;

        Ok(row.into_user())
    }

    async fn get_by_username(&self, username: &str) -> CloudOpsResult<User> {
        let mut result = self
            .db
            .query(
                "SELECT record::id(id) AS record_id, * FROM user \
                 WHERE username = $username LIMIT 1",
            )
            .bind(("username", username.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<UserRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "user".into(),
            id: username.to_string(),
        })?;

        Ok(row.into_user())
    }
}
