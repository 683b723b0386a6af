//! Database-specific error types and conversions.

use cloudops_core::error::CloudOpsError;

/// Database-layer error type.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("SurrealDB error: {0}")]
    Surreal(#[from] surrealdb::Error),

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Malformed record: {0}")]
    Decode(String),

    #[error("Record not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },
}

impl DbError {
    pub(crate) fn not_found(entity: &str, id: i64) -> Self {
        Self::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }
}

impl From<DbError> for CloudOpsError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => CloudOpsError::NotFound { entity, id },
            other => CloudOpsError::Database(other.to_string()),
        }
    }
}
