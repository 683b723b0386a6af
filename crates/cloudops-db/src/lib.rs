//! CloudOps Database: SurrealDB connection management, schema
//! migrations and the repository implementations for the
//! `cloudops-core` traits.

mod connection;
mod error;
pub mod repository;
mod schema;
mod sequence;

pub use connection::{DbConfig, connect};
pub use error::DbError;
pub use schema::run_migrations;
