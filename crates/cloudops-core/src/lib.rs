//! CloudOps core: domain models, error types, and the repository traits
//! implemented by the persistence layer.

pub mod error;
pub mod models;
pub mod repository;
