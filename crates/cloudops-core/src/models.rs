//! Domain models for CloudOps.
//!
//! These are the core types shared across all crates.

pub mod api;
pub mod menu;
pub mod resource;
pub mod role;
pub mod tree_node;
pub mod user;
