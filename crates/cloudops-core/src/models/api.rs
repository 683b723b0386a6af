//! API permission entry domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ApiKind {
    /// Parent entry grouping related endpoints.
    Group,
    /// A concrete route.
    Endpoint,
}

/// A route that roles can be granted access to. Entries nest through
/// `pid` (0 = top level).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Api {
    pub id: i64,
    pub pid: i64,
    pub path: String,
    pub method: String,
    pub title: String,
    pub kind: ApiKind,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateApi {
    pub pid: i64,
    pub path: String,
    pub method: String,
    pub title: String,
    pub kind: ApiKind,
}
