//! Menu domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A console navigation entry. Menus nest through `pid` (0 = top level).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Menu {
    pub id: i64,
    pub pid: i64,
    pub name: String,
    pub title: String,
    pub path: String,
    pub component: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateMenu {
    pub pid: i64,
    pub name: String,
    pub title: String,
    pub path: String,
    pub component: String,
}
