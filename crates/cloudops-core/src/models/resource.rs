//! Cloud resource domain model (ECS, ELB, RDS).

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::CloudOpsError;

/// The kinds of cloud resource that can be bound to tree nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    /// Compute instance.
    Ecs,
    /// Load balancer.
    Elb,
    /// Relational database instance.
    Rds,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 3] = [ResourceKind::Ecs, ResourceKind::Elb, ResourceKind::Rds];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ecs => "ecs",
            Self::Elb => "elb",
            Self::Rds => "rds",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResourceKind {
    type Err = CloudOpsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ecs" => Ok(Self::Ecs),
            "elb" => Ok(Self::Elb),
            "rds" => Ok(Self::Rds),
            other => Err(CloudOpsError::validation(format!(
                "unknown resource type: {other}"
            ))),
        }
    }
}

/// A cloud resource record and the tree nodes it is bound to.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CloudResource {
    pub id: i64,
    pub kind: ResourceKind,
    pub instance_name: String,
    pub ip_addr: String,
    pub vendor: String,
    pub region: String,
    pub description: String,
    /// Kind-specific attributes (instance type, engine, bandwidth, ...).
    pub metadata: serde_json::Value,
    /// SHA-256 fingerprint of the identifying fields, hex-encoded.
    pub hash: String,
    /// IDs of the tree nodes this resource is bound to. Empty when
    /// loaded without preload.
    pub bind_nodes: Vec<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CloudResource {
    pub fn is_bound(&self) -> bool {
        !self.bind_nodes.is_empty()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateResource {
    pub kind: ResourceKind,
    pub instance_name: String,
    pub ip_addr: String,
    pub vendor: String,
    pub region: String,
    pub description: String,
    pub metadata: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UpdateResource {
    pub instance_name: Option<String>,
    pub ip_addr: Option<String>,
    pub vendor: Option<String>,
    pub region: Option<String>,
    pub description: Option<String>,
    pub metadata: Option<serde_json::Value>,
}
