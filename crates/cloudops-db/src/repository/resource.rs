//! SurrealDB implementation of [`ResourceRepository`].
//!
//! All resource kinds share the `cloud_resource` table and are told
//! apart by the `kind` column. Bindings are `bound_to` edges from a
//! resource record to a tree node record.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use cloudops_core::error::CloudOpsResult;
use cloudops_core::models::resource::{
    CloudResource, CreateResource, ResourceKind, UpdateResource,
};
use cloudops_core::repository::ResourceRepository;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tracing::debug;

use crate::error::DbError;
use crate::repository::CountRow;
use crate::sequence::next_id;

/// Unique `(in, out)` index on `bound_to`.
const BINDING_PAIR_INDEX: &str = "idx_bound_to_pair";

#[derive(Debug, SurrealValue)]
struct ResourceRow {
    record_id: i64,
    kind: String,
    instance_name: String,
    ip_addr: String,
    vendor: String,
    region: String,
    description: String,
    metadata: serde_json::Value,
    hash: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, SurrealValue)]
struct EdgeRow {
    resource_id: i64,
    node_id: i64,
}

impl ResourceRow {
    fn try_into_resource(self, bind_nodes: Vec<i64>) -> Result<CloudResource, DbError> {
        let kind = self
            .kind
            .parse::<ResourceKind>()
            .map_err(|e| DbError::Decode(e.to_string()))?;
        Ok(CloudResource {
            id: self.record_id,
            kind,
            instance_name: self.instance_name,
            ip_addr: self.ip_addr,
            vendor: self.vendor,
            region: self.region,
            description: self.description,
            metadata: self.metadata,
            hash: self.hash,
            bind_nodes,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// Group edges by resource, node IDs ascending.
fn group_edges(edges: Vec<EdgeRow>) -> HashMap<i64, Vec<i64>> {
    let mut grouped: HashMap<i64, Vec<i64>> = HashMap::new();
    for edge in edges {
        grouped.entry(edge.resource_id).or_default().push(edge.node_id);
    }
    for nodes in grouped.values_mut() {
        nodes.sort_unstable();
    }
    grouped
}

/// SurrealDB implementation of the cloud resource repository.
#[derive(Clone)]
pub struct SurrealResourceRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealResourceRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }

    async fn edge_exists(&self, resource_id: i64, node_id: i64) -> Result<bool, DbError> {
        let mut result = self
            .db
            .query(
                "SELECT count() AS total FROM bound_to WHERE \
                 in = type::record('cloud_resource', $resource_id) AND \
                 out = type::record('tree_node', $node_id) GROUP ALL",
            )
            .bind(("resource_id", resource_id))
            .bind(("node_id", node_id))
            .await?;

        let rows: Vec<CountRow> = result.take(0)?;
        Ok(rows.first().map(|r| r.total).unwrap_or(0) > 0)
    }

    async fn select_one(
        &self,
        kind: ResourceKind,
        id: i64,
        with_edges: bool,
    ) -> Result<CloudResource, DbError> {
        let mut result = self
            .db
            .query(
                "SELECT record::id(id) AS record_id, * FROM type::record('cloud_resource', $id) \
                 WHERE kind = $kind; \
                 SELECT record::id(in) AS resource_id, record::id(out) AS node_id FROM bound_to \
                 WHERE in = type::record('cloud_resource', $id);",
            )
            .bind(("id", id))
            .bind(("kind", kind.as_str()))
            .await?;

        let rows: Vec<ResourceRow> = result.take(0)?;
        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| DbError::not_found(kind.as_str(), id))?;

        let bind_nodes = if with_edges {
            let edges: Vec<EdgeRow> = result.take(1)?;
            group_edges(edges).remove(&id).unwrap_or_default()
        } else {
            Vec::new()
        };

        row.try_into_resource(bind_nodes)
    }
}

impl<C: Connection> ResourceRepository for SurrealResourceRepository<C> {
    async fn get_all(&self, kind: ResourceKind) -> CloudOpsResult<Vec<CloudResource>> {
        let mut result = self
            .db
            .query(
                "SELECT record::id(id) AS record_id, * FROM cloud_resource \
                 WHERE kind = $kind ORDER BY id ASC; \
                 SELECT record::id(in) AS resource_id, record::id(out) AS node_id FROM bound_to \
                 WHERE in.kind = $kind;",
            )
            .bind(("kind", kind.as_str()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<ResourceRow> = result.take(0).map_err(DbError::from)?;
        let edges: Vec<EdgeRow> = result.take(1).map_err(DbError::from)?;
        let mut edges = group_edges(edges);

        rows.into_iter()
            .map(|row| {
                let bind_nodes = edges.remove(&row.record_id).unwrap_or_default();
                row.try_into_resource(bind_nodes)
            })
            .collect::<Result<Vec<_>, DbError>>()
            .map_err(Into::into)
    }

    async fn get_by_id(&self, kind: ResourceKind, id: i64) -> CloudOpsResult<CloudResource> {
        Ok(self.select_one(kind, id, true).await?)
    }

    async fn get_by_id_no_preload(
        &self,
        kind: ResourceKind,
        id: i64,
    ) -> CloudOpsResult<CloudResource> {
        Ok(self.select_one(kind, id, false).await?)
    }

    async fn create(&self, input: CreateResource, hash: String) -> CloudOpsResult<CloudResource> {
        let id = next_id(&self.db, "cloud_resource").await?;
        let metadata = input
            .metadata
            .unwrap_or(serde_json::Value::Object(Default::default()));

        let result = self
            .db
            .query(
                "CREATE type::record('cloud_resource', $id) SET \
                 kind = $kind, instance_name = $instance_name, ip_addr = $ip_addr, \
                 vendor = $vendor, region = $region, description = $description, \
                 metadata = $metadata, hash = $hash; \
                 SELECT record::id(id) AS record_id, * FROM type::record('cloud_resource', $id);",
            )
            .bind(("id", id))
            .bind(("kind", input.kind.as_str()))
            .bind(("instance_name", input.instance_name))
            .bind(("ip_addr", input.ip_addr))
            .bind(("vendor", input.vendor))
            .bind(("region", input.region))
            .bind(("description", input.description))
            .bind(("metadata", metadata))
            .bind(("hash", hash))
            .await
            .map_err(DbError::from)?;
        let mut result = result.check().map_err(|e| DbError::Query(e.to_string()))?;

        let rows: Vec<ResourceRow> = result.take(1).map_err(DbError::from)?;
        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| DbError::not_found(input.kind.as_str(), id))?;

        row.try_into_resource(Vec::new()).map_err(Into::into)
    }

    async fn update(
        &self,
        kind: ResourceKind,
        id: i64,
        input: UpdateResource,
        hash: Option<String>,
    ) -> CloudOpsResult<CloudResource> {
        let mut sets = Vec::new();
        if input.instance_name.is_some() {
            sets.push("instance_name = $instance_name");
        }
        if input.ip_addr.is_some() {
            sets.push("ip_addr = $ip_addr");
        }
        if input.vendor.is_some() {
            sets.push("vendor = $vendor");
        }
        if input.region.is_some() {
            sets.push("region = $region");
        }
        if input.description.is_some() {
            sets.push("description = $description");
        }
        if input.metadata.is_some() {
            sets.push("metadata = $metadata");
        }
        if hash.is_some() {
            sets.push("hash = $hash");
        }
        sets.push("updated_at = time::now()");

        let query = format!(
            "UPDATE type::record('cloud_resource', $id) SET {} WHERE kind = $kind",
            sets.join(", ")
        );

        let mut builder = self
            .db
            .query(&query)
            .bind(("id", id))
            .bind(("kind", kind.as_str()));

        if let Some(instance_name) = input.instance_name {
            builder = builder.bind(("instance_name", instance_name));
        }
        if let Some(ip_addr) = input.ip_addr {
            builder = builder.bind(("ip_addr", ip_addr));
        }
        if let Some(vendor) = input.vendor {
            builder = builder.bind(("vendor", vendor));
        }
        if let Some(region) = input.region {
            builder = builder.bind(("region", region));
        }
        if let Some(description) = input.description {
            builder = builder.bind(("description", description));
        }
        if let Some(metadata) = input.metadata {
            builder = builder.bind(("metadata", metadata));
        }
        if let Some(hash) = hash {
            builder = builder.bind(("hash", hash));
        }

        builder
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::Query(e.to_string()))?;

        Ok(self.select_one(kind, id, true).await?)
    }

    async fn delete(&self, kind: ResourceKind, id: i64) -> CloudOpsResult<()> {
        self.db
            .query("DELETE type::record('cloud_resource', $id) WHERE kind = $kind")
            .bind(("id", id))
            .bind(("kind", kind.as_str()))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::Query(e.to_string()))?;

        Ok(())
    }

    async fn add_bind_node(&self, resource_id: i64, node_id: i64) -> CloudOpsResult<bool> {
        if self.edge_exists(resource_id, node_id).await? {
            debug!(resource_id, node_id, "Binding already present");
            return Ok(false);
        }

        // RELATE needs literal record IDs; both are integers.
        let query = format!(
            "RELATE cloud_resource:{resource_id} -> bound_to -> tree_node:{node_id};"
        );
        let result = self.db.query(query).await.map_err(DbError::from)?;
        match result.check() {
            Ok(_) => Ok(true),
            // A concurrent bind of the same pair won the unique index.
            Err(e) if e.to_string().contains(BINDING_PAIR_INDEX) => {
                debug!(resource_id, node_id, "Binding created concurrently");
                Ok(false)
            }
            Err(e) => Err(DbError::Query(e.to_string()).into()),
        }
    }

    async fn remove_bind_node(&self, resource_id: i64, node_id: i64) -> CloudOpsResult<bool> {
        if !self.edge_exists(resource_id, node_id).await? {
            debug!(resource_id, node_id, "Binding already absent");
            return Ok(false);
        }

        self.db
            .query(
                "DELETE bound_to WHERE \
                 in = type::record('cloud_resource', $resource_id) AND \
                 out = type::record('tree_node', $node_id)",
            )
            .bind(("resource_id", resource_id))
            .bind(("node_id", node_id))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::Query(e.to_string()))?;

        Ok(true)
    }

    async fn count_bound_to_node(&self, node_id: i64) -> CloudOpsResult<u64> {
        let mut result = self
            .db
            .query(
                "SELECT count() AS total FROM bound_to \
                 WHERE out = type::record('tree_node', $node_id) GROUP ALL",
            )
            .bind(("node_id", node_id))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<CountRow> = result.take(0).map_err(DbError::from)?;
        Ok(rows.first().map(|r| r.total).unwrap_or(0))
    }
}
