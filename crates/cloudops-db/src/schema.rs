//! Schema definitions and migration runner for SurrealDB.
//!
//! All table definitions use SCHEMAFULL mode. Records are keyed by
//! integer IDs drawn from `_sequence`; parent references are stored as
//! plain integers with 0 meaning "top level". Enums are stored as
//! strings with ASSERT constraints.

use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tracing::info;

use crate::error::DbError;

// -----------------------------------------------------------------------
// Migration tracking
// -----------------------------------------------------------------------

const MIGRATION_TABLE_DDL: &str = "\
DEFINE TABLE IF NOT EXISTS _migration SCHEMAFULL;
DEFINE FIELD IF NOT EXISTS version ON TABLE _migration TYPE int;
DEFINE FIELD IF NOT EXISTS name ON TABLE _migration TYPE string;
DEFINE FIELD IF NOT EXISTS applied_at ON TABLE _migration TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX IF NOT EXISTS idx_migration_version ON TABLE _migration \
    COLUMNS version UNIQUE;
";

#[derive(Debug, SurrealValue)]
struct MigrationRecord {
    version: u32,
}

struct Migration {
    version: u32,
    name: &'static str,
    sql: &'static str,
}

static MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    name: "initial_schema",
    sql: SCHEMA_V1,
}];

// -----------------------------------------------------------------------
// Schema v1: initial table definitions
// -----------------------------------------------------------------------

const SCHEMA_V1: &str = "\
-- =======================================================================
-- ID sequences (one counter record per table)
-- =======================================================================
DEFINE TABLE _sequence SCHEMAFULL;
DEFINE FIELD current ON TABLE _sequence TYPE int;

-- =======================================================================
-- Users
-- =======================================================================
DEFINE TABLE user SCHEMAFULL;
DEFINE FIELD username ON TABLE user TYPE string;
DEFINE FIELD real_name ON TABLE user TYPE string;
DEFINE FIELD email ON TABLE user TYPE string;
DEFINE FIELD created_at ON TABLE user TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE user TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_user_username ON TABLE user COLUMNS username UNIQUE;

-- =======================================================================
-- Resource tree nodes
-- =======================================================================
DEFINE TABLE tree_node SCHEMAFULL;
DEFINE FIELD pid ON TABLE tree_node TYPE int;
DEFINE FIELD level ON TABLE tree_node TYPE int ASSERT $value >= 1;
DEFINE FIELD title ON TABLE tree_node TYPE string;
DEFINE FIELD description ON TABLE tree_node TYPE string DEFAULT '';
DEFINE FIELD is_leaf ON TABLE tree_node TYPE bool DEFAULT false;
DEFINE FIELD ops_admin_ids ON TABLE tree_node TYPE array DEFAULT [];
DEFINE FIELD ops_admin_ids.* ON TABLE tree_node TYPE int;
DEFINE FIELD rd_admin_ids ON TABLE tree_node TYPE array DEFAULT [];
DEFINE FIELD rd_admin_ids.* ON TABLE tree_node TYPE int;
DEFINE FIELD rd_member_ids ON TABLE tree_node TYPE array DEFAULT [];
DEFINE FIELD rd_member_ids.* ON TABLE tree_node TYPE int;
DEFINE FIELD created_at ON TABLE tree_node TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE tree_node TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_tree_node_pid ON TABLE tree_node COLUMNS pid;
DEFINE INDEX idx_tree_node_level ON TABLE tree_node COLUMNS level;

-- =======================================================================
-- Cloud resources (ECS, ELB, RDS)
-- =======================================================================
DEFINE TABLE cloud_resource SCHEMAFULL;
DEFINE FIELD kind ON TABLE cloud_resource TYPE string \
    ASSERT $value IN ['ecs', 'elb', 'rds'];
DEFINE FIELD instance_name ON TABLE cloud_resource TYPE string;
DEFINE FIELD ip_addr ON TABLE cloud_resource TYPE string;
DEFINE FIELD vendor ON TABLE cloud_resource TYPE string DEFAULT '';
DEFINE FIELD region ON TABLE cloud_resource TYPE string DEFAULT '';
DEFINE FIELD description ON TABLE cloud_resource TYPE string \
    DEFAULT '';
DEFINE FIELD metadata ON TABLE cloud_resource TYPE object FLEXIBLE \
    DEFAULT {};
DEFINE FIELD hash ON TABLE cloud_resource TYPE string;
DEFINE FIELD created_at ON TABLE cloud_resource TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE cloud_resource TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_cloud_resource_kind ON TABLE cloud_resource \
    COLUMNS kind;
DEFINE INDEX idx_cloud_resource_hash ON TABLE cloud_resource \
    COLUMNS hash;

-- =======================================================================
-- System management: roles, menus, APIs
-- =======================================================================
DEFINE TABLE role SCHEMAFULL;
DEFINE FIELD name ON TABLE role TYPE string;
DEFINE FIELD description ON TABLE role TYPE string DEFAULT '';
DEFINE FIELD status ON TABLE role TYPE string \
    ASSERT $value IN ['Enabled', 'Disabled'];
DEFINE FIELD menu_ids ON TABLE role TYPE array DEFAULT [];
DEFINE FIELD menu_ids.* ON TABLE role TYPE int;
DEFINE FIELD api_ids ON TABLE role TYPE array DEFAULT [];
DEFINE FIELD api_ids.* ON TABLE role TYPE int;
DEFINE FIELD created_at ON TABLE role TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE role TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_role_name ON TABLE role COLUMNS name UNIQUE;

DEFINE TABLE menu SCHEMAFULL;
DEFINE FIELD pid ON TABLE menu TYPE int;
DEFINE FIELD name ON TABLE menu TYPE string;
DEFINE FIELD title ON TABLE menu TYPE string;
DEFINE FIELD path ON TABLE menu TYPE string;
DEFINE FIELD component ON TABLE menu TYPE string DEFAULT '';
DEFINE FIELD created_at ON TABLE menu TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE menu TYPE datetime \
    DEFAULT time::now();

DEFINE TABLE api SCHEMAFULL;
DEFINE FIELD pid ON TABLE api TYPE int;
DEFINE FIELD path ON TABLE api TYPE string;
DEFINE FIELD method ON TABLE api TYPE string;
DEFINE FIELD title ON TABLE api TYPE string;
DEFINE FIELD kind ON TABLE api TYPE string \
    ASSERT $value IN ['Group', 'Endpoint'];
DEFINE FIELD created_at ON TABLE api TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE api TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_api_title ON TABLE api COLUMNS title UNIQUE;
DEFINE INDEX idx_api_pid ON TABLE api COLUMNS pid;

-- =======================================================================
-- Graph Edge Tables (relations)
-- =======================================================================

-- Cloud resource -> tree node binding; at most one edge per pair
DEFINE TABLE bound_to TYPE RELATION SCHEMAFULL;
DEFINE FIELD created_at ON TABLE bound_to TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_bound_to_pair ON TABLE bound_to COLUMNS in, out UNIQUE;
";

// -----------------------------------------------------------------------
// Public API
// -----------------------------------------------------------------------

/// Run all pending migrations against the given SurrealDB client.
///
/// Ensures the `_migration` tracking table exists, then applies every
/// migration newer than the highest recorded version, in order.
pub async fn run_migrations<C: Connection>(db: &Surreal<C>) -> Result<(), DbError> {
    db.query(MIGRATION_TABLE_DDL)
        .await?
        .check()
        .map_err(|e| DbError::Migration(e.to_string()))?;

    let current_version = current_version(db).await?;

    for migration in MIGRATIONS
        .iter()
        .filter(|m| m.version > current_version)
    {
        info!(
            version = migration.version,
            name = migration.name,
            "Applying migration"
        );
        apply(db, migration).await?;
        info!(version = migration.version, "Migration applied");
    }

    Ok(())
}

async fn current_version<C: Connection>(db: &Surreal<C>) -> Result<u32, DbError> {
    let mut result = db
        .query("SELECT version FROM _migration ORDER BY version DESC LIMIT 1")
        .await?;
    let records: Vec<MigrationRecord> = result.take(0)?;
    Ok(records.first().map(|m| m.version).unwrap_or(0))
}

async fn apply<C: Connection>(db: &Surreal<C>, migration: &Migration) -> Result<(), DbError> {
    db.query(migration.sql).await?.check().map_err(|e| {
        DbError::Migration(format!(
            "v{} '{}' failed: {e}",
            migration.version, migration.name
        ))
    })?;

    db.query("CREATE _migration SET version = $version, name = $name")
        .bind(("version", migration.version))
        .bind(("name", migration.name))
        .await?
        .check()
        .map_err(|e| {
            DbError::Migration(format!(
                "could not record v{}: {e}",
                migration.version
            ))
        })?;

    Ok(())
}
