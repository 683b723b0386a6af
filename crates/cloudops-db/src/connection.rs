//! Opening the CloudOps store.
//!
//! [`connect`] hands back a client that is signed in, scoped to the
//! configured namespace/database and migrated to the latest schema,
//! ready to be cloned into the repositories.

use surrealdb::Surreal;
use surrealdb::engine::remote::ws::{Client, Ws};
use surrealdb::opt::auth::Root;
use tracing::info;

use crate::error::DbError;
use crate::schema::run_migrations;

/// Store location and root credentials, read from the `CLOUDOPS_DB_*`
/// variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DbConfig {
    /// WebSocket address, `host:port`.
    pub url: String,
    pub namespace: String,
    pub database: String,
    pub username: String,
    pub password: String,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            url: "127.0.0.1:8000".into(),
            namespace: "cloudops".into(),
            database: "main".into(),
            username: "root".into(),
            password: "root".into(),
        }
    }
}

impl DbConfig {
    /// Overlay the `CLOUDOPS_DB_*` variables found through `lookup` on
    /// the defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            url: lookup("CLOUDOPS_DB_URL").unwrap_or(defaults.url),
            namespace: lookup("CLOUDOPS_DB_NAMESPACE").unwrap_or(defaults.namespace),
            database: lookup("CLOUDOPS_DB_DATABASE").unwrap_or(defaults.database),
            username: lookup("CLOUDOPS_DB_USER").unwrap_or(defaults.username),
            password: lookup("CLOUDOPS_DB_PASSWORD").unwrap_or(defaults.password),
        }
    }
}

/// Connect over WebSocket, sign in as root, select the namespace and
/// database, and apply pending migrations.
pub async fn connect(config: &DbConfig) -> Result<Surreal<Client>, DbError> {
    info!(
        url = %config.url,
        namespace = %config.namespace,
        database = %config.database,
        "Opening CloudOps store"
    );

    let db = Surreal::new::<Ws>(config.url.as_str()).await?;
    db.signin(Root {
        username: config.username.clone(),
        password: config.password.clone(),
    })
    .await?;
    db.use_ns(config.namespace.as_str())
        .use_db(config.database.as_str())
        .await?;

    run_migrations(&db).await?;
    info!(namespace = %config.namespace, database = %config.database, "CloudOps store ready");

    Ok(db)
}
