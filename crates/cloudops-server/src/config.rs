//! Server configuration loaded from the environment.

use cloudops_core::error::{CloudOpsError, CloudOpsResult};
use cloudops_db::DbConfig;
use cloudops_tree::TreeConfig;

/// Log filter used when neither `CLOUDOPS_LOG` nor `RUST_LOG` is set.
pub const DEFAULT_LOG_FILTER: &str = "cloudops=info";

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub db: DbConfig,
    pub tree: TreeConfig,
    /// `tracing-subscriber` filter directive.
    pub log_filter: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            db: DbConfig::default(),
            tree: TreeConfig::default(),
            log_filter: DEFAULT_LOG_FILTER.into(),
        }
    }
}

impl ServerConfig {
    /// Read the configuration from process environment variables.
    /// Unset variables keep their defaults.
    pub fn from_env() -> CloudOpsResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> CloudOpsResult<Self> {
        let mut config = Self {
            db: DbConfig::from_lookup(&lookup),
            ..Self::default()
        };

        if let Some(raw) = lookup("CLOUDOPS_BLOCK_DELETE_BOUND_NODES") {
            config.tree.block_delete_bound_nodes =
                parse_bool("CLOUDOPS_BLOCK_DELETE_BOUND_NODES", &raw)?;
        }
        if let Some(raw) = lookup("CLOUDOPS_MAX_LEVEL") {
            let max_level: i64 = raw.trim().parse().map_err(|_| {
                CloudOpsError::validation(format!(
                    "CLOUDOPS_MAX_LEVEL must be an integer, got {raw:?}"
                ))
            })?;
            if max_level < 1 {
                return Err(CloudOpsError::validation(format!(
                    "CLOUDOPS_MAX_LEVEL must be at least 1, got {max_level}"
                )));
            }
            config.tree.max_level = Some(max_level);
        }

        if let Some(filter) = lookup("CLOUDOPS_LOG").or_else(|| lookup("RUST_LOG")) {
            config.log_filter = filter;
        }

        Ok(config)
    }
}

fn parse_bool(key: &str, raw: &str) -> CloudOpsResult<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(CloudOpsError::validation(format!(
            "{key} must be a boolean, got {raw:?}"
        ))),
    }
}
