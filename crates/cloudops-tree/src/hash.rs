//! Resource fingerprinting.

use sha2::{Digest, Sha256};

/// SHA-256 of `"{instance_name}-{ip_addr}"`, lowercase hex.
///
/// Stored as `cloud_resource.hash` on create and whenever either
/// identifying field changes.
pub fn resource_hash(instance_name: &str, ip_addr: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(instance_name.as_bytes());
    hasher.update(b"-");
    hasher.update(ip_addr.as_bytes());
    hex::encode(hasher.finalize())
}
