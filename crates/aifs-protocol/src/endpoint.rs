/// HTTP endpoint paths the AIFS server mounts.
pub mod endpoints {
    pub const ASSETS: &str = "/v1/assets";
    pub const SEARCH: &str = "/v1/search";
    pub const SNAPSHOTS: &str = "/v1/snapshots";
    pub const BRANCHES: &str = "/v1/branches";
    pub const TAGS: &str = "/v1/tags";
    pub const NAMESPACES: &str = "/v1/namespaces";
    pub const EVENTS: &str = "/v1/events";
    pub const HEALTH: &str = "/v1/health";
    pub const INTROSPECT: &str = "/v1/introspect";
}

/// Health check response.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub protocol_version: u32,
}

impl Default for HealthResponse {
    fn default() -> Self {
        Self {
            status: "ok".into(),
            version: env!("CARGO_PKG_VERSION").into(),
            protocol_version: super::message::PROTOCOL_VERSION,
        }
    }
}

/// Introspection response (development mode only).
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct IntrospectResponse {
    pub asset_count: u64,
    pub chunk_count: u64,
    pub snapshot_count: u64,
    pub namespaces: Vec<IndexNamespaceInfo>,
    pub uptime_secs: u64,
    pub public_key: String,
}

/// Per-namespace vector index info.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct IndexNamespaceInfo {
    pub namespace: String,
    pub dimension: usize,
    pub vector_count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn health_response_defaults() {
        let h = HealthResponse::default();
        assert_eq!(h.status, "ok");
        assert_eq!(h.protocol_version, 1);
    }

    #[test]
    fn endpoint_paths() {
        assert_eq!(endpoints::HEALTH, "/v1/health");
        assert_eq!(endpoints::ASSETS, "/v1/assets");
        assert_eq!(endpoints::SEARCH, "/v1/search");
        assert_eq!(endpoints::EVENTS, "/v1/events");
    }
}
