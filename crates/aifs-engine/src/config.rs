use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Deployment mode. Development enables the introspection surface.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Production,
    Development,
}

impl Mode {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "production" => Some(Self::Production),
            "development" => Some(Self::Development),
            _ => None,
        }
    }
}

/// Engine configuration.
#[derive(Clone, Debug)]
pub struct EngineConfig {
    /// Root directory for chunks, metadata, and index files.
    pub storage_dir: PathBuf,
    /// Default zstd level for chunk writes (1..=22).
    pub compression_level: i32,
    /// Ed25519 seed for the snapshot signing key. Random when absent.
    pub signing_key: Option<[u8; 32]>,
    /// KMS master key for the local provider. Random when absent.
    pub kms_master_key: Option<[u8; 32]>,
    /// Permit snapshot creation in a namespace whose registered key is
    /// not the engine's signing key.
    pub allow_foreign_namespace_key: bool,
    pub mode: Mode,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            storage_dir: PathBuf::from("./aifs-data"),
            compression_level: aifs_chunk::DEFAULT_COMPRESSION_LEVEL,
            signing_key: None,
            kms_master_key: None,
            allow_foreign_namespace_key: false,
            mode: Mode::Production,
        }
    }
}

impl EngineConfig {
    pub fn with_storage_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.storage_dir = dir.into();
        self
    }
}
