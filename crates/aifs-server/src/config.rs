use std::net::SocketAddr;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use aifs_engine::Mode;

/// Server configuration.
///
/// Environment variables (all optional): `AIFS_STORAGE_DIR`, `AIFS_HOST`,
/// `AIFS_PORT`, `AIFS_MAX_WORKERS`, `AIFS_COMPRESSION_LEVEL`,
/// `AIFS_LOG_LEVEL`, `AIFS_MODE`, `AIFS_TOKEN_SECRET` (64 hex chars).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerConfig {
    pub storage_dir: PathBuf,
    pub host: String,
    pub port: u16,
    pub max_workers: usize,
    pub compression_level: i32,
    pub log_level: String,
    #[serde(with = "mode_serde")]
    pub mode: Mode,
    /// Token-verification secret; random (tokens unusable across
    /// restarts) when not configured.
    #[serde(skip)]
    pub token_secret: Option<[u8; 32]>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            storage_dir: PathBuf::from("./aifs-data"),
            host: "127.0.0.1".into(),
            port: 50051,
            max_workers: 4,
            compression_level: 1,
            log_level: "info".into(),
            mode: Mode::Production,
            token_secret: None,
        }
    }
}

impl ServerConfig {
    /// Read configuration from the environment, falling back to defaults.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(dir) = std::env::var("AIFS_STORAGE_DIR") {
            config.storage_dir = PathBuf::from(dir);
        }
        if let Ok(host) = std::env::var("AIFS_HOST") {
            config.host = host;
        }
        if let Some(port) = env_parse("AIFS_PORT") {
            config.port = port;
        }
        if let Some(workers) = env_parse("AIFS_MAX_WORKERS") {
            config.max_workers = workers;
        }
        if let Some(level) = env_parse("AIFS_COMPRESSION_LEVEL") {
            config.compression_level = level;
        }
        if let Ok(level) = std::env::var("AIFS_LOG_LEVEL") {
            config.log_level = level;
        }
        if let Some(mode) = std::env::var("AIFS_MODE").ok().and_then(|m| Mode::parse(&m)) {
            config.mode = mode;
        }
        if let Some(secret) = std::env::var("AIFS_TOKEN_SECRET")
            .ok()
            .and_then(|s| hex::decode(s).ok())
            .and_then(|b| <[u8; 32]>::try_from(b).ok())
        {
            config.token_secret = Some(secret);
        }
        config
    }

    pub fn bind_addr(&self) -> SocketAddr {
        format!("{}:{}", self.host, self.port)
            .parse()
            .unwrap_or_else(|_| SocketAddr::from(([127, 0, 0, 1], self.port)))
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.parse().ok())
}

mod mode_serde {
    use aifs_engine::Mode;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(mode: &Mode, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(match mode {
            Mode::Production => "production",
            Mode::Development => "development",
        })
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Mode, D::Error> {
        let raw = String::deserialize(d)?;
        Mode::parse(&raw).ok_or_else(|| serde::de::Error::custom("unknown mode"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.port, 50051);
        assert_eq!(config.compression_level, 1);
        assert_eq!(config.mode, Mode::Production);
        assert!(config.token_secret.is_none());
    }

    #[test]
    fn bind_addr_formats() {
        let config = ServerConfig::default();
        assert_eq!(config.bind_addr().port(), 50051);
        assert!(config.bind_addr().ip().is_loopback());
    }
}
