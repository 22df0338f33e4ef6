use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::info;

use aifs_auth::Authorizer;
use aifs_engine::{AifsEngine, EngineConfig};

use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};
use crate::router::build_router;
use crate::state::AppState;

/// The AIFS server: engine + authorizer behind the HTTP surface.
pub struct AifsServer {
    config: ServerConfig,
    state: Arc<AppState>,
}

impl AifsServer {
    /// Build the engine from the server config and assemble the state.
    pub fn new(config: ServerConfig) -> ServerResult<Self> {
        let engine = AifsEngine::open(EngineConfig {
            storage_dir: config.storage_dir.clone(),
            compression_level: config.compression_level,
            mode: config.mode,
            ..EngineConfig::default()
        })
        .map_err(ServerError::Engine)?;

        let secret = config.token_secret.unwrap_or_else(|| {
            // Without a configured secret, tokens die with the process.
            use rand::RngCore;
            let mut secret = [0u8; 32];
            rand::rngs::OsRng.fill_bytes(&mut secret);
            secret
        });
        let location = format!("aifs://{}:{}", config.host, config.port);
        let state = Arc::new(AppState::new(
            Arc::new(engine),
            Authorizer::new(secret, location),
            config.mode,
        ));
        Ok(Self { config, state })
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn state(&self) -> Arc<AppState> {
        self.state.clone()
    }

    /// The router (useful for tests).
    pub fn router(&self) -> axum::Router {
        build_router(self.state.clone())
    }

    /// Start serving requests until the process exits.
    pub async fn serve(self) -> ServerResult<()> {
        let app = self.router();
        let addr = self.config.bind_addr();
        let listener = TcpListener::bind(addr).await?;
        info!(%addr, mode = ?self.config.mode, "aifs server listening");
        axum::serve(listener, app)
            .await
            .map_err(|e| ServerError::Internal(e.to_string()))
    }
}
