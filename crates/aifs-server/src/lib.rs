//! HTTP server for AIFS.
//!
//! Mounts the RPC surface over axum: streaming ingest, retrieval, vector
//! search, snapshots, branches, tags, namespaces, a server-push event
//! stream, and health/introspection. Every route except health requires
//! a bearer capability token in the `authorization` header.

pub mod config;
pub mod error;
pub mod handler;
pub mod router;
pub mod server;
pub mod state;

pub use config::ServerConfig;
pub use error::{ServerError, ServerResult};
pub use router::build_router;
pub use server::AifsServer;
pub use state::AppState;
