//! The AIFS asset manager.
//!
//! [`AifsEngine`] owns every component — chunk store, metadata store,
//! transaction manager, vector index, signing keys — and orchestrates the
//! put/get paths, snapshots, branches, tags, and key registry across
//! them. One engine instance spans the process lifetime; there is no
//! module-level state.
//!
//! Ingest flow: validate via codec → chunk → compress+encrypt+store →
//! metadata row inside a transaction → provisional vector-index entry →
//! commit flips visibility.

pub mod config;
pub mod engine;
pub mod error;
pub mod events;

pub use config::{EngineConfig, Mode};
pub use engine::{AifsEngine, AssetView, EngineStats, ParentRef, PutOptions, VerifyWith, CHUNK_SIZE};
pub use error::{EngineError, EngineResult};
pub use events::{EngineEvent, EventBus, EventFilter, EventKind};
