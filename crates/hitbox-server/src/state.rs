use std::sync::Arc;

use hitbox_core::config::Config;
use hitbox_duckdb::DuckDbBackend;

/// Shared application state injected into every Axum handler via
/// [`axum::extract::State`].
///
/// There is deliberately nothing else here: ingestion writes its counter
/// synchronously (one atomic upsert, nothing to buffer or flush) and
/// aggregation reads are pure functions over freshly loaded rows, so no
/// caches or background tasks are required for correctness.
pub struct AppState {
    /// The DuckDB backend. Internally uses `Arc<tokio::sync::Mutex<Connection>>`
    /// so it is already cheap to clone and async-safe.
    pub db: Arc<DuckDbBackend>,

    /// Parsed configuration, loaded once at startup from environment variables.
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(db: DuckDbBackend, config: Config) -> Self {
        Self {
            db: Arc::new(db),
            config: Arc::new(config),
        }
    }
}
