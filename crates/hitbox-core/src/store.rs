//! Storage interface for the ingestion and aggregation core.

use async_trait::async_trait;
use serde::Serialize;

use crate::dimension::DimensionKind;
use crate::stats::{CounterRow, PeriodKey};

/// A tracked site. Created through the registry surface; the core only ever
/// looks sites up (by public key on the write path, by id on the read path).
#[derive(Debug, Clone, Serialize)]
pub struct Site {
    pub id: String,
    pub name: String,
    /// Opaque credential embedded in the tracking snippet.
    pub public_key: String,
    /// Normalized origin (`scheme://host[:port]`) the `Origin` header of
    /// every beacon must match exactly.
    pub origin: String,
    pub active: bool,
    pub created_at: String,
}

/// The fully resolved identity of one counter. Absent optional dimensions
/// stay `None` here; the storage layer maps them to its sentinel.
#[derive(Debug, Clone)]
pub struct CounterTuple {
    pub site_id: String,
    pub period_id: String,
    pub path_id: String,
    pub browser_id: Option<String>,
    pub platform_id: Option<String>,
    pub referrer_id: Option<String>,
}

/// Storage operations the gatekeeper and the stats reader need.
///
/// The DuckDB backend implements this; a future ClickHouse-style backend can
/// swap in without touching the route handlers.
#[async_trait]
pub trait CounterStore: Send + Sync + 'static {
    async fn site_by_public_key(&self, public_key: &str) -> anyhow::Result<Option<Site>>;
    async fn site_by_id(&self, id: &str) -> anyhow::Result<Option<Site>>;

    /// Find-or-create the dimension record for (site, kind, value) and return
    /// its id. Idempotent under concurrent first-sight races.
    async fn resolve_dimension(
        &self,
        site_id: &str,
        kind: DimensionKind,
        value: &str,
    ) -> anyhow::Result<String>;

    /// Find-or-create the hourly period bucket and return its id.
    async fn resolve_period(&self, site_id: &str, key: PeriodKey) -> anyhow::Result<String>;

    /// Add 1 to the counter for `tuple`, creating the row at 1 if absent.
    /// Exactly one row per tuple ever exists; no increment is lost.
    async fn increment_counter(&self, tuple: &CounterTuple) -> anyhow::Result<()>;

    /// All counter rows for a site, dimension values joined in, optionally
    /// narrowed to rows carrying one resolved dimension id.
    async fn load_counters(
        &self,
        site_id: &str,
        filter: Option<(DimensionKind, &str)>,
    ) -> anyhow::Result<Vec<CounterRow>>;
}
