use async_trait::async_trait;

use hitbox_core::dimension::DimensionKind;
use hitbox_core::stats::{CounterRow, PeriodKey};
use hitbox_core::store::{CounterStore, CounterTuple, Site};

use crate::DuckDbBackend;

#[async_trait]
impl CounterStore for DuckDbBackend {
    async fn site_by_public_key(&self, public_key: &str) -> anyhow::Result<Option<Site>> {
        DuckDbBackend::site_by_public_key(self, public_key).await
    }

    async fn site_by_id(&self, id: &str) -> anyhow::Result<Option<Site>> {
        DuckDbBackend::site_by_id(self, id).await
    }

    async fn resolve_dimension(
        &self,
        site_id: &str,
        kind: DimensionKind,
        value: &str,
    ) -> anyhow::Result<String> {
        DuckDbBackend::resolve_dimension(self, site_id, kind, value).await
    }

    async fn resolve_period(&self, site_id: &str, key: PeriodKey) -> anyhow::Result<String> {
        DuckDbBackend::resolve_period(self, site_id, key).await
    }

    async fn increment_counter(&self, tuple: &CounterTuple) -> anyhow::Result<()> {
        DuckDbBackend::increment_counter(self, tuple).await
    }

    async fn load_counters(
        &self,
        site_id: &str,
        filter: Option<(DimensionKind, &str)>,
    ) -> anyhow::Result<Vec<CounterRow>> {
        DuckDbBackend::load_counters(self, site_id, filter).await
    }
}
