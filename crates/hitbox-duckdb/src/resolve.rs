//! Find-or-create resolvers for dimension records and period buckets.
//!
//! Both follow the same discipline: read, then insert with
//! `ON CONFLICT .. DO NOTHING`, then re-read if the insert was swallowed by
//! the unique constraint. The constraint is the source of truth — a loser of
//! a creation race never errors, it returns the winner's id. The loop is
//! bounded by the configured retry budget with a
//! short jittered sleep between rounds; exhausting it surfaces as a
//! transient storage error, never as a duplicate row.

use anyhow::{anyhow, Result};
use tracing::{debug, error};

use hitbox_core::dimension::DimensionKind;
use hitbox_core::stats::PeriodKey;

use crate::backend::rand_hex;
use crate::DuckDbBackend;

/// Sleep 1-10 ms. Jitter keeps racing writers from re-colliding in lockstep.
async fn jittered_backoff() {
    use rand::Rng;
    let ms = rand::thread_rng().gen_range(1..=10);
    tokio::time::sleep(std::time::Duration::from_millis(ms)).await;
}

impl DuckDbBackend {
    /// Map (site, kind, raw value) to the id of its dimension record,
    /// creating the record on first sight. Idempotent: concurrent callers
    /// all observe the same id, and at most one row is ever persisted.
    pub async fn resolve_dimension(
        &self,
        site_id: &str,
        kind: DimensionKind,
        value: &str,
    ) -> Result<String> {
        for attempt in 0..=self.conflict_retries {
            if attempt > 0 {
                jittered_backoff().await;
            }

            if let Some(id) = self.find_dimension(site_id, kind, value).await? {
                return Ok(id);
            }

            let id = format!("dim_{}", rand_hex(6));
            let inserted = {
                let conn = self.conn.lock().await;
                conn.execute(
                    "INSERT INTO dimensions (id, site_id, kind, value) \
                     VALUES (?1, ?2, ?3, ?4) \
                     ON CONFLICT (site_id, kind, value) DO NOTHING",
                    duckdb::params![id, site_id, kind.as_str(), value],
                )?
            };
            if inserted == 1 {
                return Ok(id);
            }
            // Lost the creation race; next round reads the winner's id.
            debug!(site_id, kind = kind.as_str(), "dimension insert lost race");
        }
        Err(anyhow!(
            "dimension resolution for site {site_id} exhausted {} retries",
            self.conflict_retries
        ))
    }

    async fn find_dimension(
        &self,
        site_id: &str,
        kind: DimensionKind,
        value: &str,
    ) -> Result<Option<String>> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare(
            "SELECT id FROM dimensions WHERE site_id = ?1 AND kind = ?2 AND value = ?3",
        )?;
        let mut ids: Vec<String> = stmt
            .query_map(duckdb::params![site_id, kind.as_str(), value], |row| {
                row.get(0)
            })?
            .collect::<duckdb::Result<_>>()?;
        match ids.len() {
            0 => Ok(None),
            1 => Ok(ids.pop()),
            n => {
                // A duplicate here means the unique index is broken or the
                // query is wrong. Must not be coerced into "no match".
                error!(site_id, kind = kind.as_str(), rows = n, "duplicate dimension rows");
                Err(anyhow!(
                    "uniqueness invariant violated: {n} dimension rows for one identity"
                ))
            }
        }
    }

    /// Map a UTC hour bucket to the id of its period record, creating the
    /// record on first sight. Same race discipline as dimensions.
    pub async fn resolve_period(&self, site_id: &str, key: PeriodKey) -> Result<String> {
        for attempt in 0..=self.conflict_retries {
            if attempt > 0 {
                jittered_backoff().await;
            }

            if let Some(id) = self.find_period(site_id, key).await? {
                return Ok(id);
            }

            let id = format!("per_{}", rand_hex(6));
            let inserted = {
                let conn = self.conn.lock().await;
                conn.execute(
                    "INSERT INTO periods (id, site_id, year, month, day, hour) \
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6) \
                     ON CONFLICT (site_id, year, month, day, hour) DO NOTHING",
                    duckdb::params![id, site_id, key.year, key.month, key.day, key.hour],
                )?
            };
            if inserted == 1 {
                return Ok(id);
            }
            debug!(site_id, "period insert lost race");
        }
        Err(anyhow!(
            "period resolution for site {site_id} exhausted {} retries",
            self.conflict_retries
        ))
    }

    async fn find_period(&self, site_id: &str, key: PeriodKey) -> Result<Option<String>> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare(
            "SELECT id FROM periods \
             WHERE site_id = ?1 AND year = ?2 AND month = ?3 AND day = ?4 AND hour = ?5",
        )?;
        let mut ids: Vec<String> = stmt
            .query_map(
                duckdb::params![site_id, key.year, key.month, key.day, key.hour],
                |row| row.get(0),
            )?
            .collect::<duckdb::Result<_>>()?;
        match ids.len() {
            0 => Ok(None),
            1 => Ok(ids.pop()),
            n => {
                error!(site_id, rows = n, "duplicate period rows");
                Err(anyhow!(
                    "uniqueness invariant violated: {n} period rows for one bucket"
                ))
            }
        }
    }
}
