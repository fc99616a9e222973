use anyhow::Result;

use hitbox_core::dimension::DimensionKind;
use hitbox_core::stats::CounterRow;
use hitbox_core::store::CounterTuple;

use crate::DuckDbBackend;

impl DuckDbBackend {
    /// Add 1 to the counter identified by `tuple`, creating the row at 1 if
    /// it does not exist yet.
    ///
    /// This is a single atomic statement: the unique index over the full
    /// tuple is the conflict target, so two simultaneous beacons either both
    /// land on the same row (two increments) or one creates and the other
    /// updates. No lost updates, no split rows, no lock held across a
    /// find-then-write gap.
    ///
    /// Absent optional dimensions are stored as the `''` sentinel so they
    /// participate in the uniqueness tuple as a stable value.
    pub async fn increment_counter(&self, tuple: &CounterTuple) -> Result<()> {
        let conn = self.conn.lock().await;
        let affected = conn.execute(
            "INSERT INTO counters \
                 (id, site_id, period_id, path_id, browser_id, platform_id, referrer_id, count) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 1) \
             ON CONFLICT (site_id, period_id, path_id, browser_id, platform_id, referrer_id) \
             DO UPDATE SET count = count + 1",
            duckdb::params![
                uuid::Uuid::new_v4().to_string(),
                tuple.site_id,
                tuple.period_id,
                tuple.path_id,
                tuple.browser_id.as_deref().unwrap_or(""),
                tuple.platform_id.as_deref().unwrap_or(""),
                tuple.referrer_id.as_deref().unwrap_or(""),
            ],
        )?;
        anyhow::ensure!(affected == 1, "counter upsert affected {affected} rows");
        Ok(())
    }

    /// Load all counter rows for a site with period fields and dimension
    /// values joined in, optionally narrowed to rows carrying one resolved
    /// dimension id.
    ///
    /// The `''` sentinel columns match no dimension row, so LEFT JOINs turn
    /// absent dimensions back into `None`.
    pub async fn load_counters(
        &self,
        site_id: &str,
        filter: Option<(DimensionKind, &str)>,
    ) -> Result<Vec<CounterRow>> {
        // The filter column is chosen from a fixed set; only the id value is
        // ever bound as a parameter.
        let filter_sql = match filter {
            Some((DimensionKind::Path, _)) => " AND c.path_id = ?2",
            Some((DimensionKind::Browser, _)) => " AND c.browser_id = ?2",
            Some((DimensionKind::Platform, _)) => " AND c.platform_id = ?2",
            Some((DimensionKind::Referrer, _)) => " AND c.referrer_id = ?2",
            None => "",
        };

        let sql = format!(
            r#"
            SELECT
                c.id,
                p.year, p.month, p.day, p.hour,
                dp.value  AS path,
                db.value  AS browser,
                dpl.value AS platform,
                dr.value  AS referrer,
                c.count
            FROM counters c
            JOIN periods p        ON p.id   = c.period_id
            JOIN dimensions dp    ON dp.id  = c.path_id
            LEFT JOIN dimensions db  ON db.id  = c.browser_id
            LEFT JOIN dimensions dpl ON dpl.id = c.platform_id
            LEFT JOIN dimensions dr  ON dr.id  = c.referrer_id
            WHERE c.site_id = ?1{filter_sql}
            ORDER BY p.year, p.month, p.day, p.hour
            "#
        );

        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare(&sql)?;
        let map_row = |row: &duckdb::Row<'_>| -> duckdb::Result<CounterRow> {
            Ok(CounterRow {
                id: row.get(0)?,
                year: row.get(1)?,
                month: row.get(2)?,
                day: row.get(3)?,
                hour: row.get(4)?,
                path: row.get(5)?,
                browser: row.get(6)?,
                platform: row.get(7)?,
                referrer: row.get(8)?,
                count: row.get(9)?,
            })
        };
        let rows = match filter {
            Some((_, dimension_id)) => {
                stmt.query_map(duckdb::params![site_id, dimension_id], map_row)?
            }
            None => stmt.query_map(duckdb::params![site_id], map_row)?,
        };

        let mut counters = Vec::new();
        for row in rows {
            counters.push(row?);
        }
        Ok(counters)
    }
}
