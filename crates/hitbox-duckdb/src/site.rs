use anyhow::{anyhow, Result};

use hitbox_core::store::Site;

use crate::backend::rand_hex;
use crate::DuckDbBackend;

pub struct CreateSiteParams {
    pub name: String,
    /// Any URL on the tracked site; only its origin is kept.
    pub origin: String,
}

/// Generate a site ID: "site_" + 10 random alphanumeric chars.
fn generate_site_id() -> String {
    use rand::Rng;
    let mut rng = rand::thread_rng();
    let chars: String = (0..10)
        .map(|_| {
            let idx = rng.gen_range(0..36);
            if idx < 10 {
                (b'0' + idx) as char
            } else {
                (b'a' + idx - 10) as char
            }
        })
        .collect();
    format!("site_{}", chars)
}

/// Normalize a registered origin to `scheme://host[:port]`.
///
/// Beacon authorization is an exact string compare against the `Origin`
/// header, so the stored form must match what browsers send: no path, no
/// trailing slash, port only when non-default.
pub fn normalize_origin(raw: &str) -> Result<String> {
    let url = url::Url::parse(raw.trim()).map_err(|e| anyhow!("invalid origin URL: {e}"))?;
    let origin = url.origin();
    if matches!(origin, url::Origin::Opaque(_)) {
        return Err(anyhow!("origin must be a scheme://host URL"));
    }
    Ok(origin.ascii_serialization())
}

const SITE_COLUMNS: &str =
    "id, name, public_key, origin, active, CAST(created_at AS VARCHAR)";

fn site_from_row(row: &duckdb::Row<'_>) -> duckdb::Result<Site> {
    Ok(Site {
        id: row.get(0)?,
        name: row.get(1)?,
        public_key: row.get(2)?,
        origin: row.get(3)?,
        active: row.get(4)?,
        created_at: row.get(5)?,
    })
}

impl DuckDbBackend {
    /// Register a new site and mint its public key.
    pub async fn create_site(&self, params: CreateSiteParams) -> Result<Site> {
        let origin = normalize_origin(&params.origin)?;
        let id = generate_site_id();
        let public_key = rand_hex(12);

        let conn = self.conn.lock().await;
        conn.execute(
            "INSERT INTO sites (id, name, public_key, origin, active, created_at) \
             VALUES (?1, ?2, ?3, ?4, TRUE, CURRENT_TIMESTAMP)",
            duckdb::params![id, params.name, public_key, origin],
        )?;

        // Read back the created row to get the timestamp.
        let site = conn
            .prepare(&format!("SELECT {SITE_COLUMNS} FROM sites WHERE id = ?1"))?
            .query_row(duckdb::params![id], site_from_row)?;
        Ok(site)
    }

    pub async fn site_by_id(&self, id: &str) -> Result<Option<Site>> {
        let conn = self.conn.lock().await;
        let mut stmt =
            conn.prepare(&format!("SELECT {SITE_COLUMNS} FROM sites WHERE id = ?1"))?;
        match stmt.query_row(duckdb::params![id], site_from_row) {
            Ok(site) => Ok(Some(site)),
            Err(duckdb::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn site_by_public_key(&self, public_key: &str) -> Result<Option<Site>> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare(&format!(
            "SELECT {SITE_COLUMNS} FROM sites WHERE public_key = ?1"
        ))?;
        match stmt.query_row(duckdb::params![public_key], site_from_row) {
            Ok(site) => Ok(Some(site)),
            Err(duckdb::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn list_sites(&self) -> Result<Vec<Site>> {
        let conn = self.conn.lock().await;
        let mut stmt =
            conn.prepare(&format!("SELECT {SITE_COLUMNS} FROM sites ORDER BY id"))?;
        let rows = stmt.query_map([], site_from_row)?;
        let mut sites = Vec::new();
        for row in rows {
            sites.push(row?);
        }
        Ok(sites)
    }

    /// Deactivate a site. Its beacons are rejected from this point on;
    /// dimensions, periods, and counters are left untouched (the core never
    /// deletes aggregate data).
    ///
    /// Returns `false` if no such site exists.
    pub async fn deactivate_site(&self, id: &str) -> Result<bool> {
        let conn = self.conn.lock().await;
        let changed = conn.execute(
            "UPDATE sites SET active = FALSE WHERE id = ?1",
            duckdb::params![id],
        )?;
        Ok(changed == 1)
    }
}
