/// DuckDB initialization SQL.
///
/// Executed once at database open time via `Connection::execute_batch`.
/// All statements use `IF NOT EXISTS` so they are safe to re-run on every
/// startup (idempotent).
///
/// `memory_limit` is a DuckDB size string (`"512MB"`, `"1GB"`, ...) read from
/// `Config.duckdb_memory_limit`. Always set explicitly — the DuckDB default
/// of 80% of system RAM is not acceptable for a server process.
///
/// The UNIQUE constraints below are load-bearing, not advisory:
/// - the dimensions and periods identity tuples back the find-or-create
///   resolvers (losers of a creation race fall through
///   `ON CONFLICT .. DO NOTHING` and re-read the winner's row).
/// - the counters identity tuple is the conflict target of the atomic
///   `INSERT .. ON CONFLICT DO UPDATE SET count = count + 1` upsert.
///
/// The optional dimension id columns on `counters` are `NOT NULL DEFAULT ''`:
/// "absent" is the empty string, a stable member of the uniqueness tuple.
/// NULLs compare pairwise-distinct in unique indexes and would split one
/// logical counter into many rows.
pub fn init_sql(memory_limit: &str) -> String {
    format!(
        r#"SET memory_limit = '{memory_limit}';
SET threads = 2;

-- ===========================================
-- SITES (registry; created via the admin API)
-- ===========================================
CREATE TABLE IF NOT EXISTS sites (
    id          VARCHAR PRIMARY KEY,           -- 'site_' + 10 random alphanumerics
    name        VARCHAR NOT NULL,
    public_key  VARCHAR NOT NULL UNIQUE,       -- 24 hex chars, embedded in the snippet
    origin      VARCHAR NOT NULL,              -- normalized scheme://host[:port]
    active      BOOLEAN NOT NULL DEFAULT TRUE, -- deactivated sites reject beacons
    created_at  TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
);
CREATE INDEX IF NOT EXISTS idx_sites_public_key ON sites(public_key);

-- ===========================================
-- DIMENSIONS (append-only, one row per distinct value ever seen)
-- ===========================================
CREATE TABLE IF NOT EXISTS dimensions (
    id          VARCHAR PRIMARY KEY,           -- 'dim_' + 12 hex
    site_id     VARCHAR NOT NULL,
    kind        VARCHAR NOT NULL,              -- 'path' | 'browser' | 'platform' | 'referrer'
    value       VARCHAR NOT NULL,              -- truncated to 280 chars at the gate
    UNIQUE (site_id, kind, value)
);

-- ===========================================
-- PERIODS (append-only hourly UTC buckets)
-- ===========================================
CREATE TABLE IF NOT EXISTS periods (
    id          VARCHAR PRIMARY KEY,           -- 'per_' + 12 hex
    site_id     VARCHAR NOT NULL,
    year        INTEGER NOT NULL,
    month       INTEGER NOT NULL,              -- 1-12
    day         INTEGER NOT NULL,              -- day of month, 1-31
    hour        INTEGER NOT NULL,              -- 0-23
    UNIQUE (site_id, year, month, day, hour)
);

-- ===========================================
-- COUNTERS (the only mutable table; atomic increments only)
-- ===========================================
CREATE TABLE IF NOT EXISTS counters (
    id          VARCHAR PRIMARY KEY,           -- UUID v4, assigned at first insert
    site_id     VARCHAR NOT NULL,
    period_id   VARCHAR NOT NULL,
    path_id     VARCHAR NOT NULL,
    browser_id  VARCHAR NOT NULL DEFAULT '',   -- '' = absent
    platform_id VARCHAR NOT NULL DEFAULT '',   -- '' = absent
    referrer_id VARCHAR NOT NULL DEFAULT '',   -- '' = absent
    count       UBIGINT NOT NULL DEFAULT 0,
    UNIQUE (site_id, period_id, path_id, browser_id, platform_id, referrer_id)
);
CREATE INDEX IF NOT EXISTS idx_counters_site ON counters(site_id);
"#
    )
}
