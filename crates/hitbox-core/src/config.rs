#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub data_dir: String,
    /// DuckDB size string such as "1GB" or "512MB".
    pub duckdb_memory_limit: String,
    /// How many times a find-or-create loop retries after a unique-constraint
    /// conflict before giving up with a transient storage error.
    pub conflict_retries: u32,
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        Ok(Self {
            port: std::env::var("HITBOX_PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .map_err(|e| format!("invalid port: {e}"))?,
            data_dir: std::env::var("HITBOX_DATA_DIR").unwrap_or_else(|_| "./data".to_string()),
            duckdb_memory_limit: std::env::var("HITBOX_DUCKDB_MEMORY")
                .unwrap_or_else(|_| "1GB".to_string()),
            conflict_retries: std::env::var("HITBOX_CONFLICT_RETRIES")
                .unwrap_or_else(|_| "3".to_string())
                .parse()
                .unwrap_or(3),
        })
    }
}
