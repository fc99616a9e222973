use std::sync::Arc;

use anyhow::Result;
use tracing::info;

use hitbox_server::state::AppState;

/// `hitbox health` — liveness probe for Docker HEALTHCHECK.
///
/// Calls `GET http://localhost:$HITBOX_PORT/health`.
/// Exits 0 if the server responds with HTTP 200, exits 1 otherwise.
fn run_health_check() -> ! {
    let port = std::env::var("HITBOX_PORT").unwrap_or_else(|_| "3000".to_string());
    let url = format!("http://localhost:{}/health", port);
    match ureq::get(&url).call() {
        Ok(resp) if resp.status() == 200 => std::process::exit(0),
        _ => std::process::exit(1),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Health-check subcommand — handled before tokio does any real work so
    // the binary stays cheap as a Docker HEALTHCHECK probe.
    let args: Vec<String> = std::env::args().collect();
    if args.get(1).map(|s| s.as_str()) == Some("health") {
        run_health_check();
    }

    // Structured JSON logging. Level controlled via RUST_LOG.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("hitbox_server=info".parse()?),
        )
        .json()
        .init();

    let cfg = hitbox_core::config::Config::from_env().map_err(|e| anyhow::anyhow!(e))?;

    // Ensure the data directory exists before opening DuckDB.
    std::fs::create_dir_all(&cfg.data_dir)?;
    let db_path = format!("{}/hitbox.db", cfg.data_dir);

    // Open DuckDB — initialises the schema idempotently.
    let db = hitbox_duckdb::DuckDbBackend::open(
        &db_path,
        &cfg.duckdb_memory_limit,
        cfg.conflict_retries,
    )?;

    let addr = format!("0.0.0.0:{}", cfg.port);
    let state = Arc::new(AppState::new(db, cfg.clone()));
    let app = hitbox_server::app::build_app(Arc::clone(&state));

    info!(port = cfg.port, "hitbox listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            tokio::signal::ctrl_c().await.ok();
        })
        .await?;

    Ok(())
}
