use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use hitbox_core::{
    dimension::DimensionKind,
    stats::{
        rollup_desc, time_series, window_comparison, CounterRow, RollupEntry, SeriesPoint,
        WindowComparison, WindowKind,
    },
};

use crate::{error::AppError, state::AppState};

#[derive(Debug, Deserialize)]
pub struct StatsQuery {
    /// Optional dimension filter: which axis the `dimension_id` refers to.
    pub kind: Option<String>,
    /// Resolved dimension record id; only counters carrying it are loaded.
    pub dimension_id: Option<String>,
    /// Reference clock for gap-filling and window comparisons. Defaults to
    /// the server clock; overridable for reproducible dashboards and tests.
    pub now: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
pub struct WindowsResponse {
    pub hour: WindowComparison,
    pub day: WindowComparison,
    pub month: WindowComparison,
}

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub site_id: String,
    /// The raw counter rows in scope, dimension values joined in.
    pub counters: Vec<CounterRow>,
    pub pages: Vec<RollupEntry>,
    pub browsers: Vec<RollupEntry>,
    pub platforms: Vec<RollupEntry>,
    pub referrers: Vec<RollupEntry>,
    /// Gap-filled daily series from the earliest day with data through today.
    pub series: Vec<SeriesPoint>,
    pub windows: WindowsResponse,
}

/// `GET /api/sites/{id}/stats` — the read-side aggregation surface.
///
/// Side-effect free: loads the counter rows in scope and derives everything
/// else with pure functions. A site with no traffic yet gets empty rollups,
/// an empty series, and all-zero windows — "no data" is a modeled outcome,
/// not an error.
#[tracing::instrument(skip(state, query))]
pub async fn site_stats(
    State(state): State<Arc<AppState>>,
    Path(site_id): Path<String>,
    Query(query): Query<StatsQuery>,
) -> Result<Json<StatsResponse>, AppError> {
    let site = state
        .db
        .site_by_id(&site_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Unknown site: {site_id}")))?;

    let filter = match (query.kind.as_deref(), query.dimension_id.as_deref()) {
        (None, None) => None,
        (Some(kind), Some(id)) => {
            let kind = DimensionKind::parse(kind).ok_or_else(|| {
                AppError::BadRequest(
                    "kind must be one of: path, browser, platform, referrer".to_string(),
                )
            })?;
            Some((kind, id))
        }
        _ => {
            return Err(AppError::BadRequest(
                "kind and dimension_id must be provided together".to_string(),
            ))
        }
    };

    let rows = state.db.load_counters(&site.id, filter).await?;
    let now = query.now.unwrap_or_else(Utc::now);

    let response = StatsResponse {
        site_id: site.id,
        pages: rollup_desc(&rows, DimensionKind::Path),
        browsers: rollup_desc(&rows, DimensionKind::Browser),
        platforms: rollup_desc(&rows, DimensionKind::Platform),
        referrers: rollup_desc(&rows, DimensionKind::Referrer),
        series: time_series(&rows, now),
        windows: WindowsResponse {
            hour: window_comparison(&rows, WindowKind::Hour, now),
            day: window_comparison(&rows, WindowKind::Day, now),
            month: window_comparison(&rows, WindowKind::Month, now),
        },
        counters: rows,
    };
    Ok(Json(response))
}
