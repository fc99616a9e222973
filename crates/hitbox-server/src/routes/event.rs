use std::sync::Arc;

use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use chrono::Utc;
use serde_json::json;

use hitbox_core::{
    beacon::{normalize_referrer, truncate_value, BeaconPayload, ClientHints},
    dimension::DimensionKind,
    error::IngestError,
    stats::PeriodKey,
    store::CounterTuple,
};

use crate::{error::AppError, state::AppState};

/// `POST /api/event` — the ingestion gatekeeper.
///
/// ## Auth
/// The public key in the payload plus an exact `Origin` header match against
/// the site's registered origin. That pair is the whole trust boundary —
/// there is no per-request signature. Unknown or deactivated keys get 404,
/// a mismatched origin gets 403, and neither leaves any row behind.
///
/// ## What gets stored
/// One atomic increment on the counter for (hour bucket, path, browser,
/// platform, referrer). Browser and platform come from client-hint headers
/// (`Sec-CH-UA*`), defaulting to "Unknown"/desktop when absent. Path and
/// referrer are truncated to 280 chars; an empty referrer is "absent".
/// No IP, no user agent, no per-visit row — ever.
///
/// ## Response
/// `202 Accepted` with `{ "ok": true }` and `Access-Control-Allow-Origin`
/// echoing the registered origin, so the beacon works cross-origin from the
/// tracked page. The SDK treats delivery as fire-and-forget.
#[tracing::instrument(skip(state, headers, payload))]
pub async fn ingest(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<BeaconPayload>,
) -> Result<impl IntoResponse, AppError> {
    let site = state
        .db
        .site_by_public_key(&payload.key)
        .await
        .map_err(IngestError::Storage)?;
    // Deactivated sites answer exactly like unknown keys.
    let Some(site) = site.filter(|s| s.active) else {
        return Err(IngestError::SiteNotFound.into());
    };

    let origin = headers
        .get(header::ORIGIN)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    if origin != site.origin {
        tracing::debug!(site_id = %site.id, origin, "beacon rejected: origin mismatch");
        return Err(IngestError::OriginMismatch.into());
    }

    let path = truncate_value(payload.url.trim());
    if path.is_empty() {
        return Err(AppError::BadRequest("url must not be empty".to_string()));
    }
    let referrer = normalize_referrer(payload.referrer.as_deref());

    let client = extract_client_hints(&headers).derive();
    tracing::debug!(
        site_id = %site.id,
        browser = %client.browser,
        platform = %client.platform,
        device = %client.device,
        "beacon accepted"
    );

    // Every resolution for this beacon shares one clock reading and one site.
    let now = Utc::now();
    let db = &state.db;
    let period_id = db
        .resolve_period(&site.id, PeriodKey::from_utc(now))
        .await
        .map_err(IngestError::Storage)?;
    let path_id = db
        .resolve_dimension(&site.id, DimensionKind::Path, path)
        .await
        .map_err(IngestError::Storage)?;
    let browser_id = db
        .resolve_dimension(&site.id, DimensionKind::Browser, &client.browser)
        .await
        .map_err(IngestError::Storage)?;
    let platform_id = db
        .resolve_dimension(&site.id, DimensionKind::Platform, &client.platform)
        .await
        .map_err(IngestError::Storage)?;
    let referrer_id = match &referrer {
        Some(r) => Some(
            db.resolve_dimension(&site.id, DimensionKind::Referrer, r)
                .await
                .map_err(IngestError::Storage)?,
        ),
        None => None,
    };

    db.increment_counter(&CounterTuple {
        site_id: site.id.clone(),
        period_id,
        path_id,
        browser_id: Some(browser_id),
        platform_id: Some(platform_id),
        referrer_id,
    })
    .await
    .map_err(IngestError::Storage)?;

    Ok((
        StatusCode::ACCEPTED,
        [(header::ACCESS_CONTROL_ALLOW_ORIGIN, site.origin.clone())],
        Json(json!({ "ok": true })),
    ))
}

/// Pull the `Sec-CH-UA*` client-hint headers out of the request, as raw
/// values. Parsing happens in `hitbox_core::beacon`.
fn extract_client_hints(headers: &HeaderMap) -> ClientHints {
    let value = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };
    ClientHints {
        ua: value("sec-ch-ua"),
        mobile: value("sec-ch-ua-mobile"),
        platform: value("sec-ch-ua-platform"),
    }
}
