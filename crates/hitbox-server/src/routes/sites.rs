use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;

use hitbox_duckdb::site::{normalize_origin, CreateSiteParams};

use crate::{error::AppError, state::AppState};

#[derive(Debug, Deserialize)]
pub struct CreateSiteRequest {
    pub name: String,
    /// Any URL on the tracked site; stored as its normalized origin.
    pub origin: String,
}

/// `POST /api/sites` — register a site and mint its public key.
#[tracing::instrument(skip(state, req))]
pub async fn create_site(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateSiteRequest>,
) -> Result<impl IntoResponse, AppError> {
    let name = req.name.trim().to_string();
    if name.is_empty() {
        return Err(AppError::BadRequest("name must not be empty".to_string()));
    }
    // Validate up front so a bad origin is the client's 400, not a 500.
    let origin = normalize_origin(&req.origin).map_err(|e| AppError::BadRequest(e.to_string()))?;

    let site = state.db.create_site(CreateSiteParams { name, origin }).await?;
    Ok((StatusCode::CREATED, Json(site)))
}

/// `GET /api/sites` — list all registered sites.
#[tracing::instrument(skip(state))]
pub async fn list_sites(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, AppError> {
    let sites = state.db.list_sites().await?;
    Ok(Json(sites))
}

/// `GET /api/sites/{id}` — fetch one site.
#[tracing::instrument(skip(state))]
pub async fn get_site(
    State(state): State<Arc<AppState>>,
    Path(site_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let site = state
        .db
        .site_by_id(&site_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Unknown site: {site_id}")))?;
    Ok(Json(site))
}

/// `DELETE /api/sites/{id}` — deactivate a site.
///
/// Beacons for the site are rejected from here on; its aggregates stay
/// readable. Nothing is deleted.
#[tracing::instrument(skip(state))]
pub async fn deactivate_site(
    State(state): State<Arc<AppState>>,
    Path(site_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    if !state.db.deactivate_site(&site_id).await? {
        return Err(AppError::NotFound(format!("Unknown site: {site_id}")));
    }
    Ok(StatusCode::NO_CONTENT)
}
