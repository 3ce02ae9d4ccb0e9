use axum::{extract::State, Json};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

use crate::election::analytics::ElectionEngine;
use crate::server::AppState;
use crate::server::extract::{ApiPath, ApiQuery};
use crate::server::routes::{reject, ApiResult};

#[derive(Deserialize)]
pub struct ThresholdParams {
    pub threshold: Option<f64>,
}

pub async fn handle_results(State(state): State<Arc<AppState>>) -> ApiResult {
    let rows = state
        .pool
        .run(|store| store.booth_results())
        .await
        .map_err(reject)?;
    Ok(Json(json!(rows)))
}

pub async fn handle_party_summary(State(state): State<Arc<AppState>>) -> ApiResult {
    let summary = state
        .pool
        .run(|store| ElectionEngine::new(store).party_summary())
        .await
        .map_err(reject)?;
    Ok(Json(json!(summary)))
}

pub async fn handle_winners(State(state): State<Arc<AppState>>) -> ApiResult {
    let report = state
        .pool
        .run(|store| ElectionEngine::new(store).winners())
        .await
        .map_err(reject)?;
    Ok(Json(json!(report)))
}

pub async fn handle_booth(
    State(state): State<Arc<AppState>>,
    ApiPath(booth): ApiPath<String>,
) -> ApiResult {
    let detail = state
        .pool
        .run(move |store| ElectionEngine::new(store).booth(&booth))
        .await
        .map_err(reject)?;
    Ok(Json(json!(detail)))
}

/// Total votes cast at a booth; 0 when the booth has no row
pub async fn handle_booth_voters(
    State(state): State<Arc<AppState>>,
    ApiPath(booth): ApiPath<String>,
) -> ApiResult {
    let row = state
        .pool
        .run(move |store| store.booth_result(&booth))
        .await
        .map_err(reject)?;
    let total = row.map(|r| r.total_votes).unwrap_or(0);
    Ok(Json(json!({ "total_voters": total })))
}

pub async fn handle_penetration(
    State(state): State<Arc<AppState>>,
    ApiQuery(params): ApiQuery<ThresholdParams>,
) -> ApiResult {
    let report = state
        .pool
        .run(move |store| ElectionEngine::new(store).penetration(params.threshold))
        .await
        .map_err(reject)?;
    Ok(Json(json!(report)))
}

pub async fn handle_booth_list(State(state): State<Arc<AppState>>) -> ApiResult {
    let booths = state
        .pool
        .run(|store| store.booth_stations())
        .await
        .map_err(reject)?;
    Ok(Json(json!({ "booths": booths })))
}
