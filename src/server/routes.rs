use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;

use crate::family::{FamilyFilter, NewMember};
use crate::server::AppState;
use crate::server::extract::{ApiJson, ApiPath, ApiQuery};
use crate::voter::{SummaryFilter, UnlinkedQuery, VoterFilter};
use crate::{Error, FamilyLinker, NewFamily};

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

pub type ApiError = (StatusCode, Json<ErrorResponse>);
pub type ApiResult<T = Value> = Result<Json<T>, ApiError>;

/// Map a crate error onto its HTTP status and `{ "error": ... }` body
pub fn reject(err: Error) -> ApiError {
    let status =
        StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    if status.is_server_error() {
        tracing::error!("{}", err);
    } else {
        tracing::debug!(status = status.as_u16(), "{}", err);
    }
    (
        status,
        Json(ErrorResponse {
            error: err.to_string(),
        }),
    )
}

pub async fn handle_root() -> &'static str {
    "Constituency backend is live"
}

pub async fn handle_stats(State(state): State<Arc<AppState>>) -> ApiResult {
    let stats = state.pool.run(|store| store.stats()).await.map_err(reject)?;
    Ok(Json(json!(stats)))
}

// ========== Voters ==========

pub async fn handle_unlinked_voters(
    State(state): State<Arc<AppState>>,
    ApiQuery(params): ApiQuery<UnlinkedQuery>,
) -> ApiResult {
    let booth_no = params
        .booth_no
        .ok_or_else(|| reject(Error::Validation("Booth number required".into())))?;
    let page = state
        .pool
        .run(move |store| store.unlinked_voters(booth_no, &params))
        .await
        .map_err(reject)?;
    Ok(Json(json!(page)))
}

pub async fn handle_all_voters(
    State(state): State<Arc<AppState>>,
    ApiQuery(filter): ApiQuery<VoterFilter>,
) -> ApiResult {
    let page = state
        .pool
        .run(move |store| store.list_voters(&filter))
        .await
        .map_err(reject)?;
    Ok(Json(json!(page)))
}

#[derive(Deserialize)]
pub struct MobileBody {
    pub mobile_number: Option<String>,
}

pub async fn handle_update_mobile(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(body): ApiJson<MobileBody>,
) -> ApiResult {
    let mobile = body
        .mobile_number
        .filter(|m| !m.trim().is_empty())
        .ok_or_else(|| reject(Error::Validation("Mobile number required".into())))?;
    state
        .pool
        .run(move |store| store.update_mobile(id, mobile.trim()))
        .await
        .map_err(reject)?;
    Ok(Json(json!({ "message": "Mobile number updated successfully!" })))
}

pub async fn handle_summary(
    State(state): State<Arc<AppState>>,
    ApiQuery(filter): ApiQuery<SummaryFilter>,
) -> ApiResult {
    let summary = state
        .pool
        .run(move |store| store.voter_summary(&filter))
        .await
        .map_err(reject)?;
    Ok(Json(json!(summary)))
}

// ========== Families ==========

pub async fn handle_create_family(
    State(state): State<Arc<AppState>>,
    ApiJson(family): ApiJson<NewFamily>,
) -> ApiResult {
    let created = state
        .pool
        .run(move |store| FamilyLinker::new(store).create_family(&family))
        .await
        .map_err(reject)?;
    Ok(Json(json!({
        "message": "Family created successfully!",
        "family_id": created.family_id,
        "members": created.members,
        "unmatched_voters": created.unmatched_voters,
    })))
}

pub async fn handle_list_families(
    State(state): State<Arc<AppState>>,
    ApiQuery(filter): ApiQuery<FamilyFilter>,
) -> ApiResult {
    let families = state
        .pool
        .run(move |store| store.list_families(&filter))
        .await
        .map_err(reject)?;
    Ok(Json(json!(families)))
}

pub async fn handle_family_members(
    State(state): State<Arc<AppState>>,
    ApiPath(family_id): ApiPath<i64>,
) -> ApiResult {
    let members = state
        .pool
        .run(move |store| store.family_members(family_id))
        .await
        .map_err(reject)?;
    Ok(Json(json!(members)))
}

pub async fn handle_delete_family(
    State(state): State<Arc<AppState>>,
    ApiPath(family_id): ApiPath<i64>,
) -> ApiResult {
    let unlinked = state
        .pool
        .run(move |store| FamilyLinker::new(store).delete_family(family_id))
        .await
        .map_err(reject)?;
    Ok(Json(json!({
        "message": "Family deleted successfully",
        "unlinked_voters": unlinked,
    })))
}

pub async fn handle_remove_member(
    State(state): State<Arc<AppState>>,
    ApiPath(voter_id): ApiPath<i64>,
) -> ApiResult {
    let family_id = state
        .pool
        .run(move |store| FamilyLinker::new(store).remove_member(voter_id))
        .await
        .map_err(reject)?;
    Ok(Json(json!({
        "message": "Member removed successfully",
        "family_id": family_id,
    })))
}

pub async fn handle_add_member(
    State(state): State<Arc<AppState>>,
    ApiJson(member): ApiJson<NewMember>,
) -> ApiResult {
    state
        .pool
        .run(move |store| FamilyLinker::new(store).add_member(&member))
        .await
        .map_err(reject)?;
    Ok(Json(json!({ "message": "Member added successfully" })))
}
