//! Handlers for master data, events, visitors, login, wish messages and
//! the leadership roster.

use axum::{extract::State, Json};
use chrono::{Days, Local};
use serde::Deserialize;
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;

use crate::records::{
    Credentials, Delivery, LeaderFilter, LeaderInput, NewBooth, NewCaste, NewEvent, NewPanchayat,
    NewVillage, NewVisitor, WishMessage,
};
use crate::server::AppState;
use crate::server::extract::{ApiJson, ApiPath, ApiQuery};
use crate::server::routes::{reject, ApiResult};
use crate::storage::SqliteStore;
use crate::{uploads, Error, Result};

// ========== Master Data ==========

pub async fn handle_add_panchayat(
    State(state): State<Arc<AppState>>,
    ApiJson(body): ApiJson<NewPanchayat>,
) -> ApiResult {
    let id = state
        .pool
        .run(move |store| store.add_panchayat(body.validate()?))
        .await
        .map_err(reject)?;
    Ok(Json(json!({ "message": "Panchayat created!", "panchayat_id": id })))
}

pub async fn handle_list_panchayats(State(state): State<Arc<AppState>>) -> ApiResult {
    let rows = state
        .pool
        .run(|store| store.list_panchayats())
        .await
        .map_err(reject)?;
    Ok(Json(json!(rows)))
}

pub async fn handle_add_booth(
    State(state): State<Arc<AppState>>,
    ApiJson(body): ApiJson<NewBooth>,
) -> ApiResult {
    state
        .pool
        .run(move |store| store.add_booth(&body))
        .await
        .map_err(reject)?;
    Ok(Json(json!({ "message": "Booth added successfully!" })))
}

#[derive(Deserialize)]
pub struct BoothParams {
    pub panchayat_id: Option<i64>,
    pub booth_no: Option<i64>,
}

pub async fn handle_list_booths(
    State(state): State<Arc<AppState>>,
    ApiQuery(params): ApiQuery<BoothParams>,
) -> ApiResult {
    let rows = state
        .pool
        .run(move |store| store.list_booths(params.panchayat_id))
        .await
        .map_err(reject)?;
    Ok(Json(json!(rows)))
}

pub async fn handle_add_village(
    State(state): State<Arc<AppState>>,
    ApiJson(body): ApiJson<NewVillage>,
) -> ApiResult {
    state
        .pool
        .run(move |store| store.add_village(&body))
        .await
        .map_err(reject)?;
    Ok(Json(json!({ "message": "Village added successfully!" })))
}

pub async fn handle_list_villages(
    State(state): State<Arc<AppState>>,
    ApiQuery(params): ApiQuery<BoothParams>,
) -> ApiResult {
    let booth_no = params
        .booth_no
        .ok_or_else(|| reject(Error::Validation("Booth number required".into())))?;
    let rows = state
        .pool
        .run(move |store| store.villages_in_booth(booth_no))
        .await
        .map_err(reject)?;
    Ok(Json(json!(rows)))
}

pub async fn handle_add_caste(
    State(state): State<Arc<AppState>>,
    ApiJson(body): ApiJson<NewCaste>,
) -> ApiResult {
    state
        .pool
        .run(move |store| store.add_caste(&body))
        .await
        .map_err(reject)?;
    Ok(Json(json!({ "message": "Caste added!" })))
}

pub async fn handle_list_castes(State(state): State<Arc<AppState>>) -> ApiResult {
    let rows = state
        .pool
        .run(|store| store.list_castes())
        .await
        .map_err(reject)?;
    Ok(Json(json!(rows)))
}

// ========== Events ==========

pub async fn handle_add_event(
    State(state): State<Arc<AppState>>,
    ApiJson(body): ApiJson<NewEvent>,
) -> ApiResult {
    let id = state
        .pool
        .run(move |store| store.add_event(&body))
        .await
        .map_err(reject)?;
    Ok(Json(json!({ "message": "Event added successfully!", "id": id })))
}

/// Events dated today or tomorrow
pub async fn handle_upcoming_events(State(state): State<Arc<AppState>>) -> ApiResult {
    let today = Local::now().date_naive();
    let tomorrow = today.checked_add_days(Days::new(1)).unwrap_or(today);
    let rows = state
        .pool
        .run(move |store| store.events_between(today, tomorrow))
        .await
        .map_err(reject)?;
    Ok(Json(json!(rows)))
}

pub async fn handle_all_events(State(state): State<Arc<AppState>>) -> ApiResult {
    let rows = state
        .pool
        .run(|store| store.all_events())
        .await
        .map_err(reject)?;
    Ok(Json(json!(rows)))
}

pub async fn handle_delete_event(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult {
    state
        .pool
        .run(move |store| store.delete_event(id))
        .await
        .map_err(reject)?;
    Ok(Json(json!({ "message": "Event deleted successfully!" })))
}

// ========== Visitors ==========

/// Rewrite the visitor CSV; a failed snapshot does not fail the request
fn refresh_visitor_snapshot(store: &SqliteStore, upload_dir: &std::path::Path) -> Result<()> {
    let visitors = store.list_visitors()?;
    if let Err(e) = uploads::write_visitors_csv(upload_dir, &visitors) {
        tracing::warn!("Failed to write visitor snapshot: {}", e);
    }
    Ok(())
}

pub async fn handle_add_visitor(
    State(state): State<Arc<AppState>>,
    ApiJson(body): ApiJson<NewVisitor>,
) -> ApiResult {
    let upload_dir: PathBuf = state.config.upload_dir.clone();
    let id = state
        .pool
        .run(move |store| {
            let id = store.add_visitor(&body, Local::now().naive_local())?;
            refresh_visitor_snapshot(store, &upload_dir)?;
            Ok(id)
        })
        .await
        .map_err(reject)?;
    Ok(Json(json!({ "message": "Visitor added successfully!", "id": id })))
}

pub async fn handle_list_visitors(State(state): State<Arc<AppState>>) -> ApiResult {
    let rows = state
        .pool
        .run(|store| store.list_visitors())
        .await
        .map_err(reject)?;
    Ok(Json(json!(rows)))
}

pub async fn handle_delete_visitor(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult {
    let upload_dir = state.config.upload_dir.clone();
    state
        .pool
        .run(move |store| {
            store.delete_visitor(id)?;
            refresh_visitor_snapshot(store, &upload_dir)
        })
        .await
        .map_err(reject)?;
    Ok(Json(json!({ "message": "Visitor deleted successfully!" })))
}

// ========== Login ==========

pub async fn handle_login(
    State(state): State<Arc<AppState>>,
    ApiJson(body): ApiJson<Credentials>,
) -> ApiResult {
    let user = state
        .pool
        .run(move |store| {
            let (username, password) = body.validate()?;
            store
                .find_user(username, password)?
                .ok_or_else(|| Error::Unauthorized("Invalid username or password".into()))
        })
        .await
        .map_err(reject)?;
    tracing::info!(user = %user.username, "Login");
    Ok(Json(json!({ "message": "Login successful!", "user": user })))
}

// ========== Wish Messages ==========

pub async fn handle_wish_recipients(State(state): State<Arc<AppState>>) -> ApiResult {
    let phones = state
        .pool
        .run(|store| store.recipient_phones())
        .await
        .map_err(reject)?;
    Ok(Json(json!({ "phones": phones })))
}

/// Log one message per recipient; a failed row is reported, not fatal
pub async fn handle_wish_send(
    State(state): State<Arc<AppState>>,
    ApiJson(body): ApiJson<WishMessage>,
) -> ApiResult {
    let results = state
        .pool
        .run(move |store| {
            let (recipients, message) = body.validate()?;
            let deliveries: Vec<Delivery> = recipients
                .iter()
                .map(|phone| {
                    match store.log_message(phone, message, body.image_url.as_deref(), body.sender()) {
                        Ok(()) => Delivery {
                            phone: phone.clone(),
                            status: "logged",
                            error: None,
                        },
                        Err(e) => Delivery {
                            phone: phone.clone(),
                            status: "failed",
                            error: Some(e.to_string()),
                        },
                    }
                })
                .collect();
            Ok(deliveries)
        })
        .await
        .map_err(reject)?;
    Ok(Json(json!({
        "message": "Messages logged successfully!",
        "total": results.len(),
        "results": results,
    })))
}

// ========== Party Leadership ==========

pub async fn handle_list_leaders(State(state): State<Arc<AppState>>) -> ApiResult {
    let rows = state
        .pool
        .run(|store| store.list_leaders(&LeaderFilter::default()))
        .await
        .map_err(reject)?;
    Ok(Json(json!(rows)))
}

pub async fn handle_filter_leaders(
    State(state): State<Arc<AppState>>,
    ApiQuery(filter): ApiQuery<LeaderFilter>,
) -> ApiResult {
    let rows = state
        .pool
        .run(move |store| store.list_leaders(&filter))
        .await
        .map_err(reject)?;
    Ok(Json(json!(rows)))
}

pub async fn handle_add_leader(
    State(state): State<Arc<AppState>>,
    ApiJson(body): ApiJson<LeaderInput>,
) -> ApiResult {
    let s_no = state
        .pool
        .run(move |store| store.add_leader(&body))
        .await
        .map_err(reject)?;
    Ok(Json(json!({ "message": "Leader added successfully!", "s_no": s_no })))
}

pub async fn handle_update_leader(
    State(state): State<Arc<AppState>>,
    ApiPath(s_no): ApiPath<i64>,
    ApiJson(body): ApiJson<LeaderInput>,
) -> ApiResult {
    state
        .pool
        .run(move |store| match store.update_leader(s_no, &body)? {
            0 => Err(Error::NotFound("Leader not found".into())),
            _ => Ok(()),
        })
        .await
        .map_err(reject)?;
    Ok(Json(json!({ "message": "Leader updated successfully!" })))
}

pub async fn handle_delete_leader(
    State(state): State<Arc<AppState>>,
    ApiPath(s_no): ApiPath<i64>,
) -> ApiResult {
    state
        .pool
        .run(move |store| store.delete_leader(s_no))
        .await
        .map_err(reject)?;
    Ok(Json(json!({ "message": "Leader deleted successfully!" })))
}
