use axum::{
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method},
    routing::{delete, get, post, put},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::config::AppConfig;
use crate::storage::StorePool;

pub mod election;
pub mod extract;
pub mod files;
pub mod office;
pub mod routes;

/// Server state shared by every handler
pub struct AppState {
    pub pool: StorePool,
    pub config: AppConfig,
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.is_empty() {
        return CorsLayer::permissive();
    }
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match HeaderValue::from_str(o) {
            Ok(v) => Some(v),
            Err(_) => {
                tracing::warn!(origin = %o, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    CorsLayer::new()
        .allow_origin(allowed)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers(Any)
}

/// Build the API router over shared state
pub fn router(state: Arc<AppState>) -> Router {
    // Leave headroom so oversized files hit the upload check, not a bare 413
    let body_limit = state.config.max_upload_bytes + 64 * 1024;
    let upload_dir = state.config.upload_dir.clone();
    let cors = cors_layer(&state.config.cors_origins);

    Router::new()
        .route("/", get(routes::handle_root))
        .route("/api/stats", get(routes::handle_stats))
        // Voters
        .route("/api/voters", get(routes::handle_unlinked_voters))
        .route("/api/voters/all", get(routes::handle_all_voters))
        .route("/api/voters/{id}/mobile", put(routes::handle_update_mobile))
        .route("/api/summary", get(routes::handle_summary))
        // Families
        .route("/api/family", post(routes::handle_create_family))
        .route("/api/families", get(routes::handle_list_families))
        .route("/api/family/{id}", delete(routes::handle_delete_family))
        .route("/api/family/{id}/members", get(routes::handle_family_members))
        .route("/api/family/member", post(routes::handle_add_member))
        .route("/api/family/member/{voter_id}", delete(routes::handle_remove_member))
        // Master data
        .route("/api/panchayat", post(office::handle_add_panchayat))
        .route("/api/panchayats", get(office::handle_list_panchayats))
        .route("/api/booth", post(office::handle_add_booth))
        .route("/api/booths", get(office::handle_list_booths))
        .route("/api/village", post(office::handle_add_village))
        .route("/api/villages", get(office::handle_list_villages))
        .route("/api/caste", post(office::handle_add_caste))
        .route("/api/castes", get(office::handle_list_castes))
        // Events and visitors
        .route("/api/events", post(office::handle_add_event))
        .route("/api/events/today", get(office::handle_upcoming_events))
        .route("/api/events/all", get(office::handle_all_events))
        .route("/api/events/{id}", delete(office::handle_delete_event))
        .route(
            "/api/visitors",
            get(office::handle_list_visitors).post(office::handle_add_visitor),
        )
        .route("/api/visitors/{id}", delete(office::handle_delete_visitor))
        .route("/api/login", post(office::handle_login))
        // Wish messages
        .route("/api/wish/upload", post(files::handle_wish_upload))
        .route("/api/wish/recipients", get(office::handle_wish_recipients))
        .route("/api/wish/send", post(office::handle_wish_send))
        // Party leadership
        .route(
            "/api/leadership",
            get(office::handle_list_leaders).post(office::handle_add_leader),
        )
        .route("/api/leadership/filter", get(office::handle_filter_leaders))
        .route(
            "/api/leadership/{s_no}",
            put(office::handle_update_leader).delete(office::handle_delete_leader),
        )
        // Election analytics
        .route("/api/election/results", get(election::handle_results))
        .route("/api/election/party-summary", get(election::handle_party_summary))
        .route("/api/election/winners", get(election::handle_winners))
        .route("/api/election/booth/{booth}", get(election::handle_booth))
        .route("/api/election/booth/{booth}/voters", get(election::handle_booth_voters))
        .route(
            "/api/election/smallparty-penetration",
            get(election::handle_penetration),
        )
        .route("/api/election/booths", get(election::handle_booth_list))
        // Important files
        .route("/api/important/upload", post(files::handle_upload))
        .route("/api/important/list", get(files::handle_list_uploads))
        .route(
            "/api/important/delete/{filename}",
            delete(files::handle_delete_upload),
        )
        .nest_service("/uploads", ServeDir::new(upload_dir))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

pub async fn start_server(config: AppConfig) -> anyhow::Result<()> {
    std::fs::create_dir_all(&config.upload_dir)?;
    crate::config::ensure_db_dir(&config.database)?;

    let pool = StorePool::open(&config.database, config.pool_options())?;
    let addr: SocketAddr = format!("{}:{}", config.bind, config.port).parse()?;

    let state = Arc::new(AppState {
        pool: pool.clone(),
        config,
    });
    let app = router(state);

    tracing::info!("Starting server on {}", addr);
    crate::ui::status(crate::ui::Icons::GLOBE, "Server running at", &format!("http://{}", addr));

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    pool.close();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::PoolOptions;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    fn test_app(dir: &std::path::Path) -> Router {
        let config = AppConfig {
            database: dir.join("api.db"),
            upload_dir: dir.join("uploads"),
            ..Default::default()
        };
        let pool = StorePool::open(&config.database, PoolOptions::default()).unwrap();
        router(Arc::new(AppState { pool, config }))
    }

    async fn call(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(b) => builder
                .header("content-type", "application/json")
                .body(Body::from(b.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    #[tokio::test]
    async fn test_family_round_trip_over_http() {
        let dir = tempfile::tempdir().unwrap();
        let app = test_app(dir.path());

        let family = json!({
            "booth_no": 12,
            "family_name": "Velu",
            "selected_voters": [{ "voter_id": 1, "voter_name": "Velu" }]
        });
        let (status, body) = call(&app, "POST", "/api/family", Some(family.clone())).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["family_id"].as_i64().unwrap() > 0);

        let (status, body) = call(&app, "POST", "/api/family", Some(family)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Family name already exists in this booth!");

        let (status, _) = call(&app, "DELETE", "/api/family/member/999", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_malformed_input_gets_json_error() {
        let dir = tempfile::tempdir().unwrap();
        let app = test_app(dir.path());

        let family = json!({
            "booth_no": "12",
            "family_name": "Velu",
            "selected_voters": [{ "voter_id": "1" }]
        });
        let (status, body) = call(&app, "POST", "/api/family", Some(family)).await;
        assert_eq!(status, StatusCode::OK);
        let family_id = body["family_id"].as_i64().unwrap();

        let member = json!({ "family_id": family_id.to_string(), "voter_id": "2" });
        let (status, _) = call(&app, "POST", "/api/family/member", Some(member)).await;
        assert_eq!(status, StatusCode::OK);

        let request = Request::builder()
            .method("POST")
            .uri("/api/family")
            .header("content-type", "application/json")
            .body(Body::from("{ not json"))
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert!(body["error"].is_string());

        let wrong_type = json!({ "booth_no": [12], "family_name": "Arul" });
        let (status, body) = call(&app, "POST", "/api/family", Some(wrong_type)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());

        let (status, body) = call(&app, "GET", "/api/family/abc/members", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());

        let (status, body) = call(&app, "GET", "/api/voters?booth_no=abc", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn test_validation_and_auth_errors() {
        let dir = tempfile::tempdir().unwrap();
        let app = test_app(dir.path());

        let (status, body) = call(&app, "GET", "/api/voters", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Booth number required");

        let creds = json!({ "username": "admin", "password": "nope" });
        let (status, _) = call(&app, "POST", "/api/login", Some(creds)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, _) = call(&app, "GET", "/api/election/booth/42", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_visitor_write_refreshes_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let app = test_app(dir.path());

        let visitor = json!({ "name": "Selvi", "mobile": "9000000004" });
        let (status, _) = call(&app, "POST", "/api/visitors", Some(visitor)).await;
        assert_eq!(status, StatusCode::OK);
        assert!(dir.path().join("uploads").join("visitors.csv").exists());

        let (_, body) = call(&app, "GET", "/api/visitors", None).await;
        assert_eq!(body.as_array().unwrap().len(), 1);
    }
}
