use axum::{
    extract::{multipart::MultipartRejection, Multipart, State},
    Json,
};
use serde_json::json;
use std::sync::Arc;

use crate::server::AppState;
use crate::server::extract::ApiPath;
use crate::server::routes::{reject, ApiError, ApiResult};
use crate::{uploads, Error};

fn blocking_failure(e: tokio::task::JoinError) -> ApiError {
    reject(Error::Io(std::io::Error::other(e.to_string())))
}

/// Pull the named file field out of a multipart body and store it
async fn receive_file(
    state: &AppState,
    multipart: Result<Multipart, MultipartRejection>,
    field_name: &str,
    missing: &str,
) -> Result<String, ApiError> {
    let mut multipart = multipart.map_err(|e| reject(Error::Upload(e.body_text())))?;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| reject(Error::Upload(e.body_text())))?
    {
        if field.name() != Some(field_name) {
            continue;
        }
        let original = field.file_name().unwrap_or("upload").to_string();
        let content_type = field.content_type().map(str::to_string);
        let bytes = field
            .bytes()
            .await
            .map_err(|e| reject(Error::Upload(e.body_text())))?;

        let dir = state.config.upload_dir.clone();
        let max = state.config.max_upload_bytes;
        return tokio::task::spawn_blocking(move || {
            uploads::save_upload(&dir, &original, content_type.as_deref(), &bytes, max)
        })
        .await
        .map_err(blocking_failure)?
        .map_err(reject);
    }
    Err(reject(Error::Upload(missing.to_string())))
}

pub async fn handle_upload(
    State(state): State<Arc<AppState>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult {
    let name = receive_file(&state, multipart, "file", "No file uploaded").await?;
    Ok(Json(json!({
        "message": "File uploaded successfully!",
        "url": uploads::file_url(&state.config.public_url, &name),
        "name": name,
    })))
}

pub async fn handle_wish_upload(
    State(state): State<Arc<AppState>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult {
    let name = receive_file(&state, multipart, "image", "No image uploaded").await?;
    Ok(Json(json!({
        "imageUrl": uploads::file_url(&state.config.public_url, &name),
    })))
}

pub async fn handle_list_uploads(State(state): State<Arc<AppState>>) -> ApiResult {
    let dir = state.config.upload_dir.clone();
    let public_url = state.config.public_url.clone();
    let files = tokio::task::spawn_blocking(move || uploads::list_uploads(&dir, &public_url))
        .await
        .map_err(blocking_failure)?
        .map_err(reject)?;
    Ok(Json(json!(files)))
}

pub async fn handle_delete_upload(
    State(state): State<Arc<AppState>>,
    ApiPath(filename): ApiPath<String>,
) -> ApiResult {
    let dir = state.config.upload_dir.clone();
    let name = filename.clone();
    tokio::task::spawn_blocking(move || uploads::delete_upload(&dir, &name))
        .await
        .map_err(blocking_failure)?
        .map_err(reject)?;
    Ok(Json(json!({
        "message": format!("File '{}' deleted successfully!", filename),
    })))
}
