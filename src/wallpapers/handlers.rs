use axum::{
    extract::{Multipart, Path, State},
    http::header,
    response::IntoResponse,
    Json,
};
use bytes::Bytes;
use serde_json::{json, Value};
use tracing::{info, instrument};

use crate::{auth::session::AuthSession, error::ApiError, state::AppState};

const ALLOWED_EXTENSIONS: [&str; 4] = ["png", "jpg", "jpeg", "gif"];

/// Multipart upload: file field `wallpaper`, optional text field `wallName`.
/// Stored under `{user_id}_{wall_name}_{filename}` after sanitization.
#[instrument(skip(state, session, multipart))]
pub async fn upload_wallpaper(
    State(state): State<AppState>,
    AuthSession(session): AuthSession,
    mut multipart: Multipart,
) -> Result<Json<Value>, ApiError> {
    let mut file: Option<(String, Bytes)> = None;
    let mut wall_name = "default".to_string();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::Validation(format!("Invalid multipart body: {e}")))?
    {
        let name = field.name().map(|s| s.to_string());
        match name.as_deref() {
            Some("wallpaper") => {
                let filename = field.file_name().unwrap_or_default().to_string();
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::Validation(format!("Invalid multipart body: {e}")))?;
                file = Some((filename, data));
            }
            Some("wallName") => {
                wall_name = field
                    .text()
                    .await
                    .map_err(|e| ApiError::Validation(format!("Invalid multipart body: {e}")))?;
            }
            _ => {}
        }
    }

    let (filename, data) = file.ok_or_else(|| {
        ApiError::Validation("No wallpaper file provided".into())
    })?;
    if filename.is_empty() {
        return Err(ApiError::Validation("No file selected".into()));
    }
    let sanitized = sanitize_filename(&filename);
    if sanitized.is_empty() || !has_allowed_extension(&sanitized) {
        return Err(ApiError::Validation("Invalid file type".into()));
    }

    let stored_name = format!(
        "{}_{}_{}",
        session.user_id,
        sanitize_filename(&wall_name),
        sanitized
    );
    state.storage.put(&stored_name, data).await?;

    info!(user_id = %session.user_id, filename = %stored_name, "wallpaper uploaded");
    Ok(Json(json!({
        "message": "Wallpaper uploaded successfully",
        "filename": stored_name,
        "url": format!("/api/wallpapers/{stored_name}"),
    })))
}

#[instrument(skip(state, session))]
pub async fn list_wallpapers(
    State(state): State<AppState>,
    AuthSession(session): AuthSession,
) -> Result<Json<Vec<Value>>, ApiError> {
    let prefix = format!("{}_", session.user_id);
    let wallpapers = state
        .storage
        .list(&prefix)
        .await?
        .into_iter()
        .filter(|name| has_allowed_extension(name))
        .map(|name| {
            json!({
                "filename": name,
                "url": format!("/api/wallpapers/{name}"),
            })
        })
        .collect();
    Ok(Json(wallpapers))
}

/// Serves stored image bytes. Open like the original frontend expects;
/// names are unguessable only to the extent the uuid prefix is.
#[instrument(skip(state))]
pub async fn serve_wallpaper(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    // Reject anything that survives sanitization differently than it
    // arrived; that covers traversal sequences and separators.
    if filename != sanitize_filename(&filename) {
        return Err(ApiError::NotFound("Wallpaper not found".into()));
    }
    let body = state
        .storage
        .get(&filename)
        .await?
        .ok_or_else(|| ApiError::NotFound("Wallpaper not found".into()))?;
    Ok(([(header::CONTENT_TYPE, content_type_for(&filename))], body))
}

/// Keeps the final path component and strips everything outside
/// `[A-Za-z0-9._-]` (spaces become underscores).
pub fn sanitize_filename(name: &str) -> String {
    let base = name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default();
    let cleaned: String = base
        .chars()
        .map(|c| if c == ' ' { '_' } else { c })
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
        .collect();
    cleaned.trim_matches('.').to_string()
}

pub fn has_allowed_extension(name: &str) -> bool {
    match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => {
            ALLOWED_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str())
        }
        _ => false,
    }
}

fn content_type_for(name: &str) -> &'static str {
    match name.rsplit_once('.').map(|(_, ext)| ext.to_ascii_lowercase()) {
        Some(ext) if ext == "png" => "image/png",
        Some(ext) if ext == "jpg" || ext == "jpeg" => "image/jpeg",
        Some(ext) if ext == "gif" => "image/gif",
        _ => "application/octet-stream",
    }
}
