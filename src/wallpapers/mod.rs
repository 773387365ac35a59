use axum::{extract::DefaultBodyLimit, routing::get, Router};

use crate::state::AppState;

pub mod handlers;

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/wallpapers",
            get(handlers::list_wallpapers).post(handlers::upload_wallpaper),
        )
        .route("/wallpapers/:filename", get(handlers::serve_wallpaper))
        .layer(DefaultBodyLimit::max(10 * 1024 * 1024)) // 10MB
}
