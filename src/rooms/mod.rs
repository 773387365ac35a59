use axum::{routing::get, Router};

use crate::state::AppState;

mod dto;
pub mod handlers;
pub mod repo;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/rooms", get(handlers::list_rooms).post(handlers::create_room))
        .route(
            "/rooms/:id",
            get(handlers::get_room)
                .put(handlers::update_room)
                .delete(handlers::delete_room),
        )
        .route("/export/:id", get(handlers::export_room))
        .route("/room-templates", get(handlers::room_templates))
}
