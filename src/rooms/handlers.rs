use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};
use time::OffsetDateTime;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::{
    auth::session::AuthSession,
    error::ApiError,
    rooms::{
        dto::{validate_dimensions, CreateRoomRequest, RoomEnvelope, UpdateRoomRequest},
        repo,
        repo::Room,
    },
    state::AppState,
};

#[instrument(skip(state, session))]
pub async fn list_rooms(
    State(state): State<AppState>,
    AuthSession(session): AuthSession,
) -> Result<Json<Vec<Room>>, ApiError> {
    let rooms = repo::list_by_user(&state.db, session.user_id).await?;
    Ok(Json(rooms))
}

#[instrument(skip(state, session, payload))]
pub async fn create_room(
    State(state): State<AppState>,
    AuthSession(session): AuthSession,
    Json(payload): Json<CreateRoomRequest>,
) -> Result<(StatusCode, Json<RoomEnvelope>), ApiError> {
    let new_room = payload
        .into_new_room(OffsetDateTime::now_utc())
        .map_err(ApiError::Validation)?;
    let room = repo::create(&state.db, session.user_id, new_room).await?;
    info!(user_id = %session.user_id, room_id = %room.id, "room saved");
    Ok((
        StatusCode::CREATED,
        Json(RoomEnvelope {
            message: "Room saved successfully".into(),
            room,
        }),
    ))
}

#[instrument(skip(state, session))]
pub async fn get_room(
    State(state): State<AppState>,
    AuthSession(session): AuthSession,
    Path(id): Path<Uuid>,
) -> Result<Json<Room>, ApiError> {
    let room = repo::get(&state.db, id, session.user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Room not found".into()))?;
    Ok(Json(room))
}

/// Body is parsed into the enumerated update struct by hand so unknown
/// fields surface as a 400 JSON error instead of a body-rejection.
#[instrument(skip(state, session, payload))]
pub async fn update_room(
    State(state): State<AppState>,
    AuthSession(session): AuthSession,
    Path(id): Path<Uuid>,
    Json(payload): Json<Value>,
) -> Result<Json<RoomEnvelope>, ApiError> {
    let update: UpdateRoomRequest = serde_json::from_value(payload)
        .map_err(|e| ApiError::Validation(format!("Invalid room update: {e}")))?;
    if let Some(dimensions) = &update.dimensions {
        validate_dimensions(dimensions).map_err(ApiError::Validation)?;
    }

    // An empty update leaves the row (and updated_at) untouched.
    let result = if update.is_empty() {
        repo::get(&state.db, id, session.user_id).await?
    } else {
        repo::update(&state.db, id, session.user_id, update).await?
    };
    let room = result.ok_or_else(|| {
        warn!(user_id = %session.user_id, room_id = %id, "room update missed");
        ApiError::NotFound("Room not found or access denied".into())
    })?;
    Ok(Json(RoomEnvelope {
        message: "Room updated successfully".into(),
        room,
    }))
}

#[instrument(skip(state, session))]
pub async fn delete_room(
    State(state): State<AppState>,
    AuthSession(session): AuthSession,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, ApiError> {
    // Idempotent: deleting an absent or foreign room still reports success,
    // so the response does not reveal whether the record existed.
    repo::delete(&state.db, id, session.user_id).await?;
    Ok(Json(json!({ "message": "Room deleted successfully" })))
}

#[instrument(skip(state, session))]
pub async fn export_room(
    State(state): State<AppState>,
    AuthSession(session): AuthSession,
    Path(id): Path<Uuid>,
) -> Result<Json<Room>, ApiError> {
    let room = repo::get(&state.db, id, session.user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Room not found".into()))?;
    Ok(Json(room))
}

pub async fn room_templates() -> Json<Value> {
    Json(json!([
        {
            "name": "Small Bedroom",
            "roomType": "bedroom",
            "dimensions": {"length": 6, "width": 6, "height": 3},
            "wallColors": {
                "North Wall": "#e6e2d3",
                "South Wall": "#e6e2d3",
                "East Wall": "#d4c5b9",
                "West Wall": "#d4c5b9"
            }
        },
        {
            "name": "Modern Living Room",
            "roomType": "livingroom",
            "dimensions": {"length": 10, "width": 8, "height": 3.5},
            "wallColors": {
                "North Wall": "#f5f5f5",
                "South Wall": "#f5f5f5",
                "East Wall": "#e8e8e8",
                "West Wall": "#e8e8e8"
            }
        },
        {
            "name": "Kitchen Space",
            "roomType": "kitchen",
            "dimensions": {"length": 8, "width": 6, "height": 3},
            "wallColors": {
                "North Wall": "#ffffff",
                "South Wall": "#ffffff",
                "East Wall": "#f9f9f9",
                "West Wall": "#f9f9f9"
            }
        }
    ]))
}
