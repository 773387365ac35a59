use serde::Serialize;
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

use super::dto::UpdateRoomRequest;

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Room {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub room_type: String,
    pub dimensions: serde_json::Value,
    pub wall_colors: serde_json::Value,
    pub wallpapers: serde_json::Value,
    pub wall_canvas_data: serde_json::Value,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

#[derive(Debug)]
pub struct NewRoom {
    pub name: String,
    pub room_type: String,
    pub dimensions: serde_json::Value,
    pub wall_colors: serde_json::Value,
    pub wallpapers: serde_json::Value,
    pub wall_canvas_data: serde_json::Value,
}

const ROOM_COLUMNS: &str = "id, user_id, name, room_type, dimensions, wall_colors, \
    wallpapers, wall_canvas_data, created_at, updated_at";

pub async fn list_by_user(db: &PgPool, user_id: Uuid) -> Result<Vec<Room>, sqlx::Error> {
    sqlx::query_as::<_, Room>(&format!(
        "SELECT {ROOM_COLUMNS} FROM rooms WHERE user_id = $1 ORDER BY updated_at DESC"
    ))
    .bind(user_id)
    .fetch_all(db)
    .await
}

pub async fn create(db: &PgPool, user_id: Uuid, room: NewRoom) -> Result<Room, sqlx::Error> {
    sqlx::query_as::<_, Room>(&format!(
        r#"
        INSERT INTO rooms (user_id, name, room_type, dimensions, wall_colors,
                           wallpapers, wall_canvas_data)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING {ROOM_COLUMNS}
        "#
    ))
    .bind(user_id)
    .bind(room.name)
    .bind(room.room_type)
    .bind(room.dimensions)
    .bind(room.wall_colors)
    .bind(room.wallpapers)
    .bind(room.wall_canvas_data)
    .fetch_one(db)
    .await
}

/// Owner-scoped lookup: a room belonging to someone else reads as absent.
pub async fn get(db: &PgPool, id: Uuid, user_id: Uuid) -> Result<Option<Room>, sqlx::Error> {
    sqlx::query_as::<_, Room>(&format!(
        "SELECT {ROOM_COLUMNS} FROM rooms WHERE id = $1 AND user_id = $2"
    ))
    .bind(id)
    .bind(user_id)
    .fetch_optional(db)
    .await
}

/// Applies the enumerated update fields; anything left as `None` keeps its
/// stored value. Returns `None` when the room is absent or not owned.
pub async fn update(
    db: &PgPool,
    id: Uuid,
    user_id: Uuid,
    update: UpdateRoomRequest,
) -> Result<Option<Room>, sqlx::Error> {
    sqlx::query_as::<_, Room>(&format!(
        r#"
        UPDATE rooms
        SET name = COALESCE($3, name),
            room_type = COALESCE($4, room_type),
            dimensions = COALESCE($5, dimensions),
            wall_colors = COALESCE($6, wall_colors),
            wallpapers = COALESCE($7, wallpapers),
            wall_canvas_data = COALESCE($8, wall_canvas_data),
            updated_at = now()
        WHERE id = $1 AND user_id = $2
        RETURNING {ROOM_COLUMNS}
        "#
    ))
    .bind(id)
    .bind(user_id)
    .bind(update.name)
    .bind(update.room_type)
    .bind(update.dimensions)
    .bind(update.wall_colors)
    .bind(update.wallpapers)
    .bind(update.wall_canvas_data)
    .fetch_optional(db)
    .await
}

pub async fn delete(db: &PgPool, id: Uuid, user_id: Uuid) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM rooms WHERE id = $1 AND user_id = $2")
        .bind(id)
        .bind(user_id)
        .execute(db)
        .await?;
    Ok(result.rows_affected() > 0)
}
