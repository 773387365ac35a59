use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use time::macros::format_description;
use time::OffsetDateTime;

use super::repo::{NewRoom, Room};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRoomRequest {
    pub name: Option<String>,
    pub room_type: Option<String>,
    pub dimensions: Option<Value>,
    pub wall_colors: Option<Value>,
    pub wallpapers: Option<Value>,
    pub wall_canvas_data: Option<Value>,
}

/// Enumerated update: every mutable room field, and nothing else. Unknown
/// keys are rejected at the boundary instead of being merged into the row.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UpdateRoomRequest {
    pub name: Option<String>,
    pub room_type: Option<String>,
    pub dimensions: Option<Value>,
    pub wall_colors: Option<Value>,
    pub wallpapers: Option<Value>,
    pub wall_canvas_data: Option<Value>,
}

impl UpdateRoomRequest {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.room_type.is_none()
            && self.dimensions.is_none()
            && self.wall_colors.is_none()
            && self.wallpapers.is_none()
            && self.wall_canvas_data.is_none()
    }
}

#[derive(Debug, Serialize)]
pub struct RoomEnvelope {
    pub message: String,
    pub room: Room,
}

/// Requires every dimension to be present, numeric, finite and positive.
pub fn validate_dimensions(dimensions: &Value) -> Result<(), String> {
    let object = dimensions
        .as_object()
        .ok_or_else(|| "Invalid dimensions".to_string())?;
    for key in ["length", "width", "height"] {
        let value = object.get(key).ok_or_else(|| format!("Missing dimension: {key}"))?;
        match value.as_f64() {
            Some(v) if v.is_finite() && v > 0.0 => {}
            _ => return Err(format!("Invalid dimension value for {key}")),
        }
    }
    Ok(())
}

impl CreateRoomRequest {
    /// Checks the required fields and fills the documented defaults.
    pub fn into_new_room(self, now: OffsetDateTime) -> Result<NewRoom, String> {
        let room_type = self
            .room_type
            .ok_or_else(|| "Missing required field: roomType".to_string())?;
        let dimensions = self
            .dimensions
            .ok_or_else(|| "Missing required field: dimensions".to_string())?;
        validate_dimensions(&dimensions)?;

        let name = self.name.unwrap_or_else(|| default_room_name(now));
        Ok(NewRoom {
            name,
            room_type,
            dimensions,
            wall_colors: self.wall_colors.unwrap_or_else(default_wall_colors),
            wallpapers: self.wallpapers.unwrap_or_else(|| json!({})),
            wall_canvas_data: self.wall_canvas_data.unwrap_or_else(|| json!({})),
        })
    }
}

fn default_room_name(now: OffsetDateTime) -> String {
    let stamp = now
        .format(format_description!(
            "[year][month][day]_[hour][minute][second]"
        ))
        .unwrap_or_default();
    format!("Room {stamp}")
}

fn default_wall_colors() -> Value {
    json!({
        "North Wall": "#b0b0b0",
        "South Wall": "#b0b0b0",
        "East Wall": "#8a7b94",
        "West Wall": "#8a7b94"
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dimensions_require_all_three_axes() {
        assert!(validate_dimensions(&json!({"length": 8, "width": 8, "height": 3})).is_ok());
        let err = validate_dimensions(&json!({"length": 8, "width": 8})).unwrap_err();
        assert_eq!(err, "Missing dimension: height");
    }

    #[test]
    fn dimensions_must_be_positive_numbers() {
        let err = validate_dimensions(&json!({"length": 0, "width": 8, "height": 3})).unwrap_err();
        assert_eq!(err, "Invalid dimension value for length");
        let err =
            validate_dimensions(&json!({"length": 8, "width": "wide", "height": 3})).unwrap_err();
        assert_eq!(err, "Invalid dimension value for width");
        assert!(validate_dimensions(&json!({"length": 8.5, "width": 6, "height": 3.2})).is_ok());
    }

    #[test]
    fn dimensions_must_be_an_object() {
        assert!(validate_dimensions(&json!([8, 8, 3])).is_err());
    }

    #[test]
    fn create_requires_room_type_and_dimensions() {
        let request: CreateRoomRequest = serde_json::from_value(json!({})).unwrap();
        let err = request.into_new_room(OffsetDateTime::now_utc()).unwrap_err();
        assert_eq!(err, "Missing required field: roomType");

        let request: CreateRoomRequest =
            serde_json::from_value(json!({"roomType": "bedroom"})).unwrap();
        let err = request.into_new_room(OffsetDateTime::now_utc()).unwrap_err();
        assert_eq!(err, "Missing required field: dimensions");
    }

    #[test]
    fn create_fills_defaults() {
        let request: CreateRoomRequest = serde_json::from_value(json!({
            "roomType": "bedroom",
            "dimensions": {"length": 6, "width": 6, "height": 3}
        }))
        .unwrap();
        let room = request.into_new_room(OffsetDateTime::now_utc()).unwrap();
        assert!(room.name.starts_with("Room "));
        assert_eq!(room.wall_colors["North Wall"], "#b0b0b0");
        assert_eq!(room.wallpapers, json!({}));
        assert_eq!(room.wall_canvas_data, json!({}));
    }

    #[test]
    fn update_rejects_unknown_fields() {
        let result: Result<UpdateRoomRequest, _> =
            serde_json::from_value(json!({"owner": "mallory"}));
        assert!(result.is_err());
    }

    #[test]
    fn update_accepts_any_subset_of_known_fields() {
        let update: UpdateRoomRequest =
            serde_json::from_value(json!({"name": "Studio", "wallColors": {"North Wall": "#fff"}}))
                .unwrap();
        assert_eq!(update.name.as_deref(), Some("Studio"));
        assert!(update.room_type.is_none());
        assert!(!update.is_empty());

        let empty: UpdateRoomRequest = serde_json::from_value(json!({})).unwrap();
        assert!(empty.is_empty());
    }
}
