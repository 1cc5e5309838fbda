use crate::{
    auth::auth::AuthUser,
    error::ApiError,
    model::{room::Room, status::RoomStatus},
    utils::{
        db_utils::{SqlUpdate, WhereClause, bind_query_as, bind_scalar, delete_row},
        pagination::Pagination,
        validation::{Normalize, error_with, trim, trim_opt},
    },
};
use actix_web::{HttpResponse, Responder, web};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::MySqlPool;
use tracing::info;
use utoipa::{IntoParams, ToSchema};
use validator::{Validate, ValidationError};

const ROOM_COLUMNS: &str = "id, room_no, capacity, occupied, status, created_at, updated_at";

fn default_capacity() -> u32 {
    2
}

fn default_status() -> RoomStatus {
    RoomStatus::Available
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[validate(schema(function = "validate_new_room_occupancy"))]
pub struct CreateRoom {
    #[schema(example = "B-204")]
    #[validate(length(min = 1, message = "Room number is required"))]
    pub room_no: String,
    #[schema(example = 2)]
    #[serde(default = "default_capacity")]
    #[validate(range(min = 1, message = "Capacity must be a positive integer"))]
    pub capacity: u32,
    #[schema(example = 0)]
    #[serde(default)]
    pub occupied: u32,
    #[serde(default = "default_status")]
    pub status: RoomStatus,
}

impl Normalize for CreateRoom {
    fn normalize(&mut self) {
        trim(&mut self.room_no);
    }
}

/// Shared by create and (after merging with the stored row) update.
pub fn check_occupancy(capacity: u32, occupied: u32) -> Result<(), ValidationError> {
    if occupied > capacity {
        return Err(error_with(
            "occupancy",
            "Occupied cannot be greater than capacity",
        ));
    }
    Ok(())
}

fn validate_new_room_occupancy(room: &CreateRoom) -> Result<(), ValidationError> {
    check_occupancy(room.capacity, room.occupied)
}

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateRoom {
    #[validate(length(min = 1, message = "Room number is required"))]
    pub room_no: Option<String>,
    #[validate(range(min = 1, message = "Capacity must be a positive integer"))]
    pub capacity: Option<u32>,
    pub occupied: Option<u32>,
    pub status: Option<RoomStatus>,
}

impl Normalize for UpdateRoom {
    fn normalize(&mut self) {
        trim_opt(&mut self.room_no);
    }
}

/// occupied <= capacity, checked on the stored row with the update applied.
pub fn merged_occupancy(current: &Room, update: &UpdateRoom) -> Result<(), ApiError> {
    check_occupancy(
        update.capacity.unwrap_or(current.capacity),
        update.occupied.unwrap_or(current.occupied),
    )
    .map_err(|e| ApiError::Validation(e.to_string()))
}

#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct RoomQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    /// Case-insensitive match on room number
    pub search: Option<String>,
    pub status: Option<RoomStatus>,
}

#[derive(Serialize, ToSchema)]
pub struct RoomListResponse {
    pub data: Vec<Room>,
    pub page: u32,
    pub per_page: u32,
    pub total: i64,
}

async fn fetch_room(pool: &MySqlPool, room_id: u64) -> Result<Option<Room>, ApiError> {
    let sql = format!("SELECT {ROOM_COLUMNS} FROM rooms WHERE id = ?");
    Ok(sqlx::query_as::<_, Room>(&sql)
        .bind(room_id)
        .fetch_optional(pool)
        .await?)
}

#[utoipa::path(
    post,
    path = "/api/rooms",
    request_body = CreateRoom,
    responses(
        (status = 201, description = "Room created", body = Room),
        (status = 400, description = "Validation failed", body = Object, example = json!({
            "message": "Occupied cannot be greater than capacity"
        })),
        (status = 409, description = "Room number already exists")
    ),
    security(("bearer_auth" = [])),
    tag = "Rooms"
)]
pub async fn create_room(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<CreateRoom>,
) -> Result<impl Responder, ApiError> {
    auth.require_admin()?;

    let mut payload = payload.into_inner();
    payload.normalize();
    payload.validate()?;

    let result = sqlx::query(
        "INSERT INTO rooms (room_no, capacity, occupied, status) VALUES (?, ?, ?, ?)",
    )
    .bind(&payload.room_no)
    .bind(payload.capacity)
    .bind(payload.occupied)
    .bind(payload.status.as_ref())
    .execute(pool.get_ref())
    .await?;

    let room_id = result.last_insert_id();
    info!(room_id, "Room created");

    let room = fetch_room(pool.get_ref(), room_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Room"))?;
    Ok(HttpResponse::Created().json(room))
}

#[utoipa::path(
    get,
    path = "/api/rooms",
    params(RoomQuery),
    responses((status = 200, description = "Paginated room list, ordered by room number", body = RoomListResponse)),
    security(("bearer_auth" = [])),
    tag = "Rooms"
)]
pub async fn list_rooms(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<RoomQuery>,
) -> Result<impl Responder, ApiError> {
    auth.require_admin()?;

    let paging = Pagination::from_query(query.page, query.per_page);

    let mut filter = WhereClause::default();
    if let Some(status) = query.status {
        filter.eq("status", status.as_ref());
    }
    if let Some(term) = query.search.as_deref() {
        filter.search(&["room_no"], term);
    }

    let count_sql = format!("SELECT COUNT(*) FROM rooms{}", filter.sql());
    let total = bind_scalar(sqlx::query_scalar::<_, i64>(&count_sql), filter.values())
        .fetch_one(pool.get_ref())
        .await?;

    let data_sql = format!(
        "SELECT {ROOM_COLUMNS} FROM rooms{} ORDER BY room_no ASC LIMIT ? OFFSET ?",
        filter.sql()
    );
    let data = bind_query_as(sqlx::query_as::<_, Room>(&data_sql), filter.values())
        .bind(paging.limit())
        .bind(paging.offset())
        .fetch_all(pool.get_ref())
        .await?;

    Ok(HttpResponse::Ok().json(RoomListResponse {
        data,
        page: paging.page,
        per_page: paging.per_page,
        total,
    }))
}

#[utoipa::path(
    get,
    path = "/api/rooms/{room_id}",
    params(("room_id" = u64, Path, description = "Room ID")),
    responses(
        (status = 200, description = "Room found", body = Room),
        (status = 404, description = "Room not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Rooms"
)]
pub async fn get_room(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> Result<impl Responder, ApiError> {
    auth.require_admin()?;

    match fetch_room(pool.get_ref(), path.into_inner()).await? {
        Some(room) => Ok(HttpResponse::Ok().json(room)),
        None => Err(ApiError::not_found("Room")),
    }
}

#[utoipa::path(
    put,
    path = "/api/rooms/{room_id}",
    params(("room_id" = u64, Path, description = "Room ID")),
    request_body = UpdateRoom,
    responses(
        (status = 200, description = "Room updated", body = Room),
        (status = 400, description = "Validation failed or empty update"),
        (status = 404, description = "Room not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Rooms"
)]
pub async fn update_room(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    payload: web::Json<UpdateRoom>,
) -> Result<impl Responder, ApiError> {
    auth.require_admin()?;

    let room_id = path.into_inner();
    let mut payload = payload.into_inner();
    payload.normalize();
    payload.validate()?;

    if payload.capacity.is_some() || payload.occupied.is_some() {
        let current = fetch_room(pool.get_ref(), room_id)
            .await?
            .ok_or_else(|| ApiError::not_found("Room"))?;
        merged_occupancy(&current, &payload)?;
    }

    let mut update = SqlUpdate::new("rooms");
    update
        .set_opt("room_no", payload.room_no)
        .set_opt("capacity", payload.capacity)
        .set_opt("occupied", payload.occupied)
        .set_opt("status", payload.status.map(|s| s.as_ref().to_string()));
    update.execute(pool.get_ref(), room_id, "Room").await?;

    info!(room_id, "Room updated");
    let room = fetch_room(pool.get_ref(), room_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Room"))?;
    Ok(HttpResponse::Ok().json(room))
}

#[utoipa::path(
    delete,
    path = "/api/rooms/{room_id}",
    params(("room_id" = u64, Path, description = "Room ID")),
    responses(
        (status = 200, description = "Room deleted", body = Object, example = json!({
            "message": "Room deleted successfully"
        })),
        (status = 404, description = "Room not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Rooms"
)]
pub async fn delete_room(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> Result<impl Responder, ApiError> {
    auth.require_admin()?;

    let room_id = path.into_inner();
    delete_row(pool.get_ref(), "rooms", room_id, "Room").await?;

    info!(room_id, "Room deleted");
    Ok(HttpResponse::Ok().json(json!({
        "message": "Room deleted successfully"
    })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_defaults_match_new_room_form() {
        let room: CreateRoom = serde_json::from_str(r#"{"room_no": "A-101"}"#).unwrap();
        assert_eq!(room.capacity, 2);
        assert_eq!(room.occupied, 0);
        assert_eq!(room.status, RoomStatus::Available);
        assert!(room.validate().is_ok());
    }

    #[test]
    fn over_occupied_room_is_rejected() {
        let room: CreateRoom =
            serde_json::from_str(r#"{"room_no": "A-101", "capacity": 2, "occupied": 3}"#).unwrap();
        let err = ApiError::from(room.validate().unwrap_err());
        assert_eq!(err.to_string(), "Occupied cannot be greater than capacity");
    }

    #[test]
    fn zero_capacity_is_rejected() {
        let room: CreateRoom =
            serde_json::from_str(r#"{"room_no": "A-101", "capacity": 0, "occupied": 0}"#).unwrap();
        assert!(room.validate().is_err());
    }

    #[test]
    fn unknown_status_fails_to_deserialize() {
        let parsed = serde_json::from_str::<CreateRoom>(r#"{"room_no": "A-1", "status": "Closed"}"#);
        assert!(parsed.is_err());
    }

    fn stored_room(capacity: u32, occupied: u32) -> Room {
        Room {
            id: 3,
            room_no: "B-204".into(),
            capacity,
            occupied,
            status: "Available".into(),
            created_at: chrono::Utc::now(),
            updated_at: chrono::Utc::now(),
        }
    }

    #[test]
    fn lowering_capacity_below_stored_occupancy_is_rejected() {
        let current = stored_room(3, 2);
        let update = UpdateRoom {
            capacity: Some(1),
            ..Default::default()
        };
        let err = merged_occupancy(&current, &update).unwrap_err();
        assert_eq!(err.to_string(), "Occupied cannot be greater than capacity");
    }

    #[test]
    fn raising_occupancy_is_checked_against_stored_capacity() {
        let current = stored_room(2, 1);
        let full = UpdateRoom {
            occupied: Some(2),
            ..Default::default()
        };
        assert!(merged_occupancy(&current, &full).is_ok());

        let over = UpdateRoom {
            occupied: Some(3),
            ..Default::default()
        };
        assert!(merged_occupancy(&current, &over).is_err());

        let both = UpdateRoom {
            capacity: Some(4),
            occupied: Some(3),
            ..Default::default()
        };
        assert!(merged_occupancy(&current, &both).is_ok());
    }

    #[test]
    fn occupancy_check_allows_full_room() {
        assert!(check_occupancy(3, 3).is_ok());
        assert!(check_occupancy(3, 4).is_err());
    }
}
