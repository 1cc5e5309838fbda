use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Columns selected for [`Student`]; `password_hash` never leaves the database.
pub const STUDENT_COLUMNS: &str =
    "id, name, roll_no, room_no, contact_number, email, created_at, updated_at";

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
#[schema(
    example = json!({
        "id": 1,
        "name": "Asha Verma",
        "roll_no": "CS-2024-017",
        "room_no": "B-204",
        "contact_number": "9876543210",
        "email": "asha.verma@example.edu",
        "created_at": "2026-01-01T00:00:00Z",
        "updated_at": "2026-01-01T00:00:00Z"
    })
)]
pub struct Student {
    pub id: u64,
    pub name: String,
    pub roll_no: String,
    pub room_no: String,
    pub contact_number: String,
    pub email: String,
    #[schema(value_type = String, format = "date-time")]
    pub created_at: DateTime<Utc>,
    #[schema(value_type = String, format = "date-time")]
    pub updated_at: DateTime<Utc>,
}

/// Row used by student login.
#[derive(Debug, sqlx::FromRow)]
pub struct StudentCredentials {
    pub id: u64,
    pub name: String,
    pub roll_no: String,
    pub room_no: String,
    pub contact_number: String,
    pub email: String,
    pub password_hash: Option<String>,
}
