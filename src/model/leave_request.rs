use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
#[schema(
    example = json!({
        "id": 12,
        "student_name": "Asha Verma",
        "roll_no": "CS-2024-017",
        "room_no": "B-204",
        "reason": "Family function",
        "start_date": "2026-02-10",
        "end_date": "2026-02-12",
        "status": "Pending",
        "submission_date": "2026-02-01T09:30:00Z",
        "updated_at": "2026-02-01T09:30:00Z"
    })
)]
pub struct LeaveRequest {
    pub id: u64,
    pub student_name: String,
    pub roll_no: String,
    pub room_no: String,
    pub reason: String,
    #[schema(value_type = String, format = "date")]
    pub start_date: NaiveDate,
    #[schema(value_type = String, format = "date")]
    pub end_date: NaiveDate,
    pub status: String,
    #[schema(value_type = String, format = "date-time")]
    pub submission_date: DateTime<Utc>,
    #[schema(value_type = String, format = "date-time")]
    pub updated_at: DateTime<Utc>,
}
