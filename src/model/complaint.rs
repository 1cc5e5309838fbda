use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct Complaint {
    pub id: u64,
    pub student_name: String,
    pub roll_no: String,
    pub room_no: String,
    pub description: String,
    #[schema(example = "Pending")]
    pub status: String,
    #[schema(value_type = String, format = "date-time")]
    pub submission_date: DateTime<Utc>,
    #[schema(value_type = String, format = "date-time")]
    pub updated_at: DateTime<Utc>,
}
