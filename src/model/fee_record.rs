use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Student fields joined onto each fee record.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct FeeStudent {
    pub name: String,
    pub roll_no: String,
    pub room_no: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
#[schema(
    example = json!({
        "id": 7,
        "student_id": 1,
        "amount": 12500.0,
        "due_date": "2026-03-01",
        "payment_date": null,
        "status": "Due",
        "created_at": "2026-01-15T00:00:00Z",
        "updated_at": "2026-01-15T00:00:00Z",
        "student": { "name": "Asha Verma", "roll_no": "CS-2024-017", "room_no": "B-204" }
    })
)]
pub struct FeeRecord {
    pub id: u64,
    pub student_id: u64,
    pub amount: f64,
    #[schema(value_type = String, format = "date")]
    pub due_date: NaiveDate,
    #[schema(value_type = Option<String>, format = "date-time")]
    pub payment_date: Option<DateTime<Utc>>,
    pub status: String,
    #[schema(value_type = String, format = "date-time")]
    pub created_at: DateTime<Utc>,
    #[schema(value_type = String, format = "date-time")]
    pub updated_at: DateTime<Utc>,
    #[sqlx(flatten)]
    pub student: FeeStudent,
}

/// SELECT list matching [`FeeRecord`], aliased `f` for fee_records and `s` for students.
pub const FEE_RECORD_COLUMNS: &str = "f.id, f.student_id, f.amount, f.due_date, f.payment_date, \
     f.status, f.created_at, f.updated_at, s.name, s.roll_no, s.room_no";
