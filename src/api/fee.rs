use crate::{
    auth::auth::AuthUser,
    error::ApiError,
    model::{
        fee_record::{FEE_RECORD_COLUMNS, FeeRecord},
        status::FeeStatus,
    },
    utils::{
        db_utils::{
            SqlUpdate, WhereClause, bind_query_as, bind_scalar, delete_row, row_exists,
            transition_status,
        },
        pagination::Pagination,
    },
};
use actix_web::{HttpResponse, Responder, web};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::MySqlPool;
use tracing::info;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

const FEE_FROM: &str = "fee_records f JOIN students s ON s.id = f.student_id";

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateFee {
    #[schema(example = 1)]
    pub student_id: u64,
    #[schema(example = 12500.0)]
    #[validate(range(exclusive_min = 0.0, message = "Amount must be greater than 0"))]
    pub amount: f64,
    #[schema(example = "2026-03-01", format = "date", value_type = String)]
    pub due_date: NaiveDate,
}

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateFee {
    pub student_id: Option<u64>,
    #[validate(range(exclusive_min = 0.0, message = "Amount must be greater than 0"))]
    pub amount: Option<f64>,
    #[schema(format = "date", value_type = Option<String>)]
    pub due_date: Option<NaiveDate>,
}

#[derive(Deserialize, IntoParams, ToSchema)]
pub struct FeeQuery {
    pub status: Option<FeeStatus>,
    /// Case-insensitive match on the student's name, roll number or room number
    pub search: Option<String>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

#[derive(Serialize, ToSchema)]
pub struct FeeListResponse {
    pub data: Vec<FeeRecord>,
    pub page: u32,
    pub per_page: u32,
    pub total: i64,
}

async fn fetch_fee(pool: &MySqlPool, fee_id: u64) -> Result<Option<FeeRecord>, ApiError> {
    let sql = format!("SELECT {FEE_RECORD_COLUMNS} FROM {FEE_FROM} WHERE f.id = ?");
    sqlx::query_as::<_, FeeRecord>(&sql)
        .bind(fee_id)
        .fetch_optional(pool)
        .await
        .inspect_err(|e| tracing::error!(error = %e, fee_id, "Failed to fetch fee record"))
        .map_err(ApiError::from)
}

async fn ensure_student(pool: &MySqlPool, student_id: u64) -> Result<(), ApiError> {
    if !row_exists(pool, "students", student_id).await? {
        return Err(ApiError::BadRequest(format!(
            "Student {student_id} does not exist"
        )));
    }
    Ok(())
}

#[utoipa::path(
    get,
    path = "/api/fees",
    params(FeeQuery),
    responses(
        (status = 200, description = "Paginated fee records, latest due date first", body = FeeListResponse),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Fees"
)]
pub async fn list_fees(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<FeeQuery>,
) -> Result<impl Responder, ApiError> {
    auth.require_admin()?;

    let paging = Pagination::from_query(query.page, query.per_page);

    let mut filter = WhereClause::default();
    if let Some(status) = query.status {
        filter.eq("f.status", status.as_ref());
    }
    if let Some(term) = query.search.as_deref() {
        filter.search(&["s.name", "s.roll_no", "s.room_no"], term);
    }

    let count_sql = format!("SELECT COUNT(*) FROM {FEE_FROM}{}", filter.sql());
    let total = bind_scalar(sqlx::query_scalar::<_, i64>(&count_sql), filter.values())
        .fetch_one(pool.get_ref())
        .await?;

    let data_sql = format!(
        r#"
        SELECT {FEE_RECORD_COLUMNS}
        FROM {FEE_FROM}
        {}
        ORDER BY f.due_date DESC, f.id DESC
        LIMIT ? OFFSET ?
        "#,
        filter.sql()
    );
    let data = bind_query_as(sqlx::query_as::<_, FeeRecord>(&data_sql), filter.values())
        .bind(paging.limit())
        .bind(paging.offset())
        .fetch_all(pool.get_ref())
        .await
        .inspect_err(|e| tracing::error!(error = %e, "Failed to fetch fee records"))?;

    Ok(HttpResponse::Ok().json(FeeListResponse {
        data,
        page: paging.page,
        per_page: paging.per_page,
        total,
    }))
}

#[utoipa::path(
    get,
    path = "/api/fees/{fee_id}",
    params(("fee_id" = u64, Path, description = "Fee record ID")),
    responses(
        (status = 200, description = "Fee record found", body = FeeRecord),
        (status = 404, description = "Fee record not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Fees"
)]
pub async fn get_fee(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> Result<impl Responder, ApiError> {
    auth.require_admin()?;

    match fetch_fee(pool.get_ref(), path.into_inner()).await? {
        Some(fee) => Ok(HttpResponse::Ok().json(fee)),
        None => Err(ApiError::not_found("Fee record")),
    }
}

#[utoipa::path(
    post,
    path = "/api/fees",
    request_body = CreateFee,
    responses(
        (status = 201, description = "Fee record created with status Due", body = FeeRecord),
        (status = 400, description = "Invalid amount or unknown student", body = Object, example = json!({
            "message": "Amount must be greater than 0"
        }))
    ),
    security(("bearer_auth" = [])),
    tag = "Fees"
)]
pub async fn create_fee(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<CreateFee>,
) -> Result<impl Responder, ApiError> {
    auth.require_admin()?;

    let payload = payload.into_inner();
    payload.validate()?;
    ensure_student(pool.get_ref(), payload.student_id).await?;

    let result = sqlx::query(
        "INSERT INTO fee_records (student_id, amount, due_date, status) VALUES (?, ?, ?, ?)",
    )
    .bind(payload.student_id)
    .bind(payload.amount)
    .bind(payload.due_date)
    .bind(FeeStatus::Due.as_ref())
    .execute(pool.get_ref())
    .await?;

    let fee_id = result.last_insert_id();
    info!(fee_id, student_id = payload.student_id, "Fee record created");

    let fee = fetch_fee(pool.get_ref(), fee_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Fee record"))?;
    Ok(HttpResponse::Created().json(fee))
}

#[utoipa::path(
    put,
    path = "/api/fees/{fee_id}",
    params(("fee_id" = u64, Path, description = "Fee record ID")),
    request_body = UpdateFee,
    responses(
        (status = 200, description = "Fee record updated", body = FeeRecord),
        (status = 400, description = "Invalid amount, unknown student or empty update"),
        (status = 404, description = "Fee record not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Fees"
)]
pub async fn update_fee(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    payload: web::Json<UpdateFee>,
) -> Result<impl Responder, ApiError> {
    auth.require_admin()?;

    let fee_id = path.into_inner();
    let payload = payload.into_inner();
    payload.validate()?;

    if let Some(student_id) = payload.student_id {
        ensure_student(pool.get_ref(), student_id).await?;
    }

    let mut update = SqlUpdate::new("fee_records");
    update
        .set_opt("student_id", payload.student_id)
        .set_opt("amount", payload.amount)
        .set_opt("due_date", payload.due_date);
    update.execute(pool.get_ref(), fee_id, "Fee record").await?;

    info!(fee_id, "Fee record updated");
    let fee = fetch_fee(pool.get_ref(), fee_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Fee record"))?;
    Ok(HttpResponse::Ok().json(fee))
}

#[utoipa::path(
    put,
    path = "/api/fees/{fee_id}/pay",
    params(("fee_id" = u64, Path, description = "Fee record ID")),
    responses(
        (status = 200, description = "Fee marked as paid; payment date set to now", body = FeeRecord),
        (status = 404, description = "Fee record not found"),
        (status = 409, description = "Fee record is already Paid")
    ),
    security(("bearer_auth" = [])),
    tag = "Fees"
)]
pub async fn mark_fee_paid(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> Result<impl Responder, ApiError> {
    auth.require_admin()?;

    let fee_id = path.into_inner();
    transition_status(
        pool.get_ref(),
        "fee_records",
        fee_id,
        FeeStatus::Due.as_ref(),
        FeeStatus::Paid.as_ref(),
        Some("payment_date = NOW()"),
        "Fee record",
    )
    .await?;

    info!(fee_id, "Fee marked as paid");
    let fee = fetch_fee(pool.get_ref(), fee_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Fee record"))?;
    Ok(HttpResponse::Ok().json(fee))
}

#[utoipa::path(
    delete,
    path = "/api/fees/{fee_id}",
    params(("fee_id" = u64, Path, description = "Fee record ID")),
    responses(
        (status = 200, description = "Fee record deleted"),
        (status = 404, description = "Fee record not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Fees"
)]
pub async fn delete_fee(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> Result<impl Responder, ApiError> {
    auth.require_admin()?;

    let fee_id = path.into_inner();
    delete_row(pool.get_ref(), "fee_records", fee_id, "Fee record").await?;

    info!(fee_id, "Fee record deleted");
    Ok(HttpResponse::Ok().json(json!({
        "message": "Fee record deleted successfully"
    })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_positive_amount_is_rejected() {
        for amount in [0.0, -150.0] {
            let fee: CreateFee = serde_json::from_value(json!({
                "student_id": 1,
                "amount": amount,
                "due_date": "2026-03-01"
            }))
            .unwrap();
            let err = ApiError::from(fee.validate().unwrap_err());
            assert_eq!(err.to_string(), "Amount must be greater than 0");
        }
    }

    #[test]
    fn missing_due_date_fails_to_deserialize() {
        let parsed = serde_json::from_value::<CreateFee>(json!({
            "student_id": 1,
            "amount": 500.0
        }));
        assert!(parsed.is_err());
    }

    #[test]
    fn partial_update_validates_only_present_fields() {
        let update = UpdateFee {
            due_date: NaiveDate::from_ymd_opt(2026, 4, 1),
            ..Default::default()
        };
        assert!(update.validate().is_ok());

        let update = UpdateFee {
            amount: Some(0.0),
            ..Default::default()
        };
        assert!(update.validate().is_err());
    }
}
