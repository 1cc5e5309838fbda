use crate::{
    auth::auth::AuthUser,
    error::ApiError,
    model::{leave_request::LeaveRequest, status::LeaveStatus},
    utils::{
        db_utils::{WhereClause, bind_query_as, bind_scalar, delete_row, transition_status},
        pagination::Pagination,
        validation::{Normalize, error_with, trim},
    },
};
use actix_web::{HttpResponse, Responder, web};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::MySqlPool;
use tracing::info;
use utoipa::{IntoParams, ToSchema};
use validator::{Validate, ValidationError};

const LEAVE_COLUMNS: &str = "id, student_name, roll_no, room_no, reason, start_date, end_date, \
     status, submission_date, updated_at";

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[validate(schema(function = "validate_leave_dates"))]
pub struct CreateLeave {
    #[schema(example = "Asha Verma")]
    #[validate(length(min = 1, message = "Student name is required"))]
    pub student_name: String,
    #[schema(example = "CS-2024-017")]
    #[validate(length(min = 1, message = "Roll number is required"))]
    pub roll_no: String,
    #[schema(example = "B-204")]
    #[validate(length(min = 1, message = "Room number is required"))]
    pub room_no: String,
    #[schema(example = "Family function")]
    #[validate(length(min = 1, message = "Reason is required"))]
    pub reason: String,
    #[schema(example = "2026-02-10", format = "date", value_type = String)]
    pub start_date: NaiveDate,
    #[schema(example = "2026-02-12", format = "date", value_type = String)]
    pub end_date: NaiveDate,
}

impl Normalize for CreateLeave {
    fn normalize(&mut self) {
        trim(&mut self.student_name);
        trim(&mut self.roll_no);
        trim(&mut self.room_no);
        trim(&mut self.reason);
    }
}

fn validate_leave_dates(leave: &CreateLeave) -> Result<(), ValidationError> {
    if leave.start_date > leave.end_date {
        return Err(error_with(
            "date_range",
            "start_date cannot be after end_date",
        ));
    }
    Ok(())
}

#[derive(Deserialize, IntoParams, ToSchema)]
pub struct LeaveFilter {
    /// Filter by leave status
    pub status: Option<LeaveStatus>,
    /// Case-insensitive match on student name, roll number or room number
    pub search: Option<String>,
    /// Pagination page number (start with 1)
    pub page: Option<u32>,
    /// Pagination per page number
    pub per_page: Option<u32>,
}

#[derive(Serialize, ToSchema)]
pub struct LeaveListResponse {
    pub data: Vec<LeaveRequest>,
    #[schema(example = 1)]
    pub page: u32,
    #[schema(example = 20)]
    pub per_page: u32,
    #[schema(example = 1)]
    pub total: i64,
}

/* =========================
Submit leave request (public form)
========================= */
#[utoipa::path(
    post,
    path = "/public/leave",
    request_body(
        content = CreateLeave,
        description = "Leave request payload",
        content_type = "application/json"
    ),
    responses(
        (status = 201, description = "Leave request submitted",
         body = Object,
         example = json!({
            "message": "Leave request submitted",
            "id": 12,
            "status": "Pending"
         })
        ),
        (status = 400, description = "Missing field or start date after end date")
    ),
    tag = "Public"
)]
pub async fn create_leave(
    pool: web::Data<MySqlPool>,
    payload: web::Json<CreateLeave>,
) -> Result<impl Responder, ApiError> {
    let mut payload = payload.into_inner();
    payload.normalize();
    payload.validate()?;

    let result = sqlx::query(
        r#"
        INSERT INTO leave_requests
            (student_name, roll_no, room_no, reason, start_date, end_date, status)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&payload.student_name)
    .bind(&payload.roll_no)
    .bind(&payload.room_no)
    .bind(&payload.reason)
    .bind(payload.start_date)
    .bind(payload.end_date)
    .bind(LeaveStatus::Pending.as_ref())
    .execute(pool.get_ref())
    .await?;

    let leave_id = result.last_insert_id();
    info!(leave_id, roll_no = %payload.roll_no, "Leave request submitted");

    Ok(HttpResponse::Created().json(json!({
        "message": "Leave request submitted",
        "id": leave_id,
        "status": LeaveStatus::Pending
    })))
}

async fn set_leave_status(
    pool: &MySqlPool,
    leave_id: u64,
    to: LeaveStatus,
) -> Result<(), ApiError> {
    transition_status(
        pool,
        "leave_requests",
        leave_id,
        LeaveStatus::Pending.as_ref(),
        to.as_ref(),
        None,
        "Leave request",
    )
    .await
}

/* =========================
Approve leave (Admin)
========================= */
#[utoipa::path(
    put,
    path = "/api/leave/{leave_id}/approve",
    params(
        ("leave_id" = u64, Path, description = "ID of the leave request to approve")
    ),
    responses(
        (status = 200, description = "Leave approved successfully", body = Object, example = json!({
            "message": "Leave request approved successfully"
        })),
        (status = 404, description = "Leave request not found"),
        (status = 409, description = "Leave request already processed", body = Object, example = json!({
            "message": "Leave request is already Rejected"
        })),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn approve_leave(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> Result<impl Responder, ApiError> {
    auth.require_admin()?;

    let leave_id = path.into_inner();
    set_leave_status(pool.get_ref(), leave_id, LeaveStatus::Approved).await?;

    info!(leave_id, "Leave request approved");
    Ok(HttpResponse::Ok().json(json!({
        "message": "Leave request approved successfully"
    })))
}

/* =========================
Reject leave (Admin)
========================= */
#[utoipa::path(
    put,
    path = "/api/leave/{leave_id}/reject",
    params(
        ("leave_id" = u64, Path, description = "ID of the leave request to reject")
    ),
    responses(
        (status = 200, description = "Leave rejected successfully", body = Object, example = json!({
            "message": "Leave request rejected successfully"
        })),
        (status = 404, description = "Leave request not found"),
        (status = 409, description = "Leave request already processed"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn reject_leave(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> Result<impl Responder, ApiError> {
    auth.require_admin()?;

    let leave_id = path.into_inner();
    set_leave_status(pool.get_ref(), leave_id, LeaveStatus::Rejected).await?;

    info!(leave_id, "Leave request rejected");
    Ok(HttpResponse::Ok().json(json!({
        "message": "Leave request rejected successfully"
    })))
}

/// for getting a leave application details endpoint
#[utoipa::path(
    get,
    path = "/api/leave/{leave_id}",
    params(
        ("leave_id" = u64, Path, description = "ID of the leave request to fetch")
    ),
    responses(
        (status = 200, description = "Leave request found", body = LeaveRequest),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Leave request not found", body = Object, example = json!({
            "message": "Leave request not found"
        }))
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn get_leave(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> Result<impl Responder, ApiError> {
    auth.require_admin()?;

    let leave_id = path.into_inner();
    let sql = format!("SELECT {LEAVE_COLUMNS} FROM leave_requests WHERE id = ?");

    let leave = sqlx::query_as::<_, LeaveRequest>(&sql)
        .bind(leave_id)
        .fetch_optional(pool.get_ref())
        .await
        .inspect_err(|e| tracing::error!(error = %e, leave_id, "Failed to fetch leave request"))?;

    match leave {
        Some(data) => Ok(HttpResponse::Ok().json(data)),
        None => Err(ApiError::not_found("Leave request")),
    }
}

/// for getting leave applications endpoint
#[utoipa::path(
    get,
    path = "/api/leave",
    params(LeaveFilter),
    responses(
        (status = 200, description = "Paginated leave list, newest first", body = LeaveListResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn leave_list(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<LeaveFilter>,
) -> Result<impl Responder, ApiError> {
    auth.require_admin()?;

    let filter = leave_filter(&query, None);
    let paging = Pagination::from_query(query.page, query.per_page);
    let response = fetch_leave_page(pool.get_ref(), &filter, paging).await?;
    Ok(HttpResponse::Ok().json(response))
}

/// The logged-in student's own leave requests, matched by roll number.
#[utoipa::path(
    get,
    path = "/api/student/leave",
    params(LeaveFilter),
    responses(
        (status = 200, description = "Own leave requests, newest first", body = LeaveListResponse),
        (status = 403, description = "Not a student session")
    ),
    security(("bearer_auth" = [])),
    tag = "Student"
)]
pub async fn my_leave_list(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<LeaveFilter>,
) -> Result<impl Responder, ApiError> {
    auth.require_student()?;

    let filter = leave_filter(&query, Some(auth.login.as_str()));
    let paging = Pagination::from_query(query.page, query.per_page);
    let response = fetch_leave_page(pool.get_ref(), &filter, paging).await?;
    Ok(HttpResponse::Ok().json(response))
}

/// `roll_no` narrows the list to one student's requests.
fn leave_filter(query: &LeaveFilter, roll_no: Option<&str>) -> WhereClause {
    let mut filter = WhereClause::default();
    if let Some(roll_no) = roll_no {
        filter.eq("roll_no", roll_no);
    }
    if let Some(status) = query.status {
        filter.eq("status", status.as_ref());
    }
    if let Some(term) = query.search.as_deref() {
        filter.search(&["student_name", "roll_no", "room_no"], term);
    }
    filter
}

/// Newest first; `id` breaks ties within the same second.
fn leave_page_sql(filter: &WhereClause) -> String {
    format!(
        "SELECT {LEAVE_COLUMNS} FROM leave_requests{} \
         ORDER BY submission_date DESC, id DESC LIMIT ? OFFSET ?",
        filter.sql()
    )
}

async fn fetch_leave_page(
    pool: &MySqlPool,
    filter: &WhereClause,
    paging: Pagination,
) -> Result<LeaveListResponse, ApiError> {
    let count_sql = format!("SELECT COUNT(*) FROM leave_requests{}", filter.sql());
    let total = bind_scalar(sqlx::query_scalar::<_, i64>(&count_sql), filter.values())
        .fetch_one(pool)
        .await
        .inspect_err(|e| tracing::error!(error = %e, "Failed to count leave requests"))?;

    let data_sql = leave_page_sql(filter);
    let data = bind_query_as(sqlx::query_as::<_, LeaveRequest>(&data_sql), filter.values())
        .bind(paging.limit())
        .bind(paging.offset())
        .fetch_all(pool)
        .await
        .inspect_err(|e| tracing::error!(error = %e, "Failed to fetch leave list"))?;

    Ok(LeaveListResponse {
        data,
        page: paging.page,
        per_page: paging.per_page,
        total,
    })
}

#[utoipa::path(
    delete,
    path = "/api/leave/{leave_id}",
    params(("leave_id" = u64, Path, description = "ID of the leave request to delete")),
    responses(
        (status = 200, description = "Leave request deleted"),
        (status = 404, description = "Leave request not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn delete_leave(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> Result<impl Responder, ApiError> {
    auth.require_admin()?;

    let leave_id = path.into_inner();
    delete_row(pool.get_ref(), "leave_requests", leave_id, "Leave request").await?;

    info!(leave_id, "Leave request deleted");
    Ok(HttpResponse::Ok().json(json!({
        "message": "Leave request deleted successfully"
    })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::lazy_test_pool;
    use actix_web::{App, http::StatusCode, test as actix_test};

    fn form(start: &str, end: &str) -> serde_json::Value {
        json!({
            "student_name": "Asha Verma",
            "roll_no": "CS-2024-017",
            "room_no": "B-204",
            "reason": "Family function",
            "start_date": start,
            "end_date": end
        })
    }

    #[test]
    fn same_day_leave_is_valid() {
        let leave: CreateLeave = serde_json::from_value(form("2026-02-10", "2026-02-10")).unwrap();
        assert!(leave.validate().is_ok());
    }

    #[actix_web::test]
    async fn reversed_dates_are_rejected() {
        let app = actix_test::init_service(
            App::new()
                .app_data(web::Data::new(lazy_test_pool()))
                .route("/public/leave", web::post().to(create_leave)),
        )
        .await;

        let req = actix_test::TestRequest::post()
            .uri("/public/leave")
            .set_json(form("2026-02-12", "2026-02-10"))
            .to_request();
        let resp = actix_test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let body: serde_json::Value = actix_test::read_body_json(resp).await;
        assert_eq!(body["message"], "start_date cannot be after end_date");
    }

    #[actix_web::test]
    async fn blank_reason_is_rejected() {
        let app = actix_test::init_service(
            App::new()
                .app_data(web::Data::new(lazy_test_pool()))
                .route("/public/leave", web::post().to(create_leave)),
        )
        .await;

        let mut body = form("2026-02-10", "2026-02-11");
        body["reason"] = json!("   ");
        let req = actix_test::TestRequest::post()
            .uri("/public/leave")
            .set_json(body)
            .to_request();
        let resp = actix_test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn missing_field_renders_json_message() {
        let app = actix_test::init_service(
            App::new()
                .app_data(web::Data::new(lazy_test_pool()))
                .configure(crate::error::extractor_configs)
                .route("/public/leave", web::post().to(create_leave)),
        )
        .await;

        let mut body = form("2026-02-10", "2026-02-11");
        body.as_object_mut().unwrap().remove("start_date");
        let req = actix_test::TestRequest::post()
            .uri("/public/leave")
            .set_json(body)
            .to_request();
        let resp = actix_test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let body: serde_json::Value = actix_test::read_body_json(resp).await;
        let message = body["message"].as_str().unwrap();
        assert!(message.contains("missing field `start_date`"), "{message}");
    }

    #[test]
    fn own_list_keeps_search_and_student_scope() {
        let query = LeaveFilter {
            status: Some(LeaveStatus::Pending),
            search: Some("B-2".into()),
            page: None,
            per_page: None,
        };
        let filter = leave_filter(&query, Some("CS-2024-017"));

        assert_eq!(
            filter.sql(),
            " WHERE roll_no = ? AND status = ? AND \
             (LOWER(student_name) LIKE ? OR LOWER(roll_no) LIKE ? OR LOWER(room_no) LIKE ?)"
        );
        assert_eq!(filter.values().len(), 5);
    }

    #[test]
    fn page_order_is_stable_within_a_second() {
        let sql = leave_page_sql(&WhereClause::default());
        assert!(sql.contains("ORDER BY submission_date DESC, id DESC LIMIT ? OFFSET ?"));
    }
}
