use crate::{
    auth::auth::AuthUser,
    error::ApiError,
    model::{complaint::Complaint, status::ComplaintStatus},
    utils::{
        db_utils::{WhereClause, bind_query_as, bind_scalar, delete_row, transition_status},
        pagination::Pagination,
        validation::{Normalize, trim},
    },
};
use actix_web::{HttpResponse, Responder, web};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::MySqlPool;
use tracing::info;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

const COMPLAINT_COLUMNS: &str =
    "id, student_name, roll_no, room_no, description, status, submission_date, updated_at";

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateComplaint {
    #[schema(example = "Asha Verma")]
    #[validate(length(min = 1, message = "Student name is required"))]
    pub student_name: String,
    #[schema(example = "CS-2024-017")]
    #[validate(length(min = 1, message = "Roll number is required"))]
    pub roll_no: String,
    #[schema(example = "B-204")]
    #[validate(length(min = 1, message = "Room number is required"))]
    pub room_no: String,
    #[schema(example = "Ceiling fan not working")]
    #[validate(length(min = 1, message = "Description is required"))]
    pub description: String,
}

impl Normalize for CreateComplaint {
    fn normalize(&mut self) {
        trim(&mut self.student_name);
        trim(&mut self.roll_no);
        trim(&mut self.room_no);
        trim(&mut self.description);
    }
}

#[derive(Deserialize, IntoParams, ToSchema)]
pub struct ComplaintQuery {
    pub status: Option<ComplaintStatus>,
    /// Case-insensitive match on student name, roll number, room number or description
    pub search: Option<String>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

#[derive(Serialize, ToSchema)]
pub struct ComplaintListResponse {
    pub data: Vec<Complaint>,
    pub page: u32,
    pub per_page: u32,
    pub total: i64,
}

#[utoipa::path(
    post,
    path = "/public/complaint",
    request_body = CreateComplaint,
    responses(
        (status = 201, description = "Complaint submitted", body = Object, example = json!({
            "message": "Complaint submitted",
            "id": 4,
            "status": "Pending"
        })),
        (status = 400, description = "Missing field")
    ),
    tag = "Public"
)]
pub async fn create_complaint(
    pool: web::Data<MySqlPool>,
    payload: web::Json<CreateComplaint>,
) -> Result<impl Responder, ApiError> {
    let mut payload = payload.into_inner();
    payload.normalize();
    payload.validate()?;

    let result = sqlx::query(
        r#"
        INSERT INTO complaints (student_name, roll_no, room_no, description, status)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(&payload.student_name)
    .bind(&payload.roll_no)
    .bind(&payload.room_no)
    .bind(&payload.description)
    .bind(ComplaintStatus::Pending.as_ref())
    .execute(pool.get_ref())
    .await?;

    let complaint_id = result.last_insert_id();
    info!(complaint_id, roll_no = %payload.roll_no, "Complaint submitted");

    Ok(HttpResponse::Created().json(json!({
        "message": "Complaint submitted",
        "id": complaint_id,
        "status": ComplaintStatus::Pending
    })))
}

#[utoipa::path(
    get,
    path = "/api/complaints",
    params(ComplaintQuery),
    responses(
        (status = 200, description = "Paginated complaints, newest first", body = ComplaintListResponse),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Complaints"
)]
pub async fn list_complaints(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<ComplaintQuery>,
) -> Result<impl Responder, ApiError> {
    auth.require_admin()?;

    let filter = complaint_filter(&query, None);
    let paging = Pagination::from_query(query.page, query.per_page);
    Ok(HttpResponse::Ok().json(fetch_complaint_page(pool.get_ref(), &filter, paging).await?))
}

#[utoipa::path(
    get,
    path = "/api/student/complaints",
    params(ComplaintQuery),
    responses(
        (status = 200, description = "Own complaints, newest first", body = ComplaintListResponse),
        (status = 403, description = "Not a student session")
    ),
    security(("bearer_auth" = [])),
    tag = "Student"
)]
pub async fn my_complaints(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<ComplaintQuery>,
) -> Result<impl Responder, ApiError> {
    auth.require_student()?;

    let filter = complaint_filter(&query, Some(auth.login.as_str()));
    let paging = Pagination::from_query(query.page, query.per_page);
    Ok(HttpResponse::Ok().json(fetch_complaint_page(pool.get_ref(), &filter, paging).await?))
}

fn complaint_filter(query: &ComplaintQuery, roll_no: Option<&str>) -> WhereClause {
    let mut filter = WhereClause::default();
    if let Some(roll_no) = roll_no {
        filter.eq("roll_no", roll_no);
    }
    if let Some(status) = query.status {
        filter.eq("status", status.as_ref());
    }
    if let Some(term) = query.search.as_deref() {
        filter.search(&["student_name", "roll_no", "room_no", "description"], term);
    }
    filter
}

fn complaint_page_sql(filter: &WhereClause) -> String {
    format!(
        "SELECT {COMPLAINT_COLUMNS} FROM complaints{} \
         ORDER BY submission_date DESC, id DESC LIMIT ? OFFSET ?",
        filter.sql()
    )
}

async fn fetch_complaint_page(
    pool: &MySqlPool,
    filter: &WhereClause,
    paging: Pagination,
) -> Result<ComplaintListResponse, ApiError> {
    let count_sql = format!("SELECT COUNT(*) FROM complaints{}", filter.sql());
    let total = bind_scalar(sqlx::query_scalar::<_, i64>(&count_sql), filter.values())
        .fetch_one(pool)
        .await?;

    let data_sql = complaint_page_sql(filter);
    let data = bind_query_as(sqlx::query_as::<_, Complaint>(&data_sql), filter.values())
        .bind(paging.limit())
        .bind(paging.offset())
        .fetch_all(pool)
        .await
        .inspect_err(|e| tracing::error!(error = %e, "Failed to fetch complaints"))?;

    Ok(ComplaintListResponse {
        data,
        page: paging.page,
        per_page: paging.per_page,
        total,
    })
}

#[utoipa::path(
    get,
    path = "/api/complaints/{complaint_id}",
    params(("complaint_id" = u64, Path, description = "Complaint ID")),
    responses(
        (status = 200, description = "Complaint found", body = Complaint),
        (status = 404, description = "Complaint not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Complaints"
)]
pub async fn get_complaint(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> Result<impl Responder, ApiError> {
    auth.require_admin()?;

    let complaint_id = path.into_inner();
    let sql = format!("SELECT {COMPLAINT_COLUMNS} FROM complaints WHERE id = ?");
    let complaint = sqlx::query_as::<_, Complaint>(&sql)
        .bind(complaint_id)
        .fetch_optional(pool.get_ref())
        .await
        .inspect_err(|e| tracing::error!(error = %e, complaint_id, "Failed to fetch complaint"))?;

    complaint
        .map(|c| HttpResponse::Ok().json(c))
        .ok_or_else(|| ApiError::not_found("Complaint"))
}

#[utoipa::path(
    put,
    path = "/api/complaints/{complaint_id}/resolve",
    params(("complaint_id" = u64, Path, description = "Complaint ID")),
    responses(
        (status = 200, description = "Complaint resolved", body = Object, example = json!({
            "message": "Complaint resolved successfully"
        })),
        (status = 404, description = "Complaint not found"),
        (status = 409, description = "Complaint is already Resolved")
    ),
    security(("bearer_auth" = [])),
    tag = "Complaints"
)]
pub async fn resolve_complaint(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> Result<impl Responder, ApiError> {
    auth.require_admin()?;

    let complaint_id = path.into_inner();
    transition_status(
        pool.get_ref(),
        "complaints",
        complaint_id,
        ComplaintStatus::Pending.as_ref(),
        ComplaintStatus::Resolved.as_ref(),
        None,
        "Complaint",
    )
    .await?;

    info!(complaint_id, "Complaint resolved");
    Ok(HttpResponse::Ok().json(json!({
        "message": "Complaint resolved successfully"
    })))
}

#[utoipa::path(
    delete,
    path = "/api/complaints/{complaint_id}",
    params(("complaint_id" = u64, Path, description = "Complaint ID")),
    responses(
        (status = 200, description = "Complaint deleted"),
        (status = 404, description = "Complaint not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Complaints"
)]
pub async fn delete_complaint(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> Result<impl Responder, ApiError> {
    auth.require_admin()?;

    let complaint_id = path.into_inner();
    delete_row(pool.get_ref(), "complaints", complaint_id, "Complaint").await?;

    info!(complaint_id, "Complaint deleted");
    Ok(HttpResponse::Ok().json(json!({
        "message": "Complaint deleted successfully"
    })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::lazy_test_pool;
    use actix_web::{App, http::StatusCode, test as actix_test};

    #[actix_web::test]
    async fn missing_description_is_rejected() {
        let app = actix_test::init_service(
            App::new()
                .app_data(web::Data::new(lazy_test_pool()))
                .route("/public/complaint", web::post().to(create_complaint)),
        )
        .await;

        let req = actix_test::TestRequest::post()
            .uri("/public/complaint")
            .set_json(json!({
                "student_name": "Asha Verma",
                "roll_no": "CS-2024-017",
                "room_no": "B-204",
                "description": ""
            }))
            .to_request();
        let resp = actix_test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let body: serde_json::Value = actix_test::read_body_json(resp).await;
        assert_eq!(body["message"], "Description is required");
    }

    #[test]
    fn status_filter_parses_from_query() {
        let q: ComplaintQuery = serde_json::from_value(json!({ "status": "Resolved" })).unwrap();
        assert_eq!(q.status, Some(ComplaintStatus::Resolved));
        assert!(q.page.is_none());
    }

    #[test]
    fn own_complaints_are_searchable() {
        let q: ComplaintQuery = serde_json::from_value(json!({ "search": "fan" })).unwrap();
        let filter = complaint_filter(&q, Some("CS-2024-017"));

        assert!(filter.sql().starts_with(" WHERE roll_no = ? AND (LOWER(student_name) LIKE ?"));
        assert!(filter.sql().contains("LOWER(description) LIKE ?"));
        assert_eq!(filter.values().len(), 5);

        let sql = complaint_page_sql(&filter);
        assert!(sql.contains("ORDER BY submission_date DESC, id DESC"));
    }
}
