use crate::{
    auth::auth::AuthUser,
    error::ApiError,
    model::{inquiry::Inquiry, status::InquiryStatus},
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

const INQUIRY_COLUMNS: &str =
    "id, name, email, subject, message, status, submission_date, updated_at";

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateInquiry {
    #[schema(example = "Ravi Kumar")]
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,
    #[schema(example = "ravi.kumar@example.com")]
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
    #[schema(example = "Room availability")]
    #[validate(length(min = 1, message = "Subject is required"))]
    pub subject: String,
    #[schema(example = "Are single rooms available from March?")]
    #[validate(length(min = 1, message = "Message is required"))]
    pub message: String,
}

impl Normalize for CreateInquiry {
    fn normalize(&mut self) {
        trim(&mut self.name);
        trim(&mut self.email);
        trim(&mut self.subject);
        trim(&mut self.message);
    }
}

#[derive(Deserialize, IntoParams, ToSchema)]
pub struct InquiryQuery {
    pub status: Option<InquiryStatus>,
    /// Case-insensitive match on name, email, subject or message
    pub search: Option<String>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

#[derive(Serialize, ToSchema)]
pub struct InquiryListResponse {
    pub data: Vec<Inquiry>,
    pub page: u32,
    pub per_page: u32,
    pub total: i64,
}

#[utoipa::path(
    post,
    path = "/public/inquiry",
    request_body = CreateInquiry,
    responses(
        (status = 201, description = "Inquiry received", body = Object, example = json!({
            "message": "Inquiry submitted",
            "id": 9,
            "status": "Unread"
        })),
        (status = 400, description = "Missing field or invalid email")
    ),
    tag = "Public"
)]
pub async fn create_inquiry(
    pool: web::Data<MySqlPool>,
    payload: web::Json<CreateInquiry>,
) -> Result<impl Responder, ApiError> {
    let mut payload = payload.into_inner();
    payload.normalize();
    payload.validate()?;

    let result = sqlx::query(
        "INSERT INTO inquiries (name, email, subject, message, status) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(&payload.name)
    .bind(&payload.email)
    .bind(&payload.subject)
    .bind(&payload.message)
    .bind(InquiryStatus::Unread.as_ref())
    .execute(pool.get_ref())
    .await?;

    let inquiry_id = result.last_insert_id();
    info!(inquiry_id, "Inquiry submitted");

    Ok(HttpResponse::Created().json(json!({
        "message": "Inquiry submitted",
        "id": inquiry_id,
        "status": InquiryStatus::Unread
    })))
}

fn inquiry_page_sql(filter: &WhereClause) -> String {
    format!(
        "SELECT {INQUIRY_COLUMNS} FROM inquiries{} \
         ORDER BY submission_date DESC, id DESC LIMIT ? OFFSET ?",
        filter.sql()
    )
}

#[utoipa::path(
    get,
    path = "/api/inquiries",
    params(InquiryQuery),
    responses(
        (status = 200, description = "Paginated inquiries, newest first", body = InquiryListResponse),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Inquiries"
)]
pub async fn list_inquiries(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<InquiryQuery>,
) -> Result<impl Responder, ApiError> {
    auth.require_admin()?;

    let paging = Pagination::from_query(query.page, query.per_page);

    let mut filter = WhereClause::default();
    if let Some(status) = query.status {
        filter.eq("status", status.as_ref());
    }
    if let Some(term) = query.search.as_deref() {
        filter.search(&["name", "email", "subject", "message"], term);
    }

    let count_sql = format!("SELECT COUNT(*) FROM inquiries{}", filter.sql());
    let total = bind_scalar(sqlx::query_scalar::<_, i64>(&count_sql), filter.values())
        .fetch_one(pool.get_ref())
        .await?;

    let data_sql = inquiry_page_sql(&filter);
    let data = bind_query_as(sqlx::query_as::<_, Inquiry>(&data_sql), filter.values())
        .bind(paging.limit())
        .bind(paging.offset())
        .fetch_all(pool.get_ref())
        .await
        .inspect_err(|e| tracing::error!(error = %e, "Failed to fetch inquiries"))?;

    Ok(HttpResponse::Ok().json(InquiryListResponse {
        data,
        page: paging.page,
        per_page: paging.per_page,
        total,
    }))
}

#[utoipa::path(
    get,
    path = "/api/inquiries/{inquiry_id}",
    params(("inquiry_id" = u64, Path, description = "Inquiry ID")),
    responses(
        (status = 200, description = "Inquiry found", body = Inquiry),
        (status = 404, description = "Inquiry not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Inquiries"
)]
pub async fn get_inquiry(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> Result<impl Responder, ApiError> {
    auth.require_admin()?;

    let inquiry_id = path.into_inner();
    let sql = format!("SELECT {INQUIRY_COLUMNS} FROM inquiries WHERE id = ?");
    let inquiry = sqlx::query_as::<_, Inquiry>(&sql)
        .bind(inquiry_id)
        .fetch_optional(pool.get_ref())
        .await?;

    match inquiry {
        Some(data) => Ok(HttpResponse::Ok().json(data)),
        None => Err(ApiError::not_found("Inquiry")),
    }
}

#[utoipa::path(
    put,
    path = "/api/inquiries/{inquiry_id}/read",
    params(("inquiry_id" = u64, Path, description = "Inquiry ID")),
    responses(
        (status = 200, description = "Inquiry marked as read"),
        (status = 404, description = "Inquiry not found"),
        (status = 409, description = "Inquiry is already Read", body = Object, example = json!({
            "message": "Inquiry is already Read"
        }))
    ),
    security(("bearer_auth" = [])),
    tag = "Inquiries"
)]
pub async fn mark_inquiry_read(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> Result<impl Responder, ApiError> {
    auth.require_admin()?;

    let inquiry_id = path.into_inner();
    transition_status(
        pool.get_ref(),
        "inquiries",
        inquiry_id,
        InquiryStatus::Unread.as_ref(),
        InquiryStatus::Read.as_ref(),
        None,
        "Inquiry",
    )
    .await?;

    info!(inquiry_id, "Inquiry marked as read");
    Ok(HttpResponse::Ok().json(json!({
        "message": "Inquiry marked as read"
    })))
}

#[utoipa::path(
    delete,
    path = "/api/inquiries/{inquiry_id}",
    params(("inquiry_id" = u64, Path, description = "Inquiry ID")),
    responses(
        (status = 200, description = "Inquiry deleted"),
        (status = 404, description = "Inquiry not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Inquiries"
)]
pub async fn delete_inquiry(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> Result<impl Responder, ApiError> {
    auth.require_admin()?;

    let inquiry_id = path.into_inner();
    delete_row(pool.get_ref(), "inquiries", inquiry_id, "Inquiry").await?;

    info!(inquiry_id, "Inquiry deleted");
    Ok(HttpResponse::Ok().json(json!({
        "message": "Inquiry deleted successfully"
    })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::lazy_test_pool;
    use actix_web::{App, http::StatusCode, test as actix_test};

    #[actix_web::test]
    async fn malformed_email_is_rejected() {
        let app = actix_test::init_service(
            App::new()
                .app_data(web::Data::new(lazy_test_pool()))
                .route("/public/inquiry", web::post().to(create_inquiry)),
        )
        .await;

        let req = actix_test::TestRequest::post()
            .uri("/public/inquiry")
            .set_json(json!({
                "name": "Ravi Kumar",
                "email": "ravi.example.com",
                "subject": "Room availability",
                "message": "Any rooms free?"
            }))
            .to_request();
        let resp = actix_test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let body: serde_json::Value = actix_test::read_body_json(resp).await;
        assert_eq!(body["message"], "Invalid email address");
    }

    #[test]
    fn surrounding_whitespace_is_trimmed_before_validation() {
        let mut inquiry = CreateInquiry {
            name: "  Ravi ".into(),
            email: " ravi@example.com ".into(),
            subject: "Fees".into(),
            message: " When is the due date? ".into(),
        };
        inquiry.normalize();
        assert!(inquiry.validate().is_ok());
        assert_eq!(inquiry.email, "ravi@example.com");
        assert_eq!(inquiry.message, "When is the due date?");
    }

    #[test]
    fn unread_filter_orders_newest_first_with_id_tiebreak() {
        let mut filter = WhereClause::default();
        filter.eq("status", InquiryStatus::Unread.as_ref());

        assert_eq!(
            inquiry_page_sql(&filter),
            "SELECT id, name, email, subject, message, status, submission_date, updated_at \
             FROM inquiries WHERE status = ? \
             ORDER BY submission_date DESC, id DESC LIMIT ? OFFSET ?"
        );
    }
}
