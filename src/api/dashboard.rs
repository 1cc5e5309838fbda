use crate::{
    auth::auth::AuthUser,
    error::ApiError,
    model::status::{ComplaintStatus, FeeStatus, InquiryStatus, LeaveStatus, RoomStatus},
};
use actix_web::{HttpResponse, Responder, web};
use serde::Serialize;
use sqlx::MySqlPool;
use utoipa::ToSchema;

/// Headline counts for the admin dashboard.
#[derive(Debug, Serialize, sqlx::FromRow, ToSchema)]
#[schema(
    example = json!({
        "total_students": 120,
        "total_rooms": 64,
        "available_rooms": 9,
        "pending_leaves": 4,
        "pending_complaints": 2,
        "unread_inquiries": 7,
        "due_fees": 31
    })
)]
pub struct DashboardStats {
    pub total_students: i64,
    pub total_rooms: i64,
    pub available_rooms: i64,
    pub pending_leaves: i64,
    pub pending_complaints: i64,
    pub unread_inquiries: i64,
    pub due_fees: i64,
}

const DASHBOARD_SQL: &str = r#"
    SELECT
        (SELECT COUNT(*) FROM students)                        AS total_students,
        (SELECT COUNT(*) FROM rooms)                           AS total_rooms,
        (SELECT COUNT(*) FROM rooms WHERE status = ?)          AS available_rooms,
        (SELECT COUNT(*) FROM leave_requests WHERE status = ?) AS pending_leaves,
        (SELECT COUNT(*) FROM complaints WHERE status = ?)     AS pending_complaints,
        (SELECT COUNT(*) FROM inquiries WHERE status = ?)      AS unread_inquiries,
        (SELECT COUNT(*) FROM fee_records WHERE status = ?)    AS due_fees
"#;

#[utoipa::path(
    get,
    path = "/api/dashboard",
    responses(
        (status = 200, description = "Dashboard counts", body = DashboardStats),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Dashboard"
)]
pub async fn dashboard(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
) -> Result<impl Responder, ApiError> {
    auth.require_admin()?;

    let stats = sqlx::query_as::<_, DashboardStats>(DASHBOARD_SQL)
        .bind(RoomStatus::Available.as_ref())
        .bind(LeaveStatus::Pending.as_ref())
        .bind(ComplaintStatus::Pending.as_ref())
        .bind(InquiryStatus::Unread.as_ref())
        .bind(FeeStatus::Due.as_ref())
        .fetch_one(pool.get_ref())
        .await
        .inspect_err(|e| tracing::error!(error = %e, "Failed to load dashboard counts"))?;

    Ok(HttpResponse::Ok().json(stats))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        auth::jwt::{TokenSubject, generate_access_token},
        config::tests::test_config,
        db::lazy_test_pool,
        model::role::Role,
    };
    use actix_web::{App, http::StatusCode, test as actix_test};

    #[actix_web::test]
    async fn dashboard_requires_an_admin_session() {
        let config = test_config();
        let student = TokenSubject {
            user_id: 5,
            login: "CS-2024-017".into(),
            name: "Asha Verma".into(),
            role: Role::Student,
        };
        let token = generate_access_token(&student, &config.jwt_secret, 60).unwrap();

        let app = actix_test::init_service(
            App::new()
                .app_data(web::Data::new(lazy_test_pool()))
                .app_data(web::Data::new(config))
                .route("/api/dashboard", web::get().to(dashboard)),
        )
        .await;

        let req = actix_test::TestRequest::get().uri("/api/dashboard").to_request();
        let resp = actix_test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

        let req = actix_test::TestRequest::get()
            .uri("/api/dashboard")
            .insert_header(("Authorization", format!("Bearer {token}")))
            .to_request();
        let resp = actix_test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    }
}
