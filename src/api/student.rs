use crate::{
    auth::{auth::AuthUser, password::hash_password},
    error::ApiError,
    model::student::{STUDENT_COLUMNS, Student},
    utils::{
        db_utils::{SqlUpdate, WhereClause, bind_query_as, bind_scalar, delete_row},
        pagination::Pagination,
        roll_no_cache, roll_no_filter,
        validation::{Normalize, trim, trim_opt},
    },
};
use actix_web::{HttpResponse, Responder, web};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::MySqlPool;
use tracing::{debug, error, info};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateStudent {
    #[schema(example = "Asha Verma")]
    #[validate(length(min = 2, message = "Name must be at least 2 characters"))]
    pub name: String,
    #[schema(example = "CS-2024-017")]
    #[validate(length(min = 1, message = "Roll number is required"))]
    pub roll_no: String,
    #[schema(example = "B-204")]
    #[validate(length(min = 1, message = "Room number is required"))]
    pub room_no: String,
    #[schema(example = "9876543210")]
    #[validate(length(min = 10, message = "Contact number must be at least 10 digits"))]
    pub contact_number: String,
    #[schema(example = "asha.verma@example.edu", format = "email")]
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
    /// Optional login password; without it the student uses the default password.
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: Option<String>,
}

impl Normalize for CreateStudent {
    fn normalize(&mut self) {
        trim(&mut self.name);
        trim(&mut self.roll_no);
        trim(&mut self.room_no);
        trim(&mut self.contact_number);
        trim(&mut self.email);
    }
}

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateStudent {
    #[validate(length(min = 2, message = "Name must be at least 2 characters"))]
    pub name: Option<String>,
    #[validate(length(min = 1, message = "Roll number is required"))]
    pub roll_no: Option<String>,
    #[validate(length(min = 1, message = "Room number is required"))]
    pub room_no: Option<String>,
    #[validate(length(min = 10, message = "Contact number must be at least 10 digits"))]
    pub contact_number: Option<String>,
    #[validate(email(message = "Invalid email address"))]
    pub email: Option<String>,
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: Option<String>,
}

impl Normalize for UpdateStudent {
    fn normalize(&mut self) {
        trim_opt(&mut self.name);
        trim_opt(&mut self.roll_no);
        trim_opt(&mut self.room_no);
        trim_opt(&mut self.contact_number);
        trim_opt(&mut self.email);
    }
}

#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct StudentQuery {
    /// Pagination page number (start with 1)
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    /// Case-insensitive match on name, roll number or room number
    pub search: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct StudentListResponse {
    pub data: Vec<Student>,
    #[schema(example = 1)]
    pub page: u32,
    #[schema(example = 20)]
    pub per_page: u32,
    #[schema(example = 1)]
    pub total: i64,
}

fn hash(password: &str) -> Result<String, ApiError> {
    hash_password(password).map_err(|e| ApiError::Internal(format!("password hash: {e}")))
}

/// true  => roll number AVAILABLE
/// false => roll number TAKEN
pub async fn is_roll_no_available(roll_no: &str, pool: &MySqlPool) -> Result<bool, ApiError> {
    // cuckoo filter: a miss is definitive
    if !roll_no_filter::might_exist(roll_no) {
        return Ok(true);
    }

    // moka cache: a hit is definitive
    if roll_no_cache::is_taken(roll_no).await {
        return Ok(false);
    }

    let exists = sqlx::query_scalar::<_, i64>(
        "SELECT EXISTS(SELECT 1 FROM students WHERE roll_no = ? LIMIT 1)",
    )
    .bind(roll_no.trim())
    .fetch_one(pool)
    .await?;

    if exists != 0 {
        roll_no_cache::mark_taken(roll_no).await;
    }
    Ok(exists == 0)
}

async fn fetch_student(pool: &MySqlPool, student_id: u64) -> Result<Option<Student>, ApiError> {
    let sql = format!("SELECT {STUDENT_COLUMNS} FROM students WHERE id = ?");
    let student = sqlx::query_as::<_, Student>(&sql)
        .bind(student_id)
        .fetch_optional(pool)
        .await
        .inspect_err(|e| error!(error = %e, student_id, "Failed to fetch student"))?;
    Ok(student)
}

/// Create Student
#[utoipa::path(
    post,
    path = "/api/students",
    request_body = CreateStudent,
    responses(
        (status = 201, description = "Student created", body = Student),
        (status = 400, description = "Validation failed", body = Object, example = json!({
            "message": "Invalid email address"
        })),
        (status = 409, description = "Roll number already exists")
    ),
    security(("bearer_auth" = [])),
    tag = "Students"
)]
pub async fn create_student(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<CreateStudent>,
) -> Result<impl Responder, ApiError> {
    auth.require_admin()?;

    let mut payload = payload.into_inner();
    payload.normalize();
    payload.validate()?;

    if !is_roll_no_available(&payload.roll_no, pool.get_ref()).await? {
        return Err(ApiError::Conflict("Roll number already exists".into()));
    }

    let password_hash = payload.password.as_deref().map(hash).transpose()?;

    let result = sqlx::query(
        r#"
        INSERT INTO students (name, roll_no, room_no, contact_number, email, password_hash)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&payload.name)
    .bind(&payload.roll_no)
    .bind(&payload.room_no)
    .bind(&payload.contact_number)
    .bind(&payload.email)
    .bind(password_hash)
    .execute(pool.get_ref())
    .await?;

    roll_no_filter::insert(&payload.roll_no);
    roll_no_cache::mark_taken(&payload.roll_no).await;

    let student_id = result.last_insert_id();
    info!(student_id, "Student created");

    let student = fetch_student(pool.get_ref(), student_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Student"))?;
    Ok(HttpResponse::Created().json(student))
}

/// List Students
#[utoipa::path(
    get,
    path = "/api/students",
    params(StudentQuery),
    responses(
        (status = 200, description = "Paginated student list, ordered by name", body = StudentListResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Students"
)]
pub async fn list_students(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<StudentQuery>,
) -> Result<impl Responder, ApiError> {
    auth.require_admin()?;

    let paging = Pagination::from_query(query.page, query.per_page);

    let mut filter = WhereClause::default();
    if let Some(term) = query.search.as_deref() {
        filter.search(&["name", "roll_no", "room_no"], term);
    }

    let count_sql = format!("SELECT COUNT(*) FROM students{}", filter.sql());
    let total = bind_scalar(sqlx::query_scalar::<_, i64>(&count_sql), filter.values())
        .fetch_one(pool.get_ref())
        .await?;

    let data_sql = format!(
        "SELECT {STUDENT_COLUMNS} FROM students{} ORDER BY name ASC LIMIT ? OFFSET ?",
        filter.sql()
    );
    debug!(sql = %data_sql, "Fetching students");

    let data = bind_query_as(sqlx::query_as::<_, Student>(&data_sql), filter.values())
        .bind(paging.limit())
        .bind(paging.offset())
        .fetch_all(pool.get_ref())
        .await?;

    Ok(HttpResponse::Ok().json(StudentListResponse {
        data,
        page: paging.page,
        per_page: paging.per_page,
        total,
    }))
}

/// Get Student by ID
#[utoipa::path(
    get,
    path = "/api/students/{student_id}",
    params(("student_id" = u64, Path, description = "Student ID")),
    responses(
        (status = 200, description = "Student found", body = Student),
        (status = 404, description = "Student not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Students"
)]
pub async fn get_student(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> Result<impl Responder, ApiError> {
    auth.require_admin()?;

    match fetch_student(pool.get_ref(), path.into_inner()).await? {
        Some(student) => Ok(HttpResponse::Ok().json(student)),
        None => Err(ApiError::not_found("Student")),
    }
}

/// Update Student
#[utoipa::path(
    put,
    path = "/api/students/{student_id}",
    params(("student_id" = u64, Path, description = "Student ID")),
    request_body = UpdateStudent,
    responses(
        (status = 200, description = "Student updated", body = Student),
        (status = 400, description = "Validation failed or empty update"),
        (status = 404, description = "Student not found"),
        (status = 409, description = "Roll number already exists")
    ),
    security(("bearer_auth" = [])),
    tag = "Students"
)]
pub async fn update_student(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    payload: web::Json<UpdateStudent>,
) -> Result<impl Responder, ApiError> {
    auth.require_admin()?;

    let student_id = path.into_inner();
    let mut payload = payload.into_inner();
    payload.normalize();
    payload.validate()?;

    // needed to keep the roll number filter in sync on a rename
    let previous_roll_no = match &payload.roll_no {
        Some(_) => fetch_student(pool.get_ref(), student_id)
            .await?
            .map(|s| s.roll_no),
        None => None,
    };

    let mut update = SqlUpdate::new("students");
    update
        .set_opt("name", payload.name)
        .set_opt("roll_no", payload.roll_no.clone())
        .set_opt("room_no", payload.room_no)
        .set_opt("contact_number", payload.contact_number)
        .set_opt("email", payload.email)
        .set_opt(
            "password_hash",
            payload.password.as_deref().map(hash).transpose()?,
        );
    update.execute(pool.get_ref(), student_id, "Student").await?;

    if let (Some(old), Some(new)) = (previous_roll_no, payload.roll_no) {
        if roll_no_filter::normalize(&old) != roll_no_filter::normalize(&new) {
            roll_no_filter::remove(&old);
            roll_no_cache::release(&old).await;
            roll_no_filter::insert(&new);
            roll_no_cache::mark_taken(&new).await;
        }
    }

    info!(student_id, "Student updated");
    let student = fetch_student(pool.get_ref(), student_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Student"))?;
    Ok(HttpResponse::Ok().json(student))
}

/// Delete Student
#[utoipa::path(
    delete,
    path = "/api/students/{student_id}",
    params(("student_id" = u64, Path, description = "Student ID")),
    responses(
        (status = 200, description = "Student deleted", body = Object, example = json!({
            "message": "Student deleted successfully"
        })),
        (status = 404, description = "Student not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Students"
)]
pub async fn delete_student(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> Result<impl Responder, ApiError> {
    auth.require_admin()?;

    let student_id = path.into_inner();
    let student = fetch_student(pool.get_ref(), student_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Student"))?;

    delete_row(pool.get_ref(), "students", student_id, "Student").await?;

    roll_no_filter::remove(&student.roll_no);
    roll_no_cache::release(&student.roll_no).await;

    info!(student_id, "Student deleted");
    Ok(HttpResponse::Ok().json(json!({
        "message": "Student deleted successfully"
    })))
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

    fn valid() -> CreateStudent {
        CreateStudent {
            name: "Asha Verma".into(),
            roll_no: "CS-2024-017".into(),
            room_no: "B-204".into(),
            contact_number: "9876543210".into(),
            email: "asha@example.edu".into(),
            password: None,
        }
    }

    #[test]
    fn valid_student_passes() {
        assert!(valid().validate().is_ok());
    }

    #[test]
    fn short_contact_number_is_rejected() {
        let student = CreateStudent {
            contact_number: "12345".into(),
            ..valid()
        };
        let err = ApiError::from(student.validate().unwrap_err());
        assert_eq!(err.to_string(), "Contact number must be at least 10 digits");
    }

    #[test]
    fn blank_roll_number_fails_after_normalize() {
        let mut student = CreateStudent {
            roll_no: "   ".into(),
            ..valid()
        };
        student.normalize();
        let err = ApiError::from(student.validate().unwrap_err());
        assert_eq!(err.to_string(), "Roll number is required");
    }

    #[test]
    fn partial_update_validates_present_fields_only() {
        let update = UpdateStudent {
            room_no: Some("C-101".into()),
            ..Default::default()
        };
        assert!(update.validate().is_ok());

        let update = UpdateStudent {
            email: Some("nope".into()),
            ..Default::default()
        };
        assert!(update.validate().is_err());
    }

    #[actix_web::test]
    async fn students_are_admin_only() {
        let config = test_config();
        let subject = TokenSubject {
            user_id: 5,
            login: "CS-2024-017".into(),
            name: "Asha Verma".into(),
            role: Role::Student,
        };
        let token = generate_access_token(&subject, &config.jwt_secret, 60).unwrap();

        let app = actix_test::init_service(
            App::new()
                .app_data(web::Data::new(lazy_test_pool()))
                .app_data(web::Data::new(config))
                .route("/api/students", web::get().to(list_students)),
        )
        .await;

        let req = actix_test::TestRequest::get()
            .uri("/api/students")
            .insert_header(("Authorization", format!("Bearer {token}")))
            .to_request();
        let resp = actix_test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    }
}
