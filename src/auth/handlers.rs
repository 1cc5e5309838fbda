use crate::{
    auth::{
        auth::{AuthUser, bearer_token},
        jwt::{TokenSubject, generate_access_token, generate_refresh_token, verify_token},
        password::verify_password,
    },
    config::Config,
    error::ApiError,
    model::{role::Role, student::StudentCredentials},
    models::{
        AdminLoginReq, Claims, LoginResponse, SessionProfile, StudentLoginReq, TokenPair,
        TokenType,
    },
};
use actix_web::{HttpRequest, HttpResponse, Responder, web};
use sqlx::MySqlPool;
use tracing::{debug, info, instrument, warn};

/// Issues an access token plus a refresh token and records the refresh
/// token's id so it can be rotated or revoked later.
async fn issue_tokens(
    subject: &TokenSubject,
    pool: &MySqlPool,
    config: &Config,
) -> Result<TokenPair, ApiError> {
    let access_token =
        generate_access_token(subject, &config.jwt_secret, config.access_token_ttl)
            .map_err(|e| ApiError::Internal(format!("access token: {e}")))?;

    let (refresh_token, refresh_claims) =
        generate_refresh_token(subject, &config.jwt_secret, config.refresh_token_ttl)
            .map_err(|e| ApiError::Internal(format!("refresh token: {e}")))?;

    debug!(jti = %refresh_claims.jti, "Storing refresh token");
    store_refresh_token(&refresh_claims, pool).await?;

    Ok(TokenPair {
        access_token,
        refresh_token,
    })
}

async fn store_refresh_token(claims: &Claims, pool: &MySqlPool) -> Result<(), ApiError> {
    sqlx::query(
        r#"
        INSERT INTO refresh_tokens (subject, role, jti, expires_at)
        VALUES (?, ?, ?, FROM_UNIXTIME(?))
        "#,
    )
    .bind(&claims.sub)
    .bind(claims.role)
    .bind(&claims.jti)
    .bind(claims.exp as i64)
    .execute(pool)
    .await?;

    Ok(())
}

/// Checks submitted admin credentials against the configured account.
pub fn check_admin_credentials(
    email: &str,
    password: &str,
    config: &Config,
) -> Result<SessionProfile, ApiError> {
    let invalid = || ApiError::Unauthorized("Invalid email or password".into());

    if !email.trim().eq_ignore_ascii_case(&config.admin_email) {
        return Err(invalid());
    }
    verify_password(password, &config.admin_password_hash).map_err(|_| invalid())?;

    Ok(SessionProfile {
        id: config.admin_id,
        role: Role::Admin,
        name: config.admin_name.clone(),
        login: config.admin_email.clone(),
        email: Some(config.admin_email.clone()),
        room_no: None,
        contact_number: None,
    })
}

/// Students without a stored hash fall back to the configured default password.
pub fn check_student_password(
    password: &str,
    student: &StudentCredentials,
    config: &Config,
) -> Result<(), ApiError> {
    let matches = match &student.password_hash {
        Some(hash) => verify_password(password, hash).is_ok(),
        None => password == config.student_default_password,
    };

    if matches {
        Ok(())
    } else {
        Err(ApiError::Unauthorized("Invalid password".into()))
    }
}

fn subject_for(profile: &SessionProfile) -> TokenSubject {
    TokenSubject {
        user_id: profile.id,
        login: profile.login.clone(),
        name: profile.name.clone(),
        role: profile.role,
    }
}

#[utoipa::path(
    post,
    path = "/auth/admin/login",
    request_body = AdminLoginReq,
    responses(
        (status = 200, description = "Logged in", body = LoginResponse),
        (status = 400, description = "Email or password missing"),
        (status = 401, description = "Invalid email or password")
    ),
    tag = "Auth"
)]
#[instrument(name = "admin_login", skip(pool, config, payload), fields(email = %payload.email))]
pub async fn admin_login(
    payload: web::Json<AdminLoginReq>,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
) -> Result<impl Responder, ApiError> {
    info!("Admin login request received");

    if payload.email.trim().is_empty() || payload.password.is_empty() {
        return Err(ApiError::BadRequest("Email and password are required".into()));
    }

    let session = check_admin_credentials(&payload.email, &payload.password, &config)
        .inspect_err(|_| info!("Invalid admin credentials"))?;

    let tokens = issue_tokens(&subject_for(&session), pool.get_ref(), &config).await?;

    info!("Admin login successful");
    Ok(HttpResponse::Ok().json(LoginResponse {
        access_token: tokens.access_token,
        refresh_token: tokens.refresh_token,
        session,
    }))
}

#[utoipa::path(
    post,
    path = "/auth/student/login",
    request_body = StudentLoginReq,
    responses(
        (status = 200, description = "Logged in", body = LoginResponse),
        (status = 400, description = "Roll number or password missing"),
        (status = 401, description = "Student not found or invalid password")
    ),
    tag = "Auth"
)]
#[instrument(name = "student_login", skip(pool, config, payload), fields(roll_no = %payload.roll_no))]
pub async fn student_login(
    payload: web::Json<StudentLoginReq>,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
) -> Result<impl Responder, ApiError> {
    info!("Student login request received");

    let roll_no = payload.roll_no.trim();
    if roll_no.is_empty() || payload.password.is_empty() {
        return Err(ApiError::BadRequest(
            "Roll number and password are required".into(),
        ));
    }

    let student = sqlx::query_as::<_, StudentCredentials>(
        r#"
        SELECT id, name, roll_no, room_no, contact_number, email, password_hash
        FROM students
        WHERE roll_no = ?
        "#,
    )
    .bind(roll_no)
    .fetch_optional(pool.get_ref())
    .await?
    .ok_or_else(|| {
        info!("Student not found");
        ApiError::Unauthorized("Student not found".into())
    })?;

    check_student_password(&payload.password, &student, &config)
        .inspect_err(|_| info!(student_id = student.id, "Invalid student password"))?;

    let session = SessionProfile {
        id: student.id,
        role: Role::Student,
        name: student.name,
        login: student.roll_no,
        email: Some(student.email),
        room_no: Some(student.room_no),
        contact_number: Some(student.contact_number),
    };

    let tokens = issue_tokens(&subject_for(&session), pool.get_ref(), &config).await?;

    info!(student_id = session.id, "Student login successful");
    Ok(HttpResponse::Ok().json(LoginResponse {
        access_token: tokens.access_token,
        refresh_token: tokens.refresh_token,
        session,
    }))
}

#[utoipa::path(
    post,
    path = "/auth/refresh",
    responses(
        (status = 200, description = "Rotated token pair", body = TokenPair),
        (status = 401, description = "Missing, invalid or revoked refresh token")
    ),
    security(("bearer_auth" = [])),
    tag = "Auth"
)]
pub async fn refresh_token(
    req: HttpRequest,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
) -> Result<impl Responder, ApiError> {
    let unauthorized = || ApiError::Unauthorized("Invalid refresh token".into());

    let token = bearer_token(&req).ok_or_else(unauthorized)?;
    let claims = verify_token(token, &config.jwt_secret).map_err(|_| unauthorized())?;

    if claims.token_type != TokenType::Refresh {
        return Err(unauthorized());
    }

    let subject = TokenSubject::from_claims(&claims).ok_or_else(unauthorized)?;

    // Revoke the presented token; zero rows means it was unknown, already
    // revoked or expired.
    let revoked = sqlx::query(
        r#"
        UPDATE refresh_tokens
        SET revoked = 1
        WHERE jti = ? AND revoked = 0 AND expires_at > NOW()
        "#,
    )
    .bind(&claims.jti)
    .execute(pool.get_ref())
    .await?;

    if revoked.rows_affected() == 0 {
        warn!(jti = %claims.jti, "Refresh token reuse or unknown token");
        return Err(unauthorized());
    }

    let tokens = issue_tokens(&subject, pool.get_ref(), &config).await?;
    Ok(HttpResponse::Ok().json(tokens))
}

#[utoipa::path(
    post,
    path = "/auth/logout",
    responses((status = 204, description = "Refresh token revoked (idempotent)")),
    security(("bearer_auth" = [])),
    tag = "Auth"
)]
pub async fn logout(
    req: HttpRequest,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
) -> impl Responder {
    let Some(token) = bearer_token(&req) else {
        return HttpResponse::NoContent().finish();
    };

    let claims = match verify_token(token, &config.jwt_secret) {
        Ok(c) => c,
        Err(_) => return HttpResponse::NoContent().finish(),
    };

    // only refresh tokens are tracked server-side
    if claims.token_type != TokenType::Refresh {
        return HttpResponse::NoContent().finish();
    }

    if let Err(e) = sqlx::query("UPDATE refresh_tokens SET revoked = 1 WHERE jti = ?")
        .bind(&claims.jti)
        .execute(pool.get_ref())
        .await
    {
        warn!(error = %e, "Failed to revoke refresh token on logout");
    }

    HttpResponse::NoContent().finish()
}

#[utoipa::path(
    get,
    path = "/api/me",
    responses(
        (status = 200, description = "Current session", body = SessionProfile),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Auth"
)]
pub async fn me(auth: AuthUser, config: web::Data<Config>) -> impl Responder {
    let email = match auth.role {
        Role::Admin => Some(config.admin_email.clone()),
        Role::Student => None,
    };

    HttpResponse::Ok().json(SessionProfile {
        id: auth.user_id,
        role: auth.role,
        name: auth.name,
        login: auth.login,
        email,
        room_no: None,
        contact_number: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        auth::middleware::auth_middleware, config::tests::test_config, db::lazy_test_pool,
    };
    use actix_web::{App, http::StatusCode, middleware::from_fn, test as actix_test};
    use serde_json::json;

    fn student_row(password_hash: Option<String>) -> StudentCredentials {
        StudentCredentials {
            id: 5,
            name: "Asha Verma".into(),
            roll_no: "CS-2024-017".into(),
            room_no: "B-204".into(),
            contact_number: "9876543210".into(),
            email: "asha@example.edu".into(),
            password_hash,
        }
    }

    #[test]
    fn admin_credentials_match_configured_account() {
        let config = test_config();

        let session = check_admin_credentials("Admin@Hostel.com ", "admin123", &config).unwrap();
        assert_eq!(session.role, Role::Admin);
        assert_eq!(session.name, "Admin User");

        assert!(check_admin_credentials("admin@hostel.com", "nope", &config).is_err());
        assert!(check_admin_credentials("other@hostel.com", "admin123", &config).is_err());
    }

    #[test]
    fn student_without_hash_uses_default_password() {
        let config = test_config();
        let row = student_row(None);

        assert!(check_student_password("password", &row, &config).is_ok());
        assert!(check_student_password("Password", &row, &config).is_err());
    }

    #[test]
    fn student_with_hash_ignores_default_password() {
        let config = test_config();
        let hash = crate::auth::password::hash_password("hunter22").unwrap();
        let row = student_row(Some(hash));

        assert!(check_student_password("hunter22", &row, &config).is_ok());
        assert!(check_student_password("password", &row, &config).is_err());
    }

    #[actix_web::test]
    async fn admin_login_rejects_wrong_password() {
        let app = actix_test::init_service(
            App::new()
                .app_data(web::Data::new(lazy_test_pool()))
                .app_data(web::Data::new(test_config()))
                .route("/auth/admin/login", web::post().to(admin_login)),
        )
        .await;

        let req = actix_test::TestRequest::post()
            .uri("/auth/admin/login")
            .set_json(json!({"email": "admin@hostel.com", "password": "wrong"}))
            .to_request();
        let resp = actix_test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

        let body: serde_json::Value = actix_test::read_body_json(resp).await;
        assert_eq!(body["message"], "Invalid email or password");
    }

    #[actix_web::test]
    async fn admin_login_requires_both_fields() {
        let app = actix_test::init_service(
            App::new()
                .app_data(web::Data::new(lazy_test_pool()))
                .app_data(web::Data::new(test_config()))
                .route("/auth/admin/login", web::post().to(admin_login)),
        )
        .await;

        let req = actix_test::TestRequest::post()
            .uri("/auth/admin/login")
            .set_json(json!({"email": "  ", "password": ""}))
            .to_request();
        let resp = actix_test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn me_returns_session_for_access_token() {
        let config = test_config();
        let subject = TokenSubject {
            user_id: 1,
            login: "admin@hostel.com".into(),
            name: "Admin User".into(),
            role: Role::Admin,
        };
        let token = generate_access_token(&subject, &config.jwt_secret, 60).unwrap();

        let app = actix_test::init_service(
            App::new().app_data(web::Data::new(config)).service(
                web::scope("/api")
                    .wrap(from_fn(auth_middleware))
                    .route("/me", web::get().to(me)),
            ),
        )
        .await;

        let req = actix_test::TestRequest::get()
            .uri("/api/me")
            .insert_header(("Authorization", format!("Bearer {token}")))
            .to_request();
        let body: SessionProfile = actix_test::call_and_read_body_json(&app, req).await;

        assert_eq!(body.role, Role::Admin);
        assert_eq!(body.login, "admin@hostel.com");
        assert_eq!(body.email.as_deref(), Some("admin@hostel.com"));
    }

    #[actix_web::test]
    async fn protected_scope_rejects_refresh_and_missing_tokens() {
        let config = test_config();
        let subject = TokenSubject {
            user_id: 5,
            login: "CS-2024-017".into(),
            name: "Asha Verma".into(),
            role: Role::Student,
        };
        let (refresh, _) = generate_refresh_token(&subject, &config.jwt_secret, 60).unwrap();

        let app = actix_test::init_service(
            App::new().app_data(web::Data::new(config)).service(
                web::scope("/api")
                    .wrap(from_fn(auth_middleware))
                    .route("/me", web::get().to(me)),
            ),
        )
        .await;

        let req = actix_test::TestRequest::get().uri("/api/me").to_request();
        let resp = actix_test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

        let req = actix_test::TestRequest::get()
            .uri("/api/me")
            .insert_header(("Authorization", format!("Bearer {refresh}")))
            .to_request();
        let resp = actix_test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }
}
