use crate::{
    api::{complaint, dashboard, fee, inquiry, leave_request, room, student},
    auth::{handlers, middleware::auth_middleware},
    config::Config,
};
use actix_governor::{Governor, GovernorConfigBuilder, PeerIpKeyExtractor, governor::middleware::NoOpMiddleware};
use actix_web::{middleware::from_fn, web};
use std::sync::Arc;

/// Per-IP limiter refilling `requests_per_min` tokens a minute.
fn build_limiter(requests_per_min: u32) -> Governor<PeerIpKeyExtractor, NoOpMiddleware> {
    let requests_per_min = requests_per_min.max(1);
    let per_ms = (60_000 / u64::from(requests_per_min)).max(1);

    let cfg = GovernorConfigBuilder::default()
        .per_millisecond(per_ms)
        .burst_size(requests_per_min)
        .finish()
        .unwrap_or_default();
    Governor::new(&cfg)
}

pub fn configure(cfg: &mut web::ServiceConfig, config: Config) {
    let login_limiter = Arc::new(build_limiter(config.rate_login_per_min));
    let refresh_limiter = Arc::new(build_limiter(config.rate_refresh_per_min));
    let public_limiter = Arc::new(build_limiter(config.rate_public_per_min));
    let protected_limiter = Arc::new(build_limiter(config.rate_protected_per_min));

    // Sign-in and token rotation
    cfg.service(
        web::scope("/auth")
            .service(
                web::resource("/admin/login")
                    .wrap(login_limiter.clone())
                    .route(web::post().to(handlers::admin_login)),
            )
            .service(
                web::resource("/student/login")
                    .wrap(login_limiter.clone())
                    .route(web::post().to(handlers::student_login)),
            )
            .service(
                web::resource("/refresh")
                    .wrap(refresh_limiter.clone())
                    .route(web::post().to(handlers::refresh_token)),
            )
            .service(
                web::resource("/logout")
                    .wrap(refresh_limiter)
                    .route(web::post().to(handlers::logout)),
            ),
    );

    // Anonymous forms
    cfg.service(
        web::scope("/public")
            .wrap(public_limiter)
            .route("/leave", web::post().to(leave_request::create_leave))
            .route("/complaint", web::post().to(complaint::create_complaint))
            .route("/inquiry", web::post().to(inquiry::create_inquiry)),
    );

    // Protected routes
    cfg.service(
        web::scope(&config.api_prefix)
            .wrap(from_fn(auth_middleware))
            .wrap(protected_limiter)
            .route("/me", web::get().to(handlers::me))
            .route("/dashboard", web::get().to(dashboard::dashboard))
            .configure(protected_routes),
    );
}

/// Everything behind the access-token check. Split out so tests can mount it
/// without the IP limiter.
pub fn protected_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/students")
            .service(
                web::resource("")
                    .route(web::get().to(student::list_students))
                    .route(web::post().to(student::create_student)),
            )
            .service(
                web::resource("/{id}")
                    .route(web::get().to(student::get_student))
                    .route(web::put().to(student::update_student))
                    .route(web::delete().to(student::delete_student)),
            ),
    )
    .service(
        web::scope("/rooms")
            .service(
                web::resource("")
                    .route(web::get().to(room::list_rooms))
                    .route(web::post().to(room::create_room)),
            )
            .service(
                web::resource("/{id}")
                    .route(web::get().to(room::get_room))
                    .route(web::put().to(room::update_room))
                    .route(web::delete().to(room::delete_room)),
            ),
    )
    .service(
        web::scope("/leave")
            // /leave
            .service(web::resource("").route(web::get().to(leave_request::leave_list)))
            // /leave/{id}
            .service(
                web::resource("/{id}")
                    .route(web::get().to(leave_request::get_leave))
                    .route(web::delete().to(leave_request::delete_leave)),
            )
            // /leave/{id}/approve
            .service(
                web::resource("/{id}/approve").route(web::put().to(leave_request::approve_leave)),
            )
            // /leave/{id}/reject
            .service(
                web::resource("/{id}/reject").route(web::put().to(leave_request::reject_leave)),
            ),
    )
    .service(
        web::scope("/complaints")
            .service(web::resource("").route(web::get().to(complaint::list_complaints)))
            .service(
                web::resource("/{id}")
                    .route(web::get().to(complaint::get_complaint))
                    .route(web::delete().to(complaint::delete_complaint)),
            )
            .service(
                web::resource("/{id}/resolve")
                    .route(web::put().to(complaint::resolve_complaint)),
            ),
    )
    .service(
        web::scope("/inquiries")
            .service(web::resource("").route(web::get().to(inquiry::list_inquiries)))
            .service(
                web::resource("/{id}")
                    .route(web::get().to(inquiry::get_inquiry))
                    .route(web::delete().to(inquiry::delete_inquiry)),
            )
            .service(web::resource("/{id}/read").route(web::put().to(inquiry::mark_inquiry_read))),
    )
    .service(
        web::scope("/fees")
            .service(
                web::resource("")
                    .route(web::get().to(fee::list_fees))
                    .route(web::post().to(fee::create_fee)),
            )
            .service(
                web::resource("/{id}")
                    .route(web::get().to(fee::get_fee))
                    .route(web::put().to(fee::update_fee))
                    .route(web::delete().to(fee::delete_fee)),
            )
            .service(web::resource("/{id}/pay").route(web::put().to(fee::mark_fee_paid))),
    )
    .service(
        web::scope("/student")
            .route("/leave", web::get().to(leave_request::my_leave_list))
            .route("/complaints", web::get().to(complaint::my_complaints)),
    );
}

// LOGIN (admin: email, student: roll number)
//  ├─ access_token (15 min)
//  └─ refresh_token (7 days, stored and rotated)

// API REQUEST
//  └─ Authorization: Bearer access_token

// ACCESS EXPIRED
//  └─ POST /auth/refresh with refresh_token
//       └─ returns a new token pair, old refresh token revoked

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

    fn student_token(config: &Config) -> String {
        let subject = TokenSubject {
            user_id: 5,
            login: "CS-2024-017".into(),
            name: "Asha Verma".into(),
            role: Role::Student,
        };
        generate_access_token(&subject, &config.jwt_secret, 60).unwrap()
    }

    #[test]
    fn zero_rate_still_builds_a_limiter() {
        let _ = build_limiter(0);
        let _ = build_limiter(1000);
    }

    #[actix_web::test]
    async fn protected_scope_rejects_missing_token() {
        let config = test_config();
        let app = actix_test::init_service(
            App::new()
                .app_data(web::Data::new(lazy_test_pool()))
                .app_data(web::Data::new(config))
                .service(
                    web::scope("/api")
                        .wrap(from_fn(auth_middleware))
                        .configure(protected_routes),
                ),
        )
        .await;

        let req = actix_test::TestRequest::get().uri("/api/rooms").to_request();
        let resp = actix_test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[actix_web::test]
    async fn student_cannot_reach_admin_actions() {
        let config = test_config();
        let token = student_token(&config);
        let app = actix_test::init_service(
            App::new()
                .app_data(web::Data::new(lazy_test_pool()))
                .app_data(web::Data::new(config))
                .service(
                    web::scope("/api")
                        .wrap(from_fn(auth_middleware))
                        .configure(protected_routes),
                ),
        )
        .await;

        for (method, uri) in [
            ("PUT", "/api/leave/1/approve"),
            ("PUT", "/api/fees/1/pay"),
            ("DELETE", "/api/inquiries/3"),
            ("GET", "/api/complaints"),
        ] {
            let req = actix_test::TestRequest::default()
                .method(method.parse().unwrap())
                .uri(uri)
                .insert_header(("Authorization", format!("Bearer {token}")))
                .to_request();
            let resp = actix_test::call_service(&app, req).await;
            assert_eq!(resp.status(), StatusCode::FORBIDDEN, "{method} {uri}");
        }
    }
}
