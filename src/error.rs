use actix_web::{HttpResponse, ResponseError, http::StatusCode, web};
use derive_more::Display;
use serde_json::json;
use sqlx::mysql::MySqlDatabaseError;
use validator::ValidationErrors;

use crate::utils::validation::first_message;

/// Every handler error ends up here and is rendered as `{"message": ...}`.
#[derive(Debug, Display)]
pub enum ApiError {
    #[display(fmt = "{}", _0)]
    BadRequest(String),
    #[display(fmt = "{}", _0)]
    Validation(String),
    #[display(fmt = "{}", _0)]
    Unauthorized(String),
    #[display(fmt = "{}", _0)]
    Forbidden(String),
    #[display(fmt = "{}", _0)]
    NotFound(String),
    #[display(fmt = "{}", _0)]
    Conflict(String),
    #[display(fmt = "Internal Server Error")]
    Internal(String),
    #[display(fmt = "Internal Server Error")]
    Database(sqlx::Error),
}

impl ApiError {
    pub fn not_found(what: &str) -> Self {
        ApiError::NotFound(format!("{what} not found"))
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) | ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Internal(_) | ApiError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        match self {
            ApiError::Database(e) => tracing::error!(error = %e, "Database error"),
            ApiError::Internal(detail) => tracing::error!(error = %detail, "Internal error"),
            _ => {}
        }

        HttpResponse::build(self.status_code()).json(json!({
            "message": self.to_string()
        }))
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(e: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &e {
            if let Some(mysql) = db_err.try_downcast_ref::<MySqlDatabaseError>() {
                match mysql.number() {
                    1062 => return ApiError::Conflict("Record already exists".into()),
                    1451 => {
                        return ApiError::Conflict(
                            "Record is still referenced by other records".into(),
                        );
                    }
                    1452 => {
                        return ApiError::BadRequest("Referenced record does not exist".into());
                    }
                    _ => {}
                }
            }
        }
        ApiError::Database(e)
    }
}

impl From<ValidationErrors> for ApiError {
    fn from(errors: ValidationErrors) -> Self {
        ApiError::Validation(first_message(&errors))
    }
}

/// Payload, query and path extraction failures go through [`ApiError`] too,
/// so they render as `{"message": ...}` like every other error.
pub fn extractor_configs(cfg: &mut web::ServiceConfig) {
    cfg.app_data(
        web::JsonConfig::default()
            .error_handler(|err, _req| ApiError::BadRequest(err.to_string()).into()),
    )
    .app_data(
        web::QueryConfig::default()
            .error_handler(|err, _req| ApiError::BadRequest(err.to_string()).into()),
    )
    .app_data(
        web::PathConfig::default()
            .error_handler(|err, _req| ApiError::BadRequest(err.to_string()).into()),
    );
}
