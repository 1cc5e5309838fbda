use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::model::role::Role;

#[derive(Deserialize, ToSchema)]
pub struct AdminLoginReq {
    #[schema(example = "admin@hostel.com")]
    pub email: String,
    #[schema(example = "admin123")]
    pub password: String,
}

#[derive(Deserialize, ToSchema)]
pub struct StudentLoginReq {
    #[schema(example = "CS-2024-017")]
    pub roll_no: String,
    #[schema(example = "password")]
    pub password: String,
}

/// The logged-in identity handed back to the client, which keeps it
/// alongside the tokens.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
pub struct SessionProfile {
    pub id: u64,
    pub role: Role,
    pub name: String,
    /// Admin email, or student roll number.
    pub login: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub room_no: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact_number: Option<String>,
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct LoginResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub session: SessionProfile,
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub user_id: u64,
    /// Admin email or student roll number.
    pub sub: String,
    pub name: String,
    pub role: u8,
    pub exp: usize,
    pub jti: String,

    pub token_type: TokenType,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub enum TokenType {
    Access,
    Refresh,
}
