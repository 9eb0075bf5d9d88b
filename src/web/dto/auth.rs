use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::web::UserRole;

#[derive(Debug, Deserialize, Validate, utoipa::ToSchema)]
pub struct StudentRegisterBody {
    #[validate(custom(function = "crate::auth::validate::validate_username"))]
    pub username: String,
    #[validate(custom(function = "crate::auth::validate::validate_email_format"))]
    pub email: String,
    #[validate(custom(function = "crate::auth::validate::validate_password_strength"))]
    pub password: String,
    pub password2: String,
    #[serde(default)]
    #[validate(length(max = 150))]
    pub first_name: String,
    #[serde(default)]
    #[validate(length(max = 150))]
    pub last_name: String,
    #[validate(length(max = 255))]
    pub address: Option<String>,
    #[validate(custom(function = "crate::auth::validate::validate_phone_number"))]
    pub phone_no: Option<String>,
    #[validate(length(max = 500))]
    pub profile_picture: Option<String>,
}

#[derive(Debug, Deserialize, Validate, utoipa::ToSchema)]
pub struct ModeratorRegisterBody {
    #[validate(custom(function = "crate::auth::validate::validate_username"))]
    pub username: String,
    #[validate(custom(function = "crate::auth::validate::validate_email_format"))]
    pub email: String,
    #[validate(custom(function = "crate::auth::validate::validate_password_strength"))]
    pub password: String,
    pub password2: String,
    #[serde(default)]
    #[validate(length(max = 150))]
    pub first_name: String,
    #[serde(default)]
    #[validate(length(max = 150))]
    pub last_name: String,
}

#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct RegisterResponse {
    pub message: String,
    pub id: Uuid,
}

#[derive(Debug, Deserialize, Validate, utoipa::ToSchema)]
pub struct LoginBody {
    #[validate(length(min = 1, message = "Username is required"))]
    pub username: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct TokenPairResponse {
    pub refresh: String,
    pub access: String,
    pub role: UserRole,
}

#[derive(Debug, Deserialize, Validate, utoipa::ToSchema)]
pub struct RefreshBody {
    #[validate(length(min = 1, message = "Refresh token is required"))]
    pub refresh: String,
}

#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct AccessTokenResponse {
    pub access: String,
}

#[derive(Debug, Deserialize, Validate, utoipa::ToSchema)]
pub struct LogoutBody {
    #[validate(length(min = 1, message = "Refresh token is required"))]
    pub refresh_token: String,
}

#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new<S: Into<String>>(message: S) -> Self {
        Self {
            message: message.into(),
        }
    }
}
