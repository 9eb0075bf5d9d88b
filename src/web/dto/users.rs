use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::{
    model::entity::{UserEntity, UserFilter, UserOrderField},
    utils::parse_ordering,
    web::{
        UserRole,
        dto::{Pagination, double_option, parse_param},
    },
};

/// Student-only profile fields.
#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct StudentProfile {
    pub address: Option<String>,
    pub phone_no: Option<String>,
    pub profile_picture: Option<String>,
    pub is_approved: bool,
}

#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct ProfileResponse {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub role: UserRole,
    pub is_active: bool,
    pub date_joined: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub student: Option<StudentProfile>,
}

impl From<&UserEntity> for ProfileResponse {
    fn from(user: &UserEntity) -> Self {
        let role = user.role();
        let student = (role == UserRole::Student).then(|| StudentProfile {
            address: user.address().map(String::from),
            phone_no: user.phone_no().map(String::from),
            profile_picture: user.profile_picture().map(String::from),
            is_approved: user.is_approved(),
        });

        Self {
            id: user.id(),
            username: user.username().to_string(),
            email: user.email().to_string(),
            first_name: user.first_name().to_string(),
            last_name: user.last_name().to_string(),
            role,
            is_active: user.is_active(),
            date_joined: user.date_joined(),
            student,
        }
    }
}

#[derive(Debug, Default, Deserialize, Validate, utoipa::ToSchema)]
pub struct EditProfileBody {
    #[validate(custom(function = "crate::auth::validate::validate_username"))]
    pub username: Option<String>,
    #[validate(custom(function = "crate::auth::validate::validate_email_format"))]
    pub email: Option<String>,
    #[validate(length(max = 150))]
    pub first_name: Option<String>,
    #[validate(length(max = 150))]
    pub last_name: Option<String>,
    #[validate(custom(function = "crate::auth::validate::validate_password_strength"))]
    pub password: Option<String>,
    pub password2: Option<String>,
    /// Student only; `null` clears it
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    #[validate(length(max = 255))]
    pub address: Option<Option<String>>,
    /// Student only; `null` clears it
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    #[validate(custom(function = "crate::auth::validate::validate_phone_number"))]
    pub phone_no: Option<Option<String>>,
    /// Student only; `null` clears it
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    #[validate(length(max = 500))]
    pub profile_picture: Option<Option<String>>,
}

impl EditProfileBody {
    pub fn has_student_fields(&self) -> bool {
        self.address.is_some() || self.phone_no.is_some() || self.profile_picture.is_some()
    }
}

#[derive(Debug, Deserialize, Validate, utoipa::ToSchema)]
pub struct DeleteProfileBody {
    #[validate(length(min = 1, message = "Username is required"))]
    pub username: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

/// Confirmation body for admin deletions; `username` must name the target user.
#[derive(Debug, Deserialize, Validate, utoipa::ToSchema)]
pub struct AdminDeleteBody {
    #[validate(length(min = 1, message = "Username confirmation is required"))]
    pub username: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum DeleteMode {
    Temporary,
    Permanent,
}

#[derive(Debug, Default, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct UserListQuery {
    /// `student`, `moderator` or `admin`
    pub role: Option<String>,
    /// `true` or `false`
    pub is_active: Option<String>,
    /// Matches username, email, first or last name
    pub search: Option<String>,
    /// Comma separated fields, `-` prefix for descending
    pub ordering: Option<String>,
    pub limit: Option<String>,
    pub offset: Option<String>,
}

impl UserListQuery {
    pub fn into_parts(self) -> Result<(UserFilter, Pagination), String> {
        let pagination = Pagination::parse(self.limit.as_deref(), self.offset.as_deref())?;
        let ordering = match self.ordering.as_deref() {
            Some(value) => parse_ordering(value, UserOrderField::parse)?,
            None => Vec::new(),
        };

        let filter = UserFilter {
            role: parse_param::<UserRole>("role", self.role.as_deref())?,
            is_active: parse_param::<bool>("is_active", self.is_active.as_deref())?,
            search: self.search.map(|s| s.trim().to_string()).filter(|s| !s.is_empty()),
            ordering,
        };

        Ok((filter, pagination))
    }
}
