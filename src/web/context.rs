//! Request context, e.g. user id, its role, etc.
//!

use std::str::FromStr;

use axum::{extract::FromRequestParts, http::request::Parts};
use serde::{Deserialize, Serialize};

use crate::{
    model::{Permission, ResourceType, has_permission},
    web::{WebResult, error::WebError},
};

#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    user_id: uuid::Uuid,
    user_role: UserRole,
    session_id: Option<uuid::Uuid>,
}

impl AuthenticatedUser {
    pub fn new(user_id: uuid::Uuid, user_role: UserRole, session_id: uuid::Uuid) -> Self {
        Self {
            user_id,
            user_role,
            session_id: Some(session_id),
        }
    }

    /// System actor used for lookups that happen before a user is known.
    pub fn admin() -> Self {
        Self {
            user_role: UserRole::Admin,
            user_id: uuid::Uuid::max(), // admin ID
            session_id: None,
        }
    }

    pub fn user_id(&self) -> uuid::Uuid {
        self.user_id
    }

    pub fn user_role(&self) -> UserRole {
        self.user_role.clone()
    }

    pub fn session_id(&self) -> Option<uuid::Uuid> {
        self.session_id
    }

    pub fn can(&self, permission: Permission) -> bool {
        has_permission(&self.user_role, permission)
    }

    pub fn require(&self, permission: Permission, resource_type: ResourceType) -> WebResult<()> {
        if self.can(permission) {
            Ok(())
        } else {
            Err(WebError::resource_forbidden(resource_type))
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Admin,
    Moderator,
    Student,
}

impl From<&str> for UserRole {
    fn from(value: &str) -> Self {
        match value {
            "admin" => Self::Admin,
            "moderator" => Self::Moderator,
            _ => Self::Student,
        }
    }
}

impl FromStr for UserRole {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "admin" => Ok(Self::Admin),
            "moderator" => Ok(Self::Moderator),
            "student" => Ok(Self::Student),
            other => Err(format!("unknown role `{other}`")),
        }
    }
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Student => write!(f, "student"),
            Self::Moderator => write!(f, "moderator"),
            Self::Admin => write!(f, "admin"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RequestContext {
    maybe_user: Option<AuthenticatedUser>,
}

impl RequestContext {
    pub fn new(maybe_user: Option<AuthenticatedUser>) -> Self {
        Self { maybe_user }
    }

    pub fn maybe_user(&self) -> Option<&AuthenticatedUser> {
        self.maybe_user.as_ref()
    }

    pub fn user(&self) -> WebResult<&AuthenticatedUser> {
        self.maybe_user.as_ref().ok_or(WebError::auth_required())
    }
}

impl<S> FromRequestParts<S> for RequestContext
where
    S: Send + Sync,
{
    type Rejection = WebError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let ctx = parts.extensions.get::<RequestContext>();
        if let Some(ctx) = ctx {
            Ok(ctx.clone())
        } else {
            Ok(RequestContext::new(None))
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn role_parsing() {
        assert_eq!("moderator".parse::<UserRole>(), Ok(UserRole::Moderator));
        assert!("root".parse::<UserRole>().is_err());
        // stored values never fail to load
        assert_eq!(UserRole::from("root"), UserRole::Student);
        assert_eq!(UserRole::Admin.to_string(), "admin");
    }

    #[test]
    fn require_maps_to_forbidden() {
        let student =
            AuthenticatedUser::new(uuid::Uuid::new_v4(), UserRole::Student, uuid::Uuid::new_v4());
        assert!(student.require(Permission::RateCourse, ResourceType::Rating).is_ok());

        let err = student
            .require(Permission::AddCourse, ResourceType::Course)
            .unwrap_err();
        assert_eq!(err.status_code(), axum::http::StatusCode::FORBIDDEN);
    }
}
