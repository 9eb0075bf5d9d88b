use axum::{Json, http::StatusCode, response::IntoResponse};
use thiserror::Error;
use validator::ValidationErrors;

use crate::{
    auth::CryptError,
    error::log_error,
    model::{DatabaseError, ResourceType},
};

pub type WebResult<T> = std::result::Result<T, WebError>;

#[derive(Debug, Error)]
pub enum RegistrationError {
    #[error("RegistrationUsernameTaken")]
    RegistrationUsernameTaken,

    #[error("RegistrationEmailTaken")]
    RegistrationEmailTaken,

    #[error("RegistrationPasswordMismatch")]
    RegistrationPasswordMismatch,
}

#[derive(Debug, Error)]
pub enum AuthenticationError {
    #[error("AuthenticationTokenInvalid. Error: {error}")]
    AuthenticationTokenInvalid { error: jsonwebtoken::errors::Error },

    #[error("AuthenticationTokenWrongKind")]
    AuthenticationTokenWrongKind,

    #[error("AuthenticationSessionRevoked")]
    AuthenticationSessionRevoked,

    #[error("AuthenticationRequired")]
    AuthenticationRequired,

    #[error("AuthenticationInvalidCredentials")]
    AuthenticationInvalidCredentials,

    #[error("AuthenticationAccountInactive")]
    AuthenticationAccountInactive,
}

#[derive(Debug, Error)]
pub enum ResourceError {
    #[error("ResourceNotFound: {resource_type:?}")]
    ResourceNotFound { resource_type: ResourceType },

    #[error("ResourceForbidden: {resource_type:?}")]
    ResourceForbidden { resource_type: ResourceType },

    #[error("ResourceFetchError: {resource_type:?}. Error: {error}")]
    ResourceFetchError {
        resource_type: ResourceType,
        error: DatabaseError,
    },

    #[error("ResourceAlreadyExists: {resource_type:?}")]
    ResourceAlreadyExists { resource_type: ResourceType },
}

#[derive(Debug, Error)]
pub enum RequestError {
    #[error("RequestInvalidFields: {errors}")]
    RequestInvalidFields { errors: ValidationErrors },

    #[error("RequestBadRequest: {message}")]
    RequestBadRequest { message: String },
}

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("ServerCryptError: {0}")]
    ServerCryptError(#[from] crate::auth::CryptError),
}

impl ServerError {
    pub fn status_code(&self) -> StatusCode {
        StatusCode::INTERNAL_SERVER_ERROR
    }

    pub fn client_display(&self) -> String {
        String::from("Internal server error.")
    }
}

impl RegistrationError {
    pub fn status_code(&self) -> StatusCode {
        StatusCode::BAD_REQUEST
    }

    pub fn client_display(&self) -> String {
        match self {
            Self::RegistrationUsernameTaken => String::from("Username already exists"),
            Self::RegistrationEmailTaken => String::from("Email already exists"),
            Self::RegistrationPasswordMismatch => String::from("Passwords do not match"),
        }
    }
}

impl AuthenticationError {
    pub fn status_code(&self) -> StatusCode {
        StatusCode::UNAUTHORIZED
    }

    pub fn client_display(&self) -> String {
        match self {
            Self::AuthenticationTokenInvalid { .. } => {
                String::from("Authentication error, token invalid or expired.")
            }
            Self::AuthenticationTokenWrongKind => {
                String::from("Authentication error, wrong token type.")
            }
            Self::AuthenticationSessionRevoked => {
                String::from("Authentication error, token has been revoked.")
            }
            Self::AuthenticationRequired => String::from("Authentication required."),
            Self::AuthenticationInvalidCredentials => {
                String::from("Authentication error, user not found or password is invalid.")
            }
            Self::AuthenticationAccountInactive => {
                String::from("Authentication error, user is inactive.")
            }
        }
    }
}

impl ResourceError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::ResourceNotFound { .. } => StatusCode::NOT_FOUND,
            Self::ResourceForbidden { .. } => StatusCode::FORBIDDEN,
            Self::ResourceFetchError { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ResourceAlreadyExists { .. } => StatusCode::BAD_REQUEST,
        }
    }

    pub fn client_display(&self) -> String {
        match self {
            Self::ResourceNotFound { .. } => String::from("Resource error, resource not found."),
            Self::ResourceForbidden { .. } => {
                String::from("You do not have permission to perform this action.")
            }
            Self::ResourceFetchError { .. } => {
                String::from("Resource error, unable to fetch resource.")
            }
            Self::ResourceAlreadyExists { .. } => {
                String::from("Resource error, resource already exists.")
            }
        }
    }
}

impl RequestError {
    pub fn status_code(&self) -> StatusCode {
        StatusCode::BAD_REQUEST
    }

    pub fn client_display(&self) -> String {
        match self {
            Self::RequestInvalidFields { .. } => String::from("Validation error."),
            Self::RequestBadRequest { message } => message.clone(),
        }
    }

    fn field_errors(&self) -> Option<serde_json::Value> {
        match self {
            Self::RequestInvalidFields { errors } => serde_json::to_value(errors).ok(),
            Self::RequestBadRequest { .. } => None,
        }
    }
}

#[derive(Debug, Error)]
pub enum WebError {
    #[error("ResourceError - {0}")]
    ResourceError(#[from] ResourceError),
    #[error("AuthenticationError - {0}")]
    AuthenticationError(#[from] AuthenticationError),
    #[error("RegistrationError - {0}")]
    RegistrationError(#[from] RegistrationError),
    #[error("RequestError - {0}")]
    RequestError(#[from] RequestError),
    #[error("ServerError - {0}")]
    ServerError(#[from] ServerError),
}

impl From<ValidationErrors> for WebError {
    fn from(errors: ValidationErrors) -> Self {
        Self::RequestError(RequestError::RequestInvalidFields { errors })
    }
}

impl WebError {
    pub fn resource_not_found(r#type: ResourceType) -> Self {
        Self::ResourceError(ResourceError::ResourceNotFound {
            resource_type: r#type,
        })
    }

    pub fn resource_forbidden(r#type: ResourceType) -> Self {
        Self::ResourceError(ResourceError::ResourceForbidden {
            resource_type: r#type,
        })
    }

    pub fn resource_fetch_error(r#type: ResourceType, error: DatabaseError) -> Self {
        Self::ResourceError(ResourceError::ResourceFetchError {
            resource_type: r#type,
            error,
        })
    }

    /// Like [`WebError::resource_fetch_error`], but unique violations become a 400.
    pub fn resource_write_error(r#type: ResourceType, error: DatabaseError) -> Self {
        if error.is_unique_violation() {
            return Self::ResourceError(ResourceError::ResourceAlreadyExists {
                resource_type: r#type,
            });
        }
        Self::resource_fetch_error(r#type, error)
    }

    pub fn resource_already_exists(r#type: ResourceType) -> Self {
        Self::ResourceError(ResourceError::ResourceAlreadyExists {
            resource_type: r#type,
        })
    }

    pub fn bad_request<S: Into<String>>(message: S) -> Self {
        Self::RequestError(RequestError::RequestBadRequest {
            message: message.into(),
        })
    }

    pub fn auth_token_invalid(error: jsonwebtoken::errors::Error) -> Self {
        Self::AuthenticationError(AuthenticationError::AuthenticationTokenInvalid { error })
    }

    pub fn auth_token_wrong_kind() -> Self {
        Self::AuthenticationError(AuthenticationError::AuthenticationTokenWrongKind)
    }

    pub fn auth_session_revoked() -> Self {
        Self::AuthenticationError(AuthenticationError::AuthenticationSessionRevoked)
    }

    pub fn auth_required() -> Self {
        Self::AuthenticationError(AuthenticationError::AuthenticationRequired)
    }

    pub fn auth_invalid_credentials() -> Self {
        Self::AuthenticationError(AuthenticationError::AuthenticationInvalidCredentials)
    }

    pub fn auth_account_inactive() -> Self {
        Self::AuthenticationError(AuthenticationError::AuthenticationAccountInactive)
    }

    pub fn registration_username_taken() -> Self {
        Self::RegistrationError(RegistrationError::RegistrationUsernameTaken)
    }

    pub fn registration_email_taken() -> Self {
        Self::RegistrationError(RegistrationError::RegistrationEmailTaken)
    }

    pub fn registration_password_mismatch() -> Self {
        Self::RegistrationError(RegistrationError::RegistrationPasswordMismatch)
    }

    pub fn server_crypt_error(e: CryptError) -> Self {
        Self::ServerError(ServerError::ServerCryptError(e))
    }

    pub fn status_code(&self) -> axum::http::StatusCode {
        match self {
            Self::ResourceError(e) => e.status_code(),
            Self::RegistrationError(e) => e.status_code(),
            Self::AuthenticationError(e) => e.status_code(),
            Self::RequestError(e) => e.status_code(),
            Self::ServerError(e) => e.status_code(),
        }
    }

    pub fn client_display(&self) -> String {
        match self {
            Self::ResourceError(e) => e.client_display(),
            Self::RegistrationError(e) => e.client_display(),
            Self::AuthenticationError(e) => e.client_display(),
            Self::RequestError(e) => e.client_display(),
            Self::ServerError(e) => e.client_display(),
        }
    }
}

#[derive(serde::Serialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    /// Human-readable message for the client
    pub message: String,
    /// HTTP status code (stringified)
    pub status_code: String,
    /// Optional debug details (only in debug mode)
    pub details: Option<String>,
    /// Per-field validation messages
    #[schema(value_type = Option<Object>)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<serde_json::Value>,
}

impl IntoResponse for WebError {
    fn into_response(self) -> axum::response::Response {
        log_error(&self);

        let status_code = self.status_code();
        let display = self.client_display();
        let errors = match &self {
            Self::RequestError(e) => e.field_errors(),
            _ => None,
        };

        let body = ErrorResponse {
            message: display,
            status_code: status_code.as_str().to_string(),
            details: if cfg!(debug_assertions) {
                Some(self.to_string())
            } else {
                None
            },
            errors,
        };

        (status_code, Json(body)).into_response()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn registration_errors_are_bad_requests() {
        let err = WebError::registration_password_mismatch();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.client_display(), "Passwords do not match");
    }

    #[test]
    fn auth_errors_are_unauthorized() {
        for err in [
            WebError::auth_required(),
            WebError::auth_session_revoked(),
            WebError::auth_account_inactive(),
            WebError::auth_token_wrong_kind(),
        ] {
            assert_eq!(err.status_code(), StatusCode::UNAUTHORIZED);
        }
    }

    #[test]
    fn non_unique_write_errors_stay_internal() {
        let err = WebError::resource_write_error(
            ResourceType::Course,
            DatabaseError::SqlxError(sqlx::Error::RowNotFound),
        );
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn field_errors_are_exposed() {
        let mut errors = ValidationErrors::new();
        errors.add("email", validator::ValidationError::new("email"));
        let err = WebError::from(errors);
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        match &err {
            WebError::RequestError(e) => {
                let value = e.field_errors().unwrap();
                assert!(value.get("email").is_some());
            }
            other => panic!("unexpected error {other:?}"),
        }
    }
}
