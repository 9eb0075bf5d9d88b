use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::post,
};
use chrono::Utc;

use crate::{
    auth::{
        self, TokenKind, UserClaims, hash_password,
        validate::{normalize_email, normalize_phone_number},
        verify_password,
    },
    model::{
        CrudRepository, Permission, ResourceTyped,
        entity::{Session, SessionCreate, UserEntity, UserEntityCreate},
    },
    web::{
        AppState, AuthenticatedUser, RequestContext, UserRole, ValidJson, WebError, WebResult,
        dto::auth::{
            AccessTokenResponse, LoginBody, LogoutBody, MessageResponse, ModeratorRegisterBody,
            RefreshBody, RegisterResponse, StudentRegisterBody, TokenPairResponse,
        },
        error::ErrorResponse,
        middlewares,
    },
};

pub fn routes<S>(state: AppState) -> Router<S> {
    let protected = Router::new()
        .route("/register/moderator", post(register_moderator_handler))
        .route("/logout", post(logout_handler))
        .route("/logout-all", post(logout_all_handler))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            middlewares::extract_context_fn,
        ));

    Router::new()
        .route("/register/student", post(register_student_handler))
        .route("/login", post(login_handler))
        .route("/token/refresh", post(refresh_handler))
        .merge(protected)
        .with_state(state)
}

/// Rejects a username or email already used by another account.
pub(crate) async fn ensure_identity_free(
    state: &AppState,
    username: Option<&str>,
    email: Option<&str>,
    except: Option<uuid::Uuid>,
) -> WebResult<()> {
    let fetch_err = |e| WebError::resource_fetch_error(UserEntity::get_resource_type(), e);

    if let Some(username) = username {
        if UserEntity::username_taken(state.pool(), username, except)
            .await
            .map_err(fetch_err)?
        {
            return Err(WebError::registration_username_taken());
        }
    }
    if let Some(email) = email {
        if UserEntity::email_taken(state.pool(), email, except)
            .await
            .map_err(fetch_err)?
        {
            return Err(WebError::registration_email_taken());
        }
    }
    Ok(())
}

async fn create_account(state: &AppState, data: UserEntityCreate) -> WebResult<UserEntity> {
    UserEntity::create(state.pool(), &AuthenticatedUser::admin(), data)
        .await
        .map_err(|e| WebError::resource_write_error(UserEntity::get_resource_type(), e))
}

#[utoipa::path(
    post,
    path = "/api/auth/register/student",
    request_body = StudentRegisterBody,
    description = "Registers a new student account",
    responses(
        (status = 201, description = "Student registered", body = RegisterResponse),
        (status = 400, description = "Validation failed, passwords differ or username/email taken", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "auth"
)]
async fn register_student_handler(
    State(state): State<AppState>,
    ValidJson(payload): ValidJson<StudentRegisterBody>,
) -> WebResult<impl IntoResponse> {
    if payload.password != payload.password2 {
        return Err(WebError::registration_password_mismatch());
    }

    let email = normalize_email(&payload.email);
    ensure_identity_free(&state, Some(&payload.username), Some(&email), None).await?;

    let hash = hash_password(&payload.password).map_err(WebError::server_crypt_error)?;
    let created = create_account(
        &state,
        UserEntityCreate {
            username: payload.username,
            email,
            password_hash: hash,
            first_name: payload.first_name,
            last_name: payload.last_name,
            role: UserRole::Student,
            address: payload.address,
            phone_no: payload.phone_no.as_deref().map(normalize_phone_number),
            profile_picture: payload.profile_picture,
        },
    )
    .await?;

    tracing::info!(user_id = %created.id(), "student registered");

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            message: String::from("Student registered successfully"),
            id: created.id(),
        }),
    ))
}

#[utoipa::path(
    post,
    path = "/api/auth/register/moderator",
    request_body = ModeratorRegisterBody,
    description = "Registers a new moderator account. Admin only",
    responses(
        (status = 201, description = "Moderator registered", body = RegisterResponse),
        (status = 400, description = "Validation failed, passwords differ or username/email taken", body = ErrorResponse),
        (status = 401, description = "Authentication required", body = ErrorResponse),
        (status = 403, description = "Caller is not an admin", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "auth",
    security(
        ("bearer" = [])
    )
)]
async fn register_moderator_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    ValidJson(payload): ValidJson<ModeratorRegisterBody>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    user.require(Permission::ManageUsers, UserEntity::get_resource_type())?;

    if payload.password != payload.password2 {
        return Err(WebError::registration_password_mismatch());
    }

    let email = normalize_email(&payload.email);
    ensure_identity_free(&state, Some(&payload.username), Some(&email), None).await?;

    let hash = hash_password(&payload.password).map_err(WebError::server_crypt_error)?;
    let created = create_account(
        &state,
        UserEntityCreate {
            username: payload.username,
            email,
            password_hash: hash,
            first_name: payload.first_name,
            last_name: payload.last_name,
            role: UserRole::Moderator,
            address: None,
            phone_no: None,
            profile_picture: None,
        },
    )
    .await?;

    tracing::info!(user_id = %created.id(), admin_id = %user.user_id(), "moderator registered");

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            message: String::from("Moderator registered successfully"),
            id: created.id(),
        }),
    ))
}

async fn issue_token_pair(state: &AppState, user: &UserEntity) -> WebResult<TokenPairResponse> {
    let app = state.config().app();
    let system = AuthenticatedUser::admin();

    let session = Session::create(
        state.pool(),
        &system,
        SessionCreate {
            user_id: user.id(),
            expires_at: Utc::now() + app.refresh_token_ttl(),
        },
    )
    .await
    .map_err(|e| WebError::resource_write_error(Session::get_resource_type(), e))?;

    let refresh = auth::generate_token(
        UserClaims::refresh(user.id(), session.id(), *session.expires_at()),
        app.jwt(),
    )
    .map_err(|e| WebError::server_crypt_error(e.into()))?;

    let access = auth::generate_token(
        UserClaims::access(user.id(), session.id(), app.access_token_ttl()),
        app.jwt(),
    )
    .map_err(|e| WebError::server_crypt_error(e.into()))?;

    Ok(TokenPairResponse {
        refresh,
        access,
        role: user.role(),
    })
}

#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginBody,
    description = "Exchanges credentials for a refresh/access token pair",
    responses(
        (status = 200, description = "Logged in", body = TokenPairResponse),
        (status = 400, description = "Missing username or password", body = ErrorResponse),
        (status = 401, description = "Invalid credentials or inactive account", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "auth"
)]
async fn login_handler(
    State(state): State<AppState>,
    ValidJson(payload): ValidJson<LoginBody>,
) -> WebResult<impl IntoResponse> {
    let found = UserEntity::find_by_username(state.pool(), &AuthenticatedUser::admin(), &payload.username)
        .await
        .map_err(|e| WebError::resource_fetch_error(UserEntity::get_resource_type(), e))?
        .ok_or_else(WebError::auth_invalid_credentials)?;

    let is_verified =
        verify_password(found.hash(), &payload.password).map_err(WebError::server_crypt_error)?;
    if !is_verified {
        return Err(WebError::auth_invalid_credentials());
    }
    if !found.is_active() {
        return Err(WebError::auth_account_inactive());
    }

    let pair = issue_token_pair(&state, &found).await?;
    tracing::debug!(user_id = %found.id(), "user logged in");

    Ok((StatusCode::OK, Json(pair)))
}

#[utoipa::path(
    post,
    path = "/api/auth/token/refresh",
    request_body = RefreshBody,
    description = "Issues a new access token for a live refresh token",
    responses(
        (status = 200, description = "New access token", body = AccessTokenResponse),
        (status = 401, description = "Refresh token expired, malformed or revoked", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "auth"
)]
async fn refresh_handler(
    State(state): State<AppState>,
    ValidJson(payload): ValidJson<RefreshBody>,
) -> WebResult<impl IntoResponse> {
    let app = state.config().app();
    let claims = auth::process_token(&payload.refresh, app.jwt())
        .map_err(WebError::auth_token_invalid)?
        .claims;

    if claims.kind != TokenKind::Refresh {
        return Err(WebError::auth_token_wrong_kind());
    }
    let (user_id, session_id) = match (claims.user_id(), claims.session_id()) {
        (Some(user_id), Some(session_id)) => (user_id, session_id),
        _ => return Err(WebError::auth_session_revoked()),
    };

    let system = AuthenticatedUser::admin();
    let session = Session::find_by_id(state.pool(), &system, session_id)
        .await
        .map_err(|e| WebError::resource_fetch_error(Session::get_resource_type(), e))?;
    match session {
        Some(session) if session.user_id() == user_id && session.is_live(Utc::now()) => {}
        _ => return Err(WebError::auth_session_revoked()),
    }

    let user = UserEntity::find_by_id(state.pool(), &system, user_id)
        .await
        .map_err(|e| WebError::resource_fetch_error(UserEntity::get_resource_type(), e))?
        .ok_or_else(WebError::auth_invalid_credentials)?;
    if !user.is_active() {
        return Err(WebError::auth_account_inactive());
    }

    let access = auth::generate_token(
        UserClaims::access(user_id, session_id, app.access_token_ttl()),
        app.jwt(),
    )
    .map_err(|e| WebError::server_crypt_error(e.into()))?;

    Ok((StatusCode::OK, Json(AccessTokenResponse { access })))
}

#[utoipa::path(
    post,
    path = "/api/auth/logout",
    request_body = LogoutBody,
    description = "Revokes the session of the given refresh token",
    responses(
        (status = 205, description = "Logged out", body = MessageResponse),
        (status = 400, description = "Refresh token missing or invalid", body = ErrorResponse),
        (status = 401, description = "Authentication required", body = ErrorResponse),
        (status = 403, description = "Token belongs to another user", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "auth",
    security(
        ("bearer" = [])
    )
)]
async fn logout_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    ValidJson(payload): ValidJson<LogoutBody>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let claims = auth::process_token(&payload.refresh_token, state.config().app().jwt())
        .map_err(|_| WebError::bad_request("Invalid or expired refresh token"))?
        .claims;

    if claims.kind != TokenKind::Refresh {
        return Err(WebError::bad_request("Invalid or expired refresh token"));
    }

    let session = match claims.session_id() {
        Some(id) => Session::find_by_id(state.pool(), user, id)
            .await
            .map_err(|e| WebError::resource_fetch_error(Session::get_resource_type(), e))?,
        None => None,
    }
    .ok_or_else(|| WebError::bad_request("Invalid or expired refresh token"))?;

    if session.user_id() != user.user_id() {
        return Err(WebError::resource_forbidden(Session::get_resource_type()));
    }

    session
        .revoke(state.pool(), user)
        .await
        .map_err(|e| WebError::resource_write_error(Session::get_resource_type(), e))?;

    Ok((
        StatusCode::RESET_CONTENT,
        Json(MessageResponse::new("Successfully logged out")),
    ))
}

#[utoipa::path(
    post,
    path = "/api/auth/logout-all",
    description = "Revokes every live session of the caller",
    responses(
        (status = 205, description = "All sessions revoked", body = MessageResponse),
        (status = 200, description = "No active tokens found", body = MessageResponse),
        (status = 401, description = "Authentication required", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "auth",
    security(
        ("bearer" = [])
    )
)]
async fn logout_all_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let revoked = Session::revoke_all_for_user(state.pool(), user, user.user_id())
        .await
        .map_err(|e| WebError::resource_write_error(Session::get_resource_type(), e))?;

    if revoked == 0 {
        return Ok((
            StatusCode::OK,
            Json(MessageResponse::new("No active tokens found")),
        ));
    }

    tracing::debug!(user_id = %user.user_id(), revoked, "revoked all sessions");
    Ok((
        StatusCode::RESET_CONTENT,
        Json(MessageResponse::new("Successfully logged out from all devices")),
    ))
}
