use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::{delete, get, patch, post},
};
use uuid::Uuid;

use crate::{
    auth::{
        hash_password,
        validate::{normalize_email, normalize_phone_number},
        verify_password,
    },
    model::{
        CrudRepository, Page, Permission, ResourceTyped,
        entity::{Session, UserEntity, UserEntityUpdate},
    },
    web::{
        AppState, AuthenticatedUser, RequestContext, UserRole, ValidJson, WebError, WebResult,
        dto::{
            auth::MessageResponse,
            users::{
                AdminDeleteBody, DeleteMode, DeleteProfileBody, EditProfileBody, ProfileResponse,
                UserListQuery,
            },
        },
        error::ErrorResponse,
        middlewares,
        routes::auth::ensure_identity_free,
    },
};

pub fn routes<S>(state: AppState) -> Router<S> {
    Router::new()
        .route("/user/profile", get(profile_handler))
        .route("/user/edit", patch(edit_profile_handler))
        .route("/user/delete", delete(delete_profile_handler))
        .route("/admin/profile/{username}", get(admin_profile_handler))
        .route(
            "/admin/delete/temporary/{user_id}",
            delete(admin_delete_temporary_handler),
        )
        .route(
            "/admin/delete/permanent/{user_id}",
            delete(admin_delete_permanent_handler),
        )
        .route("/admin/reactivate/{user_id}", post(admin_reactivate_handler))
        .route("/users", get(user_list_handler))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            middlewares::extract_context_fn,
        ))
        .with_state(state)
}

fn fetch_err(e: crate::model::DatabaseError) -> WebError {
    WebError::resource_fetch_error(UserEntity::get_resource_type(), e)
}

async fn load_user(state: &AppState, actor: &AuthenticatedUser, id: Uuid) -> WebResult<UserEntity> {
    UserEntity::find_by_id(state.pool(), actor, id)
        .await
        .map_err(fetch_err)?
        .ok_or_else(|| WebError::resource_not_found(UserEntity::get_resource_type()))
}

async fn revoke_sessions(state: &AppState, actor: &AuthenticatedUser, user_id: Uuid) -> WebResult<u64> {
    Session::revoke_all_for_user(state.pool(), actor, user_id)
        .await
        .map_err(|e| WebError::resource_write_error(Session::get_resource_type(), e))
}

#[utoipa::path(
    get,
    path = "/api/auth/user/profile",
    description = "Returns the profile of the caller",
    responses(
        (status = 200, description = "Profile", body = ProfileResponse),
        (status = 401, description = "Authentication required", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "users",
    security(
        ("bearer" = [])
    )
)]
async fn profile_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let found = load_user(&state, user, user.user_id()).await?;

    Ok((StatusCode::OK, Json(ProfileResponse::from(&found))))
}

#[utoipa::path(
    patch,
    path = "/api/auth/user/edit",
    request_body = EditProfileBody,
    description = "Partially updates the profile of the caller. A password change revokes every session",
    responses(
        (status = 200, description = "Profile updated", body = ProfileResponse),
        (status = 400, description = "Validation failed or username/email taken", body = ErrorResponse),
        (status = 401, description = "Authentication required", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "users",
    security(
        ("bearer" = [])
    )
)]
async fn edit_profile_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    ValidJson(payload): ValidJson<EditProfileBody>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let found = load_user(&state, user, user.user_id()).await?;

    if payload.has_student_fields() && found.role() != UserRole::Student {
        return Err(WebError::bad_request(
            "Only students can set address, phone number or profile picture",
        ));
    }

    let password_hash = match &payload.password {
        Some(password) => {
            if payload.password2.as_deref() != Some(password.as_str()) {
                return Err(WebError::registration_password_mismatch());
            }
            Some(hash_password(password).map_err(WebError::server_crypt_error)?)
        }
        None => None,
    };

    let email = payload.email.as_deref().map(normalize_email);
    ensure_identity_free(
        &state,
        payload.username.as_deref(),
        email.as_deref(),
        Some(found.id()),
    )
    .await?;

    let password_changed = password_hash.is_some();
    let updated = found
        .update(
            state.pool(),
            user,
            UserEntityUpdate {
                username: payload.username,
                email,
                password_hash,
                first_name: payload.first_name,
                last_name: payload.last_name,
                address: payload.address,
                phone_no: payload
                    .phone_no
                    .map(|phone| phone.as_deref().map(normalize_phone_number)),
                profile_picture: payload.profile_picture,
            },
        )
        .await
        .map_err(|e| WebError::resource_write_error(UserEntity::get_resource_type(), e))?;

    if password_changed {
        let revoked = revoke_sessions(&state, user, updated.id()).await?;
        tracing::info!(user_id = %updated.id(), revoked, "password changed, sessions revoked");
    }

    Ok((StatusCode::OK, Json(ProfileResponse::from(&updated))))
}

#[utoipa::path(
    delete,
    path = "/api/auth/user/delete",
    request_body = DeleteProfileBody,
    description = "Deactivates the caller's account and revokes every session",
    responses(
        (status = 200, description = "Account deactivated", body = MessageResponse),
        (status = 400, description = "Username does not match", body = ErrorResponse),
        (status = 401, description = "Password is invalid", body = ErrorResponse),
        (status = 403, description = "Admins cannot delete themselves", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "users",
    security(
        ("bearer" = [])
    )
)]
async fn delete_profile_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    ValidJson(payload): ValidJson<DeleteProfileBody>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    if user.user_role() == UserRole::Admin {
        return Err(WebError::resource_forbidden(UserEntity::get_resource_type()));
    }

    let found = load_user(&state, user, user.user_id()).await?;
    if found.username() != payload.username {
        return Err(WebError::bad_request("Username does not match"));
    }

    let is_verified =
        verify_password(found.hash(), &payload.password).map_err(WebError::server_crypt_error)?;
    if !is_verified {
        return Err(WebError::auth_invalid_credentials());
    }

    let found = found
        .set_active(state.pool(), user, false)
        .await
        .map_err(|e| WebError::resource_write_error(UserEntity::get_resource_type(), e))?;
    revoke_sessions(&state, user, found.id()).await?;

    tracing::info!(user_id = %found.id(), "account deactivated by owner");
    Ok((
        StatusCode::OK,
        Json(MessageResponse::new("Account deleted successfully")),
    ))
}

#[utoipa::path(
    get,
    path = "/api/auth/admin/profile/{username}",
    params(("username" = String, Path, description = "Username to look up")),
    responses(
        (status = 200, description = "Profile", body = ProfileResponse),
        (status = 401, description = "Authentication required", body = ErrorResponse),
        (status = 403, description = "Caller is not an admin", body = ErrorResponse),
        (status = 404, description = "User not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "admin",
    security(
        ("bearer" = [])
    )
)]
async fn admin_profile_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    user.require(Permission::ManageUsers, UserEntity::get_resource_type())?;

    let found = UserEntity::find_by_username(state.pool(), user, &username)
        .await
        .map_err(fetch_err)?
        .ok_or_else(|| WebError::resource_not_found(UserEntity::get_resource_type()))?;

    Ok((StatusCode::OK, Json(ProfileResponse::from(&found))))
}

async fn admin_delete(
    ctx: RequestContext,
    state: AppState,
    user_id: Uuid,
    payload: AdminDeleteBody,
    mode: DeleteMode,
) -> WebResult<(StatusCode, Json<MessageResponse>)> {
    let user = ctx.user()?;
    user.require(Permission::ManageUsers, UserEntity::get_resource_type())?;

    let target = load_user(&state, user, user_id).await?;
    if target.id() == user.user_id() {
        return Err(WebError::resource_forbidden(UserEntity::get_resource_type()));
    }
    if target.username() != payload.username {
        return Err(WebError::bad_request("Username confirmation does not match"));
    }

    revoke_sessions(&state, user, target.id()).await?;
    let write_err = |e| WebError::resource_write_error(UserEntity::get_resource_type(), e);

    let message = match mode {
        DeleteMode::Temporary => {
            target
                .set_active(state.pool(), user, false)
                .await
                .map_err(write_err)?;
            "User deactivated successfully"
        }
        DeleteMode::Permanent => {
            target.delete(state.pool(), user).await.map_err(write_err)?;
            "User deleted permanently"
        }
    };

    tracing::info!(admin_id = %user.user_id(), %user_id, ?mode, "user deleted by admin");
    Ok((StatusCode::OK, Json(MessageResponse::new(message))))
}

#[utoipa::path(
    delete,
    path = "/api/auth/admin/delete/temporary/{user_id}",
    request_body = AdminDeleteBody,
    params(("user_id" = Uuid, Path, description = "User to deactivate")),
    responses(
        (status = 200, description = "User deactivated", body = MessageResponse),
        (status = 400, description = "Confirmation missing or mismatched", body = ErrorResponse),
        (status = 401, description = "Authentication required", body = ErrorResponse),
        (status = 403, description = "Not an admin, or target is the caller", body = ErrorResponse),
        (status = 404, description = "User not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "admin",
    security(
        ("bearer" = [])
    )
)]
async fn admin_delete_temporary_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    ValidJson(payload): ValidJson<AdminDeleteBody>,
) -> WebResult<impl IntoResponse> {
    admin_delete(ctx, state, user_id, payload, DeleteMode::Temporary).await
}

#[utoipa::path(
    delete,
    path = "/api/auth/admin/delete/permanent/{user_id}",
    request_body = AdminDeleteBody,
    params(("user_id" = Uuid, Path, description = "User to delete")),
    responses(
        (status = 200, description = "User deleted", body = MessageResponse),
        (status = 400, description = "Confirmation missing or mismatched", body = ErrorResponse),
        (status = 401, description = "Authentication required", body = ErrorResponse),
        (status = 403, description = "Not an admin, or target is the caller", body = ErrorResponse),
        (status = 404, description = "User not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "admin",
    security(
        ("bearer" = [])
    )
)]
async fn admin_delete_permanent_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    ValidJson(payload): ValidJson<AdminDeleteBody>,
) -> WebResult<impl IntoResponse> {
    admin_delete(ctx, state, user_id, payload, DeleteMode::Permanent).await
}

#[utoipa::path(
    post,
    path = "/api/auth/admin/reactivate/{user_id}",
    params(("user_id" = Uuid, Path, description = "Inactive user to reactivate")),
    responses(
        (status = 200, description = "User reactivated", body = MessageResponse),
        (status = 401, description = "Authentication required", body = ErrorResponse),
        (status = 403, description = "Caller is not an admin", body = ErrorResponse),
        (status = 404, description = "No inactive user with this id", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "admin",
    security(
        ("bearer" = [])
    )
)]
async fn admin_reactivate_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    user.require(Permission::ManageUsers, UserEntity::get_resource_type())?;

    let target = load_user(&state, user, user_id).await?;
    if target.is_active() {
        return Err(WebError::resource_not_found(UserEntity::get_resource_type()));
    }

    target
        .set_active(state.pool(), user, true)
        .await
        .map_err(|e| WebError::resource_write_error(UserEntity::get_resource_type(), e))?;

    Ok((
        StatusCode::OK,
        Json(MessageResponse::new("User reactivated successfully")),
    ))
}

#[utoipa::path(
    get,
    path = "/api/auth/users",
    params(UserListQuery),
    description = "Lists users with filtering, search and ordering. Admin only",
    responses(
        (status = 200, description = "Requested page", body = Page<ProfileResponse>),
        (status = 400, description = "Malformed query", body = ErrorResponse),
        (status = 401, description = "Authentication required", body = ErrorResponse),
        (status = 403, description = "Caller is not an admin", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "admin",
    security(
        ("bearer" = [])
    )
)]
async fn user_list_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Query(query): Query<UserListQuery>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    user.require(Permission::ManageUsers, UserEntity::get_resource_type())?;

    let (filter, page) = query.into_parts().map_err(WebError::bad_request)?;

    let items = UserEntity::search(state.pool(), user, &filter, page.limit, page.offset)
        .await
        .map_err(fetch_err)?;
    let total = UserEntity::count_matching(state.pool(), user, &filter)
        .await
        .map_err(fetch_err)?;

    let page = Page::new(items, total, page.limit, page.offset).map(|u| ProfileResponse::from(&u));
    Ok((StatusCode::OK, Json(page)))
}
