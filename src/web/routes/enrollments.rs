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
    model::{
        CrudRepository, DatabaseError, Page, Permission, ResourceTyped,
        entity::{CourseEntity, Enrollment, EnrollmentCreate},
    },
    web::{
        AppState, RequestContext, ValidJson, WebError, WebResult,
        dto::enrollments::{EnrollBody, EnrollmentListQuery, EnrollmentStatusBody},
        error::ErrorResponse,
        middlewares,
    },
};

pub fn routes<S>(state: AppState) -> Router<S> {
    Router::new()
        .route("/add", post(enrollment_add_handler))
        .route("/list", get(enrollment_list_handler))
        .route("/mine", get(enrollment_mine_handler))
        .route("/edit/{enrollment_id}", patch(enrollment_edit_handler))
        .route("/delete/{enrollment_id}", delete(enrollment_delete_handler))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            middlewares::extract_context_fn,
        ))
        .with_state(state)
}

fn fetch_err(e: DatabaseError) -> WebError {
    WebError::resource_fetch_error(Enrollment::get_resource_type(), e)
}

#[utoipa::path(
    post,
    path = "/api/enrollment/add",
    request_body = EnrollBody,
    description = "Requests enrollment of the caller in a course. New requests are pending",
    responses(
        (status = 201, description = "Enrollment requested", body = Enrollment),
        (status = 400, description = "Malformed body or already enrolled", body = ErrorResponse),
        (status = 401, description = "Authentication required", body = ErrorResponse),
        (status = 403, description = "Only students can enroll", body = ErrorResponse),
        (status = 404, description = "Course not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "enrollment",
    security(
        ("bearer" = [])
    )
)]
async fn enrollment_add_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    ValidJson(payload): ValidJson<EnrollBody>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    user.require(Permission::EnrollCourse, Enrollment::get_resource_type())?;

    CourseEntity::find_by_id(state.pool(), user, payload.course_id)
        .await
        .map_err(|e| WebError::resource_fetch_error(CourseEntity::get_resource_type(), e))?
        .ok_or_else(|| WebError::resource_not_found(CourseEntity::get_resource_type()))?;

    let enrollment = Enrollment::create(
        state.pool(),
        user,
        EnrollmentCreate {
            course_id: payload.course_id,
            user_id: user.user_id(),
        },
    )
    .await
    .map_err(|e| WebError::resource_write_error(Enrollment::get_resource_type(), e))?;

    tracing::debug!(enrollment_id = %enrollment.id(), "enrollment requested");
    Ok((StatusCode::CREATED, Json(enrollment)))
}

#[utoipa::path(
    get,
    path = "/api/enrollment/list",
    params(EnrollmentListQuery),
    description = "Lists enrollments, newest first. Moderators and admins only",
    responses(
        (status = 200, description = "Requested page", body = Page<Enrollment>),
        (status = 400, description = "Malformed query", body = ErrorResponse),
        (status = 401, description = "Authentication required", body = ErrorResponse),
        (status = 403, description = "Caller cannot review enrollments", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "enrollment",
    security(
        ("bearer" = [])
    )
)]
async fn enrollment_list_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Query(query): Query<EnrollmentListQuery>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    user.require(Permission::ReviewEnrollment, Enrollment::get_resource_type())?;

    let (filter, page) = query.into_parts().map_err(WebError::bad_request)?;

    let items = Enrollment::search(state.pool(), user, &filter, page.limit, page.offset)
        .await
        .map_err(fetch_err)?;
    let total = Enrollment::count_matching(state.pool(), user, &filter)
        .await
        .map_err(fetch_err)?;

    Ok((
        StatusCode::OK,
        Json(Page::new(items, total, page.limit, page.offset)),
    ))
}

#[utoipa::path(
    get,
    path = "/api/enrollment/mine",
    description = "Enrollments of the caller, newest first",
    responses(
        (status = 200, description = "The caller's enrollments", body = Vec<Enrollment>),
        (status = 401, description = "Authentication required", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "enrollment",
    security(
        ("bearer" = [])
    )
)]
async fn enrollment_mine_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let enrollments = Enrollment::list_own(state.pool(), user)
        .await
        .map_err(fetch_err)?;
    Ok((StatusCode::OK, Json(enrollments)))
}

#[utoipa::path(
    patch,
    path = "/api/enrollment/edit/{enrollment_id}",
    request_body = EnrollmentStatusBody,
    params(("enrollment_id" = Uuid, Path, description = "Enrollment to review")),
    description = "Approves, denies or reopens an enrollment. The reviewer's role is recorded in `approved_by`",
    responses(
        (status = 200, description = "Enrollment updated", body = Enrollment),
        (status = 400, description = "Unknown status", body = ErrorResponse),
        (status = 401, description = "Authentication required", body = ErrorResponse),
        (status = 403, description = "Caller cannot review enrollments", body = ErrorResponse),
        (status = 404, description = "Enrollment not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "enrollment",
    security(
        ("bearer" = [])
    )
)]
async fn enrollment_edit_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(enrollment_id): Path<Uuid>,
    ValidJson(payload): ValidJson<EnrollmentStatusBody>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    user.require(Permission::ReviewEnrollment, Enrollment::get_resource_type())?;

    let enrollment = Enrollment::find_by_id(state.pool(), user, enrollment_id)
        .await
        .map_err(fetch_err)?
        .ok_or_else(|| WebError::resource_not_found(Enrollment::get_resource_type()))?;

    let enrollment = enrollment
        .set_status(state.pool(), user, payload.status)
        .await
        .map_err(|e| WebError::resource_write_error(Enrollment::get_resource_type(), e))?;

    tracing::debug!(
        enrollment_id = %enrollment.id(),
        status = %enrollment.status(),
        "enrollment reviewed"
    );
    Ok((StatusCode::OK, Json(enrollment)))
}

#[utoipa::path(
    delete,
    path = "/api/enrollment/delete/{enrollment_id}",
    params(("enrollment_id" = Uuid, Path, description = "Enrollment to delete")),
    description = "Deletes an enrollment. Admin only",
    responses(
        (status = 204, description = "Enrollment deleted"),
        (status = 401, description = "Authentication required", body = ErrorResponse),
        (status = 403, description = "Caller is not an admin", body = ErrorResponse),
        (status = 404, description = "Enrollment not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "enrollment",
    security(
        ("bearer" = [])
    )
)]
async fn enrollment_delete_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(enrollment_id): Path<Uuid>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    user.require(Permission::DeleteEnrollment, Enrollment::get_resource_type())?;

    let enrollment = Enrollment::find_by_id(state.pool(), user, enrollment_id)
        .await
        .map_err(fetch_err)?
        .ok_or_else(|| WebError::resource_not_found(Enrollment::get_resource_type()))?;

    enrollment.delete(state.pool(), user).await.map_err(fetch_err)?;
    Ok(StatusCode::NO_CONTENT)
}
