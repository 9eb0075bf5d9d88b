use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::{delete, get, post},
};
use uuid::Uuid;

use crate::{
    model::{
        CrudRepository, DatabaseError, Permission, ResourceTyped, check_access,
        entity::{CourseEntity, CourseRating, CourseRatingUpsert},
    },
    web::{
        AppState, AuthenticatedUser, RequestContext, ValidJson, WebError, WebResult,
        dto::ratings::RateBody, error::ErrorResponse, middlewares,
    },
};

pub fn routes<S>(state: AppState) -> Router<S> {
    let protected = Router::new()
        .route("/rate/{course_id}", post(rating_rate_handler))
        .route("/check/{course_id}", get(rating_check_handler))
        .route("/delete/{rating_id}", delete(rating_delete_handler))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            middlewares::extract_context_fn,
        ));

    Router::new()
        .route("/list/{course_id}", get(rating_list_handler))
        .merge(protected)
        .with_state(state)
}

fn fetch_err(e: DatabaseError) -> WebError {
    WebError::resource_fetch_error(CourseRating::get_resource_type(), e)
}

async fn ensure_course(state: &AppState, actor: &AuthenticatedUser, course_id: Uuid) -> WebResult<()> {
    CourseEntity::find_by_id(state.pool(), actor, course_id)
        .await
        .map_err(|e| WebError::resource_fetch_error(CourseEntity::get_resource_type(), e))?
        .map(|_| ())
        .ok_or_else(|| WebError::resource_not_found(CourseEntity::get_resource_type()))
}

#[utoipa::path(
    post,
    path = "/api/ratings/rate/{course_id}",
    request_body = RateBody,
    params(("course_id" = Uuid, Path, description = "Course to rate")),
    description = "Creates or replaces the caller's rating of a course",
    responses(
        (status = 201, description = "Rating created", body = CourseRating),
        (status = 200, description = "Rating updated", body = CourseRating),
        (status = 400, description = "Rating out of range", body = ErrorResponse),
        (status = 401, description = "Authentication required", body = ErrorResponse),
        (status = 403, description = "Only students can rate", body = ErrorResponse),
        (status = 404, description = "Course not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "ratings",
    security(
        ("bearer" = [])
    )
)]
async fn rating_rate_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(course_id): Path<Uuid>,
    ValidJson(payload): ValidJson<RateBody>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    user.require(Permission::RateCourse, CourseRating::get_resource_type())?;
    ensure_course(&state, user, course_id).await?;

    let (rating, created) = CourseRating::upsert(
        state.pool(),
        user,
        CourseRatingUpsert {
            course_id,
            user_id: user.user_id(),
            rating: payload.normalized_rating(),
            review: payload.review,
        },
    )
    .await
    .map_err(|e| WebError::resource_write_error(CourseRating::get_resource_type(), e))?;

    let status = if created { StatusCode::CREATED } else { StatusCode::OK };
    Ok((status, Json(rating)))
}

#[utoipa::path(
    get,
    path = "/api/ratings/check/{course_id}",
    params(("course_id" = Uuid, Path, description = "Course to check")),
    responses(
        (status = 200, description = "The caller's rating", body = CourseRating),
        (status = 401, description = "Authentication required", body = ErrorResponse),
        (status = 404, description = "Course not found or not rated by the caller", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "ratings",
    security(
        ("bearer" = [])
    )
)]
async fn rating_check_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(course_id): Path<Uuid>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    ensure_course(&state, user, course_id).await?;

    let rating = CourseRating::find_for_user(state.pool(), user, course_id)
        .await
        .map_err(fetch_err)?
        .ok_or_else(|| WebError::resource_not_found(CourseRating::get_resource_type()))?;

    Ok((StatusCode::OK, Json(rating)))
}

#[utoipa::path(
    get,
    path = "/api/ratings/list/{course_id}",
    params(("course_id" = Uuid, Path, description = "Course whose ratings to list")),
    responses(
        (status = 200, description = "Ratings, newest first", body = Vec<CourseRating>),
        (status = 404, description = "Course not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "ratings"
)]
async fn rating_list_handler(
    State(state): State<AppState>,
    Path(course_id): Path<Uuid>,
) -> WebResult<impl IntoResponse> {
    ensure_course(&state, &AuthenticatedUser::admin(), course_id).await?;

    let ratings = CourseRating::list_for_course(state.pool(), course_id)
        .await
        .map_err(fetch_err)?;

    Ok((StatusCode::OK, Json(ratings)))
}

#[utoipa::path(
    delete,
    path = "/api/ratings/delete/{rating_id}",
    params(("rating_id" = Uuid, Path, description = "Rating to delete")),
    responses(
        (status = 204, description = "Rating deleted"),
        (status = 401, description = "Authentication required", body = ErrorResponse),
        (status = 403, description = "Not the author and not an admin", body = ErrorResponse),
        (status = 404, description = "Rating not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "ratings",
    security(
        ("bearer" = [])
    )
)]
async fn rating_delete_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(rating_id): Path<Uuid>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;

    let rating = CourseRating::find_by_id(state.pool(), user, rating_id)
        .await
        .map_err(fetch_err)?
        .ok_or_else(|| WebError::resource_not_found(CourseRating::get_resource_type()))?;

    check_access(state.pool(), user, &rating, user.user_id())
        .await
        .map_err(|e| {
            if let DatabaseError::Forbidden = e {
                WebError::resource_forbidden(CourseRating::get_resource_type())
            } else {
                fetch_err(e)
            }
        })?;

    rating.delete(state.pool(), user).await.map_err(fetch_err)?;
    Ok(StatusCode::NO_CONTENT)
}
