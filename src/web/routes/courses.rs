use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::{delete, get, patch, post},
};

use crate::{
    model::{
        CrudRepository, DatabaseError, Page, Permission, ResourceTyped,
        entity::{Category, CourseCreate, CourseEntity, CoursePatch, SyllabusSection},
    },
    web::{
        AppState, AuthenticatedUser, RequestContext, ValidJson, WebError, WebResult,
        dto::courses::{CourseCreateBody, CourseDetail, CourseListQuery, CoursePatchBody, CourseSummary},
        error::ErrorResponse,
        middlewares,
    },
};

pub fn routes<S>(state: AppState) -> Router<S> {
    let protected = Router::new()
        .route("/add", post(course_add_handler))
        .route("/update/{name}", patch(course_update_handler))
        .route("/delete/{name}", delete(course_delete_handler))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            middlewares::extract_context_fn,
        ));

    Router::new()
        .route("/list-courses", get(course_list_handler))
        .route("/featured", get(course_featured_handler))
        .route("/{name}", get(course_detail_handler))
        .merge(protected)
        .with_state(state)
}

fn fetch_err(e: DatabaseError) -> WebError {
    WebError::resource_fetch_error(CourseEntity::get_resource_type(), e)
}

fn write_err(e: DatabaseError) -> WebError {
    WebError::resource_write_error(CourseEntity::get_resource_type(), e)
}

async fn find_course(state: &AppState, actor: &AuthenticatedUser, name: &str) -> WebResult<CourseEntity> {
    CourseEntity::find_by_name(state.pool(), actor, name)
        .await
        .map_err(fetch_err)?
        .ok_or_else(|| WebError::resource_not_found(CourseEntity::get_resource_type()))
}

async fn ensure_name_free(state: &AppState, name: &str, except: Option<uuid::Uuid>) -> WebResult<()> {
    let taken = CourseEntity::name_taken(state.pool(), name, except)
        .await
        .map_err(fetch_err)?;
    if taken {
        return Err(WebError::bad_request("Course with this name already exists"));
    }
    Ok(())
}

async fn course_detail(state: &AppState, course: &CourseEntity) -> WebResult<CourseDetail> {
    let syllabus = SyllabusSection::for_course(state.pool(), course.id())
        .await
        .map_err(fetch_err)?;
    let categories = Category::names_for_course(state.pool(), course.id())
        .await
        .map_err(fetch_err)?;

    Ok(CourseDetail::new(course, syllabus, categories))
}

#[utoipa::path(
    post,
    path = "/api/courses/add",
    request_body = CourseCreateBody,
    description = "Creates a course together with its syllabus and categories",
    responses(
        (status = 201, description = "Course created", body = CourseDetail),
        (status = 400, description = "Validation failed or name taken", body = ErrorResponse),
        (status = 401, description = "Authentication required", body = ErrorResponse),
        (status = 403, description = "Missing `add_course` permission", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "courses",
    security(
        ("bearer" = [])
    )
)]
async fn course_add_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    ValidJson(payload): ValidJson<CourseCreateBody>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    user.require(Permission::AddCourse, CourseEntity::get_resource_type())?;

    let data = CourseCreate::from(payload);
    ensure_name_free(&state, &data.name, None).await?;

    let created = CourseEntity::create(state.pool(), user, data)
        .await
        .map_err(write_err)?;

    tracing::info!(course = %created.name(), user_id = %user.user_id(), "course created");
    Ok((StatusCode::CREATED, Json(course_detail(&state, &created).await?)))
}

#[utoipa::path(
    get,
    path = "/api/courses/list-courses",
    params(CourseListQuery),
    description = "Lists courses with filtering, search and ordering",
    responses(
        (status = 200, description = "Requested page", body = Page<CourseSummary>),
        (status = 400, description = "Malformed filter or ordering", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "courses"
)]
async fn course_list_handler(
    State(state): State<AppState>,
    Query(query): Query<CourseListQuery>,
) -> WebResult<impl IntoResponse> {
    let (filter, page) = query.into_parts().map_err(WebError::bad_request)?;
    let actor = AuthenticatedUser::admin();

    let items = CourseEntity::search(state.pool(), &actor, &filter, page.limit, page.offset)
        .await
        .map_err(fetch_err)?;
    let total = CourseEntity::count_matching(state.pool(), &actor, &filter)
        .await
        .map_err(fetch_err)?;

    let page = Page::new(items, total, page.limit, page.offset).map(|c| CourseSummary::from(&c));
    Ok((StatusCode::OK, Json(page)))
}

#[utoipa::path(
    get,
    path = "/api/courses/featured",
    description = "Up to five courses rated 4.0 or higher, best first",
    responses(
        (status = 200, description = "Featured courses", body = Vec<CourseSummary>),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "courses"
)]
async fn course_featured_handler(State(state): State<AppState>) -> WebResult<impl IntoResponse> {
    let courses = CourseEntity::featured(state.pool(), &AuthenticatedUser::admin())
        .await
        .map_err(fetch_err)?;

    let courses: Vec<CourseSummary> = courses.iter().map(CourseSummary::from).collect();
    Ok((StatusCode::OK, Json(courses)))
}

#[utoipa::path(
    get,
    path = "/api/courses/{name}",
    params(("name" = String, Path, description = "Course name")),
    responses(
        (status = 200, description = "Course detail", body = CourseDetail),
        (status = 404, description = "Course not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "courses"
)]
async fn course_detail_handler(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> WebResult<impl IntoResponse> {
    let course = find_course(&state, &AuthenticatedUser::admin(), &name).await?;
    Ok((StatusCode::OK, Json(course_detail(&state, &course).await?)))
}

#[utoipa::path(
    patch,
    path = "/api/courses/update/{name}",
    request_body = CoursePatchBody,
    params(("name" = String, Path, description = "Course name")),
    description = "Partially updates a course; `syllabus` and `categories` are replaced when given",
    responses(
        (status = 200, description = "Course updated", body = CourseDetail),
        (status = 400, description = "Validation failed or name taken", body = ErrorResponse),
        (status = 401, description = "Authentication required", body = ErrorResponse),
        (status = 403, description = "Missing `edit_course` permission", body = ErrorResponse),
        (status = 404, description = "Course not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "courses",
    security(
        ("bearer" = [])
    )
)]
async fn course_update_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(name): Path<String>,
    ValidJson(payload): ValidJson<CoursePatchBody>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    user.require(Permission::EditCourse, CourseEntity::get_resource_type())?;

    let course = find_course(&state, user, &name).await?;
    let patch = CoursePatch::from(payload);
    if let Some(new_name) = patch.name.as_deref() {
        ensure_name_free(&state, new_name, Some(course.id())).await?;
    }

    let updated = course.update(state.pool(), user, patch).await.map_err(write_err)?;

    Ok((StatusCode::OK, Json(course_detail(&state, &updated).await?)))
}

#[utoipa::path(
    delete,
    path = "/api/courses/delete/{name}",
    params(("name" = String, Path, description = "Course name")),
    responses(
        (status = 204, description = "Course deleted"),
        (status = 401, description = "Authentication required", body = ErrorResponse),
        (status = 403, description = "Missing `delete_course` permission", body = ErrorResponse),
        (status = 404, description = "Course not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "courses",
    security(
        ("bearer" = [])
    )
)]
async fn course_delete_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    user.require(Permission::DeleteCourse, CourseEntity::get_resource_type())?;

    let course = find_course(&state, user, &name).await?;
    course.delete(state.pool(), user).await.map_err(write_err)?;

    tracing::info!(course = %name, user_id = %user.user_id(), "course deleted");
    Ok(StatusCode::NO_CONTENT)
}
